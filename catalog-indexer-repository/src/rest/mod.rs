//! REST implementation of the source repository client.

mod client;
mod feed;

pub use client::{RepositoryConfig, RestSourceRepository};
pub use feed::{handle_from_link, parse_feed};
