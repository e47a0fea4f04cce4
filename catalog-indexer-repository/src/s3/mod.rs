//! S3-compatible implementation of the object store.

mod client;
mod signing;

pub use client::{S3Config, S3ObjectStore};
pub use signing::Credentials;
