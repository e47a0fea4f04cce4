//! Graph database client.

mod client;

pub use client::{GraphConfig, NeptuneGraphClient};
