//! HTTP implementation of the text extraction invoker.

mod client;

pub use client::{parse_extraction_response, HttpTextExtractor};
