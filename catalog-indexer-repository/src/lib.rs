//! # Catalog Indexer Repository
//!
//! Traits and concrete implementations for every external system the
//! pipeline talks to: the search engine, the object store, the message
//! queue, the source repository, the text extraction function and the
//! graph database.

pub mod config;
pub mod errors;
pub mod extraction;
pub mod interfaces;
pub mod kafka;
pub mod neptune;
pub mod opensearch;
pub mod rest;
pub mod s3;
pub mod types;

pub use config::SearchIndexConfig;
pub use errors::{
    ExtractionError, GraphError, QueueError, RepositoryError, SearchError, StorageError,
};
pub use extraction::HttpTextExtractor;
pub use interfaces::{
    GraphDatabase, MessagePublisher, ObjectStore, SearchEngineClient, SourceRepository,
    TextExtractor,
};
pub use kafka::KafkaPublisher;
pub use neptune::{GraphConfig, NeptuneGraphClient};
pub use opensearch::OpenSearchClient;
pub use rest::{RepositoryConfig, RestSourceRepository};
pub use s3::{Credentials, S3Config, S3ObjectStore};
