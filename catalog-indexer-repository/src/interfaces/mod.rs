//! Interface definitions for the catalog indexer's external systems.
//!
//! Every external collaborator sits behind an `async_trait` so pipeline
//! components receive them by injection and tests can substitute mocks.

mod graph_database;
mod message_publisher;
mod object_store;
mod search_engine_client;
mod source_repository;
mod text_extractor;

pub use graph_database::GraphDatabase;
pub use message_publisher::{publish_json, MessagePublisher};
pub use object_store::{get_json, put_json, ObjectStore};
pub use search_engine_client::SearchEngineClient;
pub use source_repository::SourceRepository;
pub use text_extractor::TextExtractor;
