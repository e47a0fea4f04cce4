//! Error types for the catalog indexer's external clients.

mod extraction_error;
mod graph_error;
mod queue_error;
mod repository_error;
mod search_error;
mod storage_error;

pub use extraction_error::ExtractionError;
pub use graph_error::GraphError;
pub use queue_error::QueueError;
pub use repository_error::RepositoryError;
pub use search_error::SearchError;
pub use storage_error::StorageError;
