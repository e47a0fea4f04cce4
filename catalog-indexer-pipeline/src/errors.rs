//! Pipeline error types.

use thiserror::Error;
use uuid::Uuid;

use catalog_indexer_repository::{
    ExtractionError, GraphError, QueueError, RepositoryError, SearchError, StorageError,
};
use catalog_indexer_shared::ValidationError;

/// Errors that can occur while running a pipeline component.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An input message failed validation before any side effect.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// The indexer found no persisted metadata for the job's id.
    #[error("No persisted metadata for {0}")]
    MissingMetadata(Uuid),

    /// A document could not be assembled.
    #[error("Document error: {0}")]
    DocumentError(String),

    /// Some items of a fan-out batch failed; the rest were processed.
    #[error("{failed} of {total} items failed")]
    PartialFailure { failed: usize, total: usize },

    /// The graph bulk load ended in a failure state.
    #[error("Bulk load {load_id} failed: {status}")]
    LoadFailed { load_id: String, status: String },

    /// The graph bulk load did not finish in time.
    #[error("Bulk load {0} timed out")]
    LoadTimeout(String),

    #[error("Kafka error: {0}")]
    KafkaError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PipelineError {
    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a document error.
    pub fn document(msg: impl ToString) -> Self {
        Self::DocumentError(msg.to_string())
    }

    /// Whether redelivering the message could succeed.
    ///
    /// Malformed input, missing metadata and documents that cannot be built
    /// will fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Validation(_)
                | Self::MissingMetadata(_)
                | Self::DocumentError(_)
                | Self::ConfigError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(!PipelineError::from(ValidationError::malformed("trigger", "bad id")).is_retryable());
        assert!(!PipelineError::MissingMetadata(Uuid::nil()).is_retryable());
        assert!(PipelineError::from(StorageError::transport("b", "k", "reset")).is_retryable());
        assert!(PipelineError::from(ExtractionError::failed("PdfError", "broken")).is_retryable());
        assert!(PipelineError::PartialFailure { failed: 1, total: 2 }.is_retryable());
    }
}
