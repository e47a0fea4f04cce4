//! # Catalog Indexer
//!
//! Entry point, configuration and dependency wiring for the catalog
//! indexer workers and batch jobs.

pub mod config;
pub mod logging;

pub use config::{AppConfig, Dependencies, Worker};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    Validation(#[from] catalog_indexer_shared::ValidationError),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] catalog_indexer_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] catalog_indexer_repository::SearchError),

    #[error("Storage error: {0}")]
    StorageError(#[from] catalog_indexer_repository::StorageError),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] catalog_indexer_repository::RepositoryError),

    #[error("Queue error: {0}")]
    QueueError(#[from] catalog_indexer_repository::QueueError),

    #[error("Extraction error: {0}")]
    ExtractionError(#[from] catalog_indexer_repository::ExtractionError),

    #[error("Graph error: {0}")]
    GraphError(#[from] catalog_indexer_repository::GraphError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
