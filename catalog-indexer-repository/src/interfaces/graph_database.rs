//! Graph database trait definition.

use async_trait::async_trait;

use crate::errors::GraphError;
use crate::types::{LoadRequest, LoadStatus, SparqlRow};

/// Bulk loading and SPARQL access to the graph database.
#[async_trait]
pub trait GraphDatabase: Send + Sync {
    /// Submit a bulk load job and return its load id.
    async fn start_load(&self, request: &LoadRequest) -> Result<String, GraphError>;

    /// Poll a bulk load job.
    async fn load_status(&self, load_id: &str) -> Result<LoadStatus, GraphError>;

    /// Run a SPARQL SELECT and return its rows.
    async fn select(&self, query: &str) -> Result<Vec<SparqlRow>, GraphError>;
}
