//! Search engine client trait definition.
//!
//! This module defines the abstract interface for search engine operations,
//! allowing for different backend implementations (OpenSearch, mock, etc.).

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::SearchError;
use crate::types::{BulkDeleteSummary, PercolateDocument, ScrollPage, StoredQuery};
use catalog_indexer_shared::{IndexedDocument, TagMatch};

/// Abstract interface for search engine operations.
///
/// Two indices are involved: the documents index, keyed by item id, and the
/// stored-query index holding one percolator query per vocabulary term.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Write a document under its id, replacing any existing document in full.
    async fn index_document(&self, document: &IndexedDocument) -> Result<(), SearchError>;

    /// Fetch a document's `_source` by id. Returns `Ok(None)` when absent.
    async fn get_document(&self, id: &Uuid) -> Result<Option<Value>, SearchError>;

    /// Delete every document matching `query` (a query DSL clause, not a
    /// full request body). Returns the number of deleted documents.
    async fn delete_by_query(&self, query: &Value) -> Result<u64, SearchError>;

    /// Delete documents by id in a single bulk request. Ids that are already
    /// absent count as `not_found`, not as failures.
    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<BulkDeleteSummary, SearchError>;

    /// Open a scroll over the whole documents index, projecting `fields`.
    async fn open_scroll(
        &self,
        fields: &[&str],
        page_size: usize,
        keep_alive: &str,
    ) -> Result<ScrollPage, SearchError>;

    /// Read the next page of an open scroll.
    async fn next_scroll_page(
        &self,
        scroll_id: &str,
        keep_alive: &str,
    ) -> Result<ScrollPage, SearchError>;

    /// Release a scroll's server-side resources.
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError>;

    /// Run `document` against the stored queries and return the terms whose
    /// queries matched.
    async fn percolate(&self, document: &PercolateDocument) -> Result<Vec<TagMatch>, SearchError>;

    /// Remove all stored queries derived from `named_graph`.
    async fn delete_stored_queries(&self, named_graph: &str) -> Result<u64, SearchError>;

    /// Index a batch of stored queries in one bulk request.
    async fn bulk_index_stored_queries(&self, queries: &[StoredQuery]) -> Result<(), SearchError>;

    /// Create the documents index and the stored-query index if absent.
    async fn ensure_indices(&self) -> Result<(), SearchError>;

    /// Check if the search engine is healthy and reachable.
    async fn health_check(&self) -> Result<bool, SearchError>;
}
