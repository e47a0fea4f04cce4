//! Configuration types for the search engine client.

/// Index names and request limits for the search engine client.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Index (or alias) holding one document per repository item.
    pub documents_index: String,
    /// Percolator index holding one stored query per vocabulary term.
    pub stored_queries_index: String,
    /// Maximum number of actions sent in a single bulk request. Larger
    /// batches are split into several requests. `None` disables splitting.
    pub max_batch_size: Option<usize>,
    /// Upper bound on stored queries returned for one percolate call.
    pub max_tag_matches: usize,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            documents_index: "catalog-documents".to_string(),
            stored_queries_index: "catalog-terms".to_string(),
            max_batch_size: Some(1000),
            max_tag_matches: 500,
        }
    }
}

impl SearchIndexConfig {
    /// Create a config with custom index names and default limits.
    pub fn new(documents_index: impl Into<String>, stored_queries_index: impl Into<String>) -> Self {
        Self {
            documents_index: documents_index.into(),
            stored_queries_index: stored_queries_index.into(),
            ..Self::default()
        }
    }

    /// Create a config with a custom bulk batch size.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = Some(max_batch_size.max(1));
        self
    }

    /// Chunk size for bulk requests over `total` actions.
    pub fn chunk_size(&self, total: usize) -> usize {
        self.max_batch_size.unwrap_or(total).max(1)
    }
}
