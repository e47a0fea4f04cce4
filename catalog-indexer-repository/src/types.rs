//! Request and response types shared by the client interfaces.

use std::collections::HashMap;
use std::fmt;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page read from a scroll cursor.
///
/// The engine may hand back a new cursor id with every page; callers must
/// continue (and finally clear) with the most recent one.
#[derive(Debug, Clone)]
pub struct ScrollPage {
    pub scroll_id: Option<String>,
    pub hits: Vec<ScrollHit>,
}

impl ScrollPage {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// A single hit: the document id plus its projected `_source`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollHit {
    pub doc_id: String,
    pub source: Value,
}

/// Candidate document submitted to the stored-query match endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PercolateDocument {
    pub title: String,
    pub body: String,
}

impl PercolateDocument {
    /// Build a candidate; the body falls back to the title when no text exists.
    pub fn new(title: impl Into<String>, body: Option<String>) -> Self {
        let title = title.into();
        let body = body.unwrap_or_else(|| title.clone());
        Self { title, body }
    }
}

/// A stored query derived from one vocabulary term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredQuery {
    pub id: String,
    pub label: String,
    pub uri: String,
    pub source_vocabulary: String,
    pub named_graph: String,
}

/// Outcome of a bulk delete request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeleteSummary {
    pub total: usize,
    pub deleted: usize,
    pub not_found: usize,
    pub failed: Vec<String>,
}

/// A streamed binary body.
pub struct BinaryStream {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub body: BoxStream<'static, Result<Vec<u8>, std::io::Error>>,
}

impl fmt::Debug for BinaryStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryStream")
            .field("content_length", &self.content_length)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// One entry of the repository's update feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: String,
    /// Persistent handle parsed from the link (`prefix/suffix`), if any.
    pub handle: Option<String>,
}

/// Request sent to the text extraction function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub document_uri: String,
    pub temp_uri_prefix: String,
    pub text_uri: String,
}

/// Successful extraction result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOutput {
    pub text_uri: String,
}

/// Submission to the graph bulk loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub source: String,
    pub format: String,
    pub named_graph_uri: String,
}

/// Status of a bulk load job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    NotStarted,
    InQueue,
    InProgress,
    Completed,
    Failed(String),
}

impl LoadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

/// One SPARQL result row: variable name to plain lexical value.
pub type SparqlRow = HashMap<String, String>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percolate_body_defaults_to_title() {
        let doc = PercolateDocument::new("Deep sea survey", None);
        assert_eq!(doc.body, "Deep sea survey");

        let doc = PercolateDocument::new("Deep sea survey", Some("full text".to_string()));
        assert_eq!(doc.body, "full text");
    }

    #[test]
    fn test_load_status_terminal() {
        assert!(LoadStatus::Completed.is_terminal());
        assert!(LoadStatus::Failed("LOAD_FAILED".to_string()).is_terminal());
        assert!(!LoadStatus::InProgress.is_terminal());
        assert!(!LoadStatus::InQueue.is_terminal());
        assert!(!LoadStatus::NotStarted.is_terminal());
    }
}
