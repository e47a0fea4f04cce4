//! Search index document types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::flatten::flatten_metadata;
use crate::source_item::{Attachment, SourceItem};

/// Identity field written on every indexed document.
pub const FIELD_ID: &str = "id";
/// Body-search field holding extracted text.
pub const FIELD_EXTRACTED_TEXT: &str = "extractedText";
/// Controlled-vocabulary matches.
pub const FIELD_TAGS: &str = "tags";
/// Resolved thumbnail link.
pub const FIELD_THUMBNAIL: &str = "thumbnail";
/// Last modification timestamp as reported by the repository.
pub const FIELD_LAST_MODIFIED: &str = "lastModified";
/// Attachment descriptors as reported by the repository.
pub const FIELD_ATTACHMENTS: &str = "bitstreams";

/// Fields the reconciler needs from each indexed document.
pub const RECONCILE_FIELDS: &[&str] = &[
    FIELD_ID,
    FIELD_LAST_MODIFIED,
    "bitstreams.bundleName",
    "bitstreams.mimeType",
    "bitstreams.checkSum",
];

/// A controlled-vocabulary term that matched a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMatch {
    pub label: String,
    pub uri: String,
    #[serde(default)]
    pub source_vocabulary: String,
    #[serde(default)]
    pub named_graph_reference: String,
}

/// The search engine's copy of a document, keyed by `id`.
///
/// The body is an ordered JSON object, so serializing the same inputs twice
/// yields identical bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub id: Uuid,
    pub body: Map<String, Value>,
}

impl IndexedDocument {
    /// Assemble a document from its durable inputs.
    ///
    /// Layering order: raw item fields, then flattened metadata aliases
    /// (which win over a raw field of the same name), then the reserved
    /// fields `extractedText`, `tags`, `thumbnail` and `id`, which nothing
    /// else can overwrite. Tags are sorted and de-duplicated.
    pub fn build(
        item: &SourceItem,
        extracted_text: Option<String>,
        mut tags: Vec<TagMatch>,
        thumbnail: Option<String>,
    ) -> Result<Self, serde_json::Error> {
        let mut body = match serde_json::to_value(item)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        body.extend(flatten_metadata(&item.metadata));

        body.remove(FIELD_EXTRACTED_TEXT);
        if let Some(text) = extracted_text {
            body.insert(FIELD_EXTRACTED_TEXT.to_string(), Value::String(text));
        }

        tags.sort();
        tags.dedup();
        body.insert(FIELD_TAGS.to_string(), serde_json::to_value(&tags)?);

        body.remove(FIELD_THUMBNAIL);
        if let Some(link) = thumbnail {
            body.insert(FIELD_THUMBNAIL.to_string(), Value::String(link));
        }

        body.insert(FIELD_ID.to_string(), Value::String(item.id.to_string()));

        Ok(Self { id: item.id, body })
    }

    pub fn extracted_text(&self) -> Option<&str> {
        self.body.get(FIELD_EXTRACTED_TEXT).and_then(Value::as_str)
    }

    pub fn tags(&self) -> Vec<TagMatch> {
        self.body
            .get(FIELD_TAGS)
            .and_then(|tags| serde_json::from_value(tags.clone()).ok())
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.body.clone())
    }
}

/// The projection of an indexed document used for drift detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub id: Uuid,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default, rename = "bitstreams")]
    pub attachments: Vec<Attachment>,
}
