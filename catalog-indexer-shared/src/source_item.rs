//! Source repository records.
//!
//! A `SourceItem` is the repository's own view of a document. The pipeline
//! never mutates one; it is fetched, persisted verbatim as the metadata
//! object, and later read back by the indexer and reconciler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A single metadata tuple. Keys are dotted (`dc.contributor.author`) and may
/// repeat within one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            language: None,
        }
    }
}

/// Content checksum reported by the repository for a binary attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub value: String,
    #[serde(
        default,
        rename = "checkSumAlgorithm",
        skip_serializing_if = "Option::is_none"
    )]
    pub algorithm: Option<String>,
}

/// Descriptor of a binary attachment (bitstream).
///
/// Every field is optional on the wire so that partial projections read back
/// from the search index deserialize into the same type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, rename = "uuid", skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Bundle / category, e.g. `ORIGINAL` or `THUMBNAIL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, rename = "checkSum", skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
    /// Repository-relative fetch reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieve_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attachment {
    /// The checksum value, if the repository reported one.
    pub fn checksum_value(&self) -> Option<&str> {
        self.checksum.as_ref().map(|c| c.value.as_str())
    }

    pub fn is_in_bundle(&self, bundle: &str) -> bool {
        self.bundle_name
            .as_deref()
            .is_some_and(|b| b.eq_ignore_ascii_case(bundle))
    }
}

/// An immutable-per-version snapshot of a repository document.
///
/// Fields the pipeline does not interpret are kept in `extra` so that the
/// persisted metadata object is a faithful copy of what the repository sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceItem {
    #[serde(rename = "uuid")]
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
    #[serde(default, rename = "bitstreams")]
    pub attachments: Vec<Attachment>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SourceItem {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            name: None,
            handle: None,
            last_modified: None,
            metadata: Vec::new(),
            attachments: Vec::new(),
            extra: Map::new(),
        }
    }

    /// First value recorded for `key`, in source order.
    pub fn first_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    /// Title used for tagging: `dc.title` when present, otherwise the item name.
    pub fn title(&self) -> Option<&str> {
        self.first_value("dc.title").or(self.name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_repository_payload() {
        let payload = json!({
            "uuid": "0c6a4a4e-8f49-4b5f-9d44-8f1b2c3d4e5f",
            "name": "Deep sea survey",
            "handle": "123456789/42",
            "type": "item",
            "lastModified": "2021-10-27 13:03:31.123",
            "metadata": [
                { "key": "dc.title", "value": "Deep sea survey", "language": "en" }
            ],
            "bitstreams": [{
                "uuid": "9d3f1c1e-6a2b-4f8e-8a3c-2b1d0e9f8a7b",
                "name": "survey.pdf",
                "bundleName": "ORIGINAL",
                "mimeType": "application/pdf",
                "checkSum": { "value": "abc", "checkSumAlgorithm": "MD5" },
                "retrieveLink": "/rest/bitstreams/9d3f1c1e-6a2b-4f8e-8a3c-2b1d0e9f8a7b/retrieve",
                "sizeBytes": 1024
            }]
        });

        let item: SourceItem = serde_json::from_value(payload).unwrap();

        assert_eq!(item.name.as_deref(), Some("Deep sea survey"));
        assert_eq!(item.metadata.len(), 1);
        assert_eq!(item.attachments[0].checksum_value(), Some("abc"));
        assert!(item.attachments[0].is_in_bundle("original"));
        assert_eq!(item.extra.get("type"), Some(&json!("item")));
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let payload = json!({
            "uuid": "0c6a4a4e-8f49-4b5f-9d44-8f1b2c3d4e5f",
            "parentCollection": { "name": "Reports" },
            "withdrawn": "false"
        });

        let item: SourceItem = serde_json::from_value(payload.clone()).unwrap();
        let back = serde_json::to_value(&item).unwrap();

        assert_eq!(back["parentCollection"], payload["parentCollection"]);
        assert_eq!(back["withdrawn"], "false");
    }

    #[test]
    fn test_title_prefers_dc_title() {
        let mut item = SourceItem::new(Uuid::new_v4());
        item.name = Some("Item name".to_string());
        assert_eq!(item.title(), Some("Item name"));

        item.metadata.push(MetadataEntry::new("dc.title", "Catalogued title"));
        assert_eq!(item.title(), Some("Catalogued title"));
    }
}
