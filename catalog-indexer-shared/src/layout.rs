//! Deterministic object-store layout.

use uuid::Uuid;

/// Buckets used by the pipeline. Keys inside them are derived from the item id
/// alone, so every stage can locate the others' output without coordination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub metadata_bucket: String,
    pub binary_bucket: String,
    pub text_bucket: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            metadata_bucket: "catalog-metadata".to_string(),
            binary_bucket: "catalog-binaries".to_string(),
            text_bucket: "catalog-text".to_string(),
        }
    }
}

impl StorageLayout {
    /// `{id}.json`
    pub fn metadata_key(id: &Uuid) -> String {
        format!("{}.json", id)
    }

    /// `pdf/{id}.pdf`
    pub fn binary_key(id: &Uuid) -> String {
        format!("pdf/{}.pdf", id)
    }

    /// `txt/{id}.txt`
    pub fn text_key(id: &Uuid) -> String {
        format!("txt/{}.txt", id)
    }

    /// `tmp/{id}/`, scratch space for the extraction service.
    pub fn temp_prefix(id: &Uuid) -> String {
        format!("tmp/{}/", id)
    }

    /// Recover the item id from a metadata key as it appears in a storage
    /// event, where keys are URL-encoded and spaces arrive as `+`. Only the
    /// last path segment is inspected; it must be `{uuid}.json`.
    pub fn id_from_metadata_key(key: &str) -> Option<Uuid> {
        let spaced = key.replace('+', " ");
        let decoded = urlencoding::decode(&spaced).ok()?;
        let file_name = decoded.rsplit('/').next()?;
        let stem = file_name.strip_suffix(".json")?;
        Uuid::parse_str(stem).ok()
    }

    /// `s3://bucket/key` form used in extraction requests.
    pub fn uri(bucket: &str, key: &str) -> String {
        format!("s3://{}/{}", bucket, key)
    }
}
