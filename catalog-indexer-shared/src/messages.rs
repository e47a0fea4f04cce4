//! Queue payloads and reconciliation output.
//!
//! Every payload is parsed at the boundary into a typed struct. Anything that
//! fails to parse is rejected with a [`ValidationError`] before the caller
//! performs any side effect.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

/// A request to (re-)ingest one repository item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestTrigger {
    pub id: Uuid,
}

impl IngestTrigger {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }

    /// Parse and validate a trigger payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(payload).map_err(|e| ValidationError::malformed("trigger", e))
    }

    pub fn to_vec(&self) -> Vec<u8> {
        // Serializing a struct of one UUID cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// A request to build and upsert the index document for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingJob {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_key: Option<String>,
}

impl IndexingJob {
    /// A job for an item with no extracted text.
    pub fn without_text(id: Uuid) -> Self {
        Self {
            id,
            text_bucket: None,
            text_key: None,
        }
    }

    /// A job referencing extracted text at `bucket`/`key`.
    pub fn with_text(id: Uuid, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id,
            text_bucket: Some(bucket.into()),
            text_key: Some(key.into()),
        }
    }

    /// Parse and validate a job payload. A plain `{id}` trigger is accepted.
    /// `textBucket` and `textKey` must be given together.
    pub fn from_slice(payload: &[u8]) -> Result<Self, ValidationError> {
        let job: Self =
            serde_json::from_slice(payload).map_err(|e| ValidationError::malformed("indexing job", e))?;

        match (&job.text_bucket, &job.text_key) {
            (Some(_), None) | (None, Some(_)) => Err(ValidationError::invalid(
                "indexing job",
                "textBucket and textKey must be set together",
            )),
            _ => Ok(job),
        }
    }

    /// The extracted-text location, if any.
    pub fn text_ref(&self) -> Option<(&str, &str)> {
        match (&self.text_bucket, &self.text_key) {
            (Some(bucket), Some(key)) => Some((bucket.as_str(), key.as_str())),
            _ => None,
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// A single object reference from a storage-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObjectRef {
    pub bucket: String,
    pub key: String,
}

#[derive(Deserialize)]
struct S3EventNotification {
    #[serde(rename = "Records")]
    records: Vec<S3EventRecord>,
}

#[derive(Deserialize)]
struct S3EventRecord {
    s3: S3Entity,
}

#[derive(Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Deserialize)]
struct S3Object {
    key: String,
}

/// Input accepted by the bitstream stage: either a trigger or an S3-style
/// storage event notification carrying one or more records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitstreamInput {
    Trigger(IngestTrigger),
    StorageEvent(Vec<StoredObjectRef>),
}

impl BitstreamInput {
    pub fn from_slice(payload: &[u8]) -> Result<Self, ValidationError> {
        if let Ok(trigger) = serde_json::from_slice::<IngestTrigger>(payload) {
            return Ok(Self::Trigger(trigger));
        }

        let notification: S3EventNotification = serde_json::from_slice(payload)
            .map_err(|e| ValidationError::malformed("bitstream input", e))?;

        Ok(Self::StorageEvent(
            notification
                .records
                .into_iter()
                .map(|record| StoredObjectRef {
                    bucket: record.s3.bucket.name,
                    key: record.s3.object.key,
                })
                .collect(),
        ))
    }
}

/// Output of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub updated: Vec<Uuid>,
    pub removed: Vec<Uuid>,
}

impl ReconciliationResult {
    pub fn is_clean(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_parse() {
        let trigger =
            IngestTrigger::from_slice(br#"{"id":"0c6a4a4e-8f49-4b5f-9d44-8f1b2c3d4e5f"}"#).unwrap();
        assert_eq!(trigger.id.to_string(), "0c6a4a4e-8f49-4b5f-9d44-8f1b2c3d4e5f");
    }

    #[test]
    fn test_trigger_rejects_malformed_id() {
        assert!(IngestTrigger::from_slice(br#"{"id":"not-a-uuid"}"#).is_err());
        assert!(IngestTrigger::from_slice(br#"{}"#).is_err());
        assert!(IngestTrigger::from_slice(b"garbage").is_err());
    }

    #[test]
    fn test_job_accepts_plain_trigger() {
        let job = IndexingJob::from_slice(br#"{"id":"0c6a4a4e-8f49-4b5f-9d44-8f1b2c3d4e5f"}"#).unwrap();
        assert!(job.text_ref().is_none());
    }

    #[test]
    fn test_job_with_text() {
        let job = IndexingJob::from_slice(
            br#"{"id":"0c6a4a4e-8f49-4b5f-9d44-8f1b2c3d4e5f","textBucket":"text","textKey":"txt/x.txt"}"#,
        )
        .unwrap();
        assert_eq!(job.text_ref(), Some(("text", "txt/x.txt")));
    }

    #[test]
    fn test_job_rejects_half_text_reference() {
        let result = IndexingJob::from_slice(
            br#"{"id":"0c6a4a4e-8f49-4b5f-9d44-8f1b2c3d4e5f","textBucket":"text"}"#,
        );
        assert!(matches!(result, Err(ValidationError::Invalid { .. })));
    }

    #[test]
    fn test_job_serialization_omits_missing_text() {
        let job = IndexingJob::without_text(Uuid::nil());
        let json = String::from_utf8(job.to_vec()).unwrap();
        assert_eq!(json, r#"{"id":"00000000-0000-0000-0000-000000000000"}"#);
    }

    #[test]
    fn test_bitstream_input_storage_event() {
        let payload = br#"{"Records":[
            {"s3":{"bucket":{"name":"metadata"},"object":{"key":"0c6a4a4e-8f49-4b5f-9d44-8f1b2c3d4e5f.json"}}},
            {"s3":{"bucket":{"name":"metadata"},"object":{"key":"9d3f1c1e-6a2b-4f8e-8a3c-2b1d0e9f8a7b.json"}}}
        ]}"#;

        match BitstreamInput::from_slice(payload).unwrap() {
            BitstreamInput::StorageEvent(records) => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[0].bucket, "metadata");
            }
            other => panic!("unexpected input: {:?}", other),
        }
    }

    #[test]
    fn test_bitstream_input_trigger() {
        let input =
            BitstreamInput::from_slice(br#"{"id":"0c6a4a4e-8f49-4b5f-9d44-8f1b2c3d4e5f"}"#).unwrap();
        assert!(matches!(input, BitstreamInput::Trigger(_)));
    }

    #[test]
    fn test_bitstream_input_rejects_unknown_shape() {
        assert!(BitstreamInput::from_slice(br#"{"bucket":"x"}"#).is_err());
    }
}
