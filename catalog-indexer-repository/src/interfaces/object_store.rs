//! Object store trait definition.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::errors::StorageError;
use crate::types::BinaryStream;

/// Bucket + key addressed blob storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object in full. Returns `Ok(None)` when the key does not exist.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Write an object in a single request.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Copy a streamed body into an object without buffering it in memory.
    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        stream: BinaryStream,
    ) -> Result<(), StorageError>;
}

/// Read and decode a JSON object.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get(bucket, key).await? {
        Some(bytes) => serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::invalid_json(bucket, key, e)),
        None => Ok(None),
    }
}

/// Encode and write a JSON object in a single put.
pub async fn put_json<T: Serialize + Sync>(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let body = serde_json::to_vec(value).map_err(|e| StorageError::invalid_json(bucket, key, e))?;
    store.put(bucket, key, body, "application/json").await
}
