//! Metadata downloader: trigger in, persisted metadata object out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::consumer::MessageHandler;
use crate::errors::PipelineError;
use catalog_indexer_repository::interfaces::{put_json, MessagePublisher, ObjectStore, SourceRepository};
use catalog_indexer_shared::{IngestTrigger, StorageLayout};

/// What a single invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataOutcome {
    Persisted,
    /// The repository has no such item; nothing was written.
    NotFound,
}

/// Fetches a source item and persists it under `{id}.json`.
///
/// When `forward_topic` is set, the trigger is forwarded there after the
/// write; otherwise the next stage is expected to react to the storage
/// notification for the new object.
pub struct MetadataDownloader {
    repository: Arc<dyn SourceRepository>,
    store: Arc<dyn ObjectStore>,
    publisher: Arc<dyn MessagePublisher>,
    layout: StorageLayout,
    forward_topic: Option<String>,
}

impl MetadataDownloader {
    pub fn new(
        repository: Arc<dyn SourceRepository>,
        store: Arc<dyn ObjectStore>,
        publisher: Arc<dyn MessagePublisher>,
        layout: StorageLayout,
        forward_topic: Option<String>,
    ) -> Self {
        Self {
            repository,
            store,
            publisher,
            layout,
            forward_topic,
        }
    }

    /// Persist the metadata for `id`.
    #[instrument(skip(self))]
    pub async fn download(&self, id: Uuid) -> Result<MetadataOutcome, PipelineError> {
        let item = match self.repository.get_item(&id).await? {
            Some(item) => item,
            None => {
                info!(id = %id, "Item not found in repository, nothing to persist");
                return Ok(MetadataOutcome::NotFound);
            }
        };

        let key = StorageLayout::metadata_key(&id);
        put_json(self.store.as_ref(), &self.layout.metadata_bucket, &key, &item).await?;
        debug!(id = %id, bucket = %self.layout.metadata_bucket, key = %key, "Metadata persisted");

        if let Some(ref topic) = self.forward_topic {
            let trigger = IngestTrigger::new(id);
            self.publisher
                .publish(topic, &id.to_string(), &trigger.to_vec())
                .await?;
        }

        Ok(MetadataOutcome::Persisted)
    }
}

#[async_trait]
impl MessageHandler for MetadataDownloader {
    async fn handle(&self, payload: &[u8]) -> Result<(), PipelineError> {
        let trigger = IngestTrigger::from_slice(payload)?;
        self.download(trigger.id).await?;
        Ok(())
    }
}
