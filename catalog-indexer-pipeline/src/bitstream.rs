//! Bitstream downloader: copies the primary binary into storage, runs text
//! extraction and enqueues the indexing job.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::concurrency::for_each_bounded;
use crate::consumer::MessageHandler;
use crate::errors::PipelineError;
use catalog_indexer_repository::interfaces::{
    get_json, MessagePublisher, ObjectStore, SourceRepository, TextExtractor,
};
use catalog_indexer_repository::types::ExtractionRequest;
use catalog_indexer_shared::{
    primary_attachment, BitstreamInput, IndexingJob, SourceItem, StorageLayout,
    DEFAULT_TEXT_BEARING_TYPES,
};

/// Configuration for the bitstream downloader.
#[derive(Debug, Clone)]
pub struct BitstreamConfig {
    /// Items processed at once within one batch. Extraction is rate-limited
    /// downstream, so this stays low.
    pub concurrency: usize,
    /// MIME types whose originals are copied and extracted.
    pub text_bearing_mime_types: Vec<String>,
    /// Topic receiving indexing jobs.
    pub indexing_topic: String,
}

impl Default for BitstreamConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            text_bearing_mime_types: DEFAULT_TEXT_BEARING_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            indexing_topic: "catalog.indexing-jobs".to_string(),
        }
    }
}

/// What happened to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitstreamOutcome {
    /// Binary copied, text extracted, job references the text.
    Extracted,
    /// No primary binary; job carries only the id.
    NoBinary,
    /// No persisted metadata for the id; nothing to do.
    Skipped,
}

pub struct BitstreamDownloader {
    repository: Arc<dyn SourceRepository>,
    store: Arc<dyn ObjectStore>,
    extractor: Arc<dyn TextExtractor>,
    publisher: Arc<dyn MessagePublisher>,
    layout: StorageLayout,
    config: BitstreamConfig,
}

impl BitstreamDownloader {
    pub fn new(
        repository: Arc<dyn SourceRepository>,
        store: Arc<dyn ObjectStore>,
        extractor: Arc<dyn TextExtractor>,
        publisher: Arc<dyn MessagePublisher>,
        layout: StorageLayout,
        config: BitstreamConfig,
    ) -> Self {
        Self {
            repository,
            store,
            extractor,
            publisher,
            layout,
            config,
        }
    }

    /// Resolve an input message to the ids it refers to. Storage records
    /// outside the metadata bucket, or with keys that are not `{id}.json`,
    /// are skipped.
    pub fn resolve_ids(&self, input: BitstreamInput) -> Vec<Uuid> {
        match input {
            BitstreamInput::Trigger(trigger) => vec![trigger.id],
            BitstreamInput::StorageEvent(records) => records
                .into_iter()
                .filter_map(|record| {
                    if record.bucket != self.layout.metadata_bucket {
                        warn!(bucket = %record.bucket, key = %record.key, "Ignoring object outside metadata bucket");
                        return None;
                    }
                    let id = StorageLayout::id_from_metadata_key(&record.key);
                    if id.is_none() {
                        warn!(key = %record.key, "Cannot resolve id from object key");
                    }
                    id
                })
                .collect(),
        }
    }

    /// Process a batch of ids with bounded concurrency. Every item is
    /// attempted; the batch fails afterwards if any item failed.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn process_batch(&self, ids: Vec<Uuid>) -> Result<(), PipelineError> {
        let total = ids.len();

        let results = for_each_bounded(ids, self.config.concurrency, |id| async move {
            let result = self.process_item(id).await;
            if let Err(ref e) = result {
                error!(id = %id, error = %e, "Bitstream processing failed");
            }
            result
        })
        .await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed == 0 {
            return Ok(());
        }

        // A lone failure keeps its own classification.
        if total == 1 {
            if let Some(Err(e)) = results.into_iter().next() {
                return Err(e);
            }
        }
        Err(PipelineError::PartialFailure { failed, total })
    }

    /// Handle one item end to end.
    #[instrument(skip(self))]
    pub async fn process_item(&self, id: Uuid) -> Result<BitstreamOutcome, PipelineError> {
        let key = StorageLayout::metadata_key(&id);
        let item: SourceItem =
            match get_json(self.store.as_ref(), &self.layout.metadata_bucket, &key).await? {
                Some(item) => item,
                None => {
                    warn!(id = %id, "No persisted metadata, skipping");
                    return Ok(BitstreamOutcome::Skipped);
                }
            };

        let attachment =
            match primary_attachment(&item.attachments, &self.config.text_bearing_mime_types) {
                Some(attachment) => attachment,
                None => {
                    debug!(id = %id, "No primary binary, indexing without text");
                    self.enqueue(&IndexingJob::without_text(id)).await?;
                    return Ok(BitstreamOutcome::NoBinary);
                }
            };

        let binary_key = StorageLayout::binary_key(&id);
        let stream = self.repository.open_attachment(attachment).await?;
        self.store
            .put_stream(&self.layout.binary_bucket, &binary_key, stream)
            .await?;

        let text_key = StorageLayout::text_key(&id);
        let request = ExtractionRequest {
            document_uri: StorageLayout::uri(&self.layout.binary_bucket, &binary_key),
            temp_uri_prefix: StorageLayout::uri(
                &self.layout.text_bucket,
                &StorageLayout::temp_prefix(&id),
            ),
            text_uri: StorageLayout::uri(&self.layout.text_bucket, &text_key),
        };

        match self.extractor.extract(&request).await {
            Ok(output) => debug!(id = %id, text_uri = %output.text_uri, "Text extracted"),
            Err(e) if e.is_structured() => {
                error!(id = %id, error = %e, "Extraction reported a failure");
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        }

        self.enqueue(&IndexingJob::with_text(id, &self.layout.text_bucket, text_key))
            .await?;

        info!(id = %id, "Binary extracted and queued for indexing");
        Ok(BitstreamOutcome::Extracted)
    }

    async fn enqueue(&self, job: &IndexingJob) -> Result<(), PipelineError> {
        self.publisher
            .publish(&self.config.indexing_topic, &job.id.to_string(), &job.to_vec())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for BitstreamDownloader {
    async fn handle(&self, payload: &[u8]) -> Result<(), PipelineError> {
        let input = BitstreamInput::from_slice(payload)?;
        let ids = self.resolve_ids(input);
        self.process_batch(ids).await
    }
}
