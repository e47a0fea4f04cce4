//! Trigger producers: the ways an id enters the pipeline.
//!
//! Every producer ends in [`publish_triggers`], which fans the publishes out
//! with bounded concurrency and logs individual failures instead of
//! aborting.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::concurrency::{for_each_bounded, DEFAULT_FAN_OUT};
use crate::errors::PipelineError;
use catalog_indexer_repository::interfaces::{MessagePublisher, SourceRepository};
use catalog_indexer_shared::IngestTrigger;

/// Result of publishing a set of triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub published: usize,
    pub failed: Vec<Uuid>,
}

impl PublishSummary {
    fn merge(&mut self, other: PublishSummary) {
        self.published += other.published;
        self.failed.extend(other.failed);
    }
}

/// Publish one [`IngestTrigger`] per id, keyed by the id.
pub async fn publish_triggers(
    publisher: &dyn MessagePublisher,
    topic: &str,
    ids: &[Uuid],
    concurrency: usize,
) -> PublishSummary {
    let results = for_each_bounded(ids.iter().copied(), concurrency, |id| async move {
        let payload = IngestTrigger::new(id).to_vec();
        (id, publisher.publish(topic, &id.to_string(), &payload).await)
    })
    .await;

    let mut summary = PublishSummary::default();
    for (id, result) in results {
        match result {
            Ok(()) => summary.published += 1,
            Err(e) => {
                error!(id = %id, topic = %topic, error = %e, "Failed to publish trigger");
                summary.failed.push(id);
            }
        }
    }
    summary
}

/// Publishes triggers for ids discovered in the source repository.
pub struct TriggerSource {
    repository: Arc<dyn SourceRepository>,
    publisher: Arc<dyn MessagePublisher>,
    topic: String,
    concurrency: usize,
}

impl TriggerSource {
    pub fn new(
        repository: Arc<dyn SourceRepository>,
        publisher: Arc<dyn MessagePublisher>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            publisher,
            topic: topic.into(),
            concurrency: DEFAULT_FAN_OUT,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Trigger every item listed in the repository's update feed.
    ///
    /// Feed links are resolved to ids through their persistent handle.
    /// Entries without a handle, or whose handle does not resolve, are
    /// skipped.
    #[instrument(skip(self))]
    pub async fn poll_feed(&self) -> Result<PublishSummary, PipelineError> {
        let entries = self.repository.update_feed().await?;

        let mut seen = HashSet::new();
        let mut handles = Vec::new();
        for entry in entries {
            match entry.handle {
                Some(handle) if seen.insert(handle.clone()) => handles.push(handle),
                Some(_) => {}
                None => warn!(link = %entry.link, "Feed entry has no handle, skipping"),
            }
        }

        let repository = self.repository.as_ref();
        let resolved = for_each_bounded(handles, self.concurrency, |handle| async move {
            let result = repository.resolve_handle(&handle).await;
            (handle, result)
        })
        .await;

        let mut ids = Vec::new();
        for (handle, result) in resolved {
            match result {
                Ok(Some(id)) if !ids.contains(&id) => ids.push(id),
                Ok(Some(_)) => {}
                Ok(None) => warn!(handle = %handle, "Handle does not resolve to an item"),
                Err(e) => error!(handle = %handle, error = %e, "Failed to resolve handle"),
            }
        }

        let summary = self.trigger_ids(&ids).await;
        info!(
            handles = seen.len(),
            published = summary.published,
            failed = summary.failed.len(),
            "Feed poll completed"
        );
        Ok(summary)
    }

    /// Page through the full repository listing and trigger each item.
    #[instrument(skip(self))]
    pub async fn bulk_list(
        &self,
        page_size: usize,
        max_items: Option<usize>,
    ) -> Result<PublishSummary, PipelineError> {
        let page_size = page_size.max(1);
        let mut summary = PublishSummary::default();
        let mut offset = 0;

        loop {
            let remaining = max_items.map(|max| max.saturating_sub(offset));
            if remaining == Some(0) {
                break;
            }
            let limit = remaining.map_or(page_size, |r| r.min(page_size));

            let page = self.repository.list_items(limit, offset).await?;
            if page.is_empty() {
                break;
            }
            offset += page.len();

            let ids: Vec<Uuid> = page.iter().map(|item| item.id).collect();
            summary.merge(self.trigger_ids(&ids).await);
        }

        info!(
            listed = offset,
            published = summary.published,
            failed = summary.failed.len(),
            "Bulk listing completed"
        );
        Ok(summary)
    }

    /// Trigger every item whose metadata field `key` equals `value`.
    #[instrument(skip(self))]
    pub async fn trigger_by_field(
        &self,
        key: &str,
        value: &str,
    ) -> Result<PublishSummary, PipelineError> {
        let items = self.repository.find_by_metadata_field(key, value).await?;
        if items.is_empty() {
            warn!(key = %key, value = %value, "No items match metadata field");
        }
        let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        Ok(self.trigger_ids(&ids).await)
    }

    pub async fn trigger_ids(&self, ids: &[Uuid]) -> PublishSummary {
        publish_triggers(self.publisher.as_ref(), &self.topic, ids, self.concurrency).await
    }
}
