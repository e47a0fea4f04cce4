//! Index reconciler: finds indexed documents that drifted from the source
//! repository and repairs them.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::concurrency::{for_each_bounded, DEFAULT_FAN_OUT};
use crate::errors::PipelineError;
use crate::triggers::publish_triggers;
use catalog_indexer_repository::errors::SearchError;
use catalog_indexer_repository::interfaces::{MessagePublisher, SearchEngineClient, SourceRepository};
use catalog_indexer_repository::types::{ScrollHit, ScrollPage};
use catalog_indexer_shared::document::RECONCILE_FIELDS;
use catalog_indexer_shared::{
    detect_drift, DriftReason, IndexEntry, ReconciliationResult, DEFAULT_TEXT_BEARING_TYPES,
};

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub page_size: usize,
    pub scroll_keep_alive: String,
    pub compare_concurrency: usize,
    pub publish_concurrency: usize,
    pub text_bearing_mime_types: Vec<String>,
    /// Topic that receives re-ingest triggers for updated ids.
    pub trigger_topic: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            page_size: 500,
            scroll_keep_alive: "5m".to_string(),
            compare_concurrency: DEFAULT_FAN_OUT,
            publish_concurrency: DEFAULT_FAN_OUT,
            text_bearing_mime_types: DEFAULT_TEXT_BEARING_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            trigger_topic: "catalog.triggers".to_string(),
        }
    }
}

/// What the repair step did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub republished: usize,
    pub publish_failures: Vec<Uuid>,
    pub deleted: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Unchanged,
    Updated(DriftReason),
    Removed,
}

pub struct IndexReconciler {
    search: Arc<dyn SearchEngineClient>,
    repository: Arc<dyn SourceRepository>,
    publisher: Arc<dyn MessagePublisher>,
    config: ReconcilerConfig,
}

impl IndexReconciler {
    pub fn new(
        search: Arc<dyn SearchEngineClient>,
        repository: Arc<dyn SourceRepository>,
        publisher: Arc<dyn MessagePublisher>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            search,
            repository,
            publisher,
            config,
        }
    }

    /// Scan the whole index and classify every document.
    ///
    /// The scroll cursor is cleared exactly once on every exit path,
    /// including a failed page fetch.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<ReconciliationResult, PipelineError> {
        let first = self
            .search
            .open_scroll(
                RECONCILE_FIELDS,
                self.config.page_size,
                &self.config.scroll_keep_alive,
            )
            .await?;

        let mut scroll_id = first.scroll_id.clone();
        let outcome = self.scan(first, &mut scroll_id).await;

        if let Some(ref id) = scroll_id {
            if let Err(e) = self.search.clear_scroll(id).await {
                warn!(error = %e, "Failed to clear scroll cursor");
            }
        }

        let result = outcome?;
        info!(
            updated = result.updated.len(),
            removed = result.removed.len(),
            "Reconciliation scan completed"
        );
        Ok(result)
    }

    async fn scan(
        &self,
        first: ScrollPage,
        scroll_id: &mut Option<String>,
    ) -> Result<ReconciliationResult, PipelineError> {
        let mut result = ReconciliationResult::default();
        let mut page = first;
        let mut pages = 0usize;

        while !page.is_empty() {
            pages += 1;
            self.compare_page(&page.hits, &mut result).await;
            debug!(page = pages, hits = page.hits.len(), "Compared page");

            let current = scroll_id
                .clone()
                .ok_or_else(|| SearchError::scroll("scroll response carried no cursor id"))?;
            page = self
                .search
                .next_scroll_page(&current, &self.config.scroll_keep_alive)
                .await?;
            if let Some(ref next) = page.scroll_id {
                *scroll_id = Some(next.clone());
            }
        }

        Ok(result)
    }

    async fn compare_page(&self, hits: &[ScrollHit], result: &mut ReconciliationResult) {
        let mut verdicts = for_each_bounded(
            hits.iter().enumerate(),
            self.config.compare_concurrency,
            |(position, hit)| async move { (position, hit, self.compare(hit).await) },
        )
        .await;
        verdicts.sort_by_key(|(position, _, _)| *position);

        for (_, hit, verdict) in verdicts {
            match verdict {
                Ok((_, Verdict::Unchanged)) => {}
                Ok((id, Verdict::Updated(reason))) => {
                    debug!(id = %id, reason = ?reason, "Document drifted");
                    result.updated.push(id);
                }
                Ok((id, Verdict::Removed)) => {
                    debug!(id = %id, "Source item no longer exists");
                    result.removed.push(id);
                }
                Err(e) => {
                    error!(doc_id = %hit.doc_id, error = %e, "Comparison failed, skipping document");
                }
            }
        }
    }

    async fn compare(&self, hit: &ScrollHit) -> Result<(Uuid, Verdict), PipelineError> {
        let entry = Self::index_entry(hit)?;

        let verdict = match self.repository.get_item(&entry.id).await? {
            None => Verdict::Removed,
            Some(source) => {
                match detect_drift(&entry, &source, &self.config.text_bearing_mime_types) {
                    Some(reason) => Verdict::Updated(reason),
                    None => Verdict::Unchanged,
                }
            }
        };
        Ok((entry.id, verdict))
    }

    /// Read the projected source, falling back to the hit's `_id` when the
    /// source carries no `id` field.
    fn index_entry(hit: &ScrollHit) -> Result<IndexEntry, PipelineError> {
        let mut source = hit.source.clone();
        if let Some(map) = source.as_object_mut() {
            map.entry("id")
                .or_insert_with(|| serde_json::Value::String(hit.doc_id.clone()));
        }
        serde_json::from_value(source).map_err(PipelineError::document)
    }

    /// Re-publish triggers for updated ids and bulk-delete removed ids.
    ///
    /// Publish failures are logged and counted; a failed delete propagates.
    #[instrument(skip(self, result), fields(updated = result.updated.len(), removed = result.removed.len()))]
    pub async fn repair(&self, result: &ReconciliationResult) -> Result<RepairSummary, PipelineError> {
        let published = publish_triggers(
            self.publisher.as_ref(),
            &self.config.trigger_topic,
            &result.updated,
            self.config.publish_concurrency,
        )
        .await;

        let mut summary = RepairSummary {
            republished: published.published,
            publish_failures: published.failed,
            deleted: 0,
        };

        if !result.removed.is_empty() {
            let deleted = self.search.bulk_delete(&result.removed).await?;
            if !deleted.failed.is_empty() {
                warn!(failed = ?deleted.failed, "Some documents could not be deleted");
            }
            summary.deleted = deleted.deleted;
        }

        info!(
            republished = summary.republished,
            publish_failures = summary.publish_failures.len(),
            deleted = summary.deleted,
            "Repair completed"
        );
        Ok(summary)
    }

    /// One scan followed by repair, unless `dry_run` is set.
    pub async fn run(
        &self,
        dry_run: bool,
    ) -> Result<(ReconciliationResult, Option<RepairSummary>), PipelineError> {
        let result = self.reconcile().await?;
        if dry_run || result.is_clean() {
            return Ok((result, None));
        }
        let summary = self.repair(&result).await?;
        Ok((result, Some(summary)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{item, pdf, MockRepository, MockSearch, RecordingPublisher};
    use catalog_indexer_shared::SourceItem;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn hit(id: Uuid, last_modified: &str, checksum: &str) -> ScrollHit {
        ScrollHit {
            doc_id: id.to_string(),
            source: json!({
                "id": id,
                "lastModified": last_modified,
                "bitstreams": [{
                    "bundleName": "ORIGINAL",
                    "mimeType": "application/pdf",
                    "checkSum": { "value": checksum, "checkSumAlgorithm": "MD5" }
                }]
            }),
        }
    }

    fn page(scroll_id: &str, hits: Vec<ScrollHit>) -> Result<ScrollPage, SearchError> {
        Ok(ScrollPage {
            scroll_id: Some(scroll_id.to_string()),
            hits,
        })
    }

    struct Fixture {
        search: Arc<MockSearch>,
        repository: Arc<MockRepository>,
        publisher: Arc<RecordingPublisher>,
        reconciler: IndexReconciler,
    }

    fn fixture(pages: Vec<Result<ScrollPage, SearchError>>, items: Vec<SourceItem>) -> Fixture {
        let search = Arc::new(MockSearch::with_pages(pages));
        let repository = Arc::new(MockRepository::with_items(items));
        let publisher = Arc::new(RecordingPublisher::default());
        let reconciler = IndexReconciler::new(
            search.clone(),
            repository.clone(),
            publisher.clone(),
            ReconcilerConfig::default(),
        );
        Fixture {
            search,
            repository,
            publisher,
            reconciler,
        }
    }

    #[tokio::test]
    async fn test_newer_source_is_updated() {
        let id = Uuid::new_v4();
        let f = fixture(
            vec![page("s1", vec![hit(id, "2021-08-25", "abc")])],
            vec![item(id, "2021-10-27", vec![pdf("abc")])],
        );

        let result = f.reconciler.reconcile().await.unwrap();

        assert_eq!(result.updated, vec![id]);
        assert!(result.removed.is_empty());
    }

    #[tokio::test]
    async fn test_checksum_drift_is_updated() {
        let id = Uuid::new_v4();
        let f = fixture(
            vec![page("s1", vec![hit(id, "2021-10-27", "abc")])],
            vec![item(id, "2021-10-27", vec![pdf("cde")])],
        );

        let result = f.reconciler.reconcile().await.unwrap();

        assert_eq!(result.updated, vec![id]);
    }

    #[tokio::test]
    async fn test_unchanged_is_in_neither_list() {
        let id = Uuid::new_v4();
        let f = fixture(
            vec![page("s1", vec![hit(id, "2021-10-27", "abc")])],
            vec![item(id, "2021-10-27", vec![pdf("abc")])],
        );

        let result = f.reconciler.reconcile().await.unwrap();

        assert!(result.is_clean());
    }

    #[tokio::test]
    async fn test_removed_item_is_bulk_deleted() {
        let gone = Uuid::new_v4();
        let f = fixture(vec![page("s1", vec![hit(gone, "2021-10-27", "abc")])], vec![]);

        let (result, summary) = f.reconciler.run(false).await.unwrap();

        assert_eq!(result.removed, vec![gone]);
        assert_eq!(*f.search.bulk_deletes.lock().unwrap(), vec![vec![gone]]);
        assert_eq!(summary.unwrap().deleted, 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_excluded() {
        let failing = Uuid::new_v4();
        let f = fixture(
            vec![page("s1", vec![hit(failing, "2021-08-25", "abc")])],
            vec![item(failing, "2021-10-27", vec![pdf("abc")])],
        );
        f.repository.failing.lock().unwrap().insert(failing);

        let result = f.reconciler.reconcile().await.unwrap();

        assert!(result.is_clean());
    }

    #[tokio::test]
    async fn test_scroll_advances_and_clears_latest_cursor_once() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let f = fixture(
            vec![
                page("s1", vec![hit(a, "2021-08-25", "abc")]),
                page("s2", vec![hit(b, "2021-10-27", "abc")]),
                page("s3", vec![]),
            ],
            vec![
                item(a, "2021-10-27", vec![pdf("abc")]),
                item(b, "2021-10-27", vec![pdf("abc")]),
            ],
        );

        let result = f.reconciler.reconcile().await.unwrap();

        assert_eq!(result.updated, vec![a]);
        assert_eq!(f.search.opened.load(Ordering::SeqCst), 1);
        assert_eq!(*f.search.cleared.lock().unwrap(), vec!["s3".to_string()]);
    }

    #[tokio::test]
    async fn test_page_failure_still_clears_cursor_once() {
        let a = Uuid::new_v4();
        let f = fixture(
            vec![
                page("s1", vec![hit(a, "2021-08-25", "abc")]),
                Err(SearchError::scroll("search context missing")),
            ],
            vec![item(a, "2021-10-27", vec![pdf("abc")])],
        );

        let err = f.reconciler.reconcile().await.unwrap_err();

        assert!(matches!(err, PipelineError::Search(_)));
        assert_eq!(*f.search.cleared.lock().unwrap(), vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn test_repair_publishes_updated_triggers() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let f = fixture(vec![], vec![]);
        f.publisher.fail_keys.lock().unwrap().insert(b.to_string());

        let summary = f
            .reconciler
            .repair(&ReconciliationResult {
                updated: vec![a, b],
                removed: vec![],
            })
            .await
            .unwrap();

        assert_eq!(summary.republished, 1);
        assert_eq!(summary.publish_failures, vec![b]);
        assert_eq!(
            f.publisher.payloads("catalog.triggers"),
            vec![json!({ "id": a })]
        );
        assert!(f.search.bulk_deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let a = Uuid::new_v4();
        let gone = Uuid::new_v4();
        let f = fixture(
            vec![page(
                "s1",
                vec![hit(a, "2021-08-25", "abc"), hit(gone, "2021-08-25", "abc")],
            )],
            vec![item(a, "2021-10-27", vec![pdf("abc")])],
        );

        let (result, summary) = f.reconciler.run(true).await.unwrap();

        assert_eq!(result.updated, vec![a]);
        assert_eq!(result.removed, vec![gone]);
        assert!(summary.is_none());
        assert_eq!(f.publisher.count(), 0);
        assert!(f.search.bulk_deletes.lock().unwrap().is_empty());
    }
}
