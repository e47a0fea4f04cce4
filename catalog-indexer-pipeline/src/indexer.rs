//! Document indexer: builds the search document for an id and upserts it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::consumer::MessageHandler;
use crate::errors::PipelineError;
use catalog_indexer_repository::interfaces::{
    get_json, ObjectStore, SearchEngineClient, SourceRepository,
};
use catalog_indexer_repository::types::PercolateDocument;
use catalog_indexer_shared::{
    thumbnail_attachment, IndexedDocument, IndexingJob, SourceItem, StorageLayout,
};

pub struct DocumentIndexer {
    store: Arc<dyn ObjectStore>,
    search: Arc<dyn SearchEngineClient>,
    repository: Arc<dyn SourceRepository>,
    layout: StorageLayout,
}

impl DocumentIndexer {
    /// `repository` is only used to turn attachment links into absolute URLs.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        search: Arc<dyn SearchEngineClient>,
        repository: Arc<dyn SourceRepository>,
        layout: StorageLayout,
    ) -> Self {
        Self {
            store,
            search,
            repository,
            layout,
        }
    }

    /// Build the document for `job` and write it to the index, replacing
    /// any previous version.
    #[instrument(skip(self, job), fields(id = %job.id))]
    pub async fn index(&self, job: &IndexingJob) -> Result<IndexedDocument, PipelineError> {
        let document = self.build(job).await?;
        self.search.index_document(&document).await?;

        info!(id = %job.id, tags = document.tags().len(), "Document indexed");
        Ok(document)
    }

    /// Assemble the document without writing it.
    pub async fn build(&self, job: &IndexingJob) -> Result<IndexedDocument, PipelineError> {
        let item = self.load_metadata(&job.id).await?;

        let extracted_text = match job.text_ref() {
            Some((bucket, key)) => self.load_text(bucket, key).await?,
            None => None,
        };

        let title = item
            .title()
            .map(str::to_string)
            .unwrap_or_else(|| item.id.to_string());
        let candidate = PercolateDocument::new(title, extracted_text.clone());
        let tags = self.search.percolate(&candidate).await?;
        debug!(id = %item.id, matches = tags.len(), "Tag matching completed");

        let thumbnail = thumbnail_attachment(&item.attachments)
            .and_then(|attachment| attachment.retrieve_link.as_deref())
            .map(|link| self.repository.link_url(link));

        IndexedDocument::build(&item, extracted_text, tags, thumbnail).map_err(PipelineError::document)
    }

    async fn load_metadata(&self, id: &Uuid) -> Result<SourceItem, PipelineError> {
        let key = StorageLayout::metadata_key(id);
        get_json(self.store.as_ref(), &self.layout.metadata_bucket, &key)
            .await?
            .ok_or(PipelineError::MissingMetadata(*id))
    }

    async fn load_text(&self, bucket: &str, key: &str) -> Result<Option<String>, PipelineError> {
        match self.store.get(bucket, key).await? {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => {
                warn!(bucket = %bucket, key = %key, "Referenced text is missing, indexing without it");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl MessageHandler for DocumentIndexer {
    async fn handle(&self, payload: &[u8]) -> Result<(), PipelineError> {
        let job = IndexingJob::from_slice(payload)?;
        self.index(&job).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{item, jpeg_thumbnail, pdf, MemoryStore, MockRepository, MockSearch};
    use catalog_indexer_repository::interfaces::put_json;
    use catalog_indexer_shared::{MetadataEntry, TagMatch};
    use std::sync::atomic::Ordering;

    struct Fixture {
        store: Arc<MemoryStore>,
        search: Arc<MockSearch>,
        indexer: DocumentIndexer,
    }

    async fn fixture(item: Option<&SourceItem>) -> Fixture {
        let store = Arc::new(MemoryStore::default());
        if let Some(item) = item {
            put_json(
                store.as_ref(),
                "catalog-metadata",
                &StorageLayout::metadata_key(&item.id),
                item,
            )
            .await
            .unwrap();
        }
        let search = Arc::new(MockSearch::default());
        let indexer = DocumentIndexer::new(
            store.clone(),
            search.clone(),
            Arc::new(MockRepository::default()),
            StorageLayout::default(),
        );
        Fixture {
            store,
            search,
            indexer,
        }
    }

    fn tagged_item(id: Uuid) -> SourceItem {
        let mut item = item(id, "2021-10-27 13:03:31.123", vec![pdf("abc"), jpeg_thumbnail()]);
        item.metadata = vec![
            MetadataEntry::new("dc.title", "Status of coastal fisheries"),
            MetadataEntry::new("dc.contributor.author", "A"),
            MetadataEntry::new("dc.contributor.author", "B"),
        ];
        item
    }

    #[tokio::test]
    async fn test_builds_full_document() {
        let id = Uuid::new_v4();
        let item = tagged_item(id);
        let f = fixture(Some(&item)).await;
        f.store.insert("catalog-text", "txt/a.txt", "Landings declined in 2020.");
        *f.search.percolate_matches.lock().unwrap() = vec![TagMatch {
            label: "fisheries".to_string(),
            uri: "http://vocab.example.org/term/1".to_string(),
            source_vocabulary: "ASFA".to_string(),
            named_graph_reference: "http://vocab.example.org/graph/asfa".to_string(),
        }];

        let job = IndexingJob::with_text(id, "catalog-text", "txt/a.txt");
        let document = f.indexer.index(&job).await.unwrap();
        let body = document.to_json();

        assert_eq!(body["id"], id.to_string());
        assert_eq!(body["dc_contributor_author"], serde_json::json!(["A", "B"]));
        assert_eq!(body["dc_title"], "Status of coastal fisheries");
        assert_eq!(body["extractedText"], "Landings declined in 2020.");
        assert_eq!(body["tags"][0]["label"], "fisheries");
        assert_eq!(
            body["thumbnail"],
            "https://repo.example.org/rest/bitstreams/thumb/retrieve"
        );

        let percolated = f.search.percolated.lock().unwrap().clone();
        assert_eq!(percolated[0].title, "Status of coastal fisheries");
        assert_eq!(percolated[0].body, "Landings declined in 2020.");
        assert_eq!(f.search.indexed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_without_text_falls_back_to_title() {
        let id = Uuid::new_v4();
        let item = item(id, "2021-10-27", vec![]);
        let f = fixture(Some(&item)).await;

        let document = f.indexer.index(&IndexingJob::without_text(id)).await.unwrap();

        assert!(document.to_json().get("extractedText").is_none());
        let percolated = f.search.percolated.lock().unwrap().clone();
        assert_eq!(percolated[0].body, percolated[0].title);
    }

    #[tokio::test]
    async fn test_reindexing_is_byte_identical() {
        let id = Uuid::new_v4();
        let item = tagged_item(id);
        let f = fixture(Some(&item)).await;
        f.store.insert("catalog-text", "txt/a.txt", "same text");
        let job = IndexingJob::with_text(id, "catalog-text", "txt/a.txt");

        f.indexer.index(&job).await.unwrap();
        f.indexer.index(&job).await.unwrap();

        let indexed = f.search.indexed.lock().unwrap().clone();
        assert_eq!(
            serde_json::to_vec(&indexed[0].to_json()).unwrap(),
            serde_json::to_vec(&indexed[1].to_json()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_metadata_is_not_retryable() {
        let f = fixture(None).await;

        let err = f
            .indexer
            .handle(format!(r#"{{"id":"{}"}}"#, Uuid::new_v4()).as_bytes())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::MissingMetadata(_)));
        assert!(!err.is_retryable());
        assert!(f.search.indexed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_failure_propagates() {
        let id = Uuid::new_v4();
        let item = item(id, "2021-10-27", vec![]);
        let f = fixture(Some(&item)).await;
        f.search.fail_index.store(true, Ordering::SeqCst);

        let err = f.indexer.index(&IndexingJob::without_text(id)).await.unwrap_err();

        assert!(matches!(err, PipelineError::Search(_)));
        assert!(err.is_retryable());
    }
}
