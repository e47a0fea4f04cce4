//! In-memory implementations of the client traits for component tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use serde_json::Value;
use uuid::Uuid;

use catalog_indexer_repository::errors::{
    ExtractionError, GraphError, QueueError, RepositoryError, SearchError, StorageError,
};
use catalog_indexer_repository::interfaces::{
    GraphDatabase, MessagePublisher, ObjectStore, SearchEngineClient, SourceRepository,
    TextExtractor,
};
use catalog_indexer_repository::types::{
    BinaryStream, BulkDeleteSummary, ExtractionOutput, ExtractionRequest, FeedEntry, LoadRequest,
    LoadStatus, PercolateDocument, ScrollPage, SparqlRow, StoredQuery,
};
use catalog_indexer_shared::{Attachment, IndexedDocument, SourceItem, TagMatch};

pub fn pdf(checksum: &str) -> Attachment {
    serde_json::from_value(serde_json::json!({
        "uuid": Uuid::new_v4(),
        "name": "report.pdf",
        "bundleName": "ORIGINAL",
        "mimeType": "application/pdf",
        "checkSum": { "value": checksum, "checkSumAlgorithm": "MD5" },
        "retrieveLink": "/rest/bitstreams/report/retrieve",
        "sizeBytes": 4
    }))
    .unwrap()
}

pub fn jpeg_thumbnail() -> Attachment {
    serde_json::from_value(serde_json::json!({
        "uuid": Uuid::new_v4(),
        "name": "report.pdf.jpg",
        "bundleName": "THUMBNAIL",
        "mimeType": "image/jpeg",
        "retrieveLink": "/rest/bitstreams/thumb/retrieve"
    }))
    .unwrap()
}

pub fn item(id: Uuid, last_modified: &str, attachments: Vec<Attachment>) -> SourceItem {
    let mut item = SourceItem::new(id);
    item.name = Some("Status of coastal fisheries".to_string());
    item.last_modified = Some(last_modified.to_string());
    item.attachments = attachments;
    item
}

#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub puts: AtomicUsize,
    pub fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.object(bucket, key))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::transport(bucket, key, "connection reset"));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.insert(bucket, key, body);
        Ok(())
    }

    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        stream: BinaryStream,
    ) -> Result<(), StorageError> {
        let body: Vec<u8> = stream
            .body
            .try_concat()
            .await
            .map_err(|e| StorageError::transport(bucket, key, e))?;
        self.put(bucket, key, body, "application/octet-stream").await
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    pub messages: Mutex<Vec<(String, String, Vec<u8>)>>,
    pub fail_keys: Mutex<HashSet<String>>,
}

impl RecordingPublisher {
    pub fn payloads(&self, topic: &str) -> Vec<Value> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, _, payload)| serde_json::from_slice(payload).unwrap())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), QueueError> {
        if self.fail_keys.lock().unwrap().contains(key) {
            return Err(QueueError::publish(topic, "broker unavailable"));
        }
        self.messages
            .lock()
            .unwrap()
            .push((topic.to_string(), key.to_string(), payload.to_vec()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockRepository {
    pub items: Mutex<HashMap<Uuid, SourceItem>>,
    pub listing: Mutex<Vec<SourceItem>>,
    pub failing: Mutex<HashSet<Uuid>>,
    pub feed: Mutex<Vec<FeedEntry>>,
    pub handles: Mutex<HashMap<String, Uuid>>,
    pub content: Mutex<Vec<u8>>,
    pub lookups: AtomicUsize,
}

impl MockRepository {
    pub fn with_items(items: Vec<SourceItem>) -> Self {
        let repository = Self::default();
        for item in items {
            repository.items.lock().unwrap().insert(item.id, item.clone());
            repository.listing.lock().unwrap().push(item);
        }
        *repository.content.lock().unwrap() = b"%PDF".to_vec();
        repository
    }
}

#[async_trait]
impl SourceRepository for MockRepository {
    async fn get_item(&self, id: &Uuid) -> Result<Option<SourceItem>, RepositoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(id) {
            return Err(RepositoryError::transport("gateway timeout"));
        }
        Ok(self.items.lock().unwrap().get(id).cloned())
    }

    async fn list_items(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SourceItem>, RepositoryError> {
        Ok(self
            .listing
            .lock()
            .unwrap()
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_by_metadata_field(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Vec<SourceItem>, RepositoryError> {
        Ok(self
            .listing
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.metadata.iter().any(|m| m.key == key && m.value == value))
            .cloned()
            .collect())
    }

    async fn update_feed(&self) -> Result<Vec<FeedEntry>, RepositoryError> {
        Ok(self.feed.lock().unwrap().clone())
    }

    async fn resolve_handle(&self, handle: &str) -> Result<Option<Uuid>, RepositoryError> {
        if handle == "fail/1" {
            return Err(RepositoryError::transport("gateway timeout"));
        }
        Ok(self.handles.lock().unwrap().get(handle).copied())
    }

    async fn open_attachment(
        &self,
        _attachment: &Attachment,
    ) -> Result<BinaryStream, RepositoryError> {
        let content = self.content.lock().unwrap().clone();
        Ok(BinaryStream {
            content_length: Some(content.len() as u64),
            content_type: Some("application/pdf".to_string()),
            body: stream::iter(vec![Ok(content)]).boxed(),
        })
    }

    fn link_url(&self, link: &str) -> String {
        format!("https://repo.example.org{}", link)
    }
}

#[derive(Default)]
pub struct MockSearch {
    pub indexed: Mutex<Vec<IndexedDocument>>,
    pub pages: Mutex<VecDeque<Result<ScrollPage, SearchError>>>,
    pub opened: AtomicUsize,
    pub cleared: Mutex<Vec<String>>,
    pub percolate_matches: Mutex<Vec<TagMatch>>,
    pub percolated: Mutex<Vec<PercolateDocument>>,
    pub bulk_deletes: Mutex<Vec<Vec<Uuid>>>,
    pub stored_queries: Mutex<Vec<StoredQuery>>,
    pub cleared_graphs: Mutex<Vec<String>>,
    pub fail_index: AtomicBool,
}

impl MockSearch {
    /// Queue scroll pages; the first is returned by `open_scroll`.
    pub fn with_pages(pages: Vec<Result<ScrollPage, SearchError>>) -> Self {
        let search = Self::default();
        *search.pages.lock().unwrap() = pages.into();
        search
    }

    fn next_page(&self) -> Result<ScrollPage, SearchError> {
        self.pages.lock().unwrap().pop_front().unwrap_or(Ok(ScrollPage {
            scroll_id: Some("scroll-end".to_string()),
            hits: Vec::new(),
        }))
    }
}

#[async_trait]
impl SearchEngineClient for MockSearch {
    async fn index_document(&self, document: &IndexedDocument) -> Result<(), SearchError> {
        if self.fail_index.load(Ordering::SeqCst) {
            return Err(SearchError::index("cluster unavailable"));
        }
        self.indexed.lock().unwrap().push(document.clone());
        Ok(())
    }

    async fn get_document(&self, id: &Uuid) -> Result<Option<Value>, SearchError> {
        Ok(self
            .indexed
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|doc| doc.id == *id)
            .map(IndexedDocument::to_json))
    }

    async fn delete_by_query(&self, _query: &Value) -> Result<u64, SearchError> {
        Ok(0)
    }

    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<BulkDeleteSummary, SearchError> {
        self.bulk_deletes.lock().unwrap().push(ids.to_vec());
        Ok(BulkDeleteSummary {
            total: ids.len(),
            deleted: ids.len(),
            ..Default::default()
        })
    }

    async fn open_scroll(
        &self,
        _fields: &[&str],
        _page_size: usize,
        _keep_alive: &str,
    ) -> Result<ScrollPage, SearchError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.next_page()
    }

    async fn next_scroll_page(
        &self,
        _scroll_id: &str,
        _keep_alive: &str,
    ) -> Result<ScrollPage, SearchError> {
        self.next_page()
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        self.cleared.lock().unwrap().push(scroll_id.to_string());
        Ok(())
    }

    async fn percolate(&self, document: &PercolateDocument) -> Result<Vec<TagMatch>, SearchError> {
        self.percolated.lock().unwrap().push(document.clone());
        Ok(self.percolate_matches.lock().unwrap().clone())
    }

    async fn delete_stored_queries(&self, named_graph: &str) -> Result<u64, SearchError> {
        self.cleared_graphs.lock().unwrap().push(named_graph.to_string());
        let mut queries = self.stored_queries.lock().unwrap();
        let before = queries.len();
        queries.retain(|q| q.named_graph != named_graph);
        Ok((before - queries.len()) as u64)
    }

    async fn bulk_index_stored_queries(&self, queries: &[StoredQuery]) -> Result<(), SearchError> {
        let mut stored = self.stored_queries.lock().unwrap();
        for query in queries {
            stored.retain(|existing| existing.id != query.id);
            stored.push(query.clone());
        }
        Ok(())
    }

    async fn ensure_indices(&self) -> Result<(), SearchError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }
}

pub enum ExtractorMode {
    Succeed,
    Structured,
    Transport,
}

pub struct MockExtractor {
    pub mode: ExtractorMode,
    pub requests: Mutex<Vec<ExtractionRequest>>,
}

impl MockExtractor {
    pub fn new(mode: ExtractorMode) -> Self {
        Self {
            mode,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextExtractor for MockExtractor {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutput, ExtractionError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.mode {
            ExtractorMode::Succeed => Ok(ExtractionOutput {
                text_uri: request.text_uri.clone(),
            }),
            ExtractorMode::Structured => {
                Err(ExtractionError::failed("PdfParseError", "encrypted document"))
            }
            ExtractorMode::Transport => Err(ExtractionError::transport("connection refused")),
        }
    }
}

pub struct MockGraph {
    pub statuses: Mutex<VecDeque<LoadStatus>>,
    /// Full result set; `select` pages it using the query's LIMIT/OFFSET.
    pub rows: Vec<SparqlRow>,
    pub queries: Mutex<Vec<String>>,
    pub loads: Mutex<Vec<LoadRequest>>,
}

impl MockGraph {
    pub fn new(statuses: Vec<LoadStatus>, rows: Vec<SparqlRow>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into()),
            rows,
            queries: Mutex::new(Vec::new()),
            loads: Mutex::new(Vec::new()),
        }
    }

    fn clause(query: &str, keyword: &str) -> usize {
        query
            .split_whitespace()
            .skip_while(|word| *word != keyword)
            .nth(1)
            .and_then(|n| n.parse().ok())
            .unwrap_or(0)
    }
}

#[async_trait]
impl GraphDatabase for MockGraph {
    async fn start_load(&self, request: &LoadRequest) -> Result<String, GraphError> {
        self.loads.lock().unwrap().push(request.clone());
        Ok("load-1".to_string())
    }

    async fn load_status(&self, _load_id: &str) -> Result<LoadStatus, GraphError> {
        let mut statuses = self.statuses.lock().unwrap();
        match statuses.len() {
            0 => Ok(LoadStatus::InProgress),
            1 => Ok(statuses[0].clone()),
            _ => Ok(statuses.pop_front().unwrap_or(LoadStatus::InProgress)),
        }
    }

    async fn select(&self, query: &str) -> Result<Vec<SparqlRow>, GraphError> {
        self.queries.lock().unwrap().push(query.to_string());
        let limit = Self::clause(query, "LIMIT");
        let offset = Self::clause(query, "OFFSET");
        Ok(self.rows.iter().skip(offset).take(limit).cloned().collect())
    }
}
