//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, ClearScrollParts, DeleteByQueryParts, GetParts, IndexParts, OpenSearch,
    ScrollParts, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::config::SearchIndexConfig;
use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::opensearch::index_config::{documents_index_settings, stored_queries_index_settings};
use crate::opensearch::queries::{
    build_bulk_delete_lines, build_bulk_stored_query_lines, build_named_graph_query,
    build_percolate_query, build_scroll_query, bulk_error_reasons, parse_bulk_delete,
    parse_percolate_matches, parse_scroll_page,
};
use crate::types::{BulkDeleteSummary, PercolateDocument, ScrollPage, StoredQuery};
use catalog_indexer_shared::{IndexedDocument, TagMatch};

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// use catalog_indexer_repository::config::SearchIndexConfig;
///
/// let client = OpenSearchClient::new("http://localhost:9200", SearchIndexConfig::default()).await?;
/// client.ensure_indices().await?;
/// client.index_document(&document).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
    config: SearchIndexConfig,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `config` - Index names and request limits
    pub async fn new(url: &str, config: SearchIndexConfig) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            documents_index = %config.documents_index,
            stored_queries_index = %config.stored_queries_index,
            "Created OpenSearch client"
        );

        Ok(Self { client, config })
    }

    /// Read the JSON body of a successful response, or turn a failed one into
    /// an error built by `make_error`.
    async fn read_json(
        response: Response,
        operation: &str,
        make_error: fn(String) -> SearchError,
    ) -> Result<Value, SearchError> {
        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, operation, "Request failed");
            return Err(make_error(format!(
                "{} failed with status {}: {}",
                operation, status, error_body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))
    }

    /// Send one bulk request and fail if any action reported an error.
    async fn send_bulk(&self, index: &str, lines: Vec<Value>) -> Result<Value, SearchError> {
        let body: Vec<JsonBody<Value>> = lines.into_iter().map(JsonBody::from).collect();

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::bulk(e.to_string()))?;

        Self::read_json(response, "bulk", SearchError::BulkError).await
    }

    async fn create_index_if_absent(&self, index: &str, settings: Value) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        if response.status_code().is_success() {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(settings)
            .send()
            .await
            .map_err(|e| SearchError::IndexCreationError(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            // Another worker may have created it in between.
            if error_body.contains("resource_already_exists_exception") {
                debug!(index = %index, "Index created concurrently");
                return Ok(());
            }
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(SearchError::IndexCreationError(format!(
                "Creating {} failed with status {}: {}",
                index, status, error_body
            )));
        }

        info!(index = %index, "Created index");
        Ok(())
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    #[instrument(skip(self, document), fields(id = %document.id))]
    async fn index_document(&self, document: &IndexedDocument) -> Result<(), SearchError> {
        let doc_id = document.id.to_string();

        let response = self
            .client
            .index(IndexParts::IndexId(&self.config.documents_index, &doc_id))
            .body(document.to_json())
            .send()
            .await
            .map_err(|e| SearchError::index(e.to_string()))?;

        Self::read_json(response, "index", SearchError::IndexError).await?;

        debug!(doc_id = %doc_id, "Document indexed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_document(&self, id: &Uuid) -> Result<Option<Value>, SearchError> {
        let doc_id = id.to_string();

        let response = self
            .client
            .get(GetParts::IndexId(&self.config.documents_index, &doc_id))
            .send()
            .await
            .map_err(|e| SearchError::query(e.to_string()))?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }

        let body = Self::read_json(response, "get", SearchError::QueryError).await?;
        Ok(body.get("_source").cloned())
    }

    #[instrument(skip(self, query))]
    async fn delete_by_query(&self, query: &Value) -> Result<u64, SearchError> {
        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[&self.config.documents_index]))
            .body(json!({ "query": query }))
            .send()
            .await
            .map_err(|e| SearchError::delete(e.to_string()))?;

        let body = Self::read_json(response, "delete_by_query", SearchError::DeleteError).await?;
        let deleted = body["deleted"].as_u64().unwrap_or(0);

        debug!(deleted, "Deleted documents by query");
        Ok(deleted)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<BulkDeleteSummary, SearchError> {
        let mut summary = BulkDeleteSummary {
            total: ids.len(),
            ..Default::default()
        };

        if ids.is_empty() {
            return Ok(summary);
        }

        for chunk in ids.chunks(self.config.chunk_size(ids.len())) {
            let lines = build_bulk_delete_lines(&self.config.documents_index, chunk);
            let body = self.send_bulk(&self.config.documents_index, lines).await?;
            let part = parse_bulk_delete(&body, chunk.len());

            summary.deleted += part.deleted;
            summary.not_found += part.not_found;
            summary.failed.extend(part.failed);
        }

        if !summary.failed.is_empty() {
            warn!(failed = summary.failed.len(), "Some bulk deletes failed");
        }

        Ok(summary)
    }

    #[instrument(skip(self, fields))]
    async fn open_scroll(
        &self,
        fields: &[&str],
        page_size: usize,
        keep_alive: &str,
    ) -> Result<ScrollPage, SearchError> {
        let response = self
            .client
            .search(SearchParts::Index(&[&self.config.documents_index]))
            .scroll(keep_alive)
            .size(page_size as i64)
            .body(build_scroll_query(fields))
            .send()
            .await
            .map_err(|e| SearchError::scroll(e.to_string()))?;

        let body = Self::read_json(response, "open scroll", SearchError::ScrollError).await?;
        parse_scroll_page(&body)
    }

    #[instrument(skip(self, scroll_id))]
    async fn next_scroll_page(
        &self,
        scroll_id: &str,
        keep_alive: &str,
    ) -> Result<ScrollPage, SearchError> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(json!({ "scroll": keep_alive, "scroll_id": scroll_id }))
            .send()
            .await
            .map_err(|e| SearchError::scroll(e.to_string()))?;

        let body = Self::read_json(response, "scroll", SearchError::ScrollError).await?;
        parse_scroll_page(&body)
    }

    #[instrument(skip(self, scroll_id))]
    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": [scroll_id] }))
            .send()
            .await
            .map_err(|e| SearchError::scroll(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - the cursor may already have expired
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Clear scroll failed");
            return Err(SearchError::scroll(format!(
                "Clear scroll failed with status {}: {}",
                status, error_body
            )));
        }

        Ok(())
    }

    #[instrument(skip(self, document), fields(title = %document.title))]
    async fn percolate(&self, document: &PercolateDocument) -> Result<Vec<TagMatch>, SearchError> {
        let response = self
            .client
            .search(SearchParts::Index(&[&self.config.stored_queries_index]))
            .body(build_percolate_query(document, self.config.max_tag_matches))
            .send()
            .await
            .map_err(|e| SearchError::query(e.to_string()))?;

        let body = Self::read_json(response, "percolate", SearchError::QueryError).await?;
        let matches = parse_percolate_matches(&body)?;

        debug!(matches = matches.len(), "Percolate completed");
        Ok(matches)
    }

    #[instrument(skip(self))]
    async fn delete_stored_queries(&self, named_graph: &str) -> Result<u64, SearchError> {
        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[&self.config.stored_queries_index]))
            .body(json!({ "query": build_named_graph_query(named_graph) }))
            .send()
            .await
            .map_err(|e| SearchError::delete(e.to_string()))?;

        let body = Self::read_json(response, "delete stored queries", SearchError::DeleteError).await?;
        let deleted = body["deleted"].as_u64().unwrap_or(0);

        info!(named_graph = %named_graph, deleted, "Removed stored queries");
        Ok(deleted)
    }

    #[instrument(skip(self, queries), fields(count = queries.len()))]
    async fn bulk_index_stored_queries(&self, queries: &[StoredQuery]) -> Result<(), SearchError> {
        if queries.is_empty() {
            return Ok(());
        }

        for chunk in queries.chunks(self.config.chunk_size(queries.len())) {
            let lines = build_bulk_stored_query_lines(&self.config.stored_queries_index, chunk);
            let body = self.send_bulk(&self.config.stored_queries_index, lines).await?;

            let errors = bulk_error_reasons(&body);
            if !errors.is_empty() {
                error!(failed = errors.len(), first = %errors[0], "Stored query bulk had failures");
                return Err(SearchError::bulk(format!(
                    "{} of {} stored queries failed: {}",
                    errors.len(),
                    chunk.len(),
                    errors.join("; ")
                )));
            }
        }

        debug!("Stored queries indexed");
        Ok(())
    }

    async fn ensure_indices(&self) -> Result<(), SearchError> {
        self.create_index_if_absent(&self.config.documents_index, documents_index_settings())
            .await?;
        self.create_index_if_absent(
            &self.config.stored_queries_index,
            stored_queries_index_settings(),
        )
        .await
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let health: Value = response.json().await.unwrap_or(json!({}));
        let status = health["status"].as_str().unwrap_or("unknown");

        debug!(status = %status, "OpenSearch cluster status");
        Ok(status == "green" || status == "yellow")
    }
}
