//! REST implementation of the source repository client.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use crate::errors::RepositoryError;
use crate::interfaces::SourceRepository;
use crate::rest::feed::parse_feed;
use crate::types::{BinaryStream, FeedEntry};
use catalog_indexer_shared::{Attachment, SourceItem};

const EXPAND: &str = "metadata,bitstreams";

/// Connection settings for the repository REST API.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// REST root, e.g. `https://repo.example.org/rest/`.
    pub base_url: String,
    /// Update feed location, absolute or relative to `base_url`.
    pub feed_url: String,
    pub request_timeout: Duration,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/rest/".to_string(),
            feed_url: "/feed/rss_2.0/site".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Deserialize)]
struct HandleTarget {
    uuid: Option<Uuid>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Source repository backed by a DSpace-style REST API.
pub struct RestSourceRepository {
    http: Client,
    base: Url,
    feed: Url,
}

impl RestSourceRepository {
    pub fn new(config: RepositoryConfig) -> Result<Self, RepositoryError> {
        let mut base_url = config.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base = Url::parse(&base_url).map_err(|e| RepositoryError::config(e.to_string()))?;
        let feed = base
            .join(&config.feed_url)
            .map_err(|e| RepositoryError::config(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RepositoryError::config(e.to_string()))?;

        info!(base_url = %base, feed_url = %feed, "Created repository client");

        Ok(Self { http, base, feed })
    }

    fn endpoint(&self, path: &str) -> Result<Url, RepositoryError> {
        self.base
            .join(path)
            .map_err(|e| RepositoryError::config(e.to_string()))
    }

    async fn get_items(&self, url: Url) -> Result<Vec<SourceItem>, RepositoryError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RepositoryError::status(status.as_u16(), url));
        }
        Ok(response.json::<Vec<SourceItem>>().await?)
    }
}

#[async_trait]
impl SourceRepository for RestSourceRepository {
    #[instrument(skip(self))]
    async fn get_item(&self, id: &Uuid) -> Result<Option<SourceItem>, RepositoryError> {
        let mut url = self.endpoint(&format!("items/{}", id))?;
        url.query_pairs_mut().append_pair("expand", EXPAND);

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("Item not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RepositoryError::status(status.as_u16(), url));
        }

        Ok(Some(response.json::<SourceItem>().await?))
    }

    #[instrument(skip(self))]
    async fn list_items(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SourceItem>, RepositoryError> {
        let mut url = self.endpoint("items")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string())
            .append_pair("expand", EXPAND);

        self.get_items(url).await
    }

    #[instrument(skip(self))]
    async fn find_by_metadata_field(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Vec<SourceItem>, RepositoryError> {
        let mut url = self.endpoint("items/find-by-metadata-field")?;
        url.query_pairs_mut().append_pair("expand", EXPAND);

        let response = self
            .http
            .post(url.clone())
            .json(&json!({ "key": key, "value": value }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RepositoryError::status(status.as_u16(), url));
        }

        Ok(response.json::<Vec<SourceItem>>().await?)
    }

    #[instrument(skip(self))]
    async fn update_feed(&self) -> Result<Vec<FeedEntry>, RepositoryError> {
        let response = self.http.get(self.feed.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RepositoryError::status(status.as_u16(), self.feed.as_str()));
        }

        let body = response.bytes().await?;
        let entries = parse_feed(&body)?;

        debug!(entries = entries.len(), "Read update feed");
        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn resolve_handle(&self, handle: &str) -> Result<Option<Uuid>, RepositoryError> {
        let url = self.endpoint(&format!("handle/{}", handle.trim_matches('/')))?;

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RepositoryError::status(status.as_u16(), url));
        }

        let target: HandleTarget = response.json().await?;
        match (target.kind.as_deref(), target.uuid) {
            (Some("item"), Some(id)) => Ok(Some(id)),
            (kind, _) => {
                warn!(handle = %handle, kind = ?kind, "Handle does not resolve to an item");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, attachment), fields(attachment = ?attachment.id))]
    async fn open_attachment(
        &self,
        attachment: &Attachment,
    ) -> Result<BinaryStream, RepositoryError> {
        let link = attachment
            .retrieve_link
            .as_deref()
            .ok_or_else(|| RepositoryError::parse("attachment has no retrieve link"))?;
        let url = self.link_url(link);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RepositoryError::status(status.as_u16(), url));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| attachment.mime_type.clone());

        Ok(BinaryStream {
            content_length: response.content_length().or(attachment.size_bytes),
            content_type,
            body: response
                .bytes_stream()
                .map_ok(|chunk| chunk.to_vec())
                .map_err(std::io::Error::other)
                .boxed(),
        })
    }

    fn link_url(&self, link: &str) -> String {
        self.base
            .join(link)
            .map(String::from)
            .unwrap_or_else(|_| link.to_string())
    }
}
