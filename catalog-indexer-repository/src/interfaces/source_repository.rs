//! Source repository trait definition.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::RepositoryError;
use crate::types::{BinaryStream, FeedEntry};
use catalog_indexer_shared::{Attachment, SourceItem};

/// Read access to the authoritative document repository.
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Fetch one item with its metadata and attachments.
    /// Returns `Ok(None)` when the repository reports the item does not exist.
    async fn get_item(&self, id: &Uuid) -> Result<Option<SourceItem>, RepositoryError>;

    /// List one page of items.
    async fn list_items(&self, limit: usize, offset: usize)
        -> Result<Vec<SourceItem>, RepositoryError>;

    /// Find items carrying `key` = `value` in their metadata.
    async fn find_by_metadata_field(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Vec<SourceItem>, RepositoryError>;

    /// Read the recent-updates feed.
    async fn update_feed(&self) -> Result<Vec<FeedEntry>, RepositoryError>;

    /// Resolve a persistent handle to an item id.
    /// Returns `Ok(None)` when the handle is unknown or not an item.
    async fn resolve_handle(&self, handle: &str) -> Result<Option<Uuid>, RepositoryError>;

    /// Open an attachment's content as a stream.
    async fn open_attachment(&self, attachment: &Attachment)
        -> Result<BinaryStream, RepositoryError>;

    /// Absolute URL for a repository-relative link.
    fn link_url(&self, link: &str) -> String;
}
