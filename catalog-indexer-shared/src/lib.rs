//! # Catalog Indexer Shared
//!
//! Data model shared by every stage of the catalog indexer: repository
//! records, queue payloads, index documents, and the pure transformations
//! between them (metadata flattening, attachment selection, timestamp
//! normalization, drift detection). Nothing in this crate performs I/O.

pub mod attachments;
pub mod document;
pub mod drift;
pub mod errors;
pub mod flatten;
pub mod layout;
pub mod messages;
pub mod source_item;
pub mod timestamp;

pub use attachments::{primary_attachment, thumbnail_attachment, DEFAULT_TEXT_BEARING_TYPES};
pub use document::{IndexEntry, IndexedDocument, TagMatch};
pub use drift::{detect_drift, is_updated, DriftReason};
pub use errors::ValidationError;
pub use flatten::{flatten_key, flatten_metadata};
pub use layout::StorageLayout;
pub use messages::{BitstreamInput, IndexingJob, IngestTrigger, ReconciliationResult, StoredObjectRef};
pub use source_item::{Attachment, Checksum, MetadataEntry, SourceItem};
