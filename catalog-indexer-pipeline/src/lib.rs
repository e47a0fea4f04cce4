//! # Catalog Indexer Pipeline
//!
//! Components that move a repository item from a trigger message to a
//! searchable document, plus the batch jobs that keep the index honest.
//!
//! ## Stages
//!
//! 1. **Metadata downloader**: fetches the source item and persists it.
//! 2. **Bitstream downloader**: copies the primary binary, runs text
//!    extraction and enqueues an indexing job.
//! 3. **Document indexer**: builds the search document and upserts it.
//!
//! The stages are decoupled through the object store and the queue; each
//! one is safe to repeat for the same id.
//!
//! ## Batch jobs
//!
//! - **Reconciler**: scans the index, reports drifted and removed documents,
//!   and optionally repairs them.
//! - **Ontology loader**: loads a vocabulary graph and derives the stored
//!   tag queries used by the indexer.
//! - **Trigger producers**: feed poller, bulk lister and metadata finder.

pub mod bitstream;
pub mod concurrency;
pub mod consumer;
pub mod errors;
pub mod indexer;
pub mod metadata;
pub mod ontology;
pub mod reconciler;
pub mod triggers;

#[cfg(test)]
mod test_support;

pub use bitstream::{BitstreamConfig, BitstreamDownloader, BitstreamOutcome};
pub use consumer::{ConsumerConfig, KafkaConsumer, MessageHandler};
pub use errors::PipelineError;
pub use indexer::DocumentIndexer;
pub use metadata::{MetadataDownloader, MetadataOutcome};
pub use ontology::{OntologyLoadSummary, OntologyLoader, OntologyLoaderConfig, OntologyManifest};
pub use reconciler::{IndexReconciler, ReconcilerConfig, RepairSummary};
pub use triggers::{publish_triggers, PublishSummary, TriggerSource};
