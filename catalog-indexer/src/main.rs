//! Catalog indexer command line.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::{error, info};
use uuid::Uuid;

use catalog_indexer::logging::{self, LogFormat};
use catalog_indexer::{AppConfig, Dependencies, IndexingError, Worker};
use catalog_indexer_pipeline::{OntologyManifest, PipelineError, PublishSummary, TriggerSource};
use catalog_indexer_repository::SearchEngineClient;

#[derive(Parser)]
#[command(name = "catalog-indexer")]
#[command(about = "Ingest, index and reconcile catalog documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume ingest triggers and persist item metadata
    MetadataWorker,
    /// Consume metadata notifications, copy binaries and extract text
    BitstreamWorker,
    /// Consume indexing jobs and upsert search documents
    IndexWorker,
    /// Compare the index with the repository and repair drift
    Reconcile {
        /// Report drift without publishing or deleting anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Trigger every item in the repository update feed
    PollFeed,
    /// Trigger every item in the repository listing
    BulkList {
        #[arg(long, default_value = "100")]
        page_size: usize,
        /// Stop after this many items
        #[arg(long)]
        max_items: Option<usize>,
    },
    /// Trigger explicit ids, or the items matching a metadata field
    Trigger(TriggerArgs),
    /// Bulk-load a vocabulary and rebuild its stored tag queries
    OntologyLoad {
        /// JSON manifest with source, namedGraph, sourceVocabulary and format
        manifest: PathBuf,
    },
    /// Create the search indices if they do not exist
    EnsureIndices,
}

#[derive(Args)]
struct TriggerArgs {
    ids: Vec<Uuid>,
    /// Metadata key to look up, e.g. dc.identifier.other
    #[arg(long, requires = "value", conflicts_with = "ids")]
    field: Option<String>,
    #[arg(long, requires = "field")]
    value: Option<String>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    logging::init(LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref()));

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), IndexingError> {
    let deps = Dependencies::new(AppConfig::from_env()?);

    match cli.command {
        Commands::MetadataWorker => run_worker(&deps, Worker::Metadata).await,
        Commands::BitstreamWorker => run_worker(&deps, Worker::Bitstream).await,
        Commands::IndexWorker => run_worker(&deps, Worker::Index).await,
        Commands::Reconcile { dry_run } => reconcile(&deps, dry_run).await,
        Commands::PollFeed => {
            publish_with(&deps, |source| async move { source.poll_feed().await }).await
        }
        Commands::BulkList {
            page_size,
            max_items,
        } => {
            publish_with(&deps, |source| async move {
                source.bulk_list(page_size, max_items).await
            })
            .await
        }
        Commands::Trigger(args) => trigger(&deps, args).await,
        Commands::OntologyLoad { manifest } => ontology_load(&deps, manifest).await,
        Commands::EnsureIndices => {
            deps.search().await?.ensure_indices().await?;
            info!("Search indices ready");
            Ok(())
        }
    }
}

async fn run_worker(deps: &Dependencies, worker: Worker) -> Result<(), IndexingError> {
    let handler = deps.handler(worker).await?;
    let consumer = deps.consumer(worker)?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
        }
    });

    info!(worker = worker.name(), "Worker started");
    consumer.run(handler, shutdown_rx).await?;
    info!(worker = worker.name(), "Worker stopped");
    Ok(())
}

async fn reconcile(deps: &Dependencies, dry_run: bool) -> Result<(), IndexingError> {
    let reconciler = deps.reconciler().await?;
    let (result, repair) = reconciler.run(dry_run).await?;

    if let Some(summary) = repair {
        if !summary.publish_failures.is_empty() {
            error!(failed = ?summary.publish_failures, "Some re-ingest triggers were not published");
        }
    }

    let report = serde_json::to_string_pretty(&result)
        .map_err(|e| IndexingError::config(format!("Failed to render result: {}", e)))?;
    println!("{}", report);
    Ok(())
}

/// Run a trigger producer, then flush the producer before exiting.
async fn publish_with<F, Fut>(deps: &Dependencies, produce: F) -> Result<(), IndexingError>
where
    F: FnOnce(TriggerSource) -> Fut,
    Fut: Future<Output = Result<PublishSummary, PipelineError>>,
{
    let publisher = deps.publisher("triggers")?;
    let source = deps.trigger_source(Arc::clone(&publisher))?;

    let summary = produce(source).await?;
    publisher.flush(Duration::from_secs(5))?;

    info!(
        published = summary.published,
        failed = summary.failed.len(),
        "Triggers published"
    );
    if summary.failed.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::PartialFailure {
            failed: summary.failed.len(),
            total: summary.published + summary.failed.len(),
        }
        .into())
    }
}

async fn trigger(deps: &Dependencies, args: TriggerArgs) -> Result<(), IndexingError> {
    match (args.field, args.value) {
        (Some(field), Some(value)) => {
            publish_with(deps, |source| async move {
                source.trigger_by_field(&field, &value).await
            })
            .await
        }
        _ if !args.ids.is_empty() => {
            let ids = args.ids;
            publish_with(deps, |source| async move { Ok(source.trigger_ids(&ids).await) }).await
        }
        _ => Err(IndexingError::config("Pass ids or --field/--value")),
    }
}

async fn ontology_load(deps: &Dependencies, manifest: PathBuf) -> Result<(), IndexingError> {
    let manifest = OntologyManifest::from_slice(&std::fs::read(&manifest)?)?;
    let summary = deps.ontology_loader().await?.load(&manifest).await?;

    info!(
        named_graph = %manifest.named_graph,
        indexed = summary.indexed,
        replaced = summary.replaced,
        "Ontology load finished"
    );
    Ok(())
}
