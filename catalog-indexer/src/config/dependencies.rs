//! Dependency initialization and wiring for the catalog indexer.
//!
//! Clients are built on demand so that each subcommand only needs the
//! configuration (and reachability) of the services it actually uses.

use std::sync::Arc;

use tracing::info;

use super::{AppConfig, Worker};
use crate::IndexingError;
use catalog_indexer_pipeline::{
    BitstreamDownloader, DocumentIndexer, IndexReconciler, KafkaConsumer, MessageHandler,
    MetadataDownloader, OntologyLoader, TriggerSource,
};
use catalog_indexer_repository::{
    HttpTextExtractor, KafkaPublisher, NeptuneGraphClient, OpenSearchClient, RestSourceRepository,
    S3Config, S3ObjectStore, SearchEngineClient,
};

pub struct Dependencies {
    config: AppConfig,
}

impl Dependencies {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Connect to OpenSearch and verify the cluster is healthy.
    pub async fn search(&self) -> Result<Arc<OpenSearchClient>, IndexingError> {
        let search_client =
            OpenSearchClient::new(&self.config.opensearch_url, self.config.search_index.clone())
                .await
                .map_err(|e| {
                    IndexingError::config(format!("Failed to create OpenSearch client: {}", e))
                })?;

        let healthy = search_client
            .health_check()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        info!(url = %self.config.opensearch_url, "OpenSearch connection verified");
        Ok(Arc::new(search_client))
    }

    pub fn repository(&self) -> Result<Arc<RestSourceRepository>, IndexingError> {
        Ok(Arc::new(RestSourceRepository::new(self.config.repository.clone())?))
    }

    pub fn store(&self) -> Result<Arc<S3ObjectStore>, IndexingError> {
        let storage = &self.config.storage;
        Ok(Arc::new(S3ObjectStore::new(S3Config {
            region: storage.region.clone(),
            endpoint_url: storage.endpoint_url.clone(),
            credentials: storage.credentials.clone(),
        })?))
    }

    /// Producer identified as `catalog-indexer-{role}`.
    pub fn publisher(&self, role: &str) -> Result<Arc<KafkaPublisher>, IndexingError> {
        let client_id = format!("{}-{}", self.config.kafka_group_prefix, role);
        Ok(Arc::new(KafkaPublisher::new(&self.config.kafka_broker, &client_id)?))
    }

    pub fn extractor(&self) -> Result<Arc<HttpTextExtractor>, IndexingError> {
        Ok(Arc::new(HttpTextExtractor::new(
            &self.config.extraction_url,
            self.config.extraction_timeout,
        )?))
    }

    pub fn graph(&self) -> Result<Arc<NeptuneGraphClient>, IndexingError> {
        Ok(Arc::new(NeptuneGraphClient::new(self.config.graph.clone())?))
    }

    /// The message handler behind `worker`.
    pub async fn handler(&self, worker: Worker) -> Result<Arc<dyn MessageHandler>, IndexingError> {
        let handler: Arc<dyn MessageHandler> = match worker {
            Worker::Metadata => {
                let forward_topic = self
                    .config
                    .forward_metadata_triggers
                    .then(|| self.config.topics.bitstream.clone());
                Arc::new(MetadataDownloader::new(
                    self.repository()?,
                    self.store()?,
                    self.publisher(worker.name())?,
                    self.config.layout.clone(),
                    forward_topic,
                ))
            }
            Worker::Bitstream => Arc::new(BitstreamDownloader::new(
                self.repository()?,
                self.store()?,
                self.extractor()?,
                self.publisher(worker.name())?,
                self.config.layout.clone(),
                self.config.bitstream.clone(),
            )),
            Worker::Index => Arc::new(DocumentIndexer::new(
                self.store()?,
                self.search().await?,
                self.repository()?,
                self.config.layout.clone(),
            )),
        };
        Ok(handler)
    }

    /// A subscribed consumer for `worker`.
    pub fn consumer(&self, worker: Worker) -> Result<KafkaConsumer, IndexingError> {
        let consumer = KafkaConsumer::new(
            self.config.consumer_config(worker),
            self.publisher("dead-letter")?,
        )?;
        consumer.subscribe()?;
        Ok(consumer)
    }

    pub async fn reconciler(&self) -> Result<IndexReconciler, IndexingError> {
        Ok(IndexReconciler::new(
            self.search().await?,
            self.repository()?,
            self.publisher("reconciler")?,
            self.config.reconciler.clone(),
        ))
    }

    /// Trigger producers publishing through `publisher`.
    pub fn trigger_source(
        &self,
        publisher: Arc<KafkaPublisher>,
    ) -> Result<TriggerSource, IndexingError> {
        Ok(TriggerSource::new(
            self.repository()?,
            publisher,
            self.config.topics.triggers.clone(),
        )
        .with_concurrency(self.config.fan_out))
    }

    pub async fn ontology_loader(&self) -> Result<OntologyLoader, IndexingError> {
        Ok(OntologyLoader::new(
            self.graph()?,
            self.search().await?,
            self.config.ontology.clone(),
        ))
    }
}
