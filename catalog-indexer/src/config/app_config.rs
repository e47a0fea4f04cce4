//! Environment-derived configuration, parsed once at start-up.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use catalog_indexer_pipeline::{
    BitstreamConfig, ConsumerConfig, OntologyLoaderConfig, ReconcilerConfig,
};
use catalog_indexer_repository::{Credentials, GraphConfig, RepositoryConfig, SearchIndexConfig};
use catalog_indexer_shared::StorageLayout;

use crate::IndexingError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";
const DEFAULT_DOCUMENTS_INDEX: &str = "catalog-documents";
const DEFAULT_STORED_QUERIES_INDEX: &str = "catalog-terms";

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka consumer group prefix; each worker appends its name.
const DEFAULT_KAFKA_GROUP_PREFIX: &str = "catalog-indexer";
const DEFAULT_TRIGGER_TOPIC: &str = "catalog.triggers";
const DEFAULT_BITSTREAM_TOPIC: &str = "catalog.bitstream-triggers";
const DEFAULT_INDEXING_TOPIC: &str = "catalog.indexing-jobs";
const DEFAULT_MAX_DELIVERIES: u32 = 5;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

const DEFAULT_REPOSITORY_URL: &str = "http://localhost:8080/rest/";
const DEFAULT_FEED_URL: &str = "/feed/rss_2.0/site";
const DEFAULT_REPOSITORY_TIMEOUT_SECS: u64 = 30;

const DEFAULT_AWS_REGION: &str = "us-east-1";

const DEFAULT_EXTRACTION_URL: &str = "http://localhost:9000/extract";
const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 900;

const DEFAULT_GRAPH_ENDPOINT: &str = "http://localhost:8182";

/// The long-running queue consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Worker {
    Metadata,
    Bitstream,
    Index,
}

impl Worker {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Bitstream => "bitstream",
            Self::Index => "index",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Ingest triggers consumed by the metadata worker.
    pub triggers: String,
    /// Input of the bitstream worker.
    pub bitstream: String,
    /// Indexing jobs consumed by the index worker.
    pub indexing: String,
    pub dead_letter: Option<String>,
}

/// Object store connection settings.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub region: String,
    pub endpoint_url: Option<String>,
    pub credentials: Credentials,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub opensearch_url: String,
    pub search_index: SearchIndexConfig,
    pub kafka_broker: String,
    pub kafka_group_prefix: String,
    pub topics: Topics,
    /// Forward triggers from the metadata worker to the bitstream topic.
    /// Disable when the bitstream worker is fed by storage notifications.
    pub forward_metadata_triggers: bool,
    pub max_deliveries: u32,
    pub retry_delay: Duration,
    pub repository: RepositoryConfig,
    pub storage: StorageSettings,
    pub layout: StorageLayout,
    pub extraction_url: String,
    pub extraction_timeout: Duration,
    pub graph: GraphConfig,
    pub bitstream: BitstreamConfig,
    pub reconciler: ReconcilerConfig,
    pub ontology: OntologyLoaderConfig,
    /// Concurrency for trigger publishing and handle resolution.
    pub fan_out: usize,
}

impl AppConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`, `DOCUMENTS_INDEX`, `STORED_QUERIES_INDEX`
    /// - `KAFKA_BROKER`, `KAFKA_GROUP_PREFIX`, `TRIGGER_TOPIC`,
    ///   `BITSTREAM_TOPIC`, `INDEXING_TOPIC`, `DEAD_LETTER_TOPIC`,
    ///   `FORWARD_METADATA_TRIGGERS`, `MAX_DELIVERIES`, `RETRY_DELAY_MS`
    /// - `REPOSITORY_URL`, `REPOSITORY_FEED_URL`, `REPOSITORY_TIMEOUT_SECS`
    /// - `AWS_REGION`, `S3_ENDPOINT_URL`, `AWS_ACCESS_KEY_ID`,
    ///   `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`
    /// - `METADATA_BUCKET`, `BINARY_BUCKET`, `TEXT_BUCKET`
    /// - `EXTRACTION_URL`, `EXTRACTION_TIMEOUT_SECS`
    /// - `GRAPH_ENDPOINT`, `GRAPH_LOADER_ROLE_ARN`
    /// - `TEXT_BEARING_MIME_TYPES` (comma separated), `BITSTREAM_CONCURRENCY`
    /// - `RECONCILE_PAGE_SIZE`, `RECONCILE_SCROLL_KEEP_ALIVE`,
    ///   `RECONCILE_CONCURRENCY`, `FAN_OUT`
    /// - `ONTOLOGY_POLL_INTERVAL_SECS`, `ONTOLOGY_TIMEOUT_SECS`,
    ///   `ONTOLOGY_PAGE_SIZE`
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let trigger_topic = vars.string("TRIGGER_TOPIC", DEFAULT_TRIGGER_TOPIC);
        let topics = Topics {
            triggers: trigger_topic.clone(),
            bitstream: vars.string("BITSTREAM_TOPIC", DEFAULT_BITSTREAM_TOPIC),
            indexing: vars.string("INDEXING_TOPIC", DEFAULT_INDEXING_TOPIC),
            dead_letter: vars.optional("DEAD_LETTER_TOPIC"),
        };

        let search_index = SearchIndexConfig::new(
            vars.string("DOCUMENTS_INDEX", DEFAULT_DOCUMENTS_INDEX),
            vars.string("STORED_QUERIES_INDEX", DEFAULT_STORED_QUERIES_INDEX),
        );

        let region = vars.string("AWS_REGION", DEFAULT_AWS_REGION);
        let storage = StorageSettings {
            region: region.clone(),
            endpoint_url: vars.optional("S3_ENDPOINT_URL"),
            credentials: Credentials {
                access_key_id: vars.string("AWS_ACCESS_KEY_ID", ""),
                secret_access_key: vars.string("AWS_SECRET_ACCESS_KEY", ""),
                session_token: vars.optional("AWS_SESSION_TOKEN"),
            },
        };

        let defaults = StorageLayout::default();
        let layout = StorageLayout {
            metadata_bucket: vars.string("METADATA_BUCKET", &defaults.metadata_bucket),
            binary_bucket: vars.string("BINARY_BUCKET", &defaults.binary_bucket),
            text_bucket: vars.string("TEXT_BUCKET", &defaults.text_bucket),
        };

        let mut bitstream = BitstreamConfig {
            concurrency: vars.parse("BITSTREAM_CONCURRENCY", 1)?,
            indexing_topic: topics.indexing.clone(),
            ..BitstreamConfig::default()
        };
        if let Some(types) = vars.list("TEXT_BEARING_MIME_TYPES") {
            bitstream.text_bearing_mime_types = types;
        }

        let fan_out = vars.parse("FAN_OUT", 5)?;
        let reconciler = ReconcilerConfig {
            page_size: vars.parse("RECONCILE_PAGE_SIZE", 500)?,
            scroll_keep_alive: vars.string("RECONCILE_SCROLL_KEEP_ALIVE", "5m"),
            compare_concurrency: vars.parse("RECONCILE_CONCURRENCY", 5)?,
            publish_concurrency: fan_out,
            text_bearing_mime_types: bitstream.text_bearing_mime_types.clone(),
            trigger_topic,
        };

        let ontology = OntologyLoaderConfig {
            poll_interval: Duration::from_secs(vars.parse("ONTOLOGY_POLL_INTERVAL_SECS", 10)?),
            timeout: Duration::from_secs(vars.parse("ONTOLOGY_TIMEOUT_SECS", 30 * 60)?),
            page_size: vars.parse("ONTOLOGY_PAGE_SIZE", 1000)?,
        };

        Ok(Self {
            opensearch_url: vars.string("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            search_index,
            kafka_broker: vars.string("KAFKA_BROKER", DEFAULT_KAFKA_BROKER),
            kafka_group_prefix: vars.string("KAFKA_GROUP_PREFIX", DEFAULT_KAFKA_GROUP_PREFIX),
            topics,
            forward_metadata_triggers: vars.parse("FORWARD_METADATA_TRIGGERS", true)?,
            max_deliveries: vars.parse("MAX_DELIVERIES", DEFAULT_MAX_DELIVERIES)?,
            retry_delay: Duration::from_millis(vars.parse("RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)?),
            repository: RepositoryConfig {
                base_url: vars.string("REPOSITORY_URL", DEFAULT_REPOSITORY_URL),
                feed_url: vars.string("REPOSITORY_FEED_URL", DEFAULT_FEED_URL),
                request_timeout: Duration::from_secs(
                    vars.parse("REPOSITORY_TIMEOUT_SECS", DEFAULT_REPOSITORY_TIMEOUT_SECS)?,
                ),
            },
            storage,
            layout,
            extraction_url: vars.string("EXTRACTION_URL", DEFAULT_EXTRACTION_URL),
            extraction_timeout: Duration::from_secs(
                vars.parse("EXTRACTION_TIMEOUT_SECS", DEFAULT_EXTRACTION_TIMEOUT_SECS)?,
            ),
            graph: GraphConfig {
                endpoint: vars.string("GRAPH_ENDPOINT", DEFAULT_GRAPH_ENDPOINT),
                iam_role_arn: vars.optional("GRAPH_LOADER_ROLE_ARN"),
                region,
            },
            bitstream,
            reconciler,
            ontology,
            fan_out,
        })
    }

    /// Consumer settings for `worker`.
    pub fn consumer_config(&self, worker: Worker) -> ConsumerConfig {
        let topic = match worker {
            Worker::Metadata => &self.topics.triggers,
            Worker::Bitstream => &self.topics.bitstream,
            Worker::Index => &self.topics.indexing,
        };

        ConsumerConfig {
            brokers: self.kafka_broker.clone(),
            group_id: format!("{}-{}", self.kafka_group_prefix, worker.name()),
            topic: topic.clone(),
            dead_letter_topic: self.topics.dead_letter.clone(),
            max_deliveries: self.max_deliveries,
            retry_delay: self.retry_delay,
        }
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        self.optional(key).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T, IndexingError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw
                .parse()
                .map_err(|e| IndexingError::config(format!("{} = {:?}: {}", key, raw, e))),
            None => Ok(default),
        }
    }
}
