//! Ontology loader: bulk-loads a vocabulary graph and derives one stored
//! tag query per term.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use crate::errors::PipelineError;
use catalog_indexer_repository::interfaces::{GraphDatabase, SearchEngineClient};
use catalog_indexer_repository::types::{LoadRequest, LoadStatus, SparqlRow, StoredQuery};
use catalog_indexer_shared::ValidationError;

const SKOS_PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";

fn default_format() -> String {
    "rdfxml".to_string()
}

/// Describes one vocabulary to load.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyManifest {
    /// Location the graph database can read the serialized graph from.
    pub source: String,
    #[serde(default = "default_format")]
    pub format: String,
    pub named_graph: String,
    /// Vocabulary name recorded on every derived tag.
    pub source_vocabulary: String,
}

impl OntologyManifest {
    pub fn from_slice(payload: &[u8]) -> Result<Self, ValidationError> {
        let manifest: Self = serde_json::from_slice(payload)
            .map_err(|e| ValidationError::malformed("ontology manifest", e))?;

        if manifest.source.trim().is_empty() {
            return Err(ValidationError::invalid("ontology manifest", "source is empty"));
        }
        if manifest.named_graph.trim().is_empty() {
            return Err(ValidationError::invalid(
                "ontology manifest",
                "namedGraph is empty",
            ));
        }
        Ok(manifest)
    }
}

#[derive(Debug, Clone)]
pub struct OntologyLoaderConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Terms fetched per graph query.
    pub page_size: usize,
}

impl Default for OntologyLoaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30 * 60),
            page_size: 1000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OntologyLoadSummary {
    pub load_id: String,
    pub replaced: u64,
    pub indexed: usize,
    pub duplicates: usize,
    pub pages: usize,
}

pub struct OntologyLoader {
    graph: Arc<dyn GraphDatabase>,
    search: Arc<dyn SearchEngineClient>,
    config: OntologyLoaderConfig,
}

impl OntologyLoader {
    pub fn new(
        graph: Arc<dyn GraphDatabase>,
        search: Arc<dyn SearchEngineClient>,
        config: OntologyLoaderConfig,
    ) -> Self {
        Self {
            graph,
            search,
            config,
        }
    }

    /// Load the graph, then replace the stored queries for its named graph.
    #[instrument(skip(self, manifest), fields(named_graph = %manifest.named_graph))]
    pub async fn load(&self, manifest: &OntologyManifest) -> Result<OntologyLoadSummary, PipelineError> {
        let load_id = self
            .graph
            .start_load(&LoadRequest {
                source: manifest.source.clone(),
                format: manifest.format.clone(),
                named_graph_uri: manifest.named_graph.clone(),
            })
            .await?;
        info!(load_id = %load_id, source = %manifest.source, "Bulk load submitted");

        self.await_load(&load_id).await?;

        let replaced = self.search.delete_stored_queries(&manifest.named_graph).await?;
        debug!(replaced, "Removed previous stored queries");

        let mut summary = self.derive_terms(manifest).await?;
        summary.load_id = load_id;
        summary.replaced = replaced;

        info!(
            load_id = %summary.load_id,
            indexed = summary.indexed,
            duplicates = summary.duplicates,
            pages = summary.pages,
            "Ontology loaded"
        );
        Ok(summary)
    }

    async fn await_load(&self, load_id: &str) -> Result<(), PipelineError> {
        let deadline = Instant::now() + self.config.timeout;

        loop {
            match self.graph.load_status(load_id).await? {
                LoadStatus::Completed => return Ok(()),
                LoadStatus::Failed(status) => {
                    return Err(PipelineError::LoadFailed {
                        load_id: load_id.to_string(),
                        status,
                    })
                }
                status => debug!(load_id = %load_id, status = ?status, "Bulk load pending"),
            }

            if Instant::now() >= deadline {
                warn!(load_id = %load_id, timeout = ?self.config.timeout, "Bulk load timed out");
                return Err(PipelineError::LoadTimeout(load_id.to_string()));
            }
            sleep(self.config.poll_interval).await;
        }
    }

    /// Page through the graph's terms and index one stored query per
    /// distinct `{uri, label}` pair.
    async fn derive_terms(&self, manifest: &OntologyManifest) -> Result<OntologyLoadSummary, PipelineError> {
        let page_size = self.config.page_size.max(1);
        let mut seen = HashSet::new();
        let mut summary = OntologyLoadSummary::default();
        let mut offset = 0;

        loop {
            let query = term_query(&manifest.named_graph, page_size, offset);
            let rows = self.graph.select(&query).await?;
            if rows.is_empty() {
                break;
            }
            summary.pages += 1;
            offset += rows.len();

            let mut queries = Vec::with_capacity(rows.len());
            for row in &rows {
                let Some(query) = stored_query(manifest, row) else {
                    warn!(row = ?row, "Term row is missing uri or label");
                    continue;
                };
                if seen.insert(query.id.clone()) {
                    queries.push(query);
                } else {
                    summary.duplicates += 1;
                }
            }

            if !queries.is_empty() {
                self.search.bulk_index_stored_queries(&queries).await?;
                summary.indexed += queries.len();
            }
            debug!(offset, indexed = summary.indexed, "Indexed term page");
        }

        Ok(summary)
    }
}

/// SPARQL query for one page of `{uri, label}` pairs in `named_graph`.
pub fn term_query(named_graph: &str, limit: usize, offset: usize) -> String {
    format!(
        "SELECT DISTINCT ?uri ?label WHERE {{ GRAPH <{}> {{ ?uri <{}> ?label }} }} ORDER BY ?uri ?label LIMIT {} OFFSET {}",
        named_graph, SKOS_PREF_LABEL, limit, offset
    )
}

/// Stable id for a term's stored query.
pub fn stored_query_id(named_graph: &str, uri: &str, label: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [named_graph, uri, label] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

fn stored_query(manifest: &OntologyManifest, row: &SparqlRow) -> Option<StoredQuery> {
    let uri = row.get("uri")?;
    let label = row.get("label")?.trim();
    if label.is_empty() {
        return None;
    }
    Some(StoredQuery {
        id: stored_query_id(&manifest.named_graph, uri, label),
        label: label.to_string(),
        uri: uri.clone(),
        source_vocabulary: manifest.source_vocabulary.clone(),
        named_graph: manifest.named_graph.clone(),
    })
}
