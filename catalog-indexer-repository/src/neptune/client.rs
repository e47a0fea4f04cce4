//! Neptune-style graph database client: bulk loader plus SPARQL endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};

use crate::errors::GraphError;
use crate::interfaces::GraphDatabase;
use crate::types::{LoadRequest, LoadStatus, SparqlRow};

/// Connection settings for the graph database.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Cluster endpoint, e.g. `https://graph.example.org:8182`.
    pub endpoint: String,
    /// Role the loader assumes to read the source location.
    pub iam_role_arn: Option<String>,
    pub region: String,
}

pub struct NeptuneGraphClient {
    http: Client,
    config: GraphConfig,
}

impl NeptuneGraphClient {
    pub fn new(config: GraphConfig) -> Result<Self, GraphError> {
        let http = Client::builder().build().map_err(GraphError::transport)?;

        info!(endpoint = %config.endpoint, "Created graph database client");

        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }
}

/// Body for a bulk loader submission.
pub fn build_load_body(request: &LoadRequest, config: &GraphConfig) -> Value {
    json!({
        "source": request.source,
        "format": request.format,
        "iamRoleArn": config.iam_role_arn,
        "region": config.region,
        "failOnError": "TRUE",
        "parallelism": "MEDIUM",
        "parserConfiguration": {
            "namedGraphUri": request.named_graph_uri
        }
    })
}

/// Map the loader's `overallStatus.status` to a [`LoadStatus`].
pub fn parse_load_status(body: &Value) -> Result<LoadStatus, GraphError> {
    let status = body["payload"]["overallStatus"]["status"]
        .as_str()
        .ok_or_else(|| GraphError::parse("load status response has no overallStatus"))?;

    Ok(match status {
        "LOAD_NOT_STARTED" => LoadStatus::NotStarted,
        "LOAD_IN_QUEUE" => LoadStatus::InQueue,
        "LOAD_IN_PROGRESS" => LoadStatus::InProgress,
        "LOAD_COMPLETED" => LoadStatus::Completed,
        other => LoadStatus::Failed(other.to_string()),
    })
}

/// Flatten `application/sparql-results+json` bindings into rows of lexical
/// values. Unbound variables are left out of the row.
pub fn parse_sparql_results(body: &Value) -> Result<Vec<SparqlRow>, GraphError> {
    let bindings = body["results"]["bindings"]
        .as_array()
        .ok_or_else(|| GraphError::parse("SPARQL response has no bindings"))?;

    Ok(bindings
        .iter()
        .filter_map(Value::as_object)
        .map(|binding| {
            binding
                .iter()
                .filter_map(|(name, term)| {
                    term["value"]
                        .as_str()
                        .map(|value| (name.clone(), value.to_string()))
                })
                .collect()
        })
        .collect())
}

#[async_trait]
impl GraphDatabase for NeptuneGraphClient {
    #[instrument(skip(self, request), fields(source = %request.source, graph = %request.named_graph_uri))]
    async fn start_load(&self, request: &LoadRequest) -> Result<String, GraphError> {
        let response = self
            .http
            .post(self.url("loader"))
            .json(&build_load_body(request, &self.config))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            error!(status = %status, body = %body, "Bulk load submission rejected");
            return Err(GraphError::loader(format!(
                "Load submission failed with status {}: {}",
                status, body
            )));
        }

        let load_id = body["payload"]["loadId"]
            .as_str()
            .ok_or_else(|| GraphError::parse("load response has no loadId"))?
            .to_string();

        info!(load_id = %load_id, "Bulk load submitted");
        Ok(load_id)
    }

    #[instrument(skip(self))]
    async fn load_status(&self, load_id: &str) -> Result<LoadStatus, GraphError> {
        let response = self
            .http
            .get(self.url(&format!("loader/{}", load_id)))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            return Err(GraphError::loader(format!(
                "Load status failed with status {}: {}",
                status, body
            )));
        }

        let load_status = parse_load_status(&body)?;
        debug!(status = ?load_status, "Load status");
        Ok(load_status)
    }

    #[instrument(skip(self, query))]
    async fn select(&self, query: &str) -> Result<Vec<SparqlRow>, GraphError> {
        let response = self
            .http
            .post(self.url("sparql"))
            .header(reqwest::header::ACCEPT, "application/sparql-results+json")
            .form(&[("query", query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "SPARQL query failed");
            return Err(GraphError::query(format!(
                "SPARQL query failed with status {}: {}",
                status, body
            )));
        }

        let body: Value = response.json().await?;
        parse_sparql_results(&body)
    }
}
