//! HTTP implementation of the text extraction invoker.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::errors::ExtractionError;
use crate::interfaces::TextExtractor;
use crate::types::{ExtractionOutput, ExtractionRequest};

/// Invokes the extraction function synchronously over HTTP.
pub struct HttpTextExtractor {
    http: Client,
    endpoint: String,
}

impl HttpTextExtractor {
    /// `timeout` bounds one invocation end to end; extraction of large
    /// binaries is slow, so it should be generous.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, ExtractionError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ExtractionError::transport)?;

        info!(endpoint = %endpoint, "Created text extraction client");

        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }
}

/// Interpret an extraction function response body.
///
/// Success is `{text_uri, results: {success: true}}`; failure is
/// `{errorType, errorMessage}`.
pub fn parse_extraction_response(body: &Value) -> Result<ExtractionOutput, ExtractionError> {
    if let Some(error_type) = body.get("errorType").and_then(Value::as_str) {
        let message = body
            .get("errorMessage")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(ExtractionError::failed(error_type, message));
    }

    let succeeded = body["results"]["success"].as_bool().unwrap_or(false);
    match body.get("text_uri").and_then(Value::as_str) {
        Some(text_uri) if succeeded => Ok(ExtractionOutput {
            text_uri: text_uri.to_string(),
        }),
        _ => Err(ExtractionError::UnexpectedResponse(body.to_string())),
    }
}

#[async_trait]
impl TextExtractor for HttpTextExtractor {
    #[instrument(skip(self, request), fields(document = %request.document_uri))]
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutput, ExtractionError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(ExtractionError::transport)?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            error!(status = %status, error = %e, "Unreadable extraction response");
            ExtractionError::transport(e)
        })?;

        // Structured errors may arrive with a non-success status.
        let output = parse_extraction_response(&body)?;

        debug!(text_uri = %output.text_uri, "Extraction completed");
        Ok(output)
    }
}
