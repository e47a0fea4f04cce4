//! S3-compatible object store client.

use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use reqwest::{Body, Client, Method, StatusCode};
use tracing::{debug, error, info, instrument};

use crate::errors::StorageError;
use crate::interfaces::ObjectStore;
use crate::s3::signing::{encode_key, hex_sha256, sign, Credentials, SigningRequest, UNSIGNED_PAYLOAD};
use crate::types::BinaryStream;

/// Connection settings for an S3-compatible store.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    /// Custom endpoint (MinIO, LocalStack). Uses path-style addressing when set.
    pub endpoint_url: Option<String>,
    pub credentials: Credentials,
}

/// Object store backed by the S3 REST API, signed with SigV4.
pub struct S3ObjectStore {
    http: Client,
    config: S3Config,
}

impl S3ObjectStore {
    pub fn new(config: S3Config) -> Result<Self, StorageError> {
        if config.credentials.access_key_id.is_empty() {
            return Err(StorageError::config("access key id is empty"));
        }

        let http = Client::builder()
            .build()
            .map_err(|e| StorageError::config(e.to_string()))?;

        info!(
            region = %config.region,
            endpoint = config.endpoint_url.as_deref().unwrap_or("aws"),
            "Created S3 object store"
        );

        Ok(Self { http, config })
    }

    /// Resolve the request URL plus the host and canonical path to sign.
    fn locate(&self, bucket: &str, key: &str) -> (String, String, String) {
        let encoded_key = encode_key(key);
        match self.config.endpoint_url {
            Some(ref endpoint) => {
                let base = endpoint.trim_end_matches('/');
                let host = base
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .to_string();
                let path = format!("/{}/{}", bucket, encoded_key);
                (format!("{}{}", base, path), host, path)
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", bucket, self.config.region);
                let path = format!("/{}", encoded_key);
                (format!("https://{}{}", host, path), host, path)
            }
        }
    }

    fn signed_request(
        &self,
        method: Method,
        bucket: &str,
        key: &str,
        payload_hash: &str,
    ) -> reqwest::RequestBuilder {
        let (url, host, path) = self.locate(bucket, key);
        let headers = sign(
            &self.config.credentials,
            &self.config.region,
            &SigningRequest {
                method: method.as_str(),
                host: &host,
                canonical_uri: &path,
                payload_hash,
            },
            Utc::now(),
        );

        headers
            .into_iter()
            .fold(self.http.request(method, url), |builder, (name, value)| {
                builder.header(name, value)
            })
    }

    async fn check_put(
        response: reqwest::Response,
        bucket: &str,
        key: &str,
    ) -> Result<(), StorageError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, bucket, key, "PutObject failed");
            return Err(StorageError::status(bucket, key, status.as_u16(), body));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self))]
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let response = self
            .signed_request(Method::GET, bucket, key, &hex_sha256(b""))
            .send()
            .await
            .map_err(|e| StorageError::transport(bucket, key, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Object not found");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "GetObject failed");
            return Err(StorageError::status(bucket, key, status.as_u16(), body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::transport(bucket, key, e))?;

        Ok(Some(bytes.to_vec()))
    }

    #[instrument(skip(self, body), fields(size = body.len()))]
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let payload_hash = hex_sha256(&body);

        let response = self
            .signed_request(Method::PUT, bucket, key, &payload_hash)
            .header("content-type", content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::transport(bucket, key, e))?;

        Self::check_put(response, bucket, key).await?;
        debug!("Object written");
        Ok(())
    }

    #[instrument(skip(self, stream), fields(content_length = ?stream.content_length))]
    async fn put_stream(
        &self,
        bucket: &str,
        key: &str,
        stream: BinaryStream,
    ) -> Result<(), StorageError> {
        let content_type = stream
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());

        // PutObject needs a length; without one the body is buffered first.
        let content_length = match stream.content_length {
            Some(length) => length,
            None => {
                let body: Vec<u8> = stream
                    .body
                    .try_concat()
                    .await
                    .map_err(|e| StorageError::transport(bucket, key, e))?;
                return self.put(bucket, key, body, &content_type).await;
            }
        };

        let response = self
            .signed_request(Method::PUT, bucket, key, UNSIGNED_PAYLOAD)
            .header("content-type", content_type)
            .header("content-length", content_length)
            .body(Body::wrap_stream(stream.body))
            .send()
            .await
            .map_err(|e| StorageError::transport(bucket, key, e))?;

        Self::check_put(response, bucket, key).await?;
        debug!("Object streamed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(endpoint: Option<&str>) -> S3ObjectStore {
        S3ObjectStore::new(S3Config {
            region: "eu-west-1".to_string(),
            endpoint_url: endpoint.map(str::to_string),
            credentials: Credentials {
                access_key_id: "key".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: None,
            },
        })
        .unwrap()
    }

    #[test]
    fn test_virtual_host_addressing() {
        let (url, host, path) = store(None).locate("catalog-binaries", "pdf/abc.pdf");

        assert_eq!(host, "catalog-binaries.s3.eu-west-1.amazonaws.com");
        assert_eq!(path, "/pdf/abc.pdf");
        assert_eq!(url, "https://catalog-binaries.s3.eu-west-1.amazonaws.com/pdf/abc.pdf");
    }

    #[test]
    fn test_path_style_addressing_for_custom_endpoint() {
        let (url, host, path) = store(Some("http://localhost:9000/")).locate("text", "txt/a b.txt");

        assert_eq!(host, "localhost:9000");
        assert_eq!(path, "/text/txt/a%20b.txt");
        assert_eq!(url, "http://localhost:9000/text/txt/a%20b.txt");
    }

    #[test]
    fn test_rejects_empty_credentials() {
        let result = S3ObjectStore::new(S3Config {
            region: "eu-west-1".to_string(),
            endpoint_url: None,
            credentials: Credentials {
                access_key_id: String::new(),
                secret_access_key: String::new(),
                session_token: None,
            },
        });
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_get_missing_object_is_none() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/catalog-metadata/missing.json"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = store(Some(&mock_server.uri()));
        let object = store.get("catalog-metadata", "missing.json").await.unwrap();

        assert!(object.is_none());
    }

    #[tokio::test]
    async fn test_get_returns_body_and_surfaces_errors() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/catalog-text/txt/a.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"full text".to_vec(), "text/plain"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/catalog-text/txt/b.txt"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<Error>InternalError</Error>"))
            .mount(&mock_server)
            .await;

        let store = store(Some(&mock_server.uri()));

        let body = store.get("catalog-text", "txt/a.txt").await.unwrap();
        assert_eq!(body.as_deref(), Some(&b"full text"[..]));

        let err = store.get("catalog-text", "txt/b.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::StatusError { .. }));
    }
}
