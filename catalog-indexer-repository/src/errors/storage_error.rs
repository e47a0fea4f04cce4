//! Object store error types.

use thiserror::Error;

/// Errors that can occur while reading or writing objects.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Missing or unusable credentials / endpoint configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The request could not be sent or the body could not be read.
    #[error("Transport error for s3://{bucket}/{key}: {reason}")]
    TransportError {
        bucket: String,
        key: String,
        reason: String,
    },

    /// The store answered with a non-success status.
    #[error("Object store returned HTTP {status} for s3://{bucket}/{key}: {body}")]
    StatusError {
        bucket: String,
        key: String,
        status: u16,
        body: String,
    },

    /// A stored object did not contain the expected JSON.
    #[error("Invalid JSON in s3://{bucket}/{key}: {reason}")]
    InvalidJson {
        bucket: String,
        key: String,
        reason: String,
    },
}

impl StorageError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a transport error.
    pub fn transport(bucket: &str, key: &str, reason: impl ToString) -> Self {
        Self::TransportError {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a status error.
    pub fn status(bucket: &str, key: &str, status: u16, body: impl Into<String>) -> Self {
        Self::StatusError {
            bucket: bucket.to_string(),
            key: key.to_string(),
            status,
            body: body.into(),
        }
    }

    /// Create an invalid JSON error.
    pub fn invalid_json(bucket: &str, key: &str, reason: impl ToString) -> Self {
        Self::InvalidJson {
            bucket: bucket.to_string(),
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
