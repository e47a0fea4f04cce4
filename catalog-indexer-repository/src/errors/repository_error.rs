//! Source repository error types.
//!
//! "Not found" is not an error: lookups return `Ok(None)` instead.

use thiserror::Error;

/// Errors that can occur while talking to the source repository.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Invalid base URL or client setup.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The request could not be sent or the body could not be read.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The repository answered with an unexpected status.
    #[error("Repository returned HTTP {status} for {url}")]
    StatusError { status: u16, url: String },

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl RepositoryError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl ToString) -> Self {
        Self::TransportError(msg.to_string())
    }

    /// Create a status error.
    pub fn status(status: u16, url: impl Into<String>) -> Self {
        Self::StatusError {
            status,
            url: url.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl ToString) -> Self {
        Self::ParseError(msg.to_string())
    }
}

impl From<reqwest::Error> for RepositoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::TransportError(err.to_string())
        }
    }
}
