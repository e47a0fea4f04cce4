//! Graph database error types.

use thiserror::Error;

/// Errors that can occur while loading or querying the graph database.
#[derive(Error, Debug)]
pub enum GraphError {
    /// The request could not be sent or the body could not be read.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The bulk loader rejected a request.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// A SPARQL query failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl GraphError {
    /// Create a transport error.
    pub fn transport(msg: impl ToString) -> Self {
        Self::TransportError(msg.to_string())
    }

    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl ToString) -> Self {
        Self::ParseError(msg.to_string())
    }
}

impl From<reqwest::Error> for GraphError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::TransportError(err.to_string())
        }
    }
}
