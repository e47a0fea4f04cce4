//! Text extraction error types.

use thiserror::Error;

/// Errors returned by the text extraction invoker.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The function could not be reached or its response could not be read.
    #[error("Extraction transport error: {0}")]
    TransportError(String),

    /// The function ran and reported a structured failure.
    #[error("Extraction failed ({error_type}): {error_message}")]
    Failed {
        error_type: String,
        error_message: String,
    },

    /// The response matched neither the success nor the error shape.
    #[error("Unexpected extraction response: {0}")]
    UnexpectedResponse(String),
}

impl ExtractionError {
    /// Create a transport error.
    pub fn transport(msg: impl ToString) -> Self {
        Self::TransportError(msg.to_string())
    }

    /// Create a structured failure.
    pub fn failed(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self::Failed {
            error_type: error_type.into(),
            error_message: error_message.into(),
        }
    }

    /// True when the function itself reported the failure.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
