//! Validation errors for boundary payloads.

use thiserror::Error;

/// A payload failed to parse or violated a structural rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The payload could not be decoded into the expected shape.
    #[error("Malformed {kind}: {reason}")]
    Malformed { kind: &'static str, reason: String },

    /// The payload decoded but is inconsistent.
    #[error("Invalid {kind}: {reason}")]
    Invalid { kind: &'static str, reason: String },
}

impl ValidationError {
    /// Create a malformed-payload error.
    pub fn malformed(kind: &'static str, reason: impl ToString) -> Self {
        Self::Malformed {
            kind,
            reason: reason.to_string(),
        }
    }

    /// Create an invalid-payload error.
    pub fn invalid(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind,
            reason: reason.into(),
        }
    }
}
