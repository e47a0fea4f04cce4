//! Queue error types.

use thiserror::Error;

/// Errors that can occur while publishing to a topic.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Producer could not be created.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Delivery to the broker failed.
    #[error("Publish to {topic} failed: {reason}")]
    PublishError { topic: String, reason: String },

    /// The payload could not be serialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl QueueError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a publish error.
    pub fn publish(topic: &str, reason: impl ToString) -> Self {
        Self::PublishError {
            topic: topic.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<rdkafka::error::KafkaError> for QueueError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
