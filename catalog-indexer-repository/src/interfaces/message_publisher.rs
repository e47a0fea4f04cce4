//! Message publisher trait definition.

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::QueueError;

/// Publishes messages to a topic. Delivery is at-least-once.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish `payload` to `topic`, partitioned by `key`.
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), QueueError>;
}

/// Serialize `message` as JSON and publish it.
pub async fn publish_json<T: Serialize + Sync>(
    publisher: &dyn MessagePublisher,
    topic: &str,
    key: &str,
    message: &T,
) -> Result<(), QueueError> {
    let payload = serde_json::to_vec(message)?;
    publisher.publish(topic, key, &payload).await
}
