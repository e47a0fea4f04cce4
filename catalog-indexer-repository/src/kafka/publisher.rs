//! Kafka implementation of the message publisher.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::{debug, error, info, instrument};

use crate::errors::QueueError;
use crate::interfaces::MessagePublisher;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes messages with a ZSTD-compressed `FutureProducer`.
pub struct KafkaPublisher {
    producer: FutureProducer,
    source: String,
}

impl KafkaPublisher {
    /// Create a producer connected to `broker`. `client_id` is also attached
    /// to every record as the `source` header.
    pub fn new(broker: &str, client_id: &str) -> Result<Self, QueueError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", broker)
            .set("client.id", client_id)
            .set("compression.type", "zstd")
            .set("message.timeout.ms", "5000")
            .set("enable.idempotence", "true")
            .create()?;

        info!(broker = %broker, client_id = %client_id, "Created Kafka publisher");

        Ok(Self {
            producer,
            source: client_id.to_string(),
        })
    }

    /// Wait for queued records to be delivered.
    pub fn flush(&self, timeout: Duration) -> Result<(), QueueError> {
        self.producer.flush(timeout)?;
        Ok(())
    }
}

#[async_trait]
impl MessagePublisher for KafkaPublisher {
    #[instrument(skip(self, payload), fields(size = payload.len()))]
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), QueueError> {
        let record = FutureRecord::to(topic)
            .key(key)
            .payload(payload)
            .headers(OwnedHeaders::new().insert(Header {
                key: "source",
                value: Some(self.source.as_str()),
            }));

        match self.producer.send(record, DELIVERY_TIMEOUT).await {
            Ok((partition, offset)) => {
                debug!(partition, offset, "Message delivered");
                Ok(())
            }
            Err((e, _)) => {
                error!(error = %e, "Message delivery failed");
                Err(QueueError::publish(topic, e))
            }
        }
    }
}
