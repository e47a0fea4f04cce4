//! Kafka consumer implementation for the pipeline workers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::{BorrowedMessage, Message as KafkaMessage},
    Offset, TopicPartitionList,
};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::handler::{settle, Disposition, MessageHandler};
use crate::errors::PipelineError;
use catalog_indexer_repository::interfaces::MessagePublisher;

/// Settings for one worker's consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub brokers: String,
    pub group_id: String,
    pub topic: String,
    /// Where messages go after their last failed delivery. Without one they
    /// are logged and skipped.
    pub dead_letter_topic: Option<String>,
    /// Deliveries (first attempt included) before a retryable failure is
    /// dead-lettered.
    pub max_deliveries: u32,
    /// Pause before a failed message is redelivered.
    pub retry_delay: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            brokers: "localhost:9092".to_string(),
            group_id: "catalog-indexer".to_string(),
            topic: "catalog.triggers".to_string(),
            dead_letter_topic: None,
            max_deliveries: 5,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Kafka consumer with manual commits and bounded redelivery.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    config: ConsumerConfig,
    dead_letters: Arc<dyn MessagePublisher>,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// # Arguments
    ///
    /// * `config` - Brokers, group, topic and redelivery policy
    /// * `dead_letters` - Publisher used for the dead-letter topic
    pub fn new(
        config: ConsumerConfig,
        dead_letters: Arc<dyn MessagePublisher>,
    ) -> Result<Self, PipelineError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| PipelineError::kafka(e.to_string()))?;

        info!(
            brokers = %config.brokers,
            group_id = %config.group_id,
            "Created Kafka consumer"
        );

        Ok(Self {
            consumer,
            config,
            dead_letters,
        })
    }

    /// Subscribe to the configured topic.
    pub fn subscribe(&self) -> Result<(), PipelineError> {
        self.consumer
            .subscribe(&[self.config.topic.as_str()])
            .map_err(|e| PipelineError::kafka(e.to_string()))?;

        info!(topic = %self.config.topic, "Subscribed to Kafka topic");
        Ok(())
    }

    /// Consume until the stream ends or a shutdown signal arrives.
    #[instrument(skip(self, handler, shutdown), fields(topic = %self.config.topic))]
    pub async fn run(
        &self,
        handler: Arc<dyn MessageHandler>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), PipelineError> {
        let mut message_stream = self.consumer.stream();
        let mut attempts: HashMap<(i32, i64), u32> = HashMap::new();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    break;
                }
                message = message_stream.next() => {
                    match message {
                        Some(Ok(msg)) => {
                            self.process_message(&msg, handler.as_ref(), &mut attempts).await?;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                        }
                        None => {
                            info!("Kafka stream ended");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Handle one message and settle it.
    async fn process_message(
        &self,
        msg: &BorrowedMessage<'_>,
        handler: &dyn MessageHandler,
        attempts: &mut HashMap<(i32, i64), u32>,
    ) -> Result<(), PipelineError> {
        let partition = msg.partition();
        let offset = msg.offset();
        let payload = msg.payload().unwrap_or_default();

        let attempt = {
            let count = attempts.entry((partition, offset)).or_insert(0);
            *count += 1;
            *count
        };

        debug!(partition, offset, attempt, "Processing message");

        let result = handler.handle(payload).await;
        if let Err(ref e) = result {
            error!(partition, offset, attempt, error = %e, "Message handling failed");
        }

        match settle(&result, attempt, self.config.max_deliveries) {
            Disposition::Commit => {
                attempts.remove(&(partition, offset));
                self.commit(partition, offset)
            }
            Disposition::DeadLetter => {
                if let Err(e) = self.dead_letter(msg, payload).await {
                    error!(error = %e, "Dead-letter publish failed, redelivering");
                    return self.redeliver(partition, offset).await;
                }
                attempts.remove(&(partition, offset));
                self.commit(partition, offset)
            }
            Disposition::Retry => self.redeliver(partition, offset).await,
        }
    }

    async fn dead_letter(&self, msg: &BorrowedMessage<'_>, payload: &[u8]) -> Result<(), PipelineError> {
        match self.config.dead_letter_topic {
            Some(ref topic) => {
                let key = msg
                    .key()
                    .map(|k| String::from_utf8_lossy(k).into_owned())
                    .unwrap_or_default();
                self.dead_letters.publish(topic, &key, payload).await?;
                warn!(topic = %topic, offset = msg.offset(), "Message dead-lettered");
            }
            None => {
                warn!(offset = msg.offset(), "No dead-letter topic configured, dropping message");
            }
        }
        Ok(())
    }

    /// Rewind the partition so the failed message is delivered again.
    async fn redeliver(&self, partition: i32, offset: i64) -> Result<(), PipelineError> {
        tokio::time::sleep(self.config.retry_delay).await;

        self.consumer
            .seek(
                &self.config.topic,
                partition,
                Offset::Offset(offset),
                Duration::from_secs(5),
            )
            .map_err(|e| PipelineError::kafka(e.to_string()))
    }

    fn commit(&self, partition: i32, offset: i64) -> Result<(), PipelineError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&self.config.topic, partition, Offset::Offset(offset + 1))
            .map_err(|e| PipelineError::kafka(e.to_string()))?;

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| PipelineError::kafka(e.to_string()))
    }
}
