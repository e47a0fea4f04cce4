//! Queue consumer for the long-running pipeline workers.
//!
//! Each worker subscribes to one topic and hands every payload to a
//! [`MessageHandler`]. Offsets are committed only once a message is settled.

mod handler;
mod kafka_consumer;

pub use handler::{settle, Disposition, MessageHandler};
pub use kafka_consumer::{ConsumerConfig, KafkaConsumer};
