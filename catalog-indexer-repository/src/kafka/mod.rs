//! Kafka implementation of the message publisher.

mod publisher;

pub use publisher::KafkaPublisher;
