//! Message handling contract and redelivery policy.

use async_trait::async_trait;

use crate::errors::PipelineError;

/// A pipeline stage that processes one raw queue payload.
///
/// Handlers must be idempotent: the same payload may be delivered more than
/// once.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, payload: &[u8]) -> Result<(), PipelineError>;
}

/// What to do with a message after its handler returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processed; commit the offset.
    Commit,
    /// Leave uncommitted and redeliver.
    Retry,
    /// Forward to the dead-letter topic, then commit.
    DeadLetter,
}

/// Decide the disposition of a message on its `attempt`-th delivery
/// (starting at 1).
pub fn settle(
    result: &Result<(), PipelineError>,
    attempt: u32,
    max_deliveries: u32,
) -> Disposition {
    match result {
        Ok(()) => Disposition::Commit,
        Err(e) if !e.is_retryable() => Disposition::DeadLetter,
        Err(_) if attempt >= max_deliveries => Disposition::DeadLetter,
        Err(_) => Disposition::Retry,
    }
}
