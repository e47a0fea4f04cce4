//! Text extraction invoker trait definition.

use async_trait::async_trait;

use crate::errors::ExtractionError;
use crate::types::{ExtractionOutput, ExtractionRequest};

/// Invokes the external text extraction function and waits for its result.
///
/// A structured failure reported by the function is returned as
/// [`ExtractionError::Failed`], distinct from transport failures.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutput, ExtractionError>;
}
