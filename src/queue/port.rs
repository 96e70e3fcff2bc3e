//! Broker port consumed by the queue iterator and queue backend.

use super::QueueEnvelope;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for broker operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Opaque handle on one broker channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueueHandle: Send + Sync {
    /// Publishes an envelope.
    async fn publish(&self, envelope: QueueEnvelope) -> QueueResult<()>;

    /// Waits up to `timeout` for the next envelope.
    ///
    /// `None` means nothing arrived in time; it does not mean the channel is
    /// closed.
    async fn receive(&self, timeout: Duration) -> QueueResult<Option<QueueEnvelope>>;

    /// Acknowledges a received envelope so the broker stops redelivering it.
    async fn acknowledge(&self, envelope: &QueueEnvelope) -> QueueResult<()>;
}

/// Errors raised by broker adapters and the wire codec.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// The broker could not be reached or refused the operation.
    #[error("broker error: {0}")]
    Broker(Arc<dyn std::error::Error + Send + Sync>),

    /// A payload could not be decoded into a message.
    #[error("failed to decode queue payload: {reason}")]
    Decode {
        /// What was wrong with the payload.
        reason: String,
    },

    /// A message could not be encoded for the wire.
    #[error("failed to encode message: {0}")]
    Encode(Arc<serde_json::Error>),
}

impl QueueError {
    /// Wraps a broker failure.
    pub fn broker(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Broker(Arc::new(err))
    }

    /// Creates a decode failure.
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }
}
