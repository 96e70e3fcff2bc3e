//! Iterator contract shared by every message source.

use crate::message::{domain::Message, ports::MessageStoreError};
use crate::queue::QueueError;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Result type for iterator operations.
pub type IteratorResult<T> = Result<T, IteratorError>;

/// Errors raised while pulling messages.
#[derive(Debug, Clone, Error)]
pub enum IteratorError {
    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] MessageStoreError),

    /// The broker failed.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// A delivery could not be decoded; it was acknowledged and dropped
    /// from the broker.
    #[error("malformed delivery {delivery_id}: {source}")]
    Malformed {
        /// Broker delivery identifier.
        delivery_id: Uuid,
        /// The decode failure.
        #[source]
        source: QueueError,
    },
}

impl IteratorError {
    /// Returns `true` when the error concerns one delivery rather than the
    /// source itself.
    #[must_use]
    pub const fn is_per_message(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Lazy, logically infinite sequence of ready messages.
///
/// Polling sources block with backoff instead of ending. `Ok(None)` means
/// nothing is available right now, except for finite iterators where it
/// means the snapshot is exhausted.
#[async_trait]
pub trait MessageIterator: Send {
    /// Returns the next ready message.
    async fn next_message(&mut self) -> IteratorResult<Option<Message>>;

    /// Returns `true` when no message is buffered locally.
    fn is_buffer_empty(&self) -> bool;

    /// Returns `true` when `Ok(None)` marks the end of the sequence.
    fn is_finite(&self) -> bool {
        false
    }
}
