//! Store port for message persistence and backlog queries.

use crate::message::domain::{
    AttemptWindow, Message, MessageId, MessagePage, MessageSort, MessageState, PageRequest,
    PagerCriteria, StateCounts, TypeFilter,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for message store operations.
pub type MessageStoreResult<T> = Result<T, MessageStoreError>;

/// Durable backlog of messages.
///
/// Implementations must tolerate concurrent callers from independent worker
/// processes. Only [`MessageStore::claim`] is atomic; every other write is
/// last-writer-wins at the message level.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Inserts the message or overwrites the stored copy with the same ID.
    ///
    /// # Errors
    ///
    /// Returns [`MessageStoreError::Persistence`] when the backlog is
    /// unavailable.
    async fn save(&self, message: &Message) -> MessageStoreResult<()>;

    /// Finds a message by identifier.
    ///
    /// Returns `None` when the message does not exist.
    async fn find_by_id(&self, id: MessageId) -> MessageStoreResult<Option<Message>>;

    /// Returns up to `batch_size` messages in `state`, oldest first,
    /// restricted to the types accepted by `filter`.
    async fn find_by_types(
        &self,
        filter: &TypeFilter,
        state: MessageState,
        batch_size: usize,
    ) -> MessageStoreResult<Vec<Message>>;

    /// Like [`MessageStore::find_by_types`], further restricted to messages
    /// inside the retry `window`.
    async fn find_by_attempts(
        &self,
        filter: &TypeFilter,
        state: MessageState,
        batch_size: usize,
        window: &AttemptWindow,
    ) -> MessageStoreResult<Vec<Message>>;

    /// Counts messages per state.
    async fn count_states(&self) -> MessageStoreResult<StateCounts>;

    /// Deletes every `Done` message completed strictly before `completed_before`.
    ///
    /// Returns the number of deleted messages.
    async fn cleanup(&self, completed_before: DateTime<Utc>) -> MessageStoreResult<u64>;

    /// Returns one page of messages matching `criteria`, ordered by `sort`.
    async fn get_pager(
        &self,
        criteria: &PagerCriteria,
        page: PageRequest,
        sort: &MessageSort,
    ) -> MessageStoreResult<MessagePage>;

    /// Atomically moves a stored `Open` message to `InProgress`.
    ///
    /// Returns `false` when the stored message is no longer `Open`, meaning
    /// another worker claimed it first.
    async fn claim(&self, id: MessageId, claimed_at: DateTime<Utc>) -> MessageStoreResult<bool>;
}

/// Errors returned by message store implementations.
#[derive(Debug, Clone, Error)]
pub enum MessageStoreError {
    /// The message was not found.
    #[error("message not found: {0}")]
    NotFound(MessageId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl MessageStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
