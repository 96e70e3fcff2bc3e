//! Backend contract and errors.

use super::{BackendHealth, QueueDispatcherBackend};
use crate::dispatch::{ConsumerReturnInfo, HandlerRegistry, HandlingFailure};
use crate::iterator::MessageIterator;
use crate::message::{
    domain::{Message, MessageBody, MessageDomainError, MessageId},
    ports::MessageStoreError,
};
use crate::queue::QueueError;
use async_trait::async_trait;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors raised by backends.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// A consumer failed; the message was marked `Error`.
    #[error(transparent)]
    Handling(#[from] HandlingFailure),

    /// No backend is registered for the requested type.
    #[error("no backend for message type `{message_type}`, available types: {}", .available.join(", "))]
    UnknownBackend {
        /// The requested type.
        message_type: String,
        /// Types with a dedicated backend.
        available: Vec<String>,
    },

    /// The dispatcher has no default backend to fall back on.
    #[error("no default backend configured, available types: {}", .available.join(", "))]
    NoDefaultBackend {
        /// Types with a dedicated backend.
        available: Vec<String>,
    },

    /// Another worker claimed the message first.
    #[error("message {0} was already claimed")]
    AlreadyClaimed(MessageId),

    /// A new message could not be built.
    #[error(transparent)]
    Domain(#[from] MessageDomainError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] MessageStoreError),

    /// The broker failed.
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Strategy for turning published messages into handled work.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Returns a short name used in listings and logs.
    fn name(&self) -> &str;

    /// Prepares connections or subscriptions before the first pull.
    async fn initialize(&self) -> BackendResult<()> {
        Ok(())
    }

    /// Makes `message` available for handling.
    ///
    /// Backends that handle inline update `message` in place.
    async fn publish(&self, message: &mut Message) -> BackendResult<()>;

    /// Builds an `Open` message and publishes it.
    async fn create_and_publish(
        &self,
        message_type: &str,
        body: MessageBody,
    ) -> BackendResult<Message>;

    /// Runs `message` through the consumers in `registry`.
    ///
    /// On success the message ends `Done`; when a consumer fails it ends
    /// `Error` and [`BackendError::Handling`] is returned.
    async fn handle(
        &self,
        message: &mut Message,
        registry: &HandlerRegistry,
    ) -> BackendResult<ConsumerReturnInfo>;

    /// Returns a fresh iterator over this backend's pending messages.
    fn iterator(&self) -> BackendResult<Box<dyn MessageIterator>>;

    /// Reports health without blocking.
    fn status(&self) -> BackendHealth;

    /// Purges data the backend no longer needs.
    async fn cleanup(&self) -> BackendResult<()> {
        Ok(())
    }

    /// Returns the dispatcher view when this backend routes by type.
    fn as_dispatcher(&self) -> Option<&QueueDispatcherBackend> {
        None
    }
}
