//! Consumer contract invoked for each dispatched message.

use crate::message::domain::Message;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Event handed to consumers while a message is being handled.
#[derive(Debug, Clone, Copy)]
pub struct ConsumerEvent<'a> {
    message: &'a Message,
}

impl<'a> ConsumerEvent<'a> {
    /// Wraps the message being handled.
    #[must_use]
    pub const fn new(message: &'a Message) -> Self {
        Self { message }
    }

    /// Returns the message being handled.
    #[must_use]
    pub const fn message(&self) -> &'a Message {
        self.message
    }
}

/// Optional summary a consumer returns after processing a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerReturnInfo {
    return_message: Option<String>,
}

impl ConsumerReturnInfo {
    /// Creates an empty return info.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            return_message: None,
        }
    }

    /// Creates a return info carrying a summary line.
    #[must_use]
    pub fn with_message(message: impl Into<String>) -> Self {
        let normalized = message.into().trim().to_owned();
        Self {
            return_message: (!normalized.is_empty()).then_some(normalized),
        }
    }

    /// Returns the summary line, if any.
    #[must_use]
    pub fn return_message(&self) -> Option<&str> {
        self.return_message.as_deref()
    }
}

/// Errors raised by consumer implementations.
#[derive(Debug, Clone, Error)]
pub enum ConsumerError {
    /// The consumer refused the message content.
    #[error("message rejected: {reason}")]
    Rejected {
        /// Why the message was refused.
        reason: String,
    },

    /// The consumer failed while doing its work.
    #[error("consumer failed: {0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync>),
}

impl ConsumerError {
    /// Creates a rejection with a reason.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    /// Wraps a failure raised while processing.
    pub fn failed(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Failed(Arc::new(err))
    }
}

/// Unit of handling logic registered for one or more message types.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Returns a short name used in listings and logs.
    fn name(&self) -> &str;

    /// Processes one message.
    async fn process(
        &self,
        event: &ConsumerEvent<'_>,
    ) -> Result<ConsumerReturnInfo, ConsumerError>;
}
