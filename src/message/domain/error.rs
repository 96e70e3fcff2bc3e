//! Error types for message domain validation and parsing.

use super::MessageState;
use thiserror::Error;

/// Errors returned while constructing or querying domain message values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessageDomainError {
    /// The message type is empty after trimming.
    #[error("message type must not be empty")]
    EmptyMessageType,

    /// The requested transition is not allowed from the current state.
    #[error("cannot move message from {from} to {to}")]
    InvalidStateTransition {
        /// State the message is in.
        from: MessageState,
        /// State that was requested.
        to: MessageState,
    },

    /// The message body is not a JSON object.
    #[error("message body must be a JSON object, got {0}")]
    InvalidBody(String),

    /// A pager sort requested a field that messages do not have.
    #[error("invalid sort field '{0}' for messages")]
    InvalidSortField(String),

    /// A pager sort requested an unknown direction.
    #[error("invalid sort direction '{0}', expected asc or desc")]
    InvalidSortDirection(String),

    /// A pager request asked for page zero or an empty page.
    #[error("invalid page request: page {page}, page size {page_size}")]
    InvalidPage {
        /// Requested one-based page number.
        page: u32,
        /// Requested page size.
        page_size: u32,
    },
}

/// Error returned while parsing message states from persistence or the wire.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown message state: {0}")]
pub struct ParseMessageStateError(pub String);
