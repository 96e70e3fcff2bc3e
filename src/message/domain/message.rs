//! Message aggregate root and its lifecycle transitions.

use super::{MessageBody, MessageDomainError, MessageId, MessageState};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A unit of work routed to the handlers registered for its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    message_type: String,
    body: MessageBody,
    state: MessageState,
    restart_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted or decoded message.
///
/// No validation happens on this path: a malformed message (for instance an
/// empty type coming off a broker) must still reach the consumer loop so it
/// can be reported and skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedMessageData {
    /// Persisted message identifier.
    pub id: MessageId,
    /// Routing discriminator.
    pub message_type: String,
    /// Producer payload.
    pub body: MessageBody,
    /// Persisted lifecycle state.
    pub state: MessageState,
    /// Number of restarts that led to this message.
    pub restart_count: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest state change timestamp.
    pub updated_at: DateTime<Utc>,
    /// Timestamp at which a worker claimed the message.
    pub started_at: Option<DateTime<Utc>>,
    /// Timestamp at which handling finished.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Creates a new `Open` message.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::EmptyMessageType`] when the type is blank.
    pub fn new(
        message_type: impl Into<String>,
        body: MessageBody,
        clock: &impl Clock,
    ) -> Result<Self, MessageDomainError> {
        let raw_type = message_type.into();
        let trimmed = raw_type.trim();
        if trimmed.is_empty() {
            return Err(MessageDomainError::EmptyMessageType);
        }

        let timestamp = clock.utc();
        Ok(Self {
            id: MessageId::new(),
            message_type: trimmed.to_owned(),
            body,
            state: MessageState::Open,
            restart_count: 0,
            created_at: timestamp,
            updated_at: timestamp,
            started_at: None,
            completed_at: None,
        })
    }

    /// Reconstructs a message from persisted storage or a decoded envelope.
    #[must_use]
    pub fn from_persisted(data: PersistedMessageData) -> Self {
        Self {
            id: data.id,
            message_type: data.message_type,
            body: data.body,
            state: data.state,
            restart_count: data.restart_count,
            created_at: data.created_at,
            updated_at: data.updated_at,
            started_at: data.started_at,
            completed_at: data.completed_at,
        }
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the routing type.
    #[must_use]
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Returns `true` when the message carries a usable routing type.
    #[must_use]
    pub fn has_type(&self) -> bool {
        !self.message_type.trim().is_empty()
    }

    /// Returns the payload.
    #[must_use]
    pub const fn body(&self) -> &MessageBody {
        &self.body
    }

    /// Returns a mutable reference to the payload.
    pub fn body_mut(&mut self) -> &mut MessageBody {
        &mut self.body
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub const fn state(&self) -> MessageState {
        self.state
    }

    /// Returns how many restarts preceded this message.
    #[must_use]
    pub const fn restart_count(&self) -> u32 {
        self.restart_count
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest state change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the claim timestamp, if the message was ever claimed.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns the completion timestamp, if handling finished.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns `true` when the message is waiting for pickup.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == MessageState::Open
    }

    /// Returns `true` when a worker currently owns the message.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == MessageState::InProgress
    }

    /// Returns `true` when handling succeeded.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == MessageState::Done
    }

    /// Returns `true` when a handler failed.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.state == MessageState::Error
    }

    /// Returns `true` when the message was withdrawn.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state == MessageState::Cancelled
    }

    /// Marks the message as claimed by the current worker.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::InvalidStateTransition`] unless the
    /// message is open.
    pub fn mark_in_progress(&mut self, clock: &impl Clock) -> Result<(), MessageDomainError> {
        self.mark_in_progress_at(clock.utc())
    }

    /// Marks the message as claimed at an instant chosen by the caller.
    ///
    /// Stores use this to apply a claim with the timestamp they were given.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::InvalidStateTransition`] unless the
    /// message is open.
    pub fn mark_in_progress_at(
        &mut self,
        claimed_at: DateTime<Utc>,
    ) -> Result<(), MessageDomainError> {
        self.ensure_state(MessageState::Open, MessageState::InProgress)?;
        self.state = MessageState::InProgress;
        self.started_at = Some(claimed_at);
        self.updated_at = claimed_at;
        Ok(())
    }

    /// Marks a running message as successfully handled.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::InvalidStateTransition`] unless the
    /// message is in progress.
    pub fn mark_done(&mut self, clock: &impl Clock) -> Result<(), MessageDomainError> {
        self.ensure_state(MessageState::InProgress, MessageState::Done)?;
        self.finish(MessageState::Done, clock);
        Ok(())
    }

    /// Marks a running message as failed.
    ///
    /// # Errors
    ///
    /// Returns [`MessageDomainError::InvalidStateTransition`] unless the
    /// message is in progress.
    pub fn mark_error(&mut self, clock: &impl Clock) -> Result<(), MessageDomainError> {
        self.ensure_state(MessageState::InProgress, MessageState::Error)?;
        self.finish(MessageState::Error, clock);
        Ok(())
    }

    fn ensure_state(
        &self,
        expected: MessageState,
        to: MessageState,
    ) -> Result<(), MessageDomainError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(MessageDomainError::InvalidStateTransition {
                from: self.state,
                to,
            })
        }
    }

    /// Cancels the message.
    ///
    /// Without `force`, running and failed messages are left untouched.
    /// Returns `true` when the state changed to [`MessageState::Cancelled`].
    pub fn cancel(&mut self, force: bool, clock: &impl Clock) -> bool {
        if !force && (self.is_running() || self.is_error()) {
            return false;
        }
        self.finish(MessageState::Cancelled, clock);
        true
    }

    /// Restarts a failed message.
    ///
    /// The original is force-cancelled and kept as history; the returned
    /// message is a fresh `Open` value with a new identity, the same type and
    /// payload, and an incremented restart count. Messages that are not in
    /// [`MessageState::Error`] are left unmodified and yield `None`.
    pub fn restart(&mut self, clock: &impl Clock) -> Option<Self> {
        if !self.is_error() {
            return None;
        }
        self.cancel(true, clock);
        Some(Self::restarted_from(self, clock))
    }

    fn restarted_from(previous: &Self, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: MessageId::new(),
            message_type: previous.message_type.clone(),
            body: previous.body.clone(),
            state: MessageState::Open,
            restart_count: previous.restart_count.saturating_add(1),
            created_at: timestamp,
            updated_at: timestamp,
            started_at: None,
            completed_at: None,
        }
    }

    fn finish(&mut self, state: MessageState, clock: &impl Clock) {
        let now = clock.utc();
        self.state = state;
        self.completed_at = Some(now);
        self.updated_at = now;
    }
}
