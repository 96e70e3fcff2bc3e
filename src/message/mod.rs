//! Durable messages and their persistence.
//!
//! A message is a typed unit of work with a JSON payload. This module owns
//! the message state machine, the store contract used to find and claim
//! work, and the administrative lifecycle service.
//!
//! # Architecture
//!
//! - **Domain**: [`domain::Message`], [`domain::MessageState`], retry and pager types
//! - **Ports**: [`ports::MessageStore`]
//! - **Adapters**: [`adapters::memory::InMemoryMessageStore`], [`adapters::postgres::PostgresMessageStore`]
//! - **Services**: [`services::MessageLifecycleService`]
//!
//! # Example
//!
//! ```
//! use mockable::DefaultClock;
//! use postmaster::message::domain::{Message, MessageBody, MessageState};
//!
//! let clock = DefaultClock;
//! let mut message = Message::new("mailer", MessageBody::new(), &clock)
//!     .expect("valid message type");
//! message.mark_in_progress(&clock).expect("open messages start");
//! message.mark_error(&clock).expect("running messages fail");
//!
//! let retry = message.restart(&clock).expect("failed messages restart");
//! assert_eq!(message.state(), MessageState::Cancelled);
//! assert_eq!(retry.restart_count(), 1);
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
