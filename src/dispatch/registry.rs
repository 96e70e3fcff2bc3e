//! Static `type → handlers` table built once at startup.

use super::{Consumer, ConsumerError, ConsumerEvent, ConsumerReturnInfo};
use crate::message::domain::Message;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A consumer was registered without a message type.
    #[error("consumer {consumer} was registered without a message type")]
    EmptyMessageType {
        /// Name of the offending consumer.
        consumer: String,
    },
}

/// A consumer failed while handling a message.
///
/// Keeps the consumer's original error so callers can tell handler failures
/// apart from plumbing failures.
#[derive(Debug, Clone, Error)]
#[error("consumer {consumer} failed for message type {message_type}: {source}")]
pub struct HandlingFailure {
    /// Type of the message being handled.
    pub message_type: String,
    /// Name of the consumer that failed.
    pub consumer: String,
    /// The consumer's error.
    #[source]
    pub source: ConsumerError,
}

/// A consumer together with its priority.
#[derive(Clone)]
pub struct RegisteredHandler {
    consumer: Arc<dyn Consumer>,
    priority: i32,
}

impl RegisteredHandler {
    /// Returns the consumer.
    #[must_use]
    pub fn consumer(&self) -> &dyn Consumer {
        self.consumer.as_ref()
    }

    /// Returns the consumer name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.consumer.name()
    }

    /// Returns the registration priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }
}

impl fmt::Debug for RegisteredHandler {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RegisteredHandler")
            .field("consumer", &self.consumer.name())
            .field("priority", &self.priority)
            .finish()
    }
}

/// Read-only mapping from message type to handlers in invocation order.
///
/// Handlers run highest priority first; equal priorities keep registration
/// order.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    entries: BTreeMap<String, Vec<RegisteredHandler>>,
}

impl HandlerRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Returns the registered message types in lexical order.
    pub fn types(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the handlers for `message_type` in invocation order.
    #[must_use]
    pub fn handlers_for(&self, message_type: &str) -> &[RegisteredHandler] {
        self.entries
            .get(message_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns `true` when `message_type` has at least one handler.
    #[must_use]
    pub fn contains(&self, message_type: &str) -> bool {
        self.entries.contains_key(message_type)
    }

    /// Returns `true` when no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invokes every handler registered for the message type.
    ///
    /// The first failing handler stops the chain. The returned info is the
    /// last summary any handler produced; a type without handlers yields an
    /// empty info.
    ///
    /// # Errors
    ///
    /// Returns [`HandlingFailure`] wrapping the failing consumer's error.
    pub async fn dispatch(&self, message: &Message) -> Result<ConsumerReturnInfo, HandlingFailure> {
        let handlers = self.handlers_for(message.message_type());
        if handlers.is_empty() {
            warn!(
                message_id = %message.id(),
                message_type = message.message_type(),
                "no consumer registered for message type"
            );
        }

        let event = ConsumerEvent::new(message);
        let mut info = ConsumerReturnInfo::new();
        for handler in handlers {
            debug!(
                message_id = %message.id(),
                consumer = handler.name(),
                priority = handler.priority(),
                "invoking consumer"
            );
            let returned = handler
                .consumer
                .process(&event)
                .await
                .map_err(|source| HandlingFailure {
                    message_type: message.message_type().to_owned(),
                    consumer: handler.name().to_owned(),
                    source,
                })?;
            if returned.return_message().is_some() {
                info = returned;
            }
        }
        Ok(info)
    }
}

/// Builder collecting consumer registrations.
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    registrations: Vec<(String, RegisteredHandler)>,
}

impl HandlerRegistryBuilder {
    /// Registers `consumer` for `message_type` at `priority`.
    #[must_use]
    pub fn register(
        mut self,
        message_type: impl Into<String>,
        consumer: Arc<dyn Consumer>,
        priority: i32,
    ) -> Self {
        self.registrations.push((
            message_type.into().trim().to_owned(),
            RegisteredHandler { consumer, priority },
        ));
        self
    }

    /// Freezes the registrations into a registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyMessageType`] when a registration has a
    /// blank type.
    pub fn build(self) -> Result<HandlerRegistry, RegistryError> {
        let mut entries: BTreeMap<String, Vec<RegisteredHandler>> = BTreeMap::new();
        for (message_type, handler) in self.registrations {
            if message_type.is_empty() {
                return Err(RegistryError::EmptyMessageType {
                    consumer: handler.name().to_owned(),
                });
            }
            entries.entry(message_type).or_default().push(handler);
        }
        for handlers in entries.values_mut() {
            // Stable sort keeps registration order between equal priorities.
            handlers.sort_by(|a, b| b.priority.cmp(&a.priority));
        }
        Ok(HandlerRegistry { entries })
    }
}
