//! Backend that persists messages and polls the store for work.

use super::handling::{dispatch_message, new_message};
use super::{Backend, BackendError, BackendHealth, BackendResult};
use crate::dispatch::{ConsumerReturnInfo, HandlerRegistry};
use crate::iterator::{MessageIterator, StoreIteratorSettings, StoreMessageIterator};
use crate::message::{
    domain::{Message, MessageBody, MessageDomainError, MessageState},
    ports::MessageStore,
};
use async_trait::async_trait;
use chrono::TimeDelta;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Database-polling backend.
///
/// Handling claims the message atomically first, so concurrent workers
/// never handle the same message twice.
pub struct StoreBackend<S, C>
where
    S: MessageStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    settings: StoreIteratorSettings,
    max_age: Duration,
}

impl<S, C> StoreBackend<S, C>
where
    S: MessageStore,
    C: Clock + Send + Sync,
{
    /// Default age after which `Done` messages are purged by
    /// [`Backend::cleanup`].
    pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    /// Creates a backend over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>, settings: StoreIteratorSettings) -> Self {
        Self {
            store,
            clock,
            settings,
            max_age: Self::DEFAULT_MAX_AGE,
        }
    }

    /// Sets the age after which `Done` messages are purged.
    #[must_use]
    pub const fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S, C> Backend for StoreBackend<S, C>
where
    S: MessageStore + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "store"
    }

    async fn publish(&self, message: &mut Message) -> BackendResult<()> {
        self.store.save(message).await?;
        debug!(message_id = %message.id(), message_type = message.message_type(), "message stored");
        Ok(())
    }

    async fn create_and_publish(
        &self,
        message_type: &str,
        body: MessageBody,
    ) -> BackendResult<Message> {
        let mut message = new_message(message_type, body, &*self.clock)?;
        self.publish(&mut message).await?;
        Ok(message)
    }

    async fn handle(
        &self,
        message: &mut Message,
        registry: &HandlerRegistry,
    ) -> BackendResult<ConsumerReturnInfo> {
        if message.state().is_terminal() {
            return Err(MessageDomainError::InvalidStateTransition {
                from: message.state(),
                to: MessageState::InProgress,
            }
            .into());
        }
        let claimed_at = self.clock.utc();
        if !self.store.claim(message.id(), claimed_at).await? {
            return Err(BackendError::AlreadyClaimed(message.id()));
        }
        if !message.is_running() {
            message.mark_in_progress_at(claimed_at)?;
        }

        let outcome = dispatch_message(message, registry, &*self.clock).await;
        self.store.save(message).await?;
        outcome
    }

    fn iterator(&self) -> BackendResult<Box<dyn MessageIterator>> {
        Ok(Box::new(StoreMessageIterator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.settings.clone(),
        )))
    }

    fn status(&self) -> BackendHealth {
        BackendHealth::ok("Store backend", "Ok (Store)")
    }

    async fn cleanup(&self) -> BackendResult<()> {
        let age = TimeDelta::from_std(self.max_age).unwrap_or(TimeDelta::MAX);
        let Some(completed_before) = self.clock.utc().checked_sub_signed(age) else {
            return Ok(());
        };
        let removed = self.store.cleanup(completed_before).await?;
        info!(removed, %completed_before, "purged completed messages");
        Ok(())
    }
}
