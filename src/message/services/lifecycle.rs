//! Service layer for message cancellation, restart, cleanup, and inspection.

use crate::message::{
    domain::{
        Message, MessageDomainError, MessagePage, MessageSort, PageRequest, PagerCriteria,
        StateCounts,
    },
    ports::{MessageStore, MessageStoreError},
};
use chrono::TimeDelta;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Service-level errors for message lifecycle operations.
#[derive(Debug, Error)]
pub enum MessageLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] MessageDomainError),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] MessageStoreError),
}

/// Result type for message lifecycle service operations.
pub type MessageLifecycleResult<T> = Result<T, MessageLifecycleError>;

/// Administrative operations over the message backlog.
#[derive(Clone)]
pub struct MessageLifecycleService<S, C>
where
    S: MessageStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> MessageLifecycleService<S, C>
where
    S: MessageStore,
    C: Clock + Send + Sync,
{
    /// Creates a new lifecycle service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Cancels `message` and persists it.
    ///
    /// Without `force`, running and failed messages are left untouched and
    /// nothing is written. Returns `true` when the message was cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`MessageLifecycleError::Store`] when persistence fails.
    pub async fn cancel(&self, message: &mut Message, force: bool) -> MessageLifecycleResult<bool> {
        if !message.cancel(force, &*self.clock) {
            debug!(message_id = %message.id(), state = %message.state(), "cancel refused");
            return Ok(false);
        }
        self.store.save(message).await?;
        info!(message_id = %message.id(), force, "message cancelled");
        Ok(true)
    }

    /// Restarts a failed message.
    ///
    /// The cancelled original is persisted; the returned replacement is not.
    /// Messages that are not in the error state yield `Ok(None)` and are left
    /// unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`MessageLifecycleError::Store`] when persisting the original
    /// fails.
    pub async fn restart(&self, message: &mut Message) -> MessageLifecycleResult<Option<Message>> {
        let Some(replacement) = message.restart(&*self.clock) else {
            return Ok(None);
        };
        self.store.save(message).await?;
        info!(
            message_id = %message.id(),
            replacement_id = %replacement.id(),
            restart_count = replacement.restart_count(),
            "message restarted"
        );
        Ok(Some(replacement))
    }

    /// Restarts a failed message and persists the replacement too.
    ///
    /// # Errors
    ///
    /// Returns [`MessageLifecycleError::Store`] when persistence fails.
    pub async fn restart_and_save(
        &self,
        message: &mut Message,
    ) -> MessageLifecycleResult<Option<Message>> {
        let replacement = self.restart(message).await?;
        if let Some(ref restarted) = replacement {
            self.store.save(restarted).await?;
        }
        Ok(replacement)
    }

    /// Deletes `Done` messages completed more than `max_age` ago.
    ///
    /// Returns the number of deleted messages.
    ///
    /// # Errors
    ///
    /// Returns [`MessageLifecycleError::Store`] when the delete fails.
    pub async fn cleanup(&self, max_age: Duration) -> MessageLifecycleResult<u64> {
        let age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        let now = self.clock.utc();
        let Some(completed_before) = now.checked_sub_signed(age) else {
            return Ok(0);
        };
        let removed = self.store.cleanup(completed_before).await?;
        info!(removed, %completed_before, "cleaned up completed messages");
        Ok(removed)
    }

    /// Returns per-state message counts.
    ///
    /// # Errors
    ///
    /// Returns [`MessageLifecycleError::Store`] when the query fails.
    pub async fn counts(&self) -> MessageLifecycleResult<StateCounts> {
        Ok(self.store.count_states().await?)
    }

    /// Returns one page of messages.
    ///
    /// `sort` is a `field → direction` mapping; it is validated before the
    /// store is queried and falls back to `type` ascending when empty.
    ///
    /// # Errors
    ///
    /// Returns [`MessageLifecycleError::Domain`] for an invalid sort or page
    /// and [`MessageLifecycleError::Store`] when the query fails.
    pub async fn pager<K, V>(
        &self,
        criteria: &PagerCriteria,
        page: u32,
        page_size: u32,
        sort: &[(K, V)],
    ) -> MessageLifecycleResult<MessagePage>
    where
        K: AsRef<str> + Sync,
        V: AsRef<str> + Sync,
    {
        let parsed_sort = MessageSort::parse(sort.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))?;
        let request = PageRequest::new(page, page_size)?;
        Ok(self.store.get_pager(criteria, request, &parsed_sort).await?)
    }
}
