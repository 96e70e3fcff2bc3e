//! Store-polling iterator with a local FIFO buffer and fixed backoff.

use super::{IteratorResult, MessageIterator};
use crate::message::{
    domain::{Message, MessageState, RetryPolicy, TypeFilter},
    ports::MessageStore,
};
use async_trait::async_trait;
use mockable::Clock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Tuning for [`StoreMessageIterator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreIteratorSettings {
    filter: TypeFilter,
    pause: Duration,
    batch_size: usize,
    retry: Option<RetryPolicy>,
}

impl StoreIteratorSettings {
    /// Default sleep between empty polls.
    pub const DEFAULT_PAUSE: Duration = Duration::from_millis(500);
    /// Default number of messages fetched per poll.
    pub const DEFAULT_BATCH_SIZE: usize = 10;

    /// Creates settings with default pause and batch size, no filter, and
    /// no retry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts polling to the types accepted by `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: TypeFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the sleep between empty polls.
    #[must_use]
    pub const fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Sets the poll batch size. Zero is raised to one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Enables automatic restart of failed messages.
    ///
    /// The restart sweep only runs when `retry` caps the attempts.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Returns the type filter.
    #[must_use]
    pub const fn filter(&self) -> &TypeFilter {
        &self.filter
    }

    /// Returns the pause between empty polls.
    #[must_use]
    pub const fn pause(&self) -> Duration {
        self.pause
    }

    /// Returns the batch size.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Returns the retry policy, if enabled.
    #[must_use]
    pub const fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }
}

impl Default for StoreIteratorSettings {
    fn default() -> Self {
        Self {
            filter: TypeFilter::all(),
            pause: Self::DEFAULT_PAUSE,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            retry: None,
        }
    }
}

/// Polls the store for `Open` messages, oldest first.
///
/// The buffer is only refilled once it is empty, so one query serves up to
/// `batch_size` messages. When retry is enabled each poll first restarts
/// failed messages that left their cooldown window.
pub struct StoreMessageIterator<S, C>
where
    S: MessageStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    settings: StoreIteratorSettings,
    buffer: VecDeque<Message>,
}

impl<S, C> StoreMessageIterator<S, C>
where
    S: MessageStore,
    C: Clock + Send + Sync,
{
    /// Creates an iterator over `store`.
    #[must_use]
    pub fn new(store: Arc<S>, clock: Arc<C>, settings: StoreIteratorSettings) -> Self {
        Self {
            store,
            clock,
            settings,
            buffer: VecDeque::new(),
        }
    }

    /// Returns the iterator settings.
    #[must_use]
    pub const fn settings(&self) -> &StoreIteratorSettings {
        &self.settings
    }

    async fn bufferize(&mut self) -> IteratorResult<()> {
        loop {
            let found = self.find_next_messages().await?;
            if !found.is_empty() {
                debug!(count = found.len(), "buffered messages from store");
                self.buffer.extend(found);
                return Ok(());
            }
            debug!(pause_ms = self.settings.pause.as_millis(), "store empty, backing off");
            tokio::time::sleep(self.settings.pause).await;
        }
    }

    async fn find_next_messages(&self) -> IteratorResult<Vec<Message>> {
        // Without an attempt cap a failing message would restart forever.
        if let Some(retry) = self.settings.retry.as_ref()
            && retry.max_attempts().is_some()
        {
            self.restart_eligible(retry).await?;
        }
        Ok(self
            .store
            .find_by_types(
                &self.settings.filter,
                MessageState::Open,
                self.settings.batch_size,
            )
            .await?)
    }

    async fn restart_eligible(&self, retry: &RetryPolicy) -> IteratorResult<()> {
        let window = retry.window(self.clock.utc());
        let failed = self
            .store
            .find_by_attempts(
                &self.settings.filter,
                MessageState::Error,
                self.settings.batch_size,
                &window,
            )
            .await?;
        for mut message in failed {
            let Some(replacement) = message.restart(&*self.clock) else {
                continue;
            };
            self.store.save(&message).await?;
            self.store.save(&replacement).await?;
            info!(
                message_id = %message.id(),
                replacement_id = %replacement.id(),
                restart_count = replacement.restart_count(),
                "restarted failed message"
            );
        }
        Ok(())
    }
}

#[async_trait]
impl<S, C> MessageIterator for StoreMessageIterator<S, C>
where
    S: MessageStore,
    C: Clock + Send + Sync,
{
    async fn next_message(&mut self) -> IteratorResult<Option<Message>> {
        if self.buffer.is_empty() {
            self.bufferize().await?;
        }
        Ok(self.buffer.pop_front())
    }

    fn is_buffer_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
