//! Post-iteration notifications for bookkeeping collaborators.

use crate::backend::Backend;
use crate::iterator::MessageIterator;
use crate::message::domain::Message;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Notification emitted after each handled message.
#[derive(Clone, Copy)]
pub struct IterateEvent<'a> {
    /// Iterator the message came from.
    pub iterator: &'a dyn MessageIterator,
    /// Backend that handled the message.
    pub backend: &'a dyn Backend,
    /// The message, in its final state.
    pub message: &'a Message,
}

/// Receives [`IterateEvent`]s from the consumer loop.
pub trait IterationListener: Send + Sync {
    /// Called once per handled message, success or failure.
    fn on_iterate(&self, event: &IterateEvent<'_>);
}

/// Counts how often the iterator's local buffer ran dry.
///
/// A drained buffer is the point where per-batch state (sessions, caches)
/// can be reset before the next poll.
#[derive(Debug, Default)]
pub struct BufferDrainListener {
    drains: AtomicU64,
}

impl BufferDrainListener {
    /// Creates a listener with a zero count.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            drains: AtomicU64::new(0),
        }
    }

    /// Returns how many drains were observed.
    #[must_use]
    pub fn drains(&self) -> u64 {
        self.drains.load(Ordering::Relaxed)
    }
}

impl IterationListener for BufferDrainListener {
    fn on_iterate(&self, event: &IterateEvent<'_>) {
        if event.iterator.is_buffer_empty() {
            let drains = self.drains.fetch_add(1, Ordering::Relaxed).saturating_add(1);
            debug!(
                drains,
                backend = event.backend.name(),
                last_message_id = %event.message.id(),
                "iterator buffer drained"
            );
        }
    }
}
