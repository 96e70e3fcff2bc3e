//! In-memory broker adapter for tests and single-process deployments.

use super::{QueueEnvelope, QueueError, QueueHandle, QueueResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

/// FIFO broker channel held in process memory.
///
/// Received envelopes stay pending until acknowledged; [`Self::requeue_unacknowledged`]
/// simulates broker redelivery after a consumer crash.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    state: Arc<Mutex<InMemoryQueueState>>,
    arrivals: Arc<Notify>,
}

#[derive(Debug, Default)]
struct InMemoryQueueState {
    ready: VecDeque<QueueEnvelope>,
    pending: Vec<QueueEnvelope>,
    acknowledged: u64,
}

impl InMemoryQueue {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of envelopes waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Broker`] when the lock is poisoned.
    pub fn ready_len(&self) -> QueueResult<usize> {
        Ok(self.lock()?.ready.len())
    }

    /// Returns the number of delivered but unacknowledged envelopes.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Broker`] when the lock is poisoned.
    pub fn pending_len(&self) -> QueueResult<usize> {
        Ok(self.lock()?.pending.len())
    }

    /// Returns how many envelopes were acknowledged.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Broker`] when the lock is poisoned.
    pub fn acknowledged(&self) -> QueueResult<u64> {
        Ok(self.lock()?.acknowledged)
    }

    /// Moves every unacknowledged envelope back to the front of the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Broker`] when the lock is poisoned.
    pub fn requeue_unacknowledged(&self) -> QueueResult<usize> {
        let mut state = self.lock()?;
        let pending = std::mem::take(&mut state.pending);
        let count = pending.len();
        for envelope in pending.into_iter().rev() {
            state.ready.push_front(envelope);
        }
        drop(state);
        if count > 0 {
            self.arrivals.notify_one();
        }
        Ok(count)
    }

    fn lock(&self) -> QueueResult<MutexGuard<'_, InMemoryQueueState>> {
        self.state
            .lock()
            .map_err(|err| QueueError::broker(std::io::Error::other(err.to_string())))
    }

    fn pop_ready(&self) -> QueueResult<Option<QueueEnvelope>> {
        let mut state = self.lock()?;
        let Some(envelope) = state.ready.pop_front() else {
            return Ok(None);
        };
        state.pending.push(envelope.clone());
        Ok(Some(envelope))
    }
}

#[async_trait]
impl QueueHandle for InMemoryQueue {
    async fn publish(&self, envelope: QueueEnvelope) -> QueueResult<()> {
        self.lock()?.ready.push_back(envelope);
        self.arrivals.notify_one();
        Ok(())
    }

    async fn receive(&self, timeout: Duration) -> QueueResult<Option<QueueEnvelope>> {
        if let Some(envelope) = self.pop_ready()? {
            return Ok(Some(envelope));
        }
        if tokio::time::timeout(timeout, self.arrivals.notified())
            .await
            .is_err()
        {
            return Ok(None);
        }
        self.pop_ready()
    }

    async fn acknowledge(&self, envelope: &QueueEnvelope) -> QueueResult<()> {
        let mut state = self.lock()?;
        let delivery_id = envelope.delivery_id();
        let before = state.pending.len();
        state
            .pending
            .retain(|pending| pending.delivery_id() != delivery_id);
        if state.pending.len() < before {
            state.acknowledged = state.acknowledged.saturating_add(1);
        }
        Ok(())
    }
}
