//! Backend that buffers published messages until an explicit flush.

use super::handling::new_message;
use super::{Backend, BackendHealth, BackendResult, ImmediateBackend};
use crate::dispatch::{ConsumerReturnInfo, HandlerRegistry};
use crate::iterator::{BufferedMessageIterator, MessageIterator};
use crate::message::domain::{Message, MessageBody};
use async_trait::async_trait;
use mockable::Clock;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Kind of process publishing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvocationContext {
    /// One-shot command; no later flush will happen unless the caller
    /// triggers it.
    CommandLine,
    /// Long-lived unit of work (for example a request) with a known end.
    Request,
}

/// Defers handling to [`PostponedBackend::flush`].
///
/// In a command-line context publishing falls through to immediate handling
/// unless `postpone_on_cli` is set.
pub struct PostponedBackend<C>
where
    C: Clock + Send + Sync,
{
    inner: ImmediateBackend<C>,
    postpone_on_cli: bool,
    context: InvocationContext,
    buffer: Mutex<VecDeque<Message>>,
}

impl<C> PostponedBackend<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Wraps `inner`.
    #[must_use]
    pub const fn new(
        inner: ImmediateBackend<C>,
        postpone_on_cli: bool,
        context: InvocationContext,
    ) -> Self {
        Self {
            inner,
            postpone_on_cli,
            context,
            buffer: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns `true` when published messages are buffered rather than
    /// handled inline.
    #[must_use]
    pub fn postpones(&self) -> bool {
        self.postpone_on_cli || self.context != InvocationContext::CommandLine
    }

    /// Returns the number of buffered messages.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.lock_buffer().len()
    }

    /// Handles buffered messages in publish order until the buffer is empty.
    ///
    /// Failures are logged and do not stop the drain. Returns the handled
    /// messages with their final state.
    pub async fn flush(&self) -> Vec<Message> {
        let mut handled = Vec::new();
        while let Some(mut message) = self.pop_front() {
            if let Err(err) = self.inner.handle(&mut message, self.inner.registry()).await {
                warn!(message_id = %message.id(), error = %err, "postponed message failed");
            }
            handled.push(message);
        }
        debug!(count = handled.len(), "flushed postponed messages");
        handled
    }

    fn pop_front(&self) -> Option<Message> {
        self.lock_buffer().pop_front()
    }

    fn lock_buffer(&self) -> MutexGuard<'_, VecDeque<Message>> {
        // A poisoned buffer still holds valid messages.
        self.buffer
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl<C> Backend for PostponedBackend<C>
where
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "postponed"
    }

    async fn publish(&self, message: &mut Message) -> BackendResult<()> {
        if !self.postpones() {
            return self.inner.publish(message).await;
        }
        self.lock_buffer().push_back(message.clone());
        debug!(message_id = %message.id(), "message postponed");
        Ok(())
    }

    async fn create_and_publish(
        &self,
        message_type: &str,
        body: MessageBody,
    ) -> BackendResult<Message> {
        let mut message = new_message(message_type, body, self.inner.clock())?;
        self.publish(&mut message).await?;
        Ok(message)
    }

    async fn handle(
        &self,
        message: &mut Message,
        registry: &HandlerRegistry,
    ) -> BackendResult<ConsumerReturnInfo> {
        self.inner.handle(message, registry).await
    }

    fn iterator(&self) -> BackendResult<Box<dyn MessageIterator>> {
        let snapshot: Vec<Message> = self.lock_buffer().iter().cloned().collect();
        Ok(Box::new(BufferedMessageIterator::new(snapshot)))
    }

    fn status(&self) -> BackendHealth {
        BackendHealth::ok("Postpone runtime backend", "Ok (Postpone Runtime)")
    }
}
