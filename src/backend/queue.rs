//! Backend publishing to and consuming from one broker channel.

use super::handling::{dispatch_message, new_message};
use super::{Backend, BackendError, BackendHealth, BackendResult};
use crate::dispatch::{ConsumerReturnInfo, HandlerRegistry};
use crate::iterator::{MessageIterator, QueueMessageIterator};
use crate::message::domain::{Message, MessageBody};
use crate::queue::{QueueEnvelope, QueueHandle};
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Broker-backed backend.
///
/// Every received delivery is acknowledged after handling, whatever the
/// outcome. A failed message is republished as a restarted copy while
/// `restart_count + 1 < max_attempts`.
pub struct QueueBackend<C>
where
    C: Clock + Send + Sync,
{
    name: String,
    queue: Arc<dyn QueueHandle>,
    clock: Arc<C>,
    receive_timeout: Duration,
    max_attempts: Option<u32>,
}

impl<C> QueueBackend<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Creates a backend named `name` over `queue`.
    #[must_use]
    pub fn new(name: impl Into<String>, queue: Arc<dyn QueueHandle>, clock: Arc<C>) -> Self {
        Self {
            name: name.into(),
            queue,
            clock,
            receive_timeout: QueueMessageIterator::<C>::DEFAULT_RECEIVE_TIMEOUT,
            max_attempts: None,
        }
    }

    /// Sets how long the iterator waits for each delivery.
    #[must_use]
    pub const fn with_receive_timeout(mut self, receive_timeout: Duration) -> Self {
        self.receive_timeout = receive_timeout;
        self
    }

    /// Enables republishing failed messages up to `max_attempts` deliveries.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    fn should_retry(&self, message: &Message) -> bool {
        self.max_attempts
            .is_some_and(|max| message.restart_count().saturating_add(1) < max)
    }

    async fn settle(&self, message: &mut Message, failed: bool) -> BackendResult<()> {
        if failed
            && self.should_retry(message)
            && let Some(mut replacement) = message.restart(&*self.clock)
        {
            info!(
                message_id = %message.id(),
                replacement_id = %replacement.id(),
                restart_count = replacement.restart_count(),
                "republishing failed message"
            );
            self.publish(&mut replacement).await?;
        }
        if let Some(envelope) = QueueEnvelope::from_message(message) {
            self.queue.acknowledge(&envelope).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<C> Backend for QueueBackend<C>
where
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, message: &mut Message) -> BackendResult<()> {
        let envelope = QueueEnvelope::encode(message)?;
        self.queue.publish(envelope).await?;
        debug!(
            backend = %self.name,
            message_id = %message.id(),
            "message published to queue"
        );
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
        let outcome = dispatch_message(message, registry, &*self.clock).await;
        let failed = matches!(outcome, Err(BackendError::Handling(_)));
        self.settle(message, failed).await?;
        outcome
    }

    fn iterator(&self) -> BackendResult<Box<dyn MessageIterator>> {
        Ok(Box::new(QueueMessageIterator::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.clock),
            self.receive_timeout,
        )))
    }

    fn status(&self) -> BackendHealth {
        BackendHealth::ok("Queue backend", format!("Ok (Queue {})", self.name))
    }
}
