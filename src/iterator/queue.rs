//! Iterator over deliveries from a broker channel.

use super::{IteratorError, IteratorResult, MessageIterator};
use crate::message::domain::Message;
use crate::queue::QueueHandle;
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Receives one envelope per call and decodes it into a message.
///
/// The envelope stays in the message body so the backend can acknowledge
/// it after handling.
pub struct QueueMessageIterator<C>
where
    C: Clock + Send + Sync,
{
    queue: Arc<dyn QueueHandle>,
    clock: Arc<C>,
    receive_timeout: Duration,
}

impl<C> QueueMessageIterator<C>
where
    C: Clock + Send + Sync,
{
    /// Default time to wait for a delivery.
    pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

    /// Creates an iterator over `queue`.
    #[must_use]
    pub fn new(queue: Arc<dyn QueueHandle>, clock: Arc<C>, receive_timeout: Duration) -> Self {
        Self {
            queue,
            clock,
            receive_timeout,
        }
    }
}

#[async_trait]
impl<C> MessageIterator for QueueMessageIterator<C>
where
    C: Clock + Send + Sync,
{
    async fn next_message(&mut self) -> IteratorResult<Option<Message>> {
        let Some(envelope) = self.queue.receive(self.receive_timeout).await? else {
            return Ok(None);
        };
        match envelope.decode(self.clock.utc()) {
            Ok(message) => Ok(Some(message)),
            Err(source) => {
                warn!(
                    delivery_id = %envelope.delivery_id(),
                    error = %source,
                    "dropping malformed delivery"
                );
                self.queue.acknowledge(&envelope).await?;
                Err(IteratorError::Malformed {
                    delivery_id: envelope.delivery_id(),
                    source,
                })
            }
        }
    }

    fn is_buffer_empty(&self) -> bool {
        true
    }
}
