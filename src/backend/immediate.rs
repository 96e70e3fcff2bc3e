//! Backend that handles messages inline when they are published.

use super::handling::{dispatch_message, new_message};
use super::{Backend, BackendHealth, BackendResult};
use crate::dispatch::{ConsumerReturnInfo, HandlerRegistry};
use crate::iterator::{BufferedMessageIterator, MessageIterator};
use crate::message::domain::{Message, MessageBody};
use async_trait::async_trait;
use mockable::Clock;
use std::sync::Arc;

/// Handles every published message synchronously in the caller's task.
///
/// Nothing is persisted, and its iterator is always empty.
pub struct ImmediateBackend<C>
where
    C: Clock + Send + Sync,
{
    registry: Arc<HandlerRegistry>,
    clock: Arc<C>,
}

impl<C> ImmediateBackend<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a backend publishing through `registry`.
    #[must_use]
    pub const fn new(registry: Arc<HandlerRegistry>, clock: Arc<C>) -> Self {
        Self { registry, clock }
    }

    /// Returns the registry used on publish.
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }
}

#[async_trait]
impl<C> Backend for ImmediateBackend<C>
where
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "immediate"
    }

    async fn publish(&self, message: &mut Message) -> BackendResult<()> {
        self.handle(message, &self.registry).await.map(|_| ())
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
        dispatch_message(message, registry, &*self.clock).await
    }

    fn iterator(&self) -> BackendResult<Box<dyn MessageIterator>> {
        Ok(Box::new(BufferedMessageIterator::default()))
    }

    fn status(&self) -> BackendHealth {
        BackendHealth::ok("Runtime backend", "Ok (Runtime)")
    }
}
