//! Handling steps shared by every backend.

use super::{BackendError, BackendResult};
use crate::dispatch::{ConsumerReturnInfo, HandlerRegistry};
use crate::message::domain::{Message, MessageBody};
use mockable::Clock;
use tracing::{info, warn};

/// Dispatches `message` and records the outcome on it.
///
/// Only open or running messages are dispatched; anything else is refused
/// before a consumer runs.
pub(crate) async fn dispatch_message<C>(
    message: &mut Message,
    registry: &HandlerRegistry,
    clock: &C,
) -> BackendResult<ConsumerReturnInfo>
where
    C: Clock + Send + Sync,
{
    if !message.is_running() {
        message.mark_in_progress(clock)?;
    }
    match registry.dispatch(message).await {
        Ok(returned) => {
            message.mark_done(clock)?;
            info!(
                message_id = %message.id(),
                message_type = message.message_type(),
                "message handled"
            );
            Ok(returned)
        }
        Err(failure) => {
            message.mark_error(clock)?;
            warn!(
                message_id = %message.id(),
                message_type = message.message_type(),
                consumer = %failure.consumer,
                error = %failure.source,
                "message handling failed"
            );
            Err(BackendError::Handling(failure))
        }
    }
}

/// Builds a new `Open` message for `create_and_publish`.
pub(crate) fn new_message<C>(
    message_type: &str,
    body: MessageBody,
    clock: &C,
) -> BackendResult<Message>
where
    C: Clock,
{
    Ok(Message::new(message_type, body, clock)?)
}
