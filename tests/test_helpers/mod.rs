//! Consumers shared by the integration and behaviour suites.

use async_trait::async_trait;
use postmaster::dispatch::{
    Consumer, ConsumerError, ConsumerEvent, ConsumerReturnInfo, HandlerRegistry,
};
use postmaster::message::domain::MessageId;
use std::sync::{Arc, Mutex};

/// Ordered record of handled message identifiers.
pub type Handled = Arc<Mutex<Vec<MessageId>>>;

/// Succeeds and records every message it receives.
pub struct RecordingConsumer {
    handled: Handled,
}

#[async_trait]
impl Consumer for RecordingConsumer {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn process(
        &self,
        event: &ConsumerEvent<'_>,
    ) -> Result<ConsumerReturnInfo, ConsumerError> {
        self.handled
            .lock()
            .map_err(|err| ConsumerError::failed(std::io::Error::other(err.to_string())))?
            .push(event.message().id());
        Ok(ConsumerReturnInfo::with_message("recorded"))
    }
}

/// Rejects every message.
pub struct RejectingConsumer;

#[async_trait]
impl Consumer for RejectingConsumer {
    fn name(&self) -> &str {
        "rejecter"
    }

    async fn process(
        &self,
        _event: &ConsumerEvent<'_>,
    ) -> Result<ConsumerReturnInfo, ConsumerError> {
        Err(ConsumerError::rejected("mailbox full"))
    }
}

/// Creates an empty handled log.
#[must_use]
pub fn handled_log() -> Handled {
    Arc::new(Mutex::new(Vec::new()))
}

/// Returns a snapshot of the handled log.
#[must_use]
pub fn handled_ids(handled: &Handled) -> Vec<MessageId> {
    handled.lock().map(|ids| ids.clone()).unwrap_or_default()
}

/// Builds a registry where `aType` and `mailer` record and `broken` rejects.
///
/// # Panics
///
/// Panics when the registry cannot be built.
#[must_use]
pub fn registry(handled: &Handled) -> Arc<HandlerRegistry> {
    let recorder = Arc::new(RecordingConsumer {
        handled: Arc::clone(handled),
    });
    Arc::new(
        HandlerRegistry::builder()
            .register("aType", Arc::clone(&recorder) as Arc<dyn Consumer>, 0)
            .register("mailer", recorder, 0)
            .register("broken", Arc::new(RejectingConsumer), 0)
            .build()
            .expect("registry builds"),
    )
}
