//! Consumers used by unit tests across the crate.

use super::{Consumer, ConsumerError, ConsumerEvent, ConsumerReturnInfo};
use crate::message::domain::MessageId;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Shared log of `(consumer, message)` invocations.
pub type CallLog = Arc<Mutex<Vec<(String, MessageId)>>>;

/// Records every message it sees and succeeds.
pub struct RecordingConsumer {
    name: String,
    calls: CallLog,
    reply: Option<String>,
}

impl RecordingConsumer {
    pub fn new(name: &str, calls: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            calls: Arc::clone(calls),
            reply: None,
        })
    }

    pub fn replying(name: &str, calls: &CallLog, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_owned(),
            calls: Arc::clone(calls),
            reply: Some(reply.to_owned()),
        })
    }
}

#[async_trait]
impl Consumer for RecordingConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        event: &ConsumerEvent<'_>,
    ) -> Result<ConsumerReturnInfo, ConsumerError> {
        self.calls
            .lock()
            .map_err(|err| ConsumerError::failed(std::io::Error::other(err.to_string())))?
            .push((self.name.clone(), event.message().id()));
        Ok(self
            .reply
            .as_deref()
            .map_or_else(ConsumerReturnInfo::new, ConsumerReturnInfo::with_message))
    }
}

/// Always rejects the message.
pub struct FailingConsumer {
    reason: String,
}

impl FailingConsumer {
    pub fn new(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            reason: reason.to_owned(),
        })
    }
}

#[async_trait]
impl Consumer for FailingConsumer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn process(
        &self,
        _event: &ConsumerEvent<'_>,
    ) -> Result<ConsumerReturnInfo, ConsumerError> {
        Err(ConsumerError::rejected(self.reason.clone()))
    }
}

/// Creates an empty call log.
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Returns the consumer names recorded so far.
pub fn recorded_names(calls: &CallLog) -> Vec<String> {
    calls
        .lock()
        .map(|guard| guard.iter().map(|(name, _)| name.clone()).collect())
        .unwrap_or_default()
}

/// Returns the message identifiers recorded so far.
pub fn recorded_ids(calls: &CallLog) -> Vec<MessageId> {
    calls
        .lock()
        .map(|guard| guard.iter().map(|(_, id)| *id).collect())
        .unwrap_or_default()
}
