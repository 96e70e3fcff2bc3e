//! Wire envelope and JSON codec for queued messages.
//!
//! Payloads are JSON objects of the form
//! `{"id": "…", "type": "…", "state": "open", "restart_count": 0,
//! "created_at": "…", "body": {…}}`. Only `type` and `body` (or its alias
//! `value`) are expected from foreign producers; everything else falls back
//! to defaults.

use super::{QueueError, QueueResult};
use crate::message::domain::{
    Message, MessageBody, MessageId, MessageState, PersistedMessageData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Body key under which a decoded message keeps its source envelope.
pub const INTEROP_MESSAGE_KEY: &str = "interop_message";

/// Raw message as carried by a broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEnvelope {
    delivery_id: Uuid,
    payload: String,
}

impl QueueEnvelope {
    /// Wraps a payload with a fresh delivery identifier.
    #[must_use]
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            delivery_id: Uuid::new_v4(),
            payload: payload.into(),
        }
    }

    /// Returns the broker delivery identifier.
    #[must_use]
    pub const fn delivery_id(&self) -> Uuid {
        self.delivery_id
    }

    /// Returns the raw payload.
    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Encodes `message` for publishing.
    ///
    /// Any envelope kept in the body from an earlier delivery is left out.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Encode`] when serialization fails.
    pub fn encode(message: &Message) -> QueueResult<Self> {
        let mut body = message.body().as_map().clone();
        body.remove(INTEROP_MESSAGE_KEY);
        let wire = WireMessage {
            id: Some(message.id().into_inner()),
            message_type: Some(Value::String(message.message_type().to_owned())),
            state: Some(message.state().as_str().to_owned()),
            restart_count: Some(message.restart_count()),
            created_at: Some(message.created_at()),
            body: Some(Value::Object(body)),
            value: None,
        };
        let payload = serde_json::to_string(&wire)
            .map_err(|err| QueueError::Encode(std::sync::Arc::new(err)))?;
        Ok(Self::new(payload))
    }

    /// Decodes the payload into a message.
    ///
    /// A missing or non-string `type` decodes to an empty type, which the
    /// consumer loop skips. Unknown states decode as `open`. The envelope
    /// itself is stored in the body under [`INTEROP_MESSAGE_KEY`].
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Decode`] when the payload is not a JSON object
    /// or its body is not an object.
    pub fn decode(&self, now: DateTime<Utc>) -> QueueResult<Message> {
        let raw: Value = serde_json::from_str(&self.payload)
            .map_err(|err| QueueError::decode(err.to_string()))?;
        if !raw.is_object() {
            return Err(QueueError::decode("payload is not a JSON object"));
        }
        let wire: WireMessage =
            serde_json::from_value(raw).map_err(|err| QueueError::decode(err.to_string()))?;

        let raw_body = wire.body.or(wire.value).unwrap_or(Value::Null);
        let mut body = MessageBody::try_from(raw_body)
            .map_err(|err| QueueError::decode(err.to_string()))?;
        let envelope = serde_json::to_value(self)
            .map_err(|err| QueueError::decode(err.to_string()))?;
        body.insert(INTEROP_MESSAGE_KEY, envelope);

        let message_type = match wire.message_type {
            Some(Value::String(value)) => value.trim().to_owned(),
            _ => String::new(),
        };
        let state = wire
            .state
            .as_deref()
            .and_then(|value| MessageState::try_from(value).ok())
            .unwrap_or(MessageState::Open);
        let created_at = wire.created_at.unwrap_or(now);

        Ok(Message::from_persisted(PersistedMessageData {
            id: wire.id.map_or_else(MessageId::new, MessageId::from_uuid),
            message_type,
            body,
            state,
            restart_count: wire.restart_count.unwrap_or(0),
            created_at,
            updated_at: now,
            started_at: None,
            completed_at: None,
        }))
    }

    /// Returns the envelope a decoded message was built from, if any.
    #[must_use]
    pub fn from_message(message: &Message) -> Option<Self> {
        message
            .body()
            .value(INTEROP_MESSAGE_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<Uuid>,
    #[serde(rename = "type", default)]
    message_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    restart_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
}
