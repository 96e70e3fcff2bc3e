//! Built-in consumer that writes message payloads to the log.

use super::{Consumer, ConsumerError, ConsumerEvent, ConsumerReturnInfo};
use async_trait::async_trait;
use tracing::{debug, error, info, warn};

/// Body key selecting the log level.
pub const LEVEL_KEY: &str = "level";

/// Logs each message body at the level named in its `level` key.
///
/// Unknown or missing levels log at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggerConsumer;

impl LoggerConsumer {
    /// Creates the consumer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Consumer for LoggerConsumer {
    fn name(&self) -> &str {
        "logger"
    }

    async fn process(
        &self,
        event: &ConsumerEvent<'_>,
    ) -> Result<ConsumerReturnInfo, ConsumerError> {
        let message = event.message();
        let payload = serde_json::to_string(message.body()).map_err(ConsumerError::failed)?;
        let level = message
            .body()
            .str_value(LEVEL_KEY)
            .map_or_else(|| "info".to_owned(), str::to_ascii_lowercase);

        let message_id = message.id();
        let message_type = message.message_type();
        let applied = match level.as_str() {
            "debug" => {
                debug!(%message_id, message_type, %payload, "message logged");
                "debug"
            }
            "warn" | "warning" => {
                warn!(%message_id, message_type, %payload, "message logged");
                "warn"
            }
            "error" => {
                error!(%message_id, message_type, %payload, "message logged");
                "error"
            }
            _ => {
                info!(%message_id, message_type, %payload, "message logged");
                "info"
            }
        };
        Ok(ConsumerReturnInfo::with_message(format!(
            "logged at {applied}"
        )))
    }
}
