//! Unit tests for backend variants.


use crate::dispatch::testing::{CallLog, FailingConsumer, RecordingConsumer};
use crate::dispatch::HandlerRegistry;
use std::sync::Arc;

/// Registry with a recording consumer for `mailer` and a failing one for
/// `broken`.
fn registry(calls: &CallLog) -> Arc<HandlerRegistry> {
    Arc::new(
        HandlerRegistry::builder()
            .register("mailer", RecordingConsumer::replying("recorder", calls, "sent"), 0)
            .register("broken", FailingConsumer::new("smtp down"), 0)
            .build()
            .expect("valid registry"),
    )
}
