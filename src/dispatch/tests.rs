//! Unit tests for the handler registry and built-in consumers.

use super::testing::{FailingConsumer, RecordingConsumer, call_log, recorded_names};
use super::{
    ConsumerError, ConsumerEvent, ConsumerReturnInfo, Consumer, HandlerRegistry, LoggerConsumer,
    RegistryError,
};
use crate::message::domain::{Message, MessageBody};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use std::sync::Arc;

#[fixture]
fn message() -> Message {
    Message::new("mailer", MessageBody::new(), &DefaultClock).expect("valid message")
}

#[rstest]
fn handlers_run_by_priority_then_registration_order() {
    let calls = call_log();
    let registry = HandlerRegistry::builder()
        .register("mailer", RecordingConsumer::new("low", &calls), 0)
        .register("mailer", RecordingConsumer::new("high", &calls), 10)
        .register("mailer", RecordingConsumer::new("low-second", &calls), 0)
        .build()
        .expect("valid registry");

    let names: Vec<&str> = registry
        .handlers_for("mailer")
        .iter()
        .map(|handler| handler.name())
        .collect();

    assert_eq!(names, ["high", "low", "low-second"]);
}

#[rstest]
fn types_are_listed_and_unknown_types_have_no_handlers() {
    let calls = call_log();
    let registry = HandlerRegistry::builder()
        .register("sms", RecordingConsumer::new("a", &calls), 0)
        .register("mailer", RecordingConsumer::new("b", &calls), 0)
        .build()
        .expect("valid registry");

    assert_eq!(registry.types().collect::<Vec<_>>(), ["mailer", "sms"]);
    assert!(registry.contains("sms"));
    assert!(registry.handlers_for("push").is_empty());
}

#[rstest]
fn blank_registration_type_is_rejected() {
    let calls = call_log();
    let result = HandlerRegistry::builder()
        .register("  ", RecordingConsumer::new("orphan", &calls), 0)
        .build();

    assert!(matches!(
        result,
        Err(RegistryError::EmptyMessageType { consumer }) if consumer == "orphan"
    ));
}

#[rstest]
#[tokio::test]
async fn dispatch_invokes_handlers_in_order_and_keeps_last_summary(message: Message) {
    let calls = call_log();
    let registry = HandlerRegistry::builder()
        .register("mailer", RecordingConsumer::replying("first", &calls, "sent"), 5)
        .register("mailer", RecordingConsumer::new("second", &calls), 1)
        .build()
        .expect("valid registry");

    let info = registry.dispatch(&message).await.expect("dispatch succeeds");

    assert_eq!(recorded_names(&calls), ["first", "second"]);
    assert_eq!(info.return_message(), Some("sent"));
}

#[rstest]
#[tokio::test]
async fn dispatch_stops_at_first_failure_and_keeps_cause(message: Message) {
    let calls = call_log();
    let registry = HandlerRegistry::builder()
        .register("mailer", FailingConsumer::new("bad address"), 5)
        .register("mailer", RecordingConsumer::new("after", &calls), 1)
        .build()
        .expect("valid registry");

    let failure = registry
        .dispatch(&message)
        .await
        .expect_err("dispatch fails");

    assert_eq!(failure.consumer, "failing");
    assert_eq!(failure.message_type, "mailer");
    assert!(matches!(
        failure.source,
        ConsumerError::Rejected { ref reason } if reason == "bad address"
    ));
    assert!(recorded_names(&calls).is_empty());
}

#[rstest]
#[tokio::test]
async fn dispatch_without_handlers_succeeds_empty(message: Message) {
    let registry = HandlerRegistry::default();

    let info = registry.dispatch(&message).await.expect("dispatch succeeds");

    assert_eq!(info, ConsumerReturnInfo::new());
}

#[rstest]
#[case(None, "logged at info")]
#[case(Some("ERROR"), "logged at error")]
#[case(Some("warning"), "logged at warn")]
#[case(Some("verbose"), "logged at info")]
#[tokio::test]
async fn logger_consumer_reports_applied_level(
    #[case] level: Option<&str>,
    #[case] expected: &str,
) {
    let mut body = MessageBody::new().with_value("text", "disk almost full");
    if let Some(value) = level {
        body.insert("level", value);
    }
    let message = Message::new("log", body, &DefaultClock).expect("valid message");

    let info = LoggerConsumer::new()
        .process(&ConsumerEvent::new(&message))
        .await
        .expect("logging succeeds");

    assert_eq!(info.return_message(), Some(expected));
}

#[rstest]
fn blank_return_message_is_dropped() {
    assert_eq!(ConsumerReturnInfo::with_message("   ").return_message(), None);
    let consumer: Arc<dyn Consumer> = Arc::new(LoggerConsumer::new());
    assert_eq!(consumer.name(), "logger");
}
