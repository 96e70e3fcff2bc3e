//! Deferred handling through the postponed backend.

use crate::test_helpers::{handled_ids, handled_log, registry};
use eyre::Result;
use mockable::DefaultClock;
use postmaster::backend::{
    Backend, ImmediateBackend, InvocationContext, PostponedBackend,
};
use postmaster::config::PostmasterConfig;
use postmaster::message::domain::{Message, MessageBody, MessageState};
use rstest::rstest;
use std::sync::Arc;

#[rstest]
#[tokio::test]
async fn request_context_defers_until_flush() -> Result<()> {
    let handled = handled_log();
    let inner = ImmediateBackend::new(registry(&handled), Arc::new(DefaultClock));
    let backend = PostponedBackend::new(inner, false, InvocationContext::Request);

    let first = backend.create_and_publish("mailer", MessageBody::new()).await?;
    let failing = backend.create_and_publish("broken", MessageBody::new()).await?;
    let last = backend.create_and_publish("mailer", MessageBody::new()).await?;
    assert!(handled_ids(&handled).is_empty());
    assert_eq!(backend.buffered_len(), 3);

    let flushed = backend.flush().await;

    assert_eq!(backend.buffered_len(), 0);
    assert_eq!(handled_ids(&handled), [first.id(), last.id()]);
    let states: Vec<_> = flushed.iter().map(Message::state).collect();
    assert_eq!(
        states,
        [MessageState::Done, MessageState::Error, MessageState::Done]
    );
    assert_eq!(flushed.get(1).map(Message::id), Some(failing.id()));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn command_line_context_handles_inline() -> Result<()> {
    let handled = handled_log();
    let inner = ImmediateBackend::new(registry(&handled), Arc::new(DefaultClock));
    let backend = PostponedBackend::new(inner, false, InvocationContext::CommandLine);

    let message = backend.create_and_publish("mailer", MessageBody::new()).await?;

    assert_eq!(handled_ids(&handled), [message.id()]);
    assert_eq!(message.state(), MessageState::Done);
    assert_eq!(backend.buffered_len(), 0);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn configured_postpone_on_cli_buffers_command_line_publishes() -> Result<()> {
    let handled = handled_log();
    let config = PostmasterConfig::from_json(r#"{ "backend": { "postpone_on_cli": true } }"#)?;
    let backend = config.postponed_backend(
        registry(&handled),
        Arc::new(DefaultClock),
        InvocationContext::CommandLine,
    );

    let message = backend.create_and_publish("mailer", MessageBody::new()).await?;

    assert!(handled_ids(&handled).is_empty());
    assert_eq!(backend.buffered_len(), 1);
    let flushed = backend.flush().await;
    assert_eq!(handled_ids(&handled), [message.id()]);
    assert_eq!(flushed.len(), 1);
    Ok(())
}
