//! Store backend tests: publish, poll, claim, and retry.

use super::helpers::{CollectedProgress, consumer_loop, fast_settings, store, store_backend};
use crate::test_helpers::{handled_ids, handled_log, registry};
use eyre::{Result, eyre};
use postmaster::backend::{Backend, BackendError};
use postmaster::consumer::{ConsumerLoopSettings, LoopOutcome};
use postmaster::message::adapters::memory::InMemoryMessageStore;
use postmaster::message::domain::{Message, MessageBody, MessageState, RetryPolicy};
use postmaster::message::ports::MessageStore;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

#[rstest]
#[tokio::test]
async fn published_messages_are_handled_oldest_first(
    store: Arc<InMemoryMessageStore>,
) -> Result<()> {
    let backend = Arc::new(store_backend(&store, fast_settings().with_batch_size(2)));
    let mut published = Vec::new();
    for _ in 0..3 {
        published.push(backend.create_and_publish("mailer", MessageBody::new()).await?);
    }
    let handled = handled_log();
    let progress = Arc::new(CollectedProgress::default());

    let outcome = consumer_loop(
        backend,
        &handled,
        ConsumerLoopSettings::new().with_iteration_cap(3),
        &progress,
    )
    .run()
    .await?;

    assert_eq!(outcome, LoopOutcome::CapReached { processed: 3 });
    let expected: Vec<_> = published.iter().map(Message::id).collect();
    assert_eq!(handled_ids(&handled), expected);
    for message in &published {
        let stored = store
            .find_by_id(message.id())
            .await?
            .ok_or_else(|| eyre!("message {} missing", message.id()))?;
        assert_eq!(stored.state(), MessageState::Done);
        assert!(stored.completed_at().is_some());
    }
    assert_eq!(
        progress.lines().last().map(String::as_str),
        Some("End of iteration cycle")
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn second_worker_loses_the_claim(store: Arc<InMemoryMessageStore>) -> Result<()> {
    let backend = store_backend(&store, fast_settings());
    let published = backend.create_and_publish("mailer", MessageBody::new()).await?;
    let handled = handled_log();
    let registry = registry(&handled);

    let mut first = backend
        .iterator()?
        .next_message()
        .await?
        .ok_or_else(|| eyre!("first worker saw nothing"))?;
    let mut second = backend
        .iterator()?
        .next_message()
        .await?
        .ok_or_else(|| eyre!("second worker saw nothing"))?;

    backend.handle(&mut first, &registry).await?;
    let lost = backend.handle(&mut second, &registry).await;

    assert!(matches!(lost, Err(BackendError::AlreadyClaimed(id)) if id == published.id()));
    assert_eq!(handled_ids(&handled), [published.id()]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn failed_message_is_restarted_until_the_cap(
    store: Arc<InMemoryMessageStore>,
) -> Result<()> {
    let settings =
        fast_settings().with_retry(RetryPolicy::new(Some(2), Duration::ZERO));
    let backend = Arc::new(store_backend(&store, settings));
    let original = backend.create_and_publish("broken", MessageBody::new()).await?;
    let handled = handled_log();
    let progress = Arc::new(CollectedProgress::default());

    let outcome = consumer_loop(
        Arc::clone(&backend) as Arc<dyn Backend>,
        &handled,
        ConsumerLoopSettings::new().with_iteration_cap(3),
        &progress,
    )
    .run()
    .await?;

    assert_eq!(outcome.processed(), 3);
    let counts = store.count_states().await?;
    assert_eq!(counts.get(MessageState::Cancelled), 2);
    assert_eq!(counts.get(MessageState::Error), 1);
    let stored = store
        .find_by_id(original.id())
        .await?
        .ok_or_else(|| eyre!("original missing"))?;
    assert!(stored.is_cancelled());
    let failures = progress
        .lines()
        .iter()
        .filter(|line| line.contains("KO! - message rejected: mailbox full"))
        .count();
    assert_eq!(failures, 3);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn cleanup_keeps_recent_done_messages(store: Arc<InMemoryMessageStore>) -> Result<()> {
    let backend = store_backend(&store, fast_settings()).with_max_age(Duration::from_secs(3600));
    let handled = handled_log();
    let mut message = backend.create_and_publish("mailer", MessageBody::new()).await?;
    backend.handle(&mut message, &registry(&handled)).await?;

    backend.cleanup().await?;

    assert_eq!(store.len()?, 1);
    Ok(())
}
