//! Broker round trips and per-type routing.

use super::helpers::{CollectedProgress, consumer_loop, queue, queue_backend};
use crate::test_helpers::{handled_ids, handled_log};
use eyre::Result;
use postmaster::backend::{Backend, QueueDispatcherBackend};
use postmaster::consumer::{ConsumerLoopSettings, LoopOutcome};
use postmaster::message::domain::{Message, MessageBody};
use postmaster::queue::{InMemoryQueue, QueueHandle};
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

#[rstest]
#[tokio::test]
async fn three_queued_messages_are_consumed_in_receipt_order(queue: InMemoryQueue) -> Result<()> {
    let backend: Arc<dyn Backend> = Arc::new(queue_backend("default", &queue));
    let mut published = Vec::new();
    for position in 0..3 {
        let body = MessageBody::new().with_value("position", position);
        published.push(backend.create_and_publish("aType", body).await?);
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
    assert_eq!(queue.acknowledged()?, 3);
    assert_eq!(queue.receive(Duration::from_millis(10)).await?, None);
    assert_eq!(handled_ids(&handled).len(), 3);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn type_selector_consumes_only_the_routed_queue() -> Result<()> {
    let mail_queue = InMemoryQueue::new();
    let other_queue = InMemoryQueue::new();
    let mail: Arc<dyn Backend> = Arc::new(queue_backend("mail", &mail_queue));
    let other: Arc<dyn Backend> = Arc::new(queue_backend("other", &other_queue));
    let dispatcher: Arc<dyn Backend> = Arc::new(
        QueueDispatcherBackend::new()
            .with_route("mailer", mail)
            .with_default(other),
    );
    let routed = dispatcher
        .create_and_publish("mailer", MessageBody::new())
        .await?;
    dispatcher
        .create_and_publish("aType", MessageBody::new())
        .await?;
    assert_eq!(mail_queue.ready_len()?, 1);
    assert_eq!(other_queue.ready_len()?, 1);
    let handled = handled_log();
    let progress = Arc::new(CollectedProgress::default());

    consumer_loop(
        dispatcher,
        &handled,
        ConsumerLoopSettings::new()
            .with_iteration_cap(1)
            .with_message_type("mailer"),
        &progress,
    )
    .run()
    .await?;

    assert_eq!(handled_ids(&handled), [routed.id()]);
    assert_eq!(other_queue.ready_len()?, 1);
    assert_eq!(
        progress.lines().first().map(String::as_str),
        Some("Starting the backend handler - mail (type: mailer)")
    );
    Ok(())
}

#[rstest]
#[tokio::test]
async fn unacknowledged_delivery_is_redelivered(queue: InMemoryQueue) -> Result<()> {
    let backend = queue_backend("default", &queue);
    let published = backend.create_and_publish("aType", MessageBody::new()).await?;
    let mut iterator = backend.iterator()?;
    let first = iterator.next_message().await?;
    assert!(first.is_some());

    // Simulates a worker crash between receive and acknowledge.
    assert_eq!(queue.requeue_unacknowledged()?, 1);

    let redelivered = iterator.next_message().await?;
    assert_eq!(redelivered.map(|message| message.id()), Some(published.id()));
    Ok(())
}
