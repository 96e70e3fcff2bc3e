//! Given steps for message lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use eyre::WrapErr;
use mockable::DefaultClock;
use postmaster::backend::{Backend, QueueBackend};
use postmaster::message::domain::{Message, MessageBody};
use postmaster::message::ports::MessageStore;
use postmaster::queue::QueueHandle;
use rstest_bdd_macros::given;
use std::sync::Arc;

fn store_message(world: &mut LifecycleWorld, message: Message) -> Result<(), eyre::Report> {
    run_async(world.store.save(&message)).wrap_err("store scenario message")?;
    world.message = Some(message);
    Ok(())
}

#[given(r#"an open message of type "{message_type}""#)]
fn open_message(world: &mut LifecycleWorld, message_type: String) -> Result<(), eyre::Report> {
    let message = Message::new(message_type, MessageBody::new(), &DefaultClock)
        .wrap_err("create open message")?;
    store_message(world, message)
}

#[given(r#"a running message of type "{message_type}""#)]
fn running_message(world: &mut LifecycleWorld, message_type: String) -> Result<(), eyre::Report> {
    let mut message = Message::new(message_type, MessageBody::new(), &DefaultClock)
        .wrap_err("create running message")?;
    message
        .mark_in_progress(&DefaultClock)
        .wrap_err("start running message")?;
    store_message(world, message)
}

#[given(r#"a failed message of type "{message_type}""#)]
fn failed_message(world: &mut LifecycleWorld, message_type: String) -> Result<(), eyre::Report> {
    let mut message = Message::new(message_type, MessageBody::new(), &DefaultClock)
        .wrap_err("create failed message")?;
    message
        .mark_in_progress(&DefaultClock)
        .wrap_err("start failed message")?;
    message
        .mark_error(&DefaultClock)
        .wrap_err("fail message")?;
    store_message(world, message)
}

#[given(r#"{count:usize} queued messages of type "{message_type}""#)]
fn queued_messages(
    world: &mut LifecycleWorld,
    count: usize,
    message_type: String,
) -> Result<(), eyre::Report> {
    let handle: Arc<dyn QueueHandle> = Arc::new(world.queue.clone());
    let backend = QueueBackend::new("scenario", handle, Arc::new(DefaultClock));
    for _ in 0..count {
        let message = run_async(backend.create_and_publish(&message_type, MessageBody::new()))
            .wrap_err("publish queued message")?;
        world.published.push(message);
    }
    Ok(())
}
