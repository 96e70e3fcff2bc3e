//! When steps for message lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use eyre::{WrapErr, eyre};
use mockable::DefaultClock;
use postmaster::backend::{Backend, QueueBackend};
use postmaster::consumer::{ConsumerLoop, ConsumerLoopSettings, NoMemoryProbe};
use postmaster::queue::QueueHandle;
use rstest_bdd_macros::when;
use std::sync::Arc;
use std::time::Duration;

use crate::test_helpers::registry;

fn cancel(world: &mut LifecycleWorld, force: bool) -> Result<(), eyre::Report> {
    let mut message = world
        .message
        .take()
        .ok_or_else(|| eyre!("missing message in scenario world"))?;
    let accepted =
        run_async(world.service.cancel(&mut message, force)).wrap_err("cancel message")?;
    world.cancel_accepted = Some(accepted);
    world.message = Some(message);
    Ok(())
}

#[when("the message is cancelled")]
fn message_cancelled(world: &mut LifecycleWorld) -> Result<(), eyre::Report> {
    cancel(world, false)
}

#[when("the message is force cancelled")]
fn message_force_cancelled(world: &mut LifecycleWorld) -> Result<(), eyre::Report> {
    cancel(world, true)
}

#[when("the message is restarted")]
fn message_restarted(world: &mut LifecycleWorld) -> Result<(), eyre::Report> {
    let mut message = world
        .message
        .take()
        .ok_or_else(|| eyre!("missing message in scenario world"))?;
    world.replacement =
        run_async(world.service.restart_and_save(&mut message)).wrap_err("restart message")?;
    world.message = Some(message);
    Ok(())
}

#[when("the consumer runs with an iteration cap of {cap:u64}")]
fn consumer_runs(world: &mut LifecycleWorld, cap: u64) -> Result<(), eyre::Report> {
    let handle: Arc<dyn QueueHandle> = Arc::new(world.queue.clone());
    let backend: Arc<dyn Backend> = Arc::new(
        QueueBackend::new("scenario", handle, Arc::new(DefaultClock))
            .with_receive_timeout(Duration::from_millis(10)),
    );
    let consumer = ConsumerLoop::new(
        backend,
        registry(&world.handled),
        Arc::new(DefaultClock),
        ConsumerLoopSettings::new().with_iteration_cap(cap),
    )
    .with_memory_probe(Arc::new(NoMemoryProbe));
    world.outcome = Some(run_async(consumer.run()).wrap_err("run consumer loop")?);
    Ok(())
}
