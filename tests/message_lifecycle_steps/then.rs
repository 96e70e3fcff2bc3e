//! Then steps for message lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use crate::test_helpers::handled_ids;
use eyre::eyre;
use postmaster::consumer::LoopOutcome;
use postmaster::message::domain::{Message, MessageState};
use postmaster::message::ports::MessageStore;
use rstest_bdd_macros::then;

#[then("the cancellation is accepted")]
fn cancellation_accepted(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    match world.cancel_accepted {
        Some(true) => Ok(()),
        other => Err(eyre!("expected an accepted cancellation, got {other:?}")),
    }
}

#[then("the cancellation is refused")]
fn cancellation_refused(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    match world.cancel_accepted {
        Some(false) => Ok(()),
        other => Err(eyre!("expected a refused cancellation, got {other:?}")),
    }
}

#[then(r#"the stored message state is "{state}""#)]
fn stored_state_is(world: &LifecycleWorld, state: String) -> Result<(), eyre::Report> {
    let expected = MessageState::try_from(state.as_str())
        .map_err(|err| eyre!("invalid expected state in scenario: {err}"))?;
    let message = world
        .message
        .as_ref()
        .ok_or_else(|| eyre!("missing message in scenario world"))?;
    let stored = run_async(world.store.find_by_id(message.id()))
        .map_err(|err| eyre!("find_by_id failed: {err}"))?
        .ok_or_else(|| eyre!("message {} not stored", message.id()))?;
    if stored.state() != expected {
        return Err(eyre!(
            "expected state {}, found {}",
            expected.as_str(),
            stored.state().as_str()
        ));
    }
    Ok(())
}

#[then("a replacement with restart count {count:u32} is open")]
fn replacement_is_open(world: &LifecycleWorld, count: u32) -> Result<(), eyre::Report> {
    let replacement = world
        .replacement
        .as_ref()
        .ok_or_else(|| eyre!("no replacement was produced"))?;
    let stored = run_async(world.store.find_by_id(replacement.id()))
        .map_err(|err| eyre!("find_by_id failed: {err}"))?
        .ok_or_else(|| eyre!("replacement not stored"))?;
    if !stored.is_open() || stored.restart_count() != count {
        return Err(eyre!(
            "expected open replacement with restart count {count}, found {} with {}",
            stored.state().as_str(),
            stored.restart_count()
        ));
    }
    Ok(())
}

#[then("{count:usize} messages were handled in publish order")]
fn handled_in_order(world: &LifecycleWorld, count: usize) -> Result<(), eyre::Report> {
    let handled = handled_ids(&world.handled);
    let expected: Vec<_> = world.published.iter().map(Message::id).collect();
    if handled.len() != count || handled != expected {
        return Err(eyre!("expected {expected:?} handled in order, got {handled:?}"));
    }
    Ok(())
}

#[then("the loop stopped at the iteration cap")]
fn loop_stopped_at_cap(world: &LifecycleWorld) -> Result<(), eyre::Report> {
    match world.outcome {
        Some(LoopOutcome::CapReached { .. }) => Ok(()),
        other => Err(eyre!("expected the cap to stop the loop, got {other:?}")),
    }
}
