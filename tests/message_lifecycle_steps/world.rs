//! Shared world state for message lifecycle BDD scenarios.

use crate::test_helpers::{Handled, handled_log};
use mockable::DefaultClock;
use postmaster::consumer::LoopOutcome;
use postmaster::message::{
    adapters::memory::InMemoryMessageStore, domain::Message, services::MessageLifecycleService,
};
use postmaster::queue::InMemoryQueue;
use rstest::fixture;
use std::sync::Arc;

/// Service type used by the BDD world.
pub type TestLifecycleService = MessageLifecycleService<InMemoryMessageStore, DefaultClock>;

/// Scenario world for lifecycle behaviour tests.
pub struct LifecycleWorld {
    pub store: Arc<InMemoryMessageStore>,
    pub service: TestLifecycleService,
    pub queue: InMemoryQueue,
    pub handled: Handled,
    pub message: Option<Message>,
    pub replacement: Option<Message>,
    pub published: Vec<Message>,
    pub cancel_accepted: Option<bool>,
    pub outcome: Option<LoopOutcome>,
}

impl LifecycleWorld {
    /// Creates a world over empty in-memory adapters.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryMessageStore::new());
        let service = MessageLifecycleService::new(Arc::clone(&store), Arc::new(DefaultClock));
        Self {
            store,
            service,
            queue: InMemoryQueue::new(),
            handled: handled_log(),
            message: None,
            replacement: None,
            published: Vec::new(),
            cancel_accepted: None,
            outcome: None,
        }
    }
}

impl Default for LifecycleWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> LifecycleWorld {
    LifecycleWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
