//! Shared fixtures for in-memory integration tests.

use mockable::DefaultClock;
use postmaster::backend::{Backend, QueueBackend, StoreBackend};
use postmaster::config::PostmasterConfig;
use postmaster::consumer::{
    ConsumerLoop, ConsumerLoopSettings, LoopReport, NoMemoryProbe, ProgressSink,
};
use postmaster::iterator::StoreIteratorSettings;
use postmaster::message::adapters::memory::InMemoryMessageStore;
use postmaster::queue::{InMemoryQueue, QueueHandle};
use rstest::fixture;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::test_helpers::{Handled, registry};

/// Provides a fresh in-memory store for each test.
#[fixture]
pub fn store() -> Arc<InMemoryMessageStore> {
    Arc::new(InMemoryMessageStore::new())
}

/// Provides a fresh in-memory broker for each test.
#[fixture]
pub fn queue() -> InMemoryQueue {
    InMemoryQueue::new()
}

/// Store iterator settings with a short pause so empty polls stay quick.
#[must_use]
pub fn fast_settings() -> StoreIteratorSettings {
    StoreIteratorSettings::new().with_pause(Duration::from_millis(5))
}

/// Builds a store backend over `store`.
#[must_use]
pub fn store_backend(
    store: &Arc<InMemoryMessageStore>,
    settings: StoreIteratorSettings,
) -> StoreBackend<InMemoryMessageStore, DefaultClock> {
    StoreBackend::new(Arc::clone(store), Arc::new(DefaultClock), settings)
}

/// Builds a queue backend over `queue` with a short receive timeout.
#[must_use]
pub fn queue_backend(name: &str, queue: &InMemoryQueue) -> QueueBackend<DefaultClock> {
    let handle: Arc<dyn QueueHandle> = Arc::new(queue.clone());
    let mut config = PostmasterConfig::default();
    config.queue.receive_timeout_ms = 10;
    config.queue_backend(name, handle, Arc::new(DefaultClock))
}

/// Progress sink collecting reports in memory.
#[derive(Default)]
pub struct CollectedProgress {
    reports: Mutex<Vec<LoopReport>>,
}

impl CollectedProgress {
    /// Returns the collected report lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.reports
            .lock()
            .map(|reports| reports.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }
}

impl ProgressSink for CollectedProgress {
    fn report(&self, report: &LoopReport) {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report.clone());
        }
    }
}

/// Builds a consumer loop over `backend` with the shared test registry.
#[must_use]
pub fn consumer_loop(
    backend: Arc<dyn Backend>,
    handled: &Handled,
    settings: ConsumerLoopSettings,
    progress: &Arc<CollectedProgress>,
) -> ConsumerLoop<DefaultClock> {
    let sink: Arc<dyn ProgressSink> = Arc::clone(progress) as Arc<dyn ProgressSink>;
    ConsumerLoop::new(backend, registry(handled), Arc::new(DefaultClock), settings)
        .with_progress(sink)
        .with_memory_probe(Arc::new(NoMemoryProbe))
}
