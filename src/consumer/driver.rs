//! The long-running consumer loop.

use super::listener::{IterateEvent, IterationListener};
use super::memory::{MemoryProbe, ProcessMemoryProbe, memory_delta};
use super::report::{HandledReport, LoopReport, ProgressSink, TracingProgress};
use crate::backend::{Backend, BackendError};
use crate::dispatch::HandlerRegistry;
use crate::iterator::{IteratorError, MessageIterator};
use crate::message::domain::Message;
use mockable::Clock;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Errors that stop a consumer loop run.
///
/// Failures while handling a single message are reported and never end up
/// here.
#[derive(Debug, Clone, Error)]
pub enum ConsumerLoopError {
    /// The requested type has no registered consumer.
    #[error("the type `{message_type}` does not exist, available types: {}", .available.join(", "))]
    UnknownType {
        /// The requested type.
        message_type: String,
        /// Registered types.
        available: Vec<String>,
    },

    /// A type was requested but the backend cannot route by type.
    #[error("unable to use the provided type {message_type} with backend {backend}, which does not route by type")]
    NotDispatcher {
        /// The requested type.
        message_type: String,
        /// Name of the configured backend.
        backend: String,
    },

    /// Resolving, initializing, or iterating the backend failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Pulling the next message failed.
    #[error(transparent)]
    Iterator(#[from] IteratorError),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The configured iteration cap was reached.
    CapReached {
        /// Messages pulled in this run.
        processed: u64,
    },
    /// A finite iterator ran out of messages.
    Exhausted {
        /// Messages pulled in this run.
        processed: u64,
    },
}

impl LoopOutcome {
    /// Returns the number of messages pulled.
    #[must_use]
    pub const fn processed(self) -> u64 {
        match self {
            Self::CapReached { processed } | Self::Exhausted { processed } => processed,
        }
    }
}

/// Options for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerLoopSettings {
    iteration_cap: Option<u64>,
    message_type: Option<String>,
    show_details: bool,
}

impl ConsumerLoopSettings {
    /// Creates settings for an uncapped run over the default backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops after `cap` messages. Zero means uncapped.
    #[must_use]
    pub const fn with_iteration_cap(mut self, cap: u64) -> Self {
        self.iteration_cap = if cap == 0 { None } else { Some(cap) };
        self
    }

    /// Selects the backend dedicated to `message_type`.
    #[must_use]
    pub fn with_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = Some(message_type.into());
        self
    }

    /// Includes consumer summaries in progress reports.
    #[must_use]
    pub const fn with_details(mut self, show_details: bool) -> Self {
        self.show_details = show_details;
        self
    }

    /// Returns the iteration cap.
    #[must_use]
    pub const fn iteration_cap(&self) -> Option<u64> {
        self.iteration_cap
    }

    /// Returns the type selector.
    #[must_use]
    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }
}

/// Pulls messages from a backend's iterator and handles them one at a time.
pub struct ConsumerLoop<C>
where
    C: Clock + Send + Sync,
{
    backend: Arc<dyn Backend>,
    registry: Arc<HandlerRegistry>,
    clock: Arc<C>,
    settings: ConsumerLoopSettings,
    listeners: Vec<Arc<dyn IterationListener>>,
    progress: Arc<dyn ProgressSink>,
    memory: Arc<dyn MemoryProbe>,
}

impl<C> ConsumerLoop<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a loop reporting through `tracing` and sampling process memory.
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        registry: Arc<HandlerRegistry>,
        clock: Arc<C>,
        settings: ConsumerLoopSettings,
    ) -> Self {
        Self {
            backend,
            registry,
            clock,
            settings,
            listeners: Vec::new(),
            progress: Arc::new(TracingProgress),
            memory: Arc::new(ProcessMemoryProbe::new()),
        }
    }

    /// Adds an iteration listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn IterationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Replaces the progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Replaces the memory probe.
    #[must_use]
    pub fn with_memory_probe(mut self, memory: Arc<dyn MemoryProbe>) -> Self {
        self.memory = memory;
        self
    }

    /// Resolves the backend this run pulls from.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerLoopError::UnknownType`] when the type selector has
    /// no consumer, [`ConsumerLoopError::NotDispatcher`] when a type is given
    /// to a backend that cannot route, and [`ConsumerLoopError::Backend`]
    /// when the dispatcher has no matching backend.
    pub fn resolve_backend(&self) -> Result<Arc<dyn Backend>, ConsumerLoopError> {
        let requested = self.settings.message_type();
        if let Some(message_type) = requested
            && !self.registry.contains(message_type)
        {
            return Err(ConsumerLoopError::UnknownType {
                message_type: message_type.to_owned(),
                available: self.registry.types().map(str::to_owned).collect(),
            });
        }

        match (self.backend.as_dispatcher(), requested) {
            (Some(dispatcher), _) => Ok(dispatcher.backend_for(requested)?),
            (None, Some(message_type)) => Err(ConsumerLoopError::NotDispatcher {
                message_type: message_type.to_owned(),
                backend: self.backend.name().to_owned(),
            }),
            (None, None) => Ok(Arc::clone(&self.backend)),
        }
    }

    /// Runs until the iteration cap is reached or a finite iterator ends.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerLoopError`] for startup failures and for iterator
    /// failures that concern the source itself.
    pub async fn run(&self) -> Result<LoopOutcome, ConsumerLoopError> {
        let backend = self.resolve_backend()?;
        backend.initialize().await?;
        self.progress.report(&LoopReport::Started {
            backend: backend.name().to_owned(),
            message_type: self.settings.message_type.clone(),
        });

        let mut iterator = backend.iterator()?;
        let memory_at_start = self.memory.resident_bytes();
        let mut processed: u64 = 0;

        loop {
            let next = match iterator.next_message().await {
                Ok(next) => next,
                Err(err) if err.is_per_message() => {
                    self.progress.report(&LoopReport::Malformed {
                        cause: err.to_string(),
                    });
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let Some(mut message) = next else {
                if iterator.is_finite() {
                    self.progress.report(&LoopReport::Exhausted { processed });
                    return Ok(LoopOutcome::Exhausted { processed });
                }
                continue;
            };

            processed = processed.saturating_add(1);
            if message.has_type() {
                self.handle_one(backend.as_ref(), &mut message, processed, memory_at_start)
                    .await;
                self.notify(iterator.as_ref(), backend.as_ref(), &message);
            } else {
                self.progress
                    .report(&LoopReport::Skipped { position: processed });
            }

            if self
                .settings
                .iteration_cap
                .is_some_and(|cap| processed >= cap)
            {
                self.progress.report(&LoopReport::CapReached { processed });
                return Ok(LoopOutcome::CapReached { processed });
            }
        }
    }

    async fn handle_one(
        &self,
        backend: &dyn Backend,
        message: &mut Message,
        position: u64,
        memory_at_start: Option<u64>,
    ) {
        let picked_up_at = self.clock.utc();
        let latency_secs = (picked_up_at - message.created_at()).num_seconds();
        let memory_before = self.memory.resident_bytes();
        let started = Instant::now();

        let outcome = backend.handle(message, &self.registry).await;

        let duration = started.elapsed();
        let memory_now = self.memory.resident_bytes();
        let report = match outcome {
            Ok(returned) => LoopReport::Handled(HandledReport {
                position,
                message_type: message.message_type().to_owned(),
                duration,
                latency_secs,
                memory_delta: memory_before
                    .zip(memory_now)
                    .map(|(before, after)| memory_delta(before, after)),
                memory_now,
                memory_at_start,
                details: self
                    .settings
                    .show_details
                    .then(|| returned.return_message().map(str::to_owned))
                    .flatten(),
            }),
            Err(BackendError::Handling(failure)) => LoopReport::Failed {
                position,
                message_type: message.message_type().to_owned(),
                cause: failure.source.to_string(),
            },
            Err(other) => LoopReport::Failed {
                position,
                message_type: message.message_type().to_owned(),
                cause: other.to_string(),
            },
        };
        self.progress.report(&report);
    }

    fn notify(&self, iterator: &dyn MessageIterator, backend: &dyn Backend, message: &Message) {
        let event = IterateEvent {
            iterator,
            backend,
            message,
        };
        for listener in &self.listeners {
            listener.on_iterate(&event);
        }
        debug!(message_id = %message.id(), listeners = self.listeners.len(), "iterate event emitted");
    }
}
