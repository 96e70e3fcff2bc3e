//! The consumer loop and its instrumentation.
//!
//! A run resolves a backend, initializes it, then pulls and handles
//! messages one at a time. Per-message failures are reported and never stop
//! the loop; failures of the source do.

mod driver;
mod listener;
mod memory;
mod report;

pub use driver::{ConsumerLoop, ConsumerLoopError, ConsumerLoopSettings, LoopOutcome};
pub use listener::{BufferDrainListener, IterateEvent, IterationListener};
pub use memory::{
    MemoryProbe, NoMemoryProbe, ProcessMemoryProbe, format_memory, memory_delta,
};
pub use report::{HandledReport, LoopReport, ProgressSink, TracingProgress};
