//! Broker plumbing for queue-backed delivery.
//!
//! [`QueueHandle`] is the only contract the rest of the crate sees; the
//! envelope codec turns broker payloads into messages and back.

mod envelope;
mod memory;
mod port;

pub use envelope::{INTEROP_MESSAGE_KEY, QueueEnvelope};
pub use memory::InMemoryQueue;
#[cfg(test)]
pub use port::MockQueueHandle;
pub use port::{QueueError, QueueHandle, QueueResult};
