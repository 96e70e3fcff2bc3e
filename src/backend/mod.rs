//! Strategies for turning published messages into handled work.
//!
//! - [`ImmediateBackend`] handles inline on publish.
//! - [`PostponedBackend`] buffers until [`PostponedBackend::flush`].
//! - [`StoreBackend`] persists and polls the message store.
//! - [`QueueBackend`] goes through a broker channel.
//! - [`QueueDispatcherBackend`] routes to one of the above by message type.

mod dispatcher;
mod handling;
mod health;
mod immediate;
mod port;
mod postponed;
mod queue;
mod store;

pub use dispatcher::QueueDispatcherBackend;
pub use health::{BackendHealth, HealthStatus};
pub use immediate::ImmediateBackend;
pub use port::{Backend, BackendError, BackendResult};
pub use postponed::{InvocationContext, PostponedBackend};
pub use queue::QueueBackend;
pub use store::StoreBackend;

#[cfg(test)]
mod tests;
