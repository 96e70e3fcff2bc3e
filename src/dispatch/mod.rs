//! Routing of messages to registered consumers.
//!
//! The registry is built once at startup and only read afterwards. Backends
//! call [`HandlerRegistry::dispatch`] to run a message through its
//! consumers.

mod consumer;
mod logger;
mod registry;

pub use consumer::{Consumer, ConsumerError, ConsumerEvent, ConsumerReturnInfo};
pub use logger::{LEVEL_KEY, LoggerConsumer};
pub use registry::{
    HandlerRegistry, HandlerRegistryBuilder, HandlingFailure, RegisteredHandler, RegistryError,
};

#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;
