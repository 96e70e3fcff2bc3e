//! Port contracts for message persistence.
//!
//! Ports define infrastructure-agnostic interfaces used by message services,
//! iterators, and backends.

pub mod store;

#[cfg(test)]
pub use store::MockMessageStore;
pub use store::{MessageStore, MessageStoreError, MessageStoreResult};
