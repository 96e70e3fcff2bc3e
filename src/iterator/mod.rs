//! Message sources pulled by the consumer loop.
//!
//! Store polling and broker receive sit behind the same
//! [`MessageIterator`] contract. Backoff tuning belongs to each source;
//! ordering guarantees differ between them.

mod buffered;
mod port;
mod queue;
mod store;

pub use buffered::BufferedMessageIterator;
pub use port::{IteratorError, IteratorResult, MessageIterator};
pub use queue::QueueMessageIterator;
pub use store::{StoreIteratorSettings, StoreMessageIterator};
