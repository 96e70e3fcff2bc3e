//! Domain model for dispatched messages.
//!
//! A message is created `Open` by a producer, claimed by a worker
//! (`InProgress`) and finishes `Done`, `Error`, or `Cancelled`. Restarting a
//! failed message never mutates history: it cancels the original and yields
//! a new message with an incremented restart count.

mod body;
mod counts;
mod error;
mod filter;
mod ids;
mod message;
mod pager;
mod retry;
mod state;

pub use body::MessageBody;
pub use counts::StateCounts;
pub use error::{MessageDomainError, ParseMessageStateError};
pub use filter::TypeFilter;
pub use ids::MessageId;
pub use message::{Message, PersistedMessageData};
pub use pager::{
    MessagePage, MessageSort, PageRequest, PagerCriteria, SortDirection, SortField,
};
pub use retry::{AttemptWindow, RetryPolicy};
pub use state::MessageState;
