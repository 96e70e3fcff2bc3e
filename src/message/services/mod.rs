//! Application services for message lifecycle administration.

mod lifecycle;

pub use lifecycle::{MessageLifecycleError, MessageLifecycleResult, MessageLifecycleService};
