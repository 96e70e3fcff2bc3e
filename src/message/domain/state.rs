//! Message lifecycle states.

use super::ParseMessageStateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery state of a message.
///
/// `Open` messages are eligible for pickup, `InProgress` messages are owned
/// by a worker, and the remaining states are terminal. `Error` is the only
/// terminal state a message can be restarted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// Waiting to be picked up by a worker.
    Open,
    /// Claimed by a worker and currently being handled.
    InProgress,
    /// Handled successfully.
    Done,
    /// A handler failed; eligible for restart.
    Error,
    /// Withdrawn from delivery, either explicitly or by a restart.
    Cancelled,
}

impl MessageState {
    /// Every state, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Open,
        Self::InProgress,
        Self::Done,
        Self::Error,
        Self::Cancelled,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` when no further handling will happen without a restart.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for MessageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for MessageState {
    type Error = ParseMessageStateError;

    fn try_from(value: &str) -> Result<Self, ParseMessageStateError> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseMessageStateError(value.to_owned())),
        }
    }
}
