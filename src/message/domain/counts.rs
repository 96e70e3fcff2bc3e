//! Per-state message counts.

use super::MessageState;
use std::collections::BTreeMap;

/// Number of messages in each state.
///
/// States with no messages report zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateCounts(BTreeMap<MessageState, u64>);

impl StateCounts {
    /// Creates counts with every state at zero.
    #[must_use]
    pub fn new() -> Self {
        Self(MessageState::ALL.iter().map(|state| (*state, 0)).collect())
    }

    /// Adds `count` messages to `state`.
    pub fn add(&mut self, state: MessageState, count: u64) {
        let entry = self.0.entry(state).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Returns the count for `state`.
    #[must_use]
    pub fn get(&self, state: MessageState) -> u64 {
        self.0.get(&state).copied().unwrap_or_default()
    }

    /// Returns the number of messages across all states.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Iterates over `(state, count)` pairs in lifecycle order.
    pub fn iter(&self) -> impl Iterator<Item = (MessageState, u64)> + '_ {
        self.0.iter().map(|(state, count)| (*state, *count))
    }
}

impl Default for StateCounts {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(MessageState, u64)> for StateCounts {
    fn from_iter<T: IntoIterator<Item = (MessageState, u64)>>(iter: T) -> Self {
        let mut counts = Self::new();
        for (state, count) in iter {
            counts.add(state, count);
        }
        counts
    }
}
