//! Retry eligibility for failed messages.

use super::Message;
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

/// Fixed-delay retry policy.
///
/// A failed message becomes eligible again only after `attempt_delay` has
/// passed since its last state change, and only while its restart count
/// stays below `max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: Option<u32>,
    attempt_delay: Duration,
}

impl RetryPolicy {
    /// Default cooldown between attempts.
    pub const DEFAULT_ATTEMPT_DELAY: Duration = Duration::from_secs(10);

    /// Creates a retry policy.
    #[must_use]
    pub const fn new(max_attempts: Option<u32>, attempt_delay: Duration) -> Self {
        Self {
            max_attempts,
            attempt_delay,
        }
    }

    /// Returns the attempt cap, if any.
    #[must_use]
    pub const fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Returns the cooldown between attempts.
    #[must_use]
    pub const fn attempt_delay(&self) -> Duration {
        self.attempt_delay
    }

    /// Returns `true` when a message with `restart_count` may be retried.
    #[must_use]
    pub fn allows(&self, restart_count: u32) -> bool {
        self.max_attempts.is_none_or(|max| restart_count < max)
    }

    /// Resolves the policy against the current time.
    #[must_use]
    pub fn window(&self, now: DateTime<Utc>) -> AttemptWindow {
        let delay = TimeDelta::from_std(self.attempt_delay).unwrap_or(TimeDelta::MAX);
        let updated_before = now
            .checked_sub_signed(delay)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        AttemptWindow {
            max_attempts: self.max_attempts,
            updated_before,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(None, Self::DEFAULT_ATTEMPT_DELAY)
    }
}

/// A retry policy resolved to an absolute cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptWindow {
    /// Messages must have fewer restarts than this, when set.
    pub max_attempts: Option<u32>,
    /// Messages must not have changed state at or after this instant.
    pub updated_before: DateTime<Utc>,
}

impl AttemptWindow {
    /// Returns `true` when `message` is inside the retry window.
    #[must_use]
    pub fn admits(&self, message: &Message) -> bool {
        let under_cap = self
            .max_attempts
            .is_none_or(|max| message.restart_count() < max);
        under_cap && message.updated_at() < self.updated_before
    }
}
