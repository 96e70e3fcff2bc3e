//! Health descriptor reported by backends.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Backend is usable.
    Ok,
    /// Backend is usable but degraded.
    Warning,
    /// Backend is unusable.
    Failure,
}

impl HealthStatus {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Label plus human-readable status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    status: HealthStatus,
    label: String,
    message: String,
}

impl BackendHealth {
    /// Creates a health descriptor.
    #[must_use]
    pub fn new(status: HealthStatus, label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            label: label.into(),
            message: message.into(),
        }
    }

    /// Creates an `ok` descriptor.
    #[must_use]
    pub fn ok(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(HealthStatus::Ok, label, message)
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> HealthStatus {
        self.status
    }

    /// Returns the label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the status line.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendHealth {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {} [{}]", self.label, self.message, self.status)
    }
}
