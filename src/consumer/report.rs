//! Progress reports emitted by the consumer loop.

use super::memory::{format_memory, memory_delta};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// Timing and memory figures for one handled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledReport {
    /// One-based position in this run.
    pub position: u64,
    /// Message type.
    pub message_type: String,
    /// Time spent in `handle`.
    pub duration: Duration,
    /// Seconds between message creation and pickup.
    pub latency_secs: i64,
    /// Memory change across `handle`, when sampled.
    pub memory_delta: Option<i64>,
    /// Resident memory after `handle`, when sampled.
    pub memory_now: Option<u64>,
    /// Resident memory when the loop started, when sampled.
    pub memory_at_start: Option<u64>,
    /// Consumer summary, when details are enabled.
    pub details: Option<String>,
}

impl HandledReport {
    fn memory_summary(&self) -> Option<String> {
        let delta = self.memory_delta?;
        let now = self.memory_now?;
        let start = self.memory_at_start?;
        let growth = memory_delta(start, now);
        let growth_pct = i64::try_from(start)
            .ok()
            .and_then(|base| growth.saturating_mul(10_000).checked_div(base))
            .unwrap_or(0);
        let sign = if growth_pct < 0 { "-" } else { "" };
        let pct = growth_pct.unsigned_abs();
        Some(format!(
            "{}, {} - {} = {}, {sign}{}.{:02}%",
            format_memory(delta),
            format_memory(i64::try_from(now).unwrap_or(i64::MAX)),
            format_memory(i64::try_from(start).unwrap_or(i64::MAX)),
            format_memory(growth),
            pct.checked_div(100).unwrap_or(0),
            pct.checked_rem(100).unwrap_or(0),
        ))
    }
}

/// One progress event of a consumer loop run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopReport {
    /// The backend was resolved and initialized.
    Started {
        /// Backend name.
        backend: String,
        /// Type selector, when one was given.
        message_type: Option<String>,
    },
    /// A message without a type was skipped.
    Skipped {
        /// One-based position in this run.
        position: u64,
    },
    /// A message was handled successfully.
    Handled(HandledReport),
    /// Handling a message failed.
    Failed {
        /// One-based position in this run.
        position: u64,
        /// Message type.
        message_type: String,
        /// The underlying cause.
        cause: String,
    },
    /// A delivery could not be decoded.
    Malformed {
        /// The decode failure.
        cause: String,
    },
    /// The iteration cap was reached.
    CapReached {
        /// Messages pulled in this run.
        processed: u64,
    },
    /// A finite iterator ran out of messages.
    Exhausted {
        /// Messages pulled in this run.
        processed: u64,
    },
}

impl fmt::Display for LoopReport {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started {
                backend,
                message_type: None,
            } => write!(formatter, "Starting the backend handler - {backend}"),
            Self::Started {
                backend,
                message_type: Some(selected),
            } => write!(
                formatter,
                "Starting the backend handler - {backend} (type: {selected})"
            ),
            Self::Skipped { position } => {
                write!(formatter, "#{position}: Skipping : no type defined")
            }
            Self::Handled(report) => {
                write!(
                    formatter,
                    "{} #{}: OK! - {:.4}s, {}s",
                    report.message_type,
                    report.position,
                    report.duration.as_secs_f64(),
                    report.latency_secs
                )?;
                if let Some(memory) = report.memory_summary() {
                    write!(formatter, ", {memory}")?;
                }
                if let Some(details) = report.details.as_deref() {
                    write!(formatter, "\n{details}")?;
                }
                Ok(())
            }
            Self::Failed {
                position,
                message_type,
                cause,
            } => write!(formatter, "{message_type} #{position}: KO! - {cause}"),
            Self::Malformed { cause } => write!(formatter, "KO! - {cause}"),
            Self::CapReached { .. } => formatter.write_str("End of iteration cycle"),
            Self::Exhausted { processed } => {
                write!(formatter, "No more messages after {processed} iterations")
            }
        }
    }
}

/// Destination for loop progress.
pub trait ProgressSink: Send + Sync {
    /// Records one report.
    fn report(&self, report: &LoopReport);
}

/// Writes progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, report: &LoopReport) {
        match report {
            LoopReport::Failed { .. } | LoopReport::Malformed { .. } | LoopReport::Skipped { .. } => {
                warn!(target: "postmaster::consumer", "{report}");
            }
            _ => info!(target: "postmaster::consumer", "{report}"),
        }
    }
}
