//! Process memory sampling and formatting.

use std::fmt;
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Source of the current process's resident memory.
pub trait MemoryProbe: Send + Sync {
    /// Returns resident memory in bytes, or `None` when unavailable.
    fn resident_bytes(&self) -> Option<u64>;
}

/// Samples the current process through `sysinfo`.
pub struct ProcessMemoryProbe {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessMemoryProbe {
    /// Creates a probe for the running process.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pid: sysinfo::get_current_pid().ok(),
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProcessMemoryProbe {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProcessMemoryProbe")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn resident_bytes(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        let refreshed = system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        if refreshed == 0 {
            return None;
        }
        system.process(pid).map(sysinfo::Process::memory)
    }
}

/// Probe that never reports memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMemoryProbe;

impl MemoryProbe for NoMemoryProbe {
    fn resident_bytes(&self) -> Option<u64> {
        None
    }
}

/// Formats a byte count as `b`, `Kb`, or `Mb` with two decimals.
///
/// Negative values keep their sign.
#[must_use]
pub fn format_memory(bytes: i64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;

    let sign = if bytes < 0 { "-" } else { "" };
    let magnitude = bytes.unsigned_abs();
    if magnitude < KIB {
        return format!("{sign}{magnitude}b");
    }
    let (unit, divisor) = if magnitude < MIB {
        ("Kb", KIB)
    } else {
        ("Mb", MIB)
    };
    let hundredths = magnitude
        .saturating_mul(100)
        .saturating_add(divisor.checked_div(2).unwrap_or(0))
        .checked_div(divisor)
        .unwrap_or(0);
    let whole = hundredths.checked_div(100).unwrap_or(0);
    let fraction = hundredths.checked_rem(100).unwrap_or(0);
    format!("{sign}{whole}.{fraction:02}{unit}")
}

/// Returns `after - before` as a signed byte delta.
#[must_use]
pub fn memory_delta(before: u64, after: u64) -> i64 {
    if after >= before {
        i64::try_from(after.saturating_sub(before)).unwrap_or(i64::MAX)
    } else {
        i64::try_from(before.saturating_sub(after)).map_or(i64::MIN, |delta| -delta)
    }
}
