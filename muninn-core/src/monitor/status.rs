//! Composite status surface for the orchestrator
//!
//! One snapshot struct the dashboard polls: per-domain scores, alert
//! counts, connectivity, validity, tick counters, and process RSS.

use crate::dissemination::ConnectionState;
use crate::pipeline::{AlertCounts, CompositeScore};
use serde::Serialize;

/// Per-stage error counters since startup.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StageErrorCounts {
    pub processor: u64,
    pub analytics: u64,
    pub dissemination: u64,
}

impl StageErrorCounts {
    pub fn total(&self) -> u64 {
        self.processor + self.analytics + self.dissemination
    }
}

/// Aggregate view returned by `Monitor::status()`.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub system: Option<CompositeScore>,
    pub market: Option<CompositeScore>,
    pub trading: Option<CompositeScore>,
    pub alerts: AlertCounts,
    pub connection: ConnectionState,
    pub data_valid: Option<bool>,
    pub ticks_completed: u64,
    /// Age of the last completed tick; `None` before the first tick.
    /// A growing age with `running == true` is how a stalled pipeline
    /// shows up ("stale" rather than crashed).
    pub last_tick_age_ms: Option<u64>,
    pub stage_errors: StageErrorCounts,
    pub uptime_secs: u64,
    pub resident_memory_bytes: usize,
}

/// Current process memory usage (RSS)
#[cfg(target_os = "macos")]
pub(crate) fn resident_memory_bytes() -> usize {
    use std::mem::MaybeUninit;

    let mut info: MaybeUninit<libc::rusage> = MaybeUninit::uninit();
    unsafe {
        if libc::getrusage(libc::RUSAGE_SELF, info.as_mut_ptr()) == 0 {
            let info = info.assume_init();
            // ru_maxrss is in bytes on macOS
            info.ru_maxrss as usize
        } else {
            0
        }
    }
}

#[cfg(target_os = "linux")]
pub(crate) fn resident_memory_bytes() -> usize {
    use std::mem::MaybeUninit;

    let mut info: MaybeUninit<libc::rusage> = MaybeUninit::uninit();
    unsafe {
        if libc::getrusage(libc::RUSAGE_SELF, info.as_mut_ptr()) == 0 {
            let info = info.assume_init();
            // ru_maxrss is in kilobytes on Linux
            (info.ru_maxrss as usize) * 1024
        } else {
            0
        }
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
pub(crate) fn resident_memory_bytes() -> usize {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_usage_nonzero_on_unix() {
        let memory = resident_memory_bytes();
        #[cfg(any(target_os = "macos", target_os = "linux"))]
        assert!(memory > 0, "resident memory should be non-zero");
        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        assert_eq!(memory, 0);
    }

    #[test]
    fn test_stage_error_totals() {
        let counts = StageErrorCounts {
            processor: 1,
            analytics: 2,
            dissemination: 3,
        };
        assert_eq!(counts.total(), 6);
    }
}
