//! Phase outcome classification and run metrics.

use core::fmt;
use core::time::Duration;

/// Aggregate result of running one lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    /// Every registered callback completed.
    Success,
    /// At least one callback failed, but not all of them.
    PartialFailure,
    /// Every registered callback failed.
    TotalFailure,
}

impl LifecycleStatus {
    /// Classify a run from its failure and registration counts.
    ///
    /// An empty phase is vacuously successful.
    pub fn classify(failures: usize, registered: usize) -> Self {
        if failures == 0 || registered == 0 {
            Self::Success
        } else if failures >= registered {
            Self::TotalFailure
        } else {
            Self::PartialFailure
        }
    }

    pub fn is_total_failure(self) -> bool {
        self == Self::TotalFailure
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::PartialFailure => write!(f, "PARTIAL_FAILURE"),
            Self::TotalFailure => write!(f, "TOTAL_FAILURE"),
        }
    }
}

/// Snapshot of registration counts and the most recent run of each phase.
/// Failure counts and durations are overwritten by every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleMetrics {
    pub wakeup_registered: usize,
    pub sleep_registered: usize,
    pub wakeup_failures: usize,
    pub sleep_failures: usize,
    pub last_wakeup_duration: Duration,
    pub last_sleep_duration: Duration,
}

impl fmt::Display for LifecycleMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wakeup {} registered / {} failed in {} ms, sleep {} registered / {} failed in {} ms",
            self.wakeup_registered,
            self.wakeup_failures,
            self.last_wakeup_duration.as_millis(),
            self.sleep_registered,
            self.sleep_failures,
            self.last_sleep_duration.as_millis(),
        )
    }
}
