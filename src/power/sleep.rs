//! Timed deep sleep entry.
//!
//! Runs the sleep phase of the lifecycle, clears stale wake sources, arms
//! the RTC timer and suspends the chip.  The next thing that executes is
//! the bootloader.

use log::{error, info, warn};

use crate::app::ports::SleepControlPort;
use crate::error::HalError;
use crate::lifecycle::{LifecycleOrchestrator, LifecycleStatus};

const US_PER_SEC: u64 = 1_000_000;

/// Convert a whole-second duration to the timer's microsecond unit.
/// Zero is raised to one second; overflow saturates.
pub fn sleep_duration_us(duration_secs: u64) -> u64 {
    duration_secs.max(1).saturating_mul(US_PER_SEC)
}

pub struct DeepSleepScheduler<S: SleepControlPort> {
    control: S,
}

impl<S: SleepControlPort> DeepSleepScheduler<S> {
    pub fn new(control: S) -> Self {
        Self { control }
    }

    pub fn control(&self) -> &S {
        &self.control
    }

    /// Clear every wake source and arm the timer.  Returns the armed
    /// duration in microseconds.
    pub fn arm(&mut self, duration_secs: u64) -> Result<u64, HalError> {
        if duration_secs == 0 {
            warn!("Sleep: zero duration requested, using 1 s");
        }
        let duration_us = sleep_duration_us(duration_secs);
        self.control.disable_all_wake_sources()?;
        self.control.enable_timer_wakeup(duration_us)?;
        info!(
            "Sleep: timer armed for {} s ({} us)",
            duration_secs.max(1),
            duration_us
        );
        Ok(duration_us)
    }

    /// Everything [`enter_deep_sleep`](Self::enter_deep_sleep) does short
    /// of suspending.  Arming errors are logged.
    pub fn prepare<C>(
        &mut self,
        orchestrator: &mut LifecycleOrchestrator<C>,
        ctx: &mut C,
        duration_secs: u64,
    ) -> LifecycleStatus {
        let status = orchestrator.run_sleep_prep(ctx);
        if let Err(e) = self.arm(duration_secs) {
            error!("Sleep: {}", e);
        }
        status
    }

    /// Run the sleep phase, arm the timer and suspend.  Never returns.
    pub fn enter_deep_sleep<C>(
        &mut self,
        orchestrator: &mut LifecycleOrchestrator<C>,
        ctx: &mut C,
        duration_secs: u64,
    ) -> ! {
        self.prepare(orchestrator, ctx, duration_secs);
        self.suspend()
    }

    pub fn suspend(&mut self) -> ! {
        self.control.suspend()
    }
}
