//! Monotonic clock adapter.
//!
//! - **`target_os = "espidf"`** wraps `esp_timer_get_time()` (µs since
//!   boot, survives light sleep, restarts at zero after deep sleep).
//! - **`not(target_os = "espidf")`** uses `std::time::Instant` so host
//!   tests see real, if tiny, durations.

use core::time::Duration;

/// Boot-relative microsecond clock used for phase and callback timing.
pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot.
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: read-only query of the high-resolution timer.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since the clock was created.
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Time elapsed since an earlier [`uptime_us`](Self::uptime_us) sample.
    /// Never negative; a sample from the future reads as zero.
    pub fn since(&self, start_us: u64) -> Duration {
        Duration::from_micros(self.uptime_us().saturating_sub(start_us))
    }
}
