//! Power-domain management for deep sleep.
//!
//! Before the chip sleeps, every GPIO the application is not driving is
//! parked as a pulled-down input so nothing floats and leaks current, the
//! sensor-rail switch is latched OFF, and the radio plus the RTC peripheral
//! and XTAL domains are shut down.  After waking, the latch is released so
//! the switch can be driven again.
//!
//! Sleep preparation order (each step is logged; failures never abort):
//!
//! 1. radio off
//! 2. RTC peripheral and XTAL domains off
//! 3. on-board indicator LED isolated
//! 4. I2C bus pins isolated
//! 5. every remaining unused pin isolated
//! 6. peripheral-power hold asserted
//! 7. console pins (UART, USB) isolated, so logging ends here

pub mod sleep;

use log::{error, info, warn};

use crate::app::ports::{PowerDomain, PowerHalPort};
use crate::error::HalError;
use crate::pins::BoardPinProfile;

/// Radio controller spin-down time.
const RADIO_SETTLE_MS: u32 = 100;
/// Time for the UART FIFO to drain after a flush.
const CONSOLE_DRAIN_MS: u32 = 10;

/// Result of one sleep preparation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SleepPrepReport {
    /// Pins parked by the bulk isolation pass (step 5).
    pub pins_isolated: usize,
    /// Steps or pins that reported an error.
    pub errors: usize,
    pub hold_asserted: bool,
}

/// Applies one board's pin profile to the power HAL.
pub struct PowerDomainManager<H: PowerHalPort> {
    hal: H,
    profile: BoardPinProfile,
    prepared: bool,
}

impl<H: PowerHalPort> PowerDomainManager<H> {
    pub fn new(hal: H, profile: BoardPinProfile) -> Self {
        info!(
            "Power: {} profile, {} pins eligible for isolation",
            profile.variant,
            profile.isolation_candidates().count()
        );
        Self {
            hal,
            profile,
            prepared: false,
        }
    }

    pub fn profile(&self) -> &BoardPinProfile {
        &self.profile
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// `true` once a sleep preparation pass has run this cycle.
    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Release the deep-sleep latch on `pin` so it can be driven again.
    /// A failure is logged and returned; it is never fatal.
    pub fn post_wakeup_release(&mut self, pin: u8) -> Result<(), HalError> {
        match self.hal.hold_disable(pin) {
            Ok(()) => {
                info!("Power: released hold on GPIO{}", pin);
                Ok(())
            }
            Err(e) => {
                warn!("Power: {}", e);
                Err(e)
            }
        }
    }

    /// Release the hold on this board's peripheral-power pin.
    pub fn post_wakeup(&mut self) -> Result<(), HalError> {
        self.post_wakeup_release(self.profile.peripheral_power)
    }

    /// Pull down every pin the profile does not reserve.  Returns how many
    /// pins were parked; individual failures are logged and skipped.
    pub fn isolate_unused_pins(&mut self) -> usize {
        let profile = self.profile;
        let mut isolated = 0;
        for pin in profile.isolation_candidates() {
            match self.hal.isolate_pin(pin) {
                Ok(()) => isolated += 1,
                Err(e) => warn!("Power: {}", e),
            }
        }
        info!("Power: isolated {} unused GPIO pins", isolated);
        isolated
    }

    /// Latch `pin` at its current (OFF) level through deep sleep.
    pub fn assert_peripheral_power_hold(&mut self, pin: u8) -> Result<(), HalError> {
        match self.hal.hold_enable(pin) {
            Ok(()) => {
                let level = if self.profile.peripheral_off_level() {
                    "HIGH"
                } else {
                    "LOW"
                };
                info!("Power: GPIO{} held {} (peripherals OFF)", pin, level);
                Ok(())
            }
            Err(e) => {
                error!("Power: {}; peripherals may draw current in sleep", e);
                Err(e)
            }
        }
    }

    /// Full pre-sleep sequence.  Must run after the sensor rail has been
    /// switched off and the I2C bus released.
    pub fn prepare_for_sleep(&mut self) -> SleepPrepReport {
        info!("Power: preparing for deep sleep");
        self.run_sleep_sequence()
    }

    /// Same sequence as [`prepare_for_sleep`](Self::prepare_for_sleep),
    /// for error paths where subsystems may never have started.
    pub fn emergency_prepare_for_sleep(&mut self) -> SleepPrepReport {
        warn!("Power: EMERGENCY sleep preparation");
        self.run_sleep_sequence()
    }

    fn run_sleep_sequence(&mut self) -> SleepPrepReport {
        let profile = self.profile;
        let mut report = SleepPrepReport::default();

        // 1. Radio
        if let Err(e) = self.hal.radio_off() {
            warn!("Power: {}", e);
            report.errors += 1;
        }
        self.hal.delay_ms(RADIO_SETTLE_MS);

        // 2. Power domains
        for domain in [PowerDomain::RtcPeripheral, PowerDomain::Xtal] {
            if let Err(e) = self.hal.power_down_domain(domain) {
                warn!("Power: {:?}: {}", domain, e);
                report.errors += 1;
            }
        }

        // 3. On-board LED
        if let Some(led) = profile.board_led {
            report.errors += self.isolate_each(&[led]);
        }

        // 4. I2C bus
        report.errors += self.isolate_each(&profile.i2c_pins());

        // 5. Everything else
        let candidates = profile.isolation_candidates().count();
        report.pins_isolated = self.isolate_unused_pins();
        report.errors += candidates - report.pins_isolated;

        // 6. Sensor-rail latch
        report.hold_asserted = self
            .assert_peripheral_power_hold(profile.peripheral_power)
            .is_ok();
        if !report.hold_asserted {
            report.errors += 1;
        }

        // 7. Console, last
        info!(
            "Power: sleep prep done ({} errors), isolating console",
            report.errors
        );
        self.hal.flush_console();
        self.hal.delay_ms(CONSOLE_DRAIN_MS);
        report.errors += self.isolate_each(&profile.console_pins());

        self.prepared = true;
        report
    }

    /// Isolate each pin in `pins`; returns the number of failures.
    fn isolate_each(&mut self, pins: &[u8]) -> usize {
        pins.iter()
            .filter(|&&pin| self.hal.isolate_pin(pin).is_err())
            .count()
    }
}
