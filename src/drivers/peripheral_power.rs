//! Sensor-rail power switch.
//!
//! A single GPIO gates VCC to the fuel gauge and soil probe.  Some boards
//! drive the switch active-low, so ON and OFF are resolved through the
//! profile's polarity rather than hard-coded levels.  Both transitions
//! wait for the rail to settle.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::info;

use crate::app::ports::PeripheralPowerPort;
use crate::error::HalError;

const RAIL_SETTLE_MS: u32 = 500;

pub struct PeripheralPower<P, D> {
    pin: P,
    delay: D,
    gpio: u8,
    inverted: bool,
    on: bool,
}

impl<P: OutputPin, D: DelayNs> PeripheralPower<P, D> {
    pub fn new(pin: P, delay: D, gpio: u8, inverted: bool) -> Self {
        Self {
            pin,
            delay,
            gpio,
            inverted,
            on: false,
        }
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    fn drive(&mut self, on: bool) -> Result<(), HalError> {
        let high = on != self.inverted;
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|_| HalError::GpioConfigFailed {
            pin: self.gpio,
            code: -1,
        })?;
        self.on = on;
        info!(
            "PeripheralPower: {} (GPIO{} {}{})",
            if on { "ON" } else { "OFF" },
            self.gpio,
            if high { "HIGH" } else { "LOW" },
            if self.inverted { ", inverted" } else { "" }
        );
        self.delay.delay_ms(RAIL_SETTLE_MS);
        Ok(())
    }
}

impl<P: OutputPin, D: DelayNs> PeripheralPowerPort for PeripheralPower<P, D> {
    fn power_on(&mut self) -> Result<(), HalError> {
        self.drive(true)
    }

    fn power_off(&mut self) -> Result<(), HalError> {
        self.drive(false)
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
