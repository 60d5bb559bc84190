//! MAX17048 LiPo fuel gauge.
//!
//! The gauge sits on the switched sensor rail, so it loses power every
//! sleep and has to be probed again after each wakeup.  All register
//! access is 16-bit big-endian over I2C.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::{BatteryPort, StatusCode};
use crate::error::SensorError;

/// 7-bit I2C address (fixed).
pub const MAX17048_I2C_ADDR: u8 = 0x36;

pub const REG_VCELL: u8 = 0x02;
pub const REG_SOC: u8 = 0x04;
pub const REG_VERSION: u8 = 0x08;
pub const REG_CRATE: u8 = 0x16;
pub const REG_STATUS: u8 = 0x1A;

/// STATUS: reset indicator.
pub const STATUS_RI: u16 = 1 << 8;
/// STATUS: cell voltage above VALRT.MAX.
pub const STATUS_VH: u16 = 1 << 9;
/// STATUS: cell voltage below VALRT.MIN.
pub const STATUS_VL: u16 = 1 << 10;

const MAX_PROBE_ATTEMPTS: u8 = 10;
const PROBE_BACKOFF_MS: u32 = 10;
/// The IC needs a moment after its reset flag is cleared.
const RESET_SETTLE_MS: u32 = 1000;

/// VCELL LSB: 78.125 µV.
pub fn decode_voltage(raw: u16) -> f32 {
    raw as f32 * 78.125e-6
}

/// SOC LSB: 1/256 %.
pub fn decode_soc(raw: u16) -> f32 {
    raw as f32 / 256.0
}

/// CRATE LSB: 0.208 %/hr, two's complement.
pub fn decode_change_rate(raw: u16) -> f32 {
    (raw as i16) as f32 * 0.208
}

// ---------------------------------------------------------------------------
// Status snapshot
// ---------------------------------------------------------------------------

/// One fuel-gauge reading.  Numeric fields are meaningless unless
/// `is_valid` is set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BatteryStatus {
    /// Cell voltage (V).
    pub voltage: f32,
    /// State of charge (%).
    pub state_of_charge: f32,
    /// Charge rate (%/hr); positive while charging.
    pub change_rate: f32,
    pub is_valid: bool,
    pub is_charging: bool,
    pub is_low_voltage: bool,
    pub is_high_voltage: bool,
}

impl BatteryStatus {
    pub const INVALID: Self = Self {
        voltage: 0.0,
        state_of_charge: 0.0,
        change_rate: 0.0,
        is_valid: false,
        is_charging: false,
        is_low_voltage: false,
        is_high_voltage: false,
    };

    /// Low and not being charged.
    pub fn needs_conservation(&self) -> bool {
        self.is_valid && self.is_low_voltage && !self.is_charging
    }

    /// Status LED codes summarising this reading, in display order.
    pub fn indications(&self) -> heapless::Vec<StatusCode, 2> {
        let mut codes = heapless::Vec::new();
        if !self.is_valid {
            let _ = codes.push(StatusCode::Error);
            return codes;
        }
        if self.is_charging {
            let _ = codes.push(StatusCode::BatteryCharging);
        }
        let band = if self.state_of_charge < 25.0 {
            StatusCode::BatteryChargeLow
        } else if self.state_of_charge < 50.0 {
            StatusCode::BatteryBelow50
        } else if self.state_of_charge < 75.0 {
            StatusCode::BatteryBelow75
        } else {
            StatusCode::BatteryOk
        };
        let _ = codes.push(band);
        codes
    }
}

impl fmt::Display for BatteryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BatteryStatus{{voltage={:.3}V, percent={:.1}%, rate={:.3}, valid={}, charging={}, low={}, high={}}}",
            self.voltage,
            self.state_of_charge,
            self.change_rate,
            self.is_valid,
            self.is_charging,
            self.is_low_voltage,
            self.is_high_voltage,
        )
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Fuel-gauge driver.  Owns the I2C bus until [`BatteryPort::stop`], which
/// drops the driver so the bus pins can be isolated.
pub struct BatteryMonitor<I, D> {
    i2c: Option<I>,
    delay: D,
    started: bool,
}

impl<I: I2c, D: DelayNs> BatteryMonitor<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c: Some(i2c),
            delay,
            started: false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// `false` once the bus has been handed back by [`BatteryPort::stop`].
    pub fn owns_bus(&self) -> bool {
        self.i2c.is_some()
    }

    fn read_reg(i2c: &mut I, reg: u8) -> Result<u16, I::Error> {
        let mut buf = [0u8; 2];
        i2c.write_read(MAX17048_I2C_ADDR, &[reg], &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn write_reg(i2c: &mut I, reg: u8, value: u16) -> Result<(), I::Error> {
        let [hi, lo] = value.to_be_bytes();
        i2c.write(MAX17048_I2C_ADDR, &[reg, hi, lo])
    }

    /// Clear the reset indicator if the gauge reports a fresh power-up.
    fn clear_reset_indicator(i2c: &mut I, delay: &mut D) {
        let Ok(status) = Self::read_reg(i2c, REG_STATUS) else {
            warn!("Battery: STATUS read failed");
            return;
        };
        if status & STATUS_RI != 0 {
            info!("Battery: reset indicator set, clearing");
            if Self::write_reg(i2c, REG_STATUS, status & !STATUS_RI).is_err() {
                warn!("Battery: failed to clear reset indicator");
            }
        }
        delay.delay_ms(RESET_SETTLE_MS);
    }

    fn try_read(i2c: &mut I) -> Result<BatteryStatus, I::Error> {
        let voltage = decode_voltage(Self::read_reg(i2c, REG_VCELL)?);
        let state_of_charge = decode_soc(Self::read_reg(i2c, REG_SOC)?);
        let change_rate = decode_change_rate(Self::read_reg(i2c, REG_CRATE)?);
        let flags = Self::read_reg(i2c, REG_STATUS)?;
        Ok(BatteryStatus {
            voltage,
            state_of_charge,
            change_rate,
            is_valid: true,
            is_charging: change_rate > 0.0,
            is_low_voltage: flags & STATUS_VL != 0,
            is_high_voltage: flags & STATUS_VH != 0,
        })
    }
}

impl<I: I2c, D: DelayNs> BatteryPort for BatteryMonitor<I, D> {
    fn start(&mut self) -> Result<(), SensorError> {
        if self.started {
            return Ok(());
        }
        let Some(i2c) = self.i2c.as_mut() else {
            warn!("Battery: I2C bus already released");
            return Err(SensorError::BusReleased);
        };
        for attempt in 1..=MAX_PROBE_ATTEMPTS {
            if Self::read_reg(i2c, REG_VERSION).is_ok() {
                info!("Battery: MAX17048 found (attempt {})", attempt);
                self.started = true;
                Self::clear_reset_indicator(i2c, &mut self.delay);
                return Ok(());
            }
            self.delay.delay_ms(PROBE_BACKOFF_MS * attempt as u32);
        }
        warn!(
            "Battery: no MAX17048 after {} attempts, check wiring",
            MAX_PROBE_ATTEMPTS
        );
        Err(SensorError::GaugeNotFound {
            attempts: MAX_PROBE_ATTEMPTS,
        })
    }

    fn stop(&mut self) {
        if !self.started {
            warn!("Battery: stop requested but monitor not started");
        }
        self.started = false;
        // Dropping the driver uninstalls it and frees SDA/SCL.
        if self.i2c.take().is_some() {
            info!("Battery: monitor stopped, I2C released");
        }
    }

    fn read_status(&mut self) -> BatteryStatus {
        let (true, Some(i2c)) = (self.started, self.i2c.as_mut()) else {
            warn!("Battery: monitor not started, status invalid");
            return BatteryStatus::INVALID;
        };
        match Self::try_read(i2c) {
            Ok(status) => {
                info!("Battery: {}", status);
                status
            }
            Err(_) => {
                warn!("Battery: gauge read failed, check battery is connected");
                BatteryStatus::INVALID
            }
        }
    }
}
