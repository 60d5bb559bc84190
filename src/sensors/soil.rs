//! Capacitive soil moisture probe.
//!
//! The probe outputs a voltage that falls as the soil gets wetter.  A
//! reading is the mean of several ADC samples, clamped to the two-point
//! dry/wet calibration and mapped linearly onto 0–100 %.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: samples ADC1 through [`hw_init::AdcPin`].
//! On host/test: any [`AnalogInput`] (the sim pin reads an injectable
//! atomic).

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::ports::MoisturePort;
use crate::config::SoilCalibration;
use crate::drivers::hw_init;
use crate::error::SensorError;

/// Used when a caller asks for zero samples.
const DEFAULT_SAMPLES: u16 = 10;
const MAX_SAMPLES: u16 = 100;
const SAMPLE_INTERVAL_MS: u32 = 50;
const SUPPLY_SETTLE_MS: u32 = 500;

/// A single-channel ADC.
pub trait AnalogInput {
    fn read_raw(&mut self) -> u16;
}

impl AnalogInput for hw_init::AdcPin {
    fn read_raw(&mut self) -> u16 {
        self.read()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoilReading {
    /// Averaged ADC value, clamped into the calibration range.
    pub raw: u16,
    /// 0 = dry, 100 = saturated.
    pub moisture_percent: u8,
}

/// Effective sample count: 0 means the default, anything above the cap
/// is clamped.
pub fn clamp_samples(requested: u16) -> u16 {
    match requested {
        0 => DEFAULT_SAMPLES,
        n => n.min(MAX_SAMPLES),
    }
}

/// Map an averaged ADC value onto the calibration.
pub fn to_reading(raw: u16, cal: &SoilCalibration) -> SoilReading {
    let (dry, wet) = (cal.dry_raw as i32, cal.wet_raw as i32);
    let range = dry - wet;
    if range == 0 {
        warn!("Soil: invalid calibration (dry == wet)");
        return SoilReading {
            raw,
            moisture_percent: 0,
        };
    }
    if range < 0 {
        warn!("Soil: calibration inverted (dry <= wet)");
    }
    if raw == 0 {
        warn!("Soil: zero reading, probe disconnected?");
        return SoilReading {
            raw,
            moisture_percent: 0,
        };
    }

    let (lo, hi) = (wet.min(dry), wet.max(dry));
    let clamped = (raw as i32).clamp(lo, hi);
    if clamped != raw as i32 {
        warn!("Soil: reading {} outside calibration, clamped to {}", raw, clamped);
    }
    let percent = (100 * (dry - clamped) / range).clamp(0, 100);
    SoilReading {
        raw: clamped as u16,
        moisture_percent: percent as u8,
    }
}

pub struct SoilSensor<A, D> {
    adc: A,
    delay: D,
    cal: SoilCalibration,
    /// Dedicated probe supply, when the board has one.
    supply_pin: Option<u8>,
    aout_pin: u8,
}

impl<A: AnalogInput, D: DelayNs> SoilSensor<A, D> {
    pub fn new(adc: A, delay: D, cal: SoilCalibration, aout_pin: u8) -> Self {
        Self {
            adc,
            delay,
            cal,
            supply_pin: None,
            aout_pin,
        }
    }

    pub fn with_supply_pin(mut self, pin: u8) -> Self {
        self.supply_pin = Some(pin);
        self
    }

    /// Mean of `samples` readings (after [`clamp_samples`]).
    pub fn average_reading(&mut self, samples: u16) -> u16 {
        let n = clamp_samples(samples);
        if n != samples {
            warn!("Soil: sample count {} adjusted to {}", samples, n);
        }
        let mut total: u32 = 0;
        for _ in 0..n {
            total += self.adc.read_raw() as u32;
            self.delay.delay_ms(SAMPLE_INTERVAL_MS);
        }
        (total / n as u32) as u16
    }
}

impl<A: AnalogInput, D: DelayNs> MoisturePort for SoilSensor<A, D> {
    /// Powers the probe.  Without a supply pin the probe shares the
    /// sensor rail; this reports [`SensorError::NoSupplyPin`] so the
    /// caller can log it.
    fn start(&mut self) -> Result<(), SensorError> {
        let Some(pin) = self.supply_pin else {
            info!("Soil: no supply pin, assuming probe is on the sensor rail");
            return Err(SensorError::NoSupplyPin);
        };
        hw_init::gpio_output(pin, true).map_err(|e| {
            warn!("Soil: {}", e);
            SensorError::ProbeSupplyFailed { pin }
        })?;
        self.delay.delay_ms(SUPPLY_SETTLE_MS);
        info!("Soil: probe powered on (GPIO{})", pin);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(pin) = self.supply_pin {
            hw_init::gpio_write(pin, false);
            info!("Soil: probe powered off");
        }
        if let Err(e) = hw_init::gpio_isolate(self.aout_pin) {
            warn!("Soil: {}", e);
        }
    }

    fn read(&mut self) -> SoilReading {
        let raw = self.average_reading(self.cal.samples);
        let reading = to_reading(raw, &self.cal);
        info!(
            "Soil: raw {} -> {}% moisture",
            reading.raw, reading.moisture_percent
        );
        reading
    }
}
