//! Port traits: the hexagonal boundary between node logic and hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Node / PowerDomainManager / DeepSleepScheduler
//! ```
//!
//! Each adapter in [`crate::adapters`], [`crate::drivers`] or
//! [`crate::sensors`] implements one of these.  The domain consumes them
//! through generics (bundled by [`NodePorts`]), so host tests swap every
//! piece of hardware for a recording mock.

use crate::error::{CommsError, HalError, SensorError};
use crate::sensors::battery::BatteryStatus;
use crate::sensors::soil::SoilReading;

// ───────────────────────────────────────────────────────────────
// Power HAL port (domain → GPIO / power domains / radio)
// ───────────────────────────────────────────────────────────────

/// Chip power domains that can be forced off for deep sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerDomain {
    /// RTC peripherals (RTC IO, touch, ULP).
    RtcPeripheral,
    /// Main crystal oscillator.
    Xtal,
}

/// Low-level pin and power control used by the power-domain manager.
pub trait PowerHalPort {
    /// Shut the radio controller down.
    fn radio_off(&mut self) -> Result<(), HalError>;

    /// Keep `domain` powered down during deep sleep.
    fn power_down_domain(&mut self, domain: PowerDomain) -> Result<(), HalError>;

    /// Reconfigure `pin` as an input with pull-down.
    fn isolate_pin(&mut self, pin: u8) -> Result<(), HalError>;

    /// Latch the current level of `pin` through deep sleep.
    fn hold_enable(&mut self, pin: u8) -> Result<(), HalError>;

    /// Release a latched pin.
    fn hold_disable(&mut self, pin: u8) -> Result<(), HalError>;

    /// Drain pending console output.
    fn flush_console(&mut self);

    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Sleep control port (domain → wake sources / deep sleep entry)
// ───────────────────────────────────────────────────────────────

pub trait SleepControlPort {
    /// Clear every previously armed wake source.
    fn disable_all_wake_sources(&mut self) -> Result<(), HalError>;

    /// Arm the RTC timer to wake after `duration_us`.
    fn enable_timer_wakeup(&mut self, duration_us: u64) -> Result<(), HalError>;

    /// Enter deep sleep.  Execution resumes at reset.
    fn suspend(&mut self) -> !;
}

// ───────────────────────────────────────────────────────────────
// Sensor ports (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Fuel gauge on the sensor rail.
pub trait BatteryPort {
    fn start(&mut self) -> Result<(), SensorError>;
    /// Release the I2C bus.
    fn stop(&mut self);
    fn read_status(&mut self) -> BatteryStatus;
}

/// Capacitive soil probe.
pub trait MoisturePort {
    fn start(&mut self) -> Result<(), SensorError>;
    fn stop(&mut self);
    fn read(&mut self) -> SoilReading;
}

/// Switched supply for the sensor rail.
pub trait PeripheralPowerPort {
    fn power_on(&mut self) -> Result<(), HalError>;
    fn power_off(&mut self) -> Result<(), HalError>;
    fn is_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Communication ports (domain → network)
// ───────────────────────────────────────────────────────────────

/// Station-mode network link.
pub trait ConnectivityPort {
    fn connect(&mut self) -> Result<(), CommsError>;
    /// Disconnect and power the radio down.
    fn shutdown(&mut self);
    fn is_connected(&self) -> bool;
}

/// Published values.  Each maps to one topic below the node's prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    MoisturePercent,
    MoistureRaw,
    BatteryVoltage,
    BatteryCharge,
    BatteryChangeRate,
}

impl Metric {
    pub const ALL: [Self; 5] = [
        Self::MoisturePercent,
        Self::MoistureRaw,
        Self::BatteryVoltage,
        Self::BatteryCharge,
        Self::BatteryChangeRate,
    ];

    /// Last topic segment.
    pub fn topic_suffix(self) -> &'static str {
        match self {
            Self::MoisturePercent => "moisture_percent",
            Self::MoistureRaw => "moisture_reading_raw",
            Self::BatteryVoltage => "voltage",
            Self::BatteryCharge => "charge_percentage",
            Self::BatteryChangeRate => "discharge_rate",
        }
    }
}

/// Broker session.
pub trait PublishPort {
    /// Connect and announce availability.
    fn connect(&mut self) -> Result<(), CommsError>;
    fn publish(&mut self, metric: Metric, payload: &str) -> Result<(), CommsError>;
    /// Announce offline and close the session.
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Status indicator port (domain → user)
// ───────────────────────────────────────────────────────────────

pub use crate::drivers::status_led::StatusCode;

pub trait StatusIndicatorPort {
    fn show(&mut self, status: StatusCode);
    /// Turn the indicator off and park its pin for sleep.
    fn shutdown(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// The full set of adapters a node is built from.
pub trait NodePorts: 'static {
    type Hal: PowerHalPort;
    type PeripheralPower: PeripheralPowerPort;
    type Battery: BatteryPort;
    type Soil: MoisturePort;
    type Wifi: ConnectivityPort;
    type Mqtt: PublishPort;
    type Led: StatusIndicatorPort;
}
