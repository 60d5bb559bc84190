//! Unified error types for the SoilNode firmware.
//!
//! One `Error` enum that every subsystem converts into, so the wakeup and
//! sleep paths can log any failure the same way.  All variants are `Copy`;
//! hardware errors carry the raw `esp_err_t` code where one exists.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A GPIO / power-domain / sleep control call was rejected.
    Hal(HalError),
    /// A sensor could not be started or read.
    Sensor(SensorError),
    /// A network subsystem failed.
    Comms(CommsError),
    /// Configuration is invalid or could not be parsed.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hal(e) => write!(f, "hal: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// HAL errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// `gpio_hold_en` failed (e.g. pin has no RTC hold capability).
    HoldEnableFailed { pin: u8, code: i32 },
    /// `gpio_hold_dis` failed.
    HoldReleaseFailed { pin: u8, code: i32 },
    /// `gpio_config` failed while isolating or driving a pin.
    GpioConfigFailed { pin: u8, code: i32 },
    /// `esp_sleep_pd_config` rejected a power domain option.
    PowerDomainFailed(i32),
    /// A wake source could not be armed or cleared.
    WakeSourceFailed(i32),
    /// Radio controller refused to shut down.
    RadioShutdownFailed(i32),
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HoldEnableFailed { pin, code } => {
                write!(f, "hold enable failed on GPIO{pin} (rc={code})")
            }
            Self::HoldReleaseFailed { pin, code } => {
                write!(f, "hold release failed on GPIO{pin} (rc={code})")
            }
            Self::GpioConfigFailed { pin, code } => {
                write!(f, "GPIO{pin} config failed (rc={code})")
            }
            Self::PowerDomainFailed(rc) => write!(f, "power domain config failed (rc={rc})"),
            Self::WakeSourceFailed(rc) => write!(f, "wake source config failed (rc={rc})"),
            Self::RadioShutdownFailed(rc) => write!(f, "radio shutdown failed (rc={rc})"),
        }
    }
}

impl From<HalError> for Error {
    fn from(e: HalError) -> Self {
        Self::Hal(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Fuel gauge did not answer after every retry.
    GaugeNotFound { attempts: u8 },
    /// Probe supply pin is not wired on this board.
    NoSupplyPin,
    /// Probe supply pin could not be driven.
    ProbeSupplyFailed { pin: u8 },
    /// The bus was handed back at the end of the last cycle.
    BusReleased,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GaugeNotFound { attempts } => {
                write!(f, "fuel gauge not found after {attempts} attempts")
            }
            Self::NoSupplyPin => write!(f, "no supply pin configured"),
            Self::ProbeSupplyFailed { pin } => write!(f, "probe supply GPIO{pin} failed"),
            Self::BusReleased => write!(f, "I2C bus already released"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// SSID or passphrase rejected before any radio activity.
    InvalidCredentials,
    WifiConnectFailed,
    MqttNotConnected,
    MqttConnectFailed,
    MqttPublishFailed,
    TopicTooLong,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "WiFi credentials invalid"),
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::MqttNotConnected => write!(f, "MQTT session not connected"),
            Self::MqttConnectFailed => write!(f, "MQTT connect failed"),
            Self::MqttPublishFailed => write!(f, "MQTT publish failed"),
            Self::TopicTooLong => write!(f, "MQTT topic too long"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
