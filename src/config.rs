//! Node configuration parameters
//!
//! Everything the firmware needs that is not a pin number: network
//! credentials, soil calibration, and the sleep intervals that decide how
//! long the node stays dark after each outcome.  Values come from
//! [`NodeConfig::default`] or a JSON override baked in at build time.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pins::BoardVariant;

/// WiFi station credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiConfig {
    pub ssid: heapless::String<32>,
    pub password: heapless::String<64>,
}

/// MQTT broker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: heapless::String<64>,
    pub broker_port: u16,
    pub username: heapless::String<32>,
    pub password: heapless::String<64>,
    /// Broker keep-alive in seconds.
    pub keepalive_secs: u16,
}

/// Two-point calibration of the capacitive soil probe.
/// Dry soil reads higher than wet soil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoilCalibration {
    pub dry_raw: u16,
    pub wet_raw: u16,
    /// ADC samples averaged per reading.
    pub samples: u16,
}

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Selects the pin profile.
    pub board: BoardVariant,
    /// Keep the serial console up during the wake cycle.
    pub serial_console: bool,

    pub wifi: WifiConfig,
    pub mqtt: MqttConfig,
    pub soil: SoilCalibration,

    // --- Sleep intervals (seconds) ---
    /// After a normal publish cycle.
    pub normal_sleep_secs: u64,
    /// After a wakeup phase in which every subsystem failed.
    pub conservation_sleep_secs: u64,
    /// When the battery is invalid or low and not charging.
    pub low_battery_sleep_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            board: BoardVariant::Esp32S3,
            serial_console: true,

            wifi: WifiConfig {
                ssid: heapless::String::new(),
                password: heapless::String::new(),
            },
            mqtt: MqttConfig {
                broker_host: fixed("192.168.1.1"),
                broker_port: 1883,
                username: heapless::String::new(),
                password: heapless::String::new(),
                keepalive_secs: 30,
            },
            soil: SoilCalibration {
                dry_raw: 2733,
                wet_raw: 1380,
                samples: 25,
            },

            normal_sleep_secs: 7 * 3600,
            conservation_sleep_secs: 20 * 60,
            low_battery_sleep_secs: 10 * 3600,
        }
    }
}

impl NodeConfig {
    /// Parse a JSON override and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Config("malformed JSON"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would brick the sleep/wake cycle.
    pub fn validate(&self) -> Result<()> {
        if self.normal_sleep_secs == 0
            || self.conservation_sleep_secs == 0
            || self.low_battery_sleep_secs == 0
        {
            return Err(Error::Config("sleep intervals must be non-zero"));
        }
        if self.soil.dry_raw == self.soil.wet_raw {
            return Err(Error::Config("soil calibration dry == wet"));
        }
        if self.soil.samples == 0 || self.soil.samples > 100 {
            return Err(Error::Config("soil samples must be 1..=100"));
        }
        if self.mqtt.broker_port == 0 {
            return Err(Error::Config("MQTT port must be non-zero"));
        }
        Ok(())
    }
}

/// Build a fixed-capacity string from a literal that is known to fit.
fn fixed<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
