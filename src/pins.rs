//! Per-board GPIO assignments for the SoilNode carrier boards.
//!
//! Single source of truth: every driver and the power-domain manager take
//! their pin numbers from a [`BoardPinProfile`] selected once at boot from
//! [`BoardVariant`].  Adding a board means adding one table here; the
//! isolation algorithm in [`crate::power`] stays identical across variants.

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Board identity
// ---------------------------------------------------------------------------

/// Hardware variants the firmware knows how to drive.
///
/// Deserialized through [`BoardVariant::from_name`], so an unrecognised
/// board name selects the fallback profile instead of rejecting the config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum BoardVariant {
    /// SparkFun Thing Plus ESP32-C6.
    Esp32C6,
    /// SparkFun Thing Plus ESP32-S3.
    Esp32S3,
    /// Anything else.  Uses the conservative fallback profile.
    Unknown,
}

impl BoardVariant {
    /// Every variant, in table order.
    pub const ALL: [Self; 3] = [Self::Esp32C6, Self::Esp32S3, Self::Unknown];

    /// Parse a board name as written in config files or build flags.
    /// Unrecognised names resolve to [`BoardVariant::Unknown`].
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "esp32c6" | "esp32-c6" | "esp32_c6" => Self::Esp32C6,
            "esp32s3" | "esp32-s3" | "esp32_s3" => Self::Esp32S3,
            _ => Self::Unknown,
        }
    }

    /// The pin profile for this variant.
    pub const fn profile(self) -> BoardPinProfile {
        match self {
            Self::Esp32C6 => ESP32C6_PROFILE,
            Self::Esp32S3 => ESP32S3_PROFILE,
            Self::Unknown => FALLBACK_PROFILE,
        }
    }
}

impl From<String> for BoardVariant {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl fmt::Display for BoardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Esp32C6 => write!(f, "ESP32-C6"),
            Self::Esp32S3 => write!(f, "ESP32-S3"),
            Self::Unknown => write!(f, "unknown (fallback)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pin profile
// ---------------------------------------------------------------------------

/// GPIO layout of one board variant.  Immutable after selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardPinProfile {
    pub variant: BoardVariant,

    /// Console UART (UART0).
    pub uart_tx: u8,
    pub uart_rx: u8,
    /// USB Serial/JTAG data lines.
    pub usb_dm: u8,
    pub usb_dp: u8,
    /// Fuel-gauge I2C bus.
    pub i2c_sda: u8,
    pub i2c_scl: u8,

    /// Switches VCC to the sensor rail.
    pub peripheral_power: u8,
    /// `true` when the switch is active-low (LOW = ON).
    pub peripheral_power_inverted: bool,
    /// Addressable RGB status LED data pin.
    pub status_led: Option<u8>,
    /// Plain on-board LED, isolated separately before the bulk pass.
    pub board_led: Option<u8>,
    /// Capacitive soil probe analog output.
    pub soil_adc: u8,

    /// Pins the bulk isolation pass must never touch: application pins plus
    /// strapping and flash/PSRAM pins.
    pub active_pins: &'static [u8],
    /// Highest GPIO number on the package.
    pub max_pin_index: u8,
}

impl BoardPinProfile {
    /// `true` if `pin` is in the never-isolate set.
    pub fn is_active(&self, pin: u8) -> bool {
        self.active_pins.contains(&pin)
    }

    /// `true` if `pin` carries the diagnostic console (UART or USB).
    pub fn is_console_pin(&self, pin: u8) -> bool {
        self.console_pins().contains(&pin)
    }

    /// UART TX/RX then USB D-/D+.
    pub const fn console_pins(&self) -> [u8; 4] {
        [self.uart_tx, self.uart_rx, self.usb_dm, self.usb_dp]
    }

    pub const fn i2c_pins(&self) -> [u8; 2] {
        [self.i2c_sda, self.i2c_scl]
    }

    /// Whether the bulk pass may pull `pin` down.
    pub fn should_isolate(&self, pin: u8) -> bool {
        pin <= self.max_pin_index && !self.is_active(pin) && !self.is_console_pin(pin)
    }

    /// Every pin the bulk isolation pass will pull down, ascending.
    pub fn isolation_candidates(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=self.max_pin_index).filter(move |&pin| self.should_isolate(pin))
    }

    /// Output level that switches the sensor rail on.
    pub const fn peripheral_on_level(&self) -> bool {
        !self.peripheral_power_inverted
    }

    /// Output level that switches the sensor rail off.
    pub const fn peripheral_off_level(&self) -> bool {
        self.peripheral_power_inverted
    }
}

// ---------------------------------------------------------------------------
// ESP32-C6 (SparkFun Thing Plus)
// ---------------------------------------------------------------------------

const C6_PERIPHERAL_POWER: u8 = 15;
const C6_STATUS_LED: u8 = 23;
const C6_BOARD_LED: u8 = 8;
const C6_I2C_SDA: u8 = 6;
const C6_I2C_SCL: u8 = 7;
const SOIL_ADC_GPIO: u8 = 4;

static C6_ACTIVE_PINS: [u8; 15] = [
    C6_PERIPHERAL_POWER,
    C6_STATUS_LED,
    C6_BOARD_LED,
    SOIL_ADC_GPIO,
    C6_I2C_SDA,
    C6_I2C_SCL,
    // Strapping
    2,
    9,
    // SPI flash
    24,
    25,
    26,
    27,
    28,
    29,
    30,
];

pub const ESP32C6_PROFILE: BoardPinProfile = BoardPinProfile {
    variant: BoardVariant::Esp32C6,
    uart_tx: 16,
    uart_rx: 17,
    usb_dm: 12,
    usb_dp: 13,
    i2c_sda: C6_I2C_SDA,
    i2c_scl: C6_I2C_SCL,
    peripheral_power: C6_PERIPHERAL_POWER,
    peripheral_power_inverted: true,
    status_led: Some(C6_STATUS_LED),
    board_led: Some(C6_BOARD_LED),
    soil_adc: SOIL_ADC_GPIO,
    active_pins: &C6_ACTIVE_PINS,
    max_pin_index: 30,
};

// ---------------------------------------------------------------------------
// ESP32-S3 (SparkFun Thing Plus)
// ---------------------------------------------------------------------------

const S3_PERIPHERAL_POWER: u8 = 45;
const S3_STATUS_LED: u8 = 46;
const S3_I2C_SDA: u8 = 8;
const S3_I2C_SCL: u8 = 9;

static S3_ACTIVE_PINS: [u8; 19] = [
    S3_PERIPHERAL_POWER,
    S3_STATUS_LED,
    SOIL_ADC_GPIO,
    S3_I2C_SDA,
    S3_I2C_SCL,
    // Strapping (isolating these trips the watchdog)
    0,
    3,
    // SPI flash
    26,
    27,
    28,
    29,
    30,
    31,
    32,
    // Octal PSRAM
    33,
    34,
    35,
    36,
    37,
];

pub const ESP32S3_PROFILE: BoardPinProfile = BoardPinProfile {
    variant: BoardVariant::Esp32S3,
    uart_tx: 43,
    uart_rx: 44,
    usb_dm: 19,
    usb_dp: 20,
    i2c_sda: S3_I2C_SDA,
    i2c_scl: S3_I2C_SCL,
    peripheral_power: S3_PERIPHERAL_POWER,
    peripheral_power_inverted: false,
    status_led: Some(S3_STATUS_LED),
    // The on-board LED shares GPIO8 with I2C SDA.
    board_led: None,
    soil_adc: SOIL_ADC_GPIO,
    active_pins: &S3_ACTIVE_PINS,
    max_pin_index: 48,
};

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

static FALLBACK_ACTIVE_PINS: [u8; 4] = [SOIL_ADC_GPIO, 8, 21, 22];

pub const FALLBACK_PROFILE: BoardPinProfile = BoardPinProfile {
    variant: BoardVariant::Unknown,
    uart_tx: 1,
    uart_rx: 3,
    usb_dm: 19,
    usb_dp: 20,
    i2c_sda: 21,
    i2c_scl: 22,
    peripheral_power: 45,
    peripheral_power_inverted: false,
    status_led: None,
    board_led: None,
    soil_adc: SOIL_ADC_GPIO,
    active_pins: &FALLBACK_ACTIVE_PINS,
    max_pin_index: 39,
};
