//! Addressable RGB status LED.
//!
//! Status codes map to a colour and a pulse pattern; the driver plays the
//! pattern synchronously and leaves the LED dark afterwards.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: one WS2812 pixel clocked out over RMT ([`Ws2812`]).
//! On host/test: any [`RgbWriter`]; [`SimRgb`] records the last colour.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::app::ports::StatusIndicatorPort;
use crate::drivers::hw_init;
use crate::error::HalError;

/// Channel brightness ceiling.
pub const RGB_BRIGHTNESS: u8 = 64;

// ── Status codes ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusCode {
    Error = 0x01,
    Warning = 0x02,
    Ok = 0x03,

    BatteryChargeLow = 0x10,
    BatteryCellVoltLow = 0x11,
    BatteryCellVoltHigh = 0x12,
    BatteryCharging = 0x13,
    BatteryDischarging = 0x14,
    BatteryNotCharging = 0x15,
    BatteryOk = 0x16,
    BatteryBelow75 = 0x17,
    BatteryBelow50 = 0x18,
    BatteryBelow30 = 0x19,
    BatteryInvalid = 0x1A,

    WifiDisconnected = 0x20,
    WifiConnecting = 0x21,
    WifiConnected = 0x22,

    PublishOk = 0x30,
    PublishError = 0x31,

    /// End-of-cycle success blink.
    CycleComplete = 0x40,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Off,
    Red,
    Yellow,
    Orange,
    Green,
    Blue,
    Purple,
    Cyan,
    White,
}

impl Colour {
    pub const fn rgb(self) -> (u8, u8, u8) {
        const B: u8 = RGB_BRIGHTNESS;
        match self {
            Self::Off => (0, 0, 0),
            Self::Red => (B, 0, 0),
            Self::Yellow => (B, B / 2, 0),
            Self::Orange => (B, B / 4, 0),
            Self::Green => (0, B, 0),
            Self::Blue => (0, 0, B),
            Self::Purple => (B - 12, 0, B),
            Self::Cyan => (0, B, B),
            Self::White => (B, B, B),
        }
    }
}

/// `count` flashes of `colour`, each `on_ms` lit then `off_ms` dark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    pub colour: Colour,
    pub count: u8,
    pub on_ms: u16,
    pub off_ms: u16,
}

const fn normal(count: u8, colour: Colour) -> Pulse {
    Pulse {
        colour,
        count,
        on_ms: 250,
        off_ms: 250,
    }
}

const fn fast(count: u8, colour: Colour) -> Pulse {
    Pulse {
        colour,
        count,
        on_ms: 125,
        off_ms: 125,
    }
}

impl StatusCode {
    pub fn pattern(self) -> &'static [Pulse] {
        use Colour::*;
        match self {
            Self::Error => const { &[normal(2, Red)] },
            Self::Warning => const { &[normal(2, Yellow)] },
            Self::Ok => const { &[normal(2, Green)] },
            Self::BatteryBelow75 => const { &[fast(1, Cyan)] },
            Self::BatteryBelow50 => const { &[fast(1, Yellow)] },
            Self::BatteryBelow30 => const { &[fast(1, Orange)] },
            Self::BatteryChargeLow | Self::BatteryCellVoltLow => const { &[fast(3, Orange)] },
            Self::BatteryCellVoltHigh => const { &[fast(3, Red)] },
            Self::BatteryCharging => const { &[fast(1, Blue)] },
            Self::BatteryDischarging => const { &[fast(1, Green)] },
            Self::BatteryNotCharging => const { &[fast(1, Purple)] },
            Self::BatteryInvalid => const { &[
                fast(1, Red),
                fast(1, Orange),
                fast(1, Red),
                fast(1, Purple),
            ] },
            Self::BatteryOk => const { &[fast(1, White)] },
            Self::WifiDisconnected => const { &[fast(2, Red)] },
            Self::WifiConnecting => const { &[fast(1, Yellow)] },
            Self::WifiConnected | Self::PublishOk => const { &[fast(1, Green)] },
            Self::PublishError => const { &[fast(1, Orange)] },
            Self::CycleComplete => const { &[normal(1, White)] },
        }
    }
}

// ── Output ────────────────────────────────────────────────────

/// Writes one RGB value to the LED.
pub trait RgbWriter {
    fn write_rgb(&mut self, r: u8, g: u8, b: u8) -> Result<(), HalError>;
}

/// Host stand-in.
#[derive(Debug, Default)]
pub struct SimRgb {
    pub last: (u8, u8, u8),
    pub writes: usize,
}

impl RgbWriter for SimRgb {
    fn write_rgb(&mut self, r: u8, g: u8, b: u8) -> Result<(), HalError> {
        self.last = (r, g, b);
        self.writes += 1;
        Ok(())
    }
}

/// Boards without a status LED carry `None`.
impl<W: RgbWriter> RgbWriter for Option<W> {
    fn write_rgb(&mut self, r: u8, g: u8, b: u8) -> Result<(), HalError> {
        match self {
            Some(w) => w.write_rgb(r, g, b),
            None => Ok(()),
        }
    }
}

#[cfg(target_os = "espidf")]
pub use ws2812::Ws2812;

#[cfg(target_os = "espidf")]
mod ws2812 {
    use core::time::Duration;

    use esp_idf_hal::rmt::{FixedLengthSignal, PinState, Pulse, TxRmtDriver};

    use super::RgbWriter;
    use crate::error::HalError;

    /// Single WS2812 pixel on an RMT channel.
    pub struct Ws2812 {
        tx: TxRmtDriver<'static>,
    }

    impl Ws2812 {
        pub fn new(tx: TxRmtDriver<'static>) -> Self {
            Self { tx }
        }

        fn send(&mut self, grb: u32) -> Result<(), esp_idf_svc::sys::EspError> {
            let ticks_hz = self.tx.counter_clock()?;
            let t0h = Pulse::new_with_duration(ticks_hz, PinState::High, &Duration::from_nanos(350))?;
            let t0l = Pulse::new_with_duration(ticks_hz, PinState::Low, &Duration::from_nanos(800))?;
            let t1h = Pulse::new_with_duration(ticks_hz, PinState::High, &Duration::from_nanos(700))?;
            let t1l = Pulse::new_with_duration(ticks_hz, PinState::Low, &Duration::from_nanos(600))?;
            let mut signal = FixedLengthSignal::<24>::new();
            for i in (0..24).rev() {
                let bit = (grb >> i) & 1 != 0;
                let pair = if bit { (t1h, t1l) } else { (t0h, t0l) };
                signal.set(23 - i as usize, &pair)?;
            }
            self.tx.start_blocking(&signal)
        }
    }

    impl RgbWriter for Ws2812 {
        fn write_rgb(&mut self, r: u8, g: u8, b: u8) -> Result<(), HalError> {
            let grb = (u32::from(g) << 16) | (u32::from(r) << 8) | u32::from(b);
            self.send(grb)
                .map_err(|e| HalError::GpioConfigFailed { pin: 0, code: e.code() })
        }
    }
}

// ── Driver ────────────────────────────────────────────────────

pub struct StatusLed<W, D> {
    out: W,
    delay: D,
    pin: Option<u8>,
    current: Colour,
}

impl<W: RgbWriter, D: DelayNs> StatusLed<W, D> {
    /// `pin` is the LED data line, parked on shutdown.  `None` for
    /// boards without a status LED; every call becomes a no-op.
    pub fn new(out: W, delay: D, pin: Option<u8>) -> Self {
        Self {
            out,
            delay,
            pin,
            current: Colour::Off,
        }
    }

    pub fn set_colour(&mut self, colour: Colour) {
        if self.pin.is_none() {
            return;
        }
        let (r, g, b) = colour.rgb();
        if let Err(e) = self.out.write_rgb(r, g, b) {
            warn!("StatusLed: {}", e);
        }
        self.current = colour;
    }

    pub fn off(&mut self) {
        self.set_colour(Colour::Off);
    }

    pub fn current_colour(&self) -> Colour {
        self.current
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn play(&mut self, pattern: &[Pulse]) {
        for pulse in pattern {
            for _ in 0..pulse.count {
                self.set_colour(pulse.colour);
                self.delay.delay_ms(u32::from(pulse.on_ms));
                self.off();
                self.delay.delay_ms(u32::from(pulse.off_ms));
            }
        }
    }
}

impl<W: RgbWriter, D: DelayNs> StatusIndicatorPort for StatusLed<W, D> {
    fn show(&mut self, status: StatusCode) {
        debug!("StatusLed: {:?} (0x{:02X})", status, status as u8);
        self.play(status.pattern());
    }

    fn shutdown(&mut self) {
        let Some(pin) = self.pin else {
            return;
        };
        self.off();
        if let Err(e) = hw_init::gpio_isolate(pin) {
            warn!("StatusLed: {}", e);
        }
        info!("StatusLed: shut down (GPIO{} pulled down)", pin);
    }
}
