//! SoilNode firmware entry point
//!
//! One pass per boot: wake the subsystems, measure, publish, sleep.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EspPowerHal      PeripheralPower   BatteryMonitor   SoilSensor│
//! │  EspSleepControl  WifiAdapter       MqttAdapter      StatusLed │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  NodeService · LifecycleOrchestrator · PowerDomainMgr  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  DeepSleepScheduler (timer wake, never returns)                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::delay::Delay;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Output, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::rmt::config::TransmitConfig;
use esp_idf_hal::rmt::TxRmtDriver;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use soilnode::adapters::device_id;
use soilnode::adapters::mqtt::MqttAdapter;
use soilnode::adapters::power_hal::{EspPowerHal, EspSleepControl};
use soilnode::adapters::wifi::WifiAdapter;
use soilnode::app::node::{register_all_lifecycle_callbacks, Node};
use soilnode::app::ports::NodePorts;
use soilnode::app::service::NodeService;
use soilnode::config::NodeConfig;
use soilnode::drivers::hw_init::AdcPin;
use soilnode::drivers::peripheral_power::PeripheralPower;
use soilnode::drivers::status_led::{StatusLed, Ws2812};
use soilnode::error::Error;
use soilnode::lifecycle::LifecycleOrchestrator;
use soilnode::power::sleep::DeepSleepScheduler;
use soilnode::power::PowerDomainManager;
use soilnode::sensors::battery::BatteryMonitor;
use soilnode::sensors::soil::SoilSensor;

/// Baked-in configuration override.
const NODE_CONFIG_JSON: &str = include_str!("../config/node.json");

const I2C_BAUDRATE_HZ: u32 = 100_000;

// ── Port bundle ───────────────────────────────────────────────

struct EspPorts;

impl NodePorts for EspPorts {
    type Hal = EspPowerHal;
    type PeripheralPower = PeripheralPower<PinDriver<'static, AnyOutputPin, Output>, Delay>;
    type Battery = BatteryMonitor<I2cDriver<'static>, Delay>;
    type Soil = SoilSensor<AdcPin, Delay>;
    type Wifi = WifiAdapter<Delay>;
    type Mqtt = MqttAdapter<Delay>;
    type Led = StatusLed<Option<Ws2812>, Delay>;
}

fn load_config() -> NodeConfig {
    match NodeConfig::from_json(NODE_CONFIG_JSON) {
        Ok(cfg) => {
            info!("Config loaded from config/node.json");
            cfg
        }
        Err(e) => {
            warn!("Config override rejected ({}), using defaults", e);
            NodeConfig::default()
        }
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SoilNode v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config();
    if !config.serial_console {
        info!("Serial console disabled by config");
        log::set_max_level(log::LevelFilter::Off);
    }
    let profile = config.board.profile();
    info!("Board: {}", profile.variant);

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // SAFETY: each GPIO number below is claimed exactly once and comes
    // from the board profile.
    let rail_pin = unsafe { AnyOutputPin::new(profile.peripheral_power as _) };
    let sda = unsafe { AnyIOPin::new(profile.i2c_sda as _) };
    let scl = unsafe { AnyIOPin::new(profile.i2c_scl as _) };

    let peripheral_power = PeripheralPower::new(
        PinDriver::output(rail_pin)?,
        Delay::new_default(),
        profile.peripheral_power,
        profile.peripheral_power_inverted,
    );

    let i2c_config = I2cConfig::new().baudrate(Hertz(I2C_BAUDRATE_HZ));
    let i2c = I2cDriver::new(peripherals.i2c0, sda, scl, &i2c_config)?;
    let battery = BatteryMonitor::new(i2c, Delay::new_default());

    let adc = AdcPin::new(profile.soil_adc).map_err(Error::from)?;
    let soil = SoilSensor::new(adc, Delay::new_default(), config.soil, profile.soil_adc);

    let led_out = match profile.status_led {
        Some(pin) => {
            // SAFETY: see above.
            let led_pin = unsafe { AnyOutputPin::new(pin as _) };
            let tx = TxRmtDriver::new(
                peripherals.rmt.channel0,
                led_pin,
                &TransmitConfig::new().clock_divider(1),
            )?;
            Some(Ws2812::new(tx))
        }
        None => None,
    };
    let led = StatusLed::new(led_out, Delay::new_default(), profile.status_led);

    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
    let wifi = WifiAdapter::new(
        BlockingWifi::wrap(esp_wifi, sysloop)?,
        &config.wifi,
        Delay::new_default(),
    );

    let client_id = device_id::client_id(&device_id::read_mac());
    info!("Client ID: {}", client_id);
    let mqtt = MqttAdapter::new(&config.mqtt, client_id, Delay::new_default());

    let power = PowerDomainManager::new(EspPowerHal::new(), profile);

    let mut node: Node<EspPorts> =
        Node::new(power, peripheral_power, battery, soil, wifi, mqtt, led);

    // ── 4. Lifecycle ──────────────────────────────────────────
    let mut orch = LifecycleOrchestrator::new();
    register_all_lifecycle_callbacks(&mut orch);

    let mut scheduler = DeepSleepScheduler::new(EspSleepControl::new());
    let mut service = NodeService::new(config);

    // ── 5. Wake → measure → publish → sleep ───────────────────
    service.run(&mut scheduler, &mut orch, &mut node)
}
