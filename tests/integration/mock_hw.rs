//! Mock node adapters for integration tests.
//!
//! Every port shares one call log, so tests can assert on the interleaving
//! of power, sensor, network and LED calls across a whole wake cycle
//! without touching real GPIO registers.

use std::cell::RefCell;
use std::rc::Rc;

use soilnode::app::node::{register_all_lifecycle_callbacks, Node};
use soilnode::app::ports::{
    BatteryPort, ConnectivityPort, Metric, MoisturePort, NodePorts, PeripheralPowerPort,
    PowerDomain, PowerHalPort, PublishPort, SleepControlPort, StatusCode, StatusIndicatorPort,
};
use soilnode::error::{CommsError, HalError, SensorError};
use soilnode::lifecycle::LifecycleOrchestrator;
use soilnode::pins::BoardVariant;
use soilnode::power::PowerDomainManager;
use soilnode::sensors::battery::BatteryStatus;
use soilnode::sensors::soil::SoilReading;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RadioOff,
    PowerDown(PowerDomain),
    Isolate(u8),
    HoldEnable(u8),
    HoldDisable(u8),
    FlushConsole,
    RailOn,
    RailOff,
    BatteryStart,
    BatteryStop,
    BatteryRead,
    SoilStart,
    SoilStop,
    SoilRead,
    WifiConnect,
    WifiShutdown,
    MqttConnect,
    Publish(Metric, String),
    MqttDisconnect,
    Led(StatusCode),
    LedShutdown,
    DisableWakeSources,
    ArmTimer(u64),
}

pub type Log = Rc<RefCell<Vec<Call>>>;

fn record(log: &Log, call: Call) {
    log.borrow_mut().push(call);
}

// ── Power HAL ─────────────────────────────────────────────────

pub struct MockHal {
    pub log: Log,
    pub fail_hold: bool,
    pub fail_release: bool,
}

impl PowerHalPort for MockHal {
    fn radio_off(&mut self) -> Result<(), HalError> {
        record(&self.log, Call::RadioOff);
        Ok(())
    }

    fn power_down_domain(&mut self, domain: PowerDomain) -> Result<(), HalError> {
        record(&self.log, Call::PowerDown(domain));
        Ok(())
    }

    fn isolate_pin(&mut self, pin: u8) -> Result<(), HalError> {
        record(&self.log, Call::Isolate(pin));
        Ok(())
    }

    fn hold_enable(&mut self, pin: u8) -> Result<(), HalError> {
        record(&self.log, Call::HoldEnable(pin));
        if self.fail_hold {
            return Err(HalError::HoldEnableFailed { pin, code: 258 });
        }
        Ok(())
    }

    fn hold_disable(&mut self, pin: u8) -> Result<(), HalError> {
        record(&self.log, Call::HoldDisable(pin));
        if self.fail_release {
            return Err(HalError::HoldReleaseFailed { pin, code: 258 });
        }
        Ok(())
    }

    fn flush_console(&mut self) {
        record(&self.log, Call::FlushConsole);
    }

    fn delay_ms(&mut self, _ms: u32) {}
}

// ── Sensor rail ───────────────────────────────────────────────

pub struct MockRail {
    pub log: Log,
    pub on: bool,
    pub fail: bool,
}

impl PeripheralPowerPort for MockRail {
    fn power_on(&mut self) -> Result<(), HalError> {
        record(&self.log, Call::RailOn);
        if self.fail {
            return Err(HalError::GpioConfigFailed { pin: 45, code: -1 });
        }
        self.on = true;
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), HalError> {
        record(&self.log, Call::RailOff);
        self.on = false;
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

// ── Sensors ───────────────────────────────────────────────────

pub struct MockBattery {
    pub log: Log,
    pub status: BatteryStatus,
    pub fail_start: bool,
}

impl BatteryPort for MockBattery {
    fn start(&mut self) -> Result<(), SensorError> {
        record(&self.log, Call::BatteryStart);
        if self.fail_start {
            return Err(SensorError::GaugeNotFound { attempts: 10 });
        }
        Ok(())
    }

    fn stop(&mut self) {
        record(&self.log, Call::BatteryStop);
    }

    fn read_status(&mut self) -> BatteryStatus {
        record(&self.log, Call::BatteryRead);
        self.status
    }
}

pub struct MockSoil {
    pub log: Log,
    pub reading: SoilReading,
    pub start_result: Result<(), SensorError>,
}

impl MoisturePort for MockSoil {
    fn start(&mut self) -> Result<(), SensorError> {
        record(&self.log, Call::SoilStart);
        self.start_result
    }

    fn stop(&mut self) {
        record(&self.log, Call::SoilStop);
    }

    fn read(&mut self) -> SoilReading {
        record(&self.log, Call::SoilRead);
        self.reading
    }
}

// ── Network ───────────────────────────────────────────────────

pub struct MockWifi {
    pub log: Log,
    pub fail: bool,
    pub connected: bool,
}

impl ConnectivityPort for MockWifi {
    fn connect(&mut self) -> Result<(), CommsError> {
        record(&self.log, Call::WifiConnect);
        if self.fail {
            return Err(CommsError::WifiConnectFailed);
        }
        self.connected = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        record(&self.log, Call::WifiShutdown);
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

pub struct MockMqtt {
    pub log: Log,
    pub fail_connect: bool,
    pub fail_publish: bool,
    pub connected: bool,
}

impl PublishPort for MockMqtt {
    fn connect(&mut self) -> Result<(), CommsError> {
        record(&self.log, Call::MqttConnect);
        if self.fail_connect {
            return Err(CommsError::MqttConnectFailed);
        }
        self.connected = true;
        Ok(())
    }

    fn publish(&mut self, metric: Metric, payload: &str) -> Result<(), CommsError> {
        record(&self.log, Call::Publish(metric, payload.to_string()));
        if !self.connected {
            return Err(CommsError::MqttNotConnected);
        }
        if self.fail_publish {
            return Err(CommsError::MqttPublishFailed);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        record(&self.log, Call::MqttDisconnect);
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ── Status LED ────────────────────────────────────────────────

pub struct MockLed {
    pub log: Log,
}

impl StatusIndicatorPort for MockLed {
    fn show(&mut self, status: StatusCode) {
        record(&self.log, Call::Led(status));
    }

    fn shutdown(&mut self) {
        record(&self.log, Call::LedShutdown);
    }
}

// ── Sleep control ─────────────────────────────────────────────

pub struct MockSleep {
    pub log: Log,
    pub fail_timer: bool,
}

impl SleepControlPort for MockSleep {
    fn disable_all_wake_sources(&mut self) -> Result<(), HalError> {
        record(&self.log, Call::DisableWakeSources);
        Ok(())
    }

    fn enable_timer_wakeup(&mut self, duration_us: u64) -> Result<(), HalError> {
        record(&self.log, Call::ArmTimer(duration_us));
        if self.fail_timer {
            return Err(HalError::WakeSourceFailed(-1));
        }
        Ok(())
    }

    fn suspend(&mut self) -> ! {
        panic!("suspended");
    }
}

// ── Port bundle ───────────────────────────────────────────────

pub struct MockPorts;

impl NodePorts for MockPorts {
    type Hal = MockHal;
    type PeripheralPower = MockRail;
    type Battery = MockBattery;
    type Soil = MockSoil;
    type Wifi = MockWifi;
    type Mqtt = MockMqtt;
    type Led = MockLed;
}

pub type MockNode = Node<MockPorts>;

/// Charged, discharging slowly.
pub fn healthy_battery() -> BatteryStatus {
    BatteryStatus {
        voltage: 3.912,
        state_of_charge: 81.5,
        change_rate: -0.416,
        is_valid: true,
        is_charging: false,
        is_low_voltage: false,
        is_high_voltage: false,
    }
}

pub fn low_battery() -> BatteryStatus {
    BatteryStatus {
        voltage: 3.301,
        state_of_charge: 4.0,
        change_rate: -1.248,
        is_low_voltage: true,
        ..healthy_battery()
    }
}

/// A node with every mock healthy, plus the orchestrator wired the way
/// the firmware wires it.
pub struct Rig {
    pub log: Log,
    pub node: MockNode,
    pub orch: LifecycleOrchestrator<MockNode>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(variant: BoardVariant) -> Self {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let hal = MockHal {
            log: log.clone(),
            fail_hold: false,
            fail_release: false,
        };
        let node = Node::new(
            PowerDomainManager::new(hal, variant.profile()),
            MockRail {
                log: log.clone(),
                on: false,
                fail: false,
            },
            MockBattery {
                log: log.clone(),
                status: healthy_battery(),
                fail_start: false,
            },
            MockSoil {
                log: log.clone(),
                reading: SoilReading {
                    raw: 2100,
                    moisture_percent: 46,
                },
                start_result: Err(SensorError::NoSupplyPin),
            },
            MockWifi {
                log: log.clone(),
                fail: false,
                connected: false,
            },
            MockMqtt {
                log: log.clone(),
                fail_connect: false,
                fail_publish: false,
                connected: false,
            },
            MockLed { log: log.clone() },
        );
        let mut orch = LifecycleOrchestrator::new();
        register_all_lifecycle_callbacks(&mut orch);
        Self { log, node, orch }
    }

    /// Make every wakeup step fail.  The hold release is logged rather
    /// than counted, so five of the six callbacks report a failure.
    pub fn break_everything(&mut self) {
        self.node.peripheral_power.fail = true;
        self.node.power.hal_mut().fail_release = true;
        self.node.battery.fail_start = true;
        self.node.wifi.fail = true;
        self.node.mqtt.fail_connect = true;
        self.node.soil.start_result = Err(SensorError::ProbeSupplyFailed { pin: 4 });
    }

    pub fn sleep_control(&self) -> MockSleep {
        MockSleep {
            log: self.log.clone(),
            fail_timer: false,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn publishes(&self) -> Vec<(Metric, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Publish(m, p) => Some((m, p)),
                _ => None,
            })
            .collect()
    }

    pub fn leds(&self) -> Vec<StatusCode> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Led(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Position of the first occurrence of `call`.
    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }
}
