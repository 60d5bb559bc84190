//! Node assembly and lifecycle wiring.
//!
//! A [`Node`] owns one adapter per port plus the power-domain manager and
//! is the context every lifecycle callback receives.  The wiring below
//! fixes the start order of the subsystems; sleep callbacks are registered
//! in reverse so the LIFO sleep phase tears them down dependency-first:
//!
//! ```text
//!   wakeup: rail on → release holds → battery → WiFi → MQTT → soil
//!   sleep:  MQTT+WiFi off → soil stop → LED off → battery stop → rail off → power prep
//! ```

use log::info;

use super::ports::{
    BatteryPort, ConnectivityPort, MoisturePort, NodePorts, PeripheralPowerPort, PublishPort,
    StatusIndicatorPort,
};
use crate::error::{Error, SensorError};
use crate::lifecycle::{counted, log_and_continue, CallbackOutcome, LifecycleOrchestrator};
use crate::power::PowerDomainManager;

pub struct Node<P: NodePorts> {
    pub power: PowerDomainManager<P::Hal>,
    pub peripheral_power: P::PeripheralPower,
    pub battery: P::Battery,
    pub soil: P::Soil,
    pub wifi: P::Wifi,
    pub mqtt: P::Mqtt,
    pub led: P::Led,
}

impl<P: NodePorts> Node<P> {
    pub fn new(
        power: PowerDomainManager<P::Hal>,
        peripheral_power: P::PeripheralPower,
        battery: P::Battery,
        soil: P::Soil,
        wifi: P::Wifi,
        mqtt: P::Mqtt,
        led: P::Led,
    ) -> Self {
        Self {
            power,
            peripheral_power,
            battery,
            soil,
            wifi,
            mqtt,
            led,
        }
    }
}

pub const WAKEUP_LABELS: [&str; 6] = [
    "peripheral_power_on",
    "power_post_wakeup",
    "battery_monitor",
    "wifi",
    "mqtt",
    "soil_sensor",
];

/// In registration order; they run back to front.
pub const SLEEP_LABELS: [&str; 6] = [
    "power_prep_sleep",
    "peripheral_power_off",
    "battery_monitor_stop",
    "status_led_off",
    "soil_sensor_stop",
    "mqtt_disconnect",
];

/// Register the six wakeup and six sleep callbacks.  Returns how many
/// registrations were accepted.
pub fn register_all_lifecycle_callbacks<P: NodePorts>(
    orch: &mut LifecycleOrchestrator<Node<P>>,
) -> usize {
    info!("Node: registering lifecycle callbacks");
    let mut accepted = 0;

    // ── Wakeup (FIFO) ─────────────────────────────────────────

    // Rail first: the gauge and the probe sit behind it.
    accepted += usize::from(orch.on_wakeup(
        WAKEUP_LABELS[0],
        counted(WAKEUP_LABELS[0], |n: &mut Node<P>| {
            n.peripheral_power.power_on().map_err(Error::from)?;
            Ok(())
        }),
    ));
    // The pin may already be unheld, so a failed release is not counted.
    accepted += usize::from(orch.on_wakeup(
        WAKEUP_LABELS[1],
        log_and_continue(WAKEUP_LABELS[1], |n: &mut Node<P>| {
            n.power.post_wakeup().map_err(Error::from)?;
            Ok(())
        }),
    ));
    accepted += usize::from(orch.on_wakeup(
        WAKEUP_LABELS[2],
        counted(WAKEUP_LABELS[2], |n: &mut Node<P>| {
            n.battery.start().map_err(Error::from)?;
            Ok(())
        }),
    ));
    accepted += usize::from(orch.on_wakeup(
        WAKEUP_LABELS[3],
        counted(WAKEUP_LABELS[3], |n: &mut Node<P>| {
            n.wifi.connect().map_err(Error::from)?;
            Ok(())
        }),
    ));
    accepted += usize::from(orch.on_wakeup(
        WAKEUP_LABELS[4],
        counted(WAKEUP_LABELS[4], |n: &mut Node<P>| {
            n.mqtt.connect().map_err(Error::from)?;
            Ok(())
        }),
    ));
    accepted += usize::from(orch.on_wakeup(
        WAKEUP_LABELS[5],
        counted(WAKEUP_LABELS[5], |n: &mut Node<P>| match n.soil.start() {
            // Probe fed straight from the sensor rail.
            Err(SensorError::NoSupplyPin) => Ok(()),
            r => Ok(r.map_err(Error::from)?),
        }),
    ));

    // ── Sleep (LIFO) ──────────────────────────────────────────

    accepted += usize::from(orch.on_sleep(SLEEP_LABELS[0], |n: &mut Node<P>| {
        let report = n.power.prepare_for_sleep();
        if report.errors > 0 {
            CallbackOutcome::Failed
        } else {
            CallbackOutcome::Completed
        }
    }));
    accepted += usize::from(orch.on_sleep(
        SLEEP_LABELS[1],
        log_and_continue(SLEEP_LABELS[1], |n: &mut Node<P>| {
            n.peripheral_power.power_off().map_err(Error::from)?;
            Ok(())
        }),
    ));
    accepted += usize::from(orch.on_sleep(SLEEP_LABELS[2], |n: &mut Node<P>| n.battery.stop()));
    accepted += usize::from(orch.on_sleep(SLEEP_LABELS[3], |n: &mut Node<P>| n.led.shutdown()));
    accepted += usize::from(orch.on_sleep(SLEEP_LABELS[4], |n: &mut Node<P>| n.soil.stop()));
    accepted += usize::from(orch.on_sleep(SLEEP_LABELS[5], |n: &mut Node<P>| {
        n.mqtt.disconnect();
        n.wifi.shutdown();
    }));

    info!("Node: {} lifecycle callbacks registered", accepted);
    accepted
}
