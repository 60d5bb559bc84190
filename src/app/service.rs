//! Node service: one wake cycle from boot to deep sleep.
//!
//! [`NodeService`] drives the lifecycle orchestrator, runs the measurement
//! and publish cycle, and decides how long the node sleeps.  All I/O flows
//! through the ports bundled in [`Node`], so the whole cycle runs against
//! mock adapters in tests.
//!
//! ```text
//!  Booting ─▶ Awake(status) ─▶ Operating ─▶ PreparingSleep ─▶ Isolated ─▶ Sleeping
//!                 │                                 ▲
//!                 └──── total wakeup failure ───────┘
//! ```

use core::fmt::{self, Write};

use log::{error, info, warn};

use super::node::Node;
use super::ports::{
    BatteryPort, Metric, MoisturePort, NodePorts, PublishPort, SleepControlPort, StatusCode,
    StatusIndicatorPort,
};
use crate::config::NodeConfig;
use crate::lifecycle::{LifecycleOrchestrator, LifecycleStatus};
use crate::power::sleep::DeepSleepScheduler;

type Payload = heapless::String<16>;

// ───────────────────────────────────────────────────────────────
// States and sleep plans
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Booting,
    /// Wakeup phase finished with this classification.
    Awake(LifecycleStatus),
    Operating,
    PreparingSleep,
    /// Sleep phase done and pins parked.
    Isolated,
    Sleeping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepReason {
    /// Readings published.
    Normal,
    /// Cell low and not charging.
    LowBattery,
    /// Fuel gauge gave no usable reading.
    InvalidBattery,
    /// Every wakeup callback failed.
    Conservation,
}

impl fmt::Display for SleepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::LowBattery => write!(f, "low battery"),
            Self::InvalidBattery => write!(f, "invalid battery"),
            Self::Conservation => write!(f, "conservation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepPlan {
    pub reason: SleepReason,
    pub secs: u64,
}

// ───────────────────────────────────────────────────────────────
// NodeService
// ───────────────────────────────────────────────────────────────

pub struct NodeService {
    config: NodeConfig,
    state: NodeState,
    published: u8,
    publish_failures: u8,
}

impl NodeService {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            state: NodeState::Booting,
            published: 0,
            publish_failures: 0,
        }
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Values delivered by the last [`run_cycle`](Self::run_cycle).
    pub fn published(&self) -> u8 {
        self.published
    }

    pub fn publish_failures(&self) -> u8 {
        self.publish_failures
    }

    fn transition(&mut self, to: NodeState) {
        if self.state != to {
            info!("Node: {:?} -> {:?}", self.state, to);
            self.state = to;
        }
    }

    fn plan(&self, reason: SleepReason) -> SleepPlan {
        let secs = match reason {
            SleepReason::Normal => self.config.normal_sleep_secs,
            SleepReason::LowBattery | SleepReason::InvalidBattery => {
                self.config.low_battery_sleep_secs
            }
            SleepReason::Conservation => self.config.conservation_sleep_secs,
        };
        SleepPlan { reason, secs }
    }

    // ── Wakeup ────────────────────────────────────────────────

    /// Run the wakeup phase.  Returns a conservation sleep plan when every
    /// subsystem failed; a partial failure is logged and the cycle goes on.
    pub fn wake<P: NodePorts>(
        &mut self,
        orch: &mut LifecycleOrchestrator<Node<P>>,
        node: &mut Node<P>,
    ) -> Option<SleepPlan> {
        let status = orch.run_wakeup(node);
        self.transition(NodeState::Awake(status));
        match status {
            LifecycleStatus::Success => None,
            LifecycleStatus::PartialFailure => {
                warn!("Node: some wakeup callbacks failed, continuing");
                orch.log_metrics();
                None
            }
            LifecycleStatus::TotalFailure => {
                error!("Node: CRITICAL: wakeup failed completely");
                orch.log_metrics();
                Some(self.plan(SleepReason::Conservation))
            }
        }
    }

    // ── Measurement cycle ─────────────────────────────────────

    /// Read the battery and the probe, publish, and pick the next sleep.
    pub fn run_cycle<P: NodePorts>(&mut self, node: &mut Node<P>) -> SleepPlan {
        self.transition(NodeState::Operating);
        self.published = 0;
        self.publish_failures = 0;

        let battery = node.battery.read_status();
        info!("Node: {}", battery);

        if !battery.is_valid {
            warn!("Node: battery status invalid, sleeping to conserve power");
            node.led.show(StatusCode::BatteryInvalid);
            return self.plan(SleepReason::InvalidBattery);
        }
        if battery.needs_conservation() {
            warn!("Node: battery voltage low, sleeping to conserve power");
            node.led.show(StatusCode::BatteryChargeLow);
            return self.plan(SleepReason::LowBattery);
        }

        for code in battery.indications() {
            node.led.show(code);
        }

        self.publish_f32(node, Metric::BatteryVoltage, battery.voltage, 3);
        self.publish_f32(node, Metric::BatteryCharge, battery.state_of_charge, 1);
        self.publish_f32(node, Metric::BatteryChangeRate, battery.change_rate, 3);

        let soil = node.soil.read();
        info!(
            "Node: soil moisture {} ({}%)",
            soil.raw, soil.moisture_percent
        );
        self.publish_int(node, Metric::MoisturePercent, u32::from(soil.moisture_percent));
        self.publish_int(node, Metric::MoistureRaw, u32::from(soil.raw));

        info!(
            "Node: cycle complete, {} published / {} failed",
            self.published, self.publish_failures
        );
        node.led.show(StatusCode::CycleComplete);
        self.plan(SleepReason::Normal)
    }

    fn publish_f32<P: NodePorts>(
        &mut self,
        node: &mut Node<P>,
        metric: Metric,
        value: f32,
        decimals: usize,
    ) {
        let mut payload = Payload::new();
        // Sixteen bytes hold any gauge value at three decimals.
        let _ = write!(payload, "{:.*}", decimals, value);
        self.publish(node, metric, &payload);
    }

    fn publish_int<P: NodePorts>(&mut self, node: &mut Node<P>, metric: Metric, value: u32) {
        let mut payload = Payload::new();
        let _ = write!(payload, "{}", value);
        self.publish(node, metric, &payload);
    }

    fn publish<P: NodePorts>(&mut self, node: &mut Node<P>, metric: Metric, payload: &str) {
        match node.mqtt.publish(metric, payload) {
            Ok(()) => self.published += 1,
            Err(e) => {
                warn!("Node: {:?} not published: {}", metric, e);
                self.publish_failures += 1;
                node.led.show(StatusCode::PublishError);
            }
        }
    }

    // ── Sleep ─────────────────────────────────────────────────

    /// Run the sleep phase and arm the timer.  Falls back to the emergency
    /// isolation pass when the phase failed outright or never parked the
    /// pins.
    pub fn prepare_sleep<P: NodePorts, S: SleepControlPort>(
        &mut self,
        scheduler: &mut DeepSleepScheduler<S>,
        orch: &mut LifecycleOrchestrator<Node<P>>,
        node: &mut Node<P>,
        plan: SleepPlan,
    ) -> LifecycleStatus {
        info!("Node: {} sleep for {} s", plan.reason, plan.secs);
        self.transition(NodeState::PreparingSleep);
        let status = scheduler.prepare(orch, node, plan.secs);
        if status.is_total_failure() || !node.power.is_prepared() {
            node.power.emergency_prepare_for_sleep();
        }
        self.transition(NodeState::Isolated);
        status
    }

    /// Wake, measure, publish and sleep.  Never returns.
    pub fn run<P: NodePorts, S: SleepControlPort>(
        &mut self,
        scheduler: &mut DeepSleepScheduler<S>,
        orch: &mut LifecycleOrchestrator<Node<P>>,
        node: &mut Node<P>,
    ) -> ! {
        let plan = match self.wake(orch, node) {
            Some(plan) => plan,
            None => self.run_cycle(node),
        };
        self.prepare_sleep(scheduler, orch, node, plan);
        self.transition(NodeState::Sleeping);
        scheduler.suspend()
    }
}
