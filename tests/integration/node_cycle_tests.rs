//! Whole wake cycles against mock adapters: wiring order, the measurement
//! and publish pass, and the sleep decisions.

use soilnode::app::node::{SLEEP_LABELS, WAKEUP_LABELS};
use soilnode::app::ports::{ConnectivityPort, Metric, PowerDomain, PublishPort, StatusCode};
use soilnode::app::service::{NodeService, NodeState, SleepPlan, SleepReason};
use soilnode::config::NodeConfig;
use soilnode::lifecycle::{counted, LifecycleOrchestrator, LifecycleStatus, Phase};
use soilnode::pins::BoardVariant;
use soilnode::power::sleep::DeepSleepScheduler;
use soilnode::sensors::battery::BatteryStatus;

use super::mock_hw::{low_battery, Call, MockNode, Rig};

fn service() -> NodeService {
    NodeService::new(NodeConfig::default())
}

// ── Wiring ────────────────────────────────────────────────────

#[test]
fn registers_six_callbacks_per_phase() {
    let rig = Rig::new(BoardVariant::Esp32S3);
    assert_eq!(
        rig.orch.registry(Phase::Wakeup).labels().collect::<Vec<_>>(),
        WAKEUP_LABELS
    );
    assert_eq!(
        rig.orch.registry(Phase::Sleep).labels().collect::<Vec<_>>(),
        SLEEP_LABELS
    );
    let m = rig.orch.get_metrics();
    assert_eq!((m.wakeup_registered, m.sleep_registered), (6, 6));
}

#[test]
fn wakeup_starts_subsystems_in_dependency_order() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    let status = rig.orch.run_wakeup(&mut rig.node);
    assert_eq!(status, LifecycleStatus::Success);
    assert_eq!(
        rig.calls(),
        vec![
            Call::RailOn,
            Call::HoldDisable(45),
            Call::BatteryStart,
            Call::WifiConnect,
            Call::MqttConnect,
            Call::SoilStart,
        ]
    );
}

#[test]
fn sleep_tears_down_in_reverse_order() {
    let mut rig = Rig::new(BoardVariant::Esp32C6);
    rig.orch.run_wakeup(&mut rig.node);
    rig.clear();

    let status = rig.orch.run_sleep_prep(&mut rig.node);
    assert_eq!(status, LifecycleStatus::Success);

    let order = [
        Call::MqttDisconnect,
        Call::WifiShutdown,
        Call::SoilStop,
        Call::LedShutdown,
        Call::BatteryStop,
        Call::RailOff,
        Call::RadioOff,
        Call::HoldEnable(15),
        Call::FlushConsole,
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|c| rig.position(c).unwrap_or_else(|| panic!("{c:?} missing")))
        .collect();
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "teardown order violated: {positions:?}"
    );
    assert!(rig.node.power.is_prepared());
}

#[test]
fn rail_hold_is_latched_only_after_rail_is_off() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    rig.orch.run_sleep_prep(&mut rig.node);
    let off = rig.position(&Call::RailOff).unwrap();
    let hold = rig.position(&Call::HoldEnable(45)).unwrap();
    assert!(off < hold);
    assert!(rig.calls().contains(&Call::PowerDown(PowerDomain::Xtal)));
}

// ── Measurement cycle ─────────────────────────────────────────

#[test]
fn healthy_cycle_publishes_every_metric() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    let mut svc = service();
    assert_eq!(svc.wake(&mut rig.orch, &mut rig.node), None);
    assert_eq!(svc.state(), NodeState::Awake(LifecycleStatus::Success));

    let plan = svc.run_cycle(&mut rig.node);
    assert_eq!(
        plan,
        SleepPlan {
            reason: SleepReason::Normal,
            secs: 7 * 3600
        }
    );
    assert_eq!(
        rig.publishes(),
        vec![
            (Metric::BatteryVoltage, "3.912".to_string()),
            (Metric::BatteryCharge, "81.5".to_string()),
            (Metric::BatteryChangeRate, "-0.416".to_string()),
            (Metric::MoisturePercent, "46".to_string()),
            (Metric::MoistureRaw, "2100".to_string()),
        ]
    );
    assert_eq!(rig.leds(), vec![StatusCode::BatteryOk, StatusCode::CycleComplete]);
    assert_eq!((svc.published(), svc.publish_failures()), (5, 0));
    assert_eq!(svc.state(), NodeState::Operating);
}

#[test]
fn invalid_battery_skips_publishing() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    rig.node.battery.status = BatteryStatus::INVALID;
    let mut svc = service();
    svc.wake(&mut rig.orch, &mut rig.node);

    let plan = svc.run_cycle(&mut rig.node);
    assert_eq!(plan.reason, SleepReason::InvalidBattery);
    assert_eq!(plan.secs, 10 * 3600);
    assert!(rig.publishes().is_empty());
    assert_eq!(rig.leds(), vec![StatusCode::BatteryInvalid]);
    assert!(!rig.calls().contains(&Call::SoilRead));
}

#[test]
fn low_battery_not_charging_conserves() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    rig.node.battery.status = low_battery();
    let mut svc = service();
    svc.wake(&mut rig.orch, &mut rig.node);

    let plan = svc.run_cycle(&mut rig.node);
    assert_eq!(plan.reason, SleepReason::LowBattery);
    assert_eq!(plan.secs, 10 * 3600);
    assert_eq!(rig.leds(), vec![StatusCode::BatteryChargeLow]);
    assert!(rig.publishes().is_empty());
}

#[test]
fn low_battery_while_charging_still_publishes() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    rig.node.battery.status = BatteryStatus {
        is_charging: true,
        change_rate: 2.08,
        ..low_battery()
    };
    let mut svc = service();
    svc.wake(&mut rig.orch, &mut rig.node);

    let plan = svc.run_cycle(&mut rig.node);
    assert_eq!(plan.reason, SleepReason::Normal);
    assert_eq!(rig.publishes().len(), 5);
    assert_eq!(
        rig.leds(),
        vec![
            StatusCode::BatteryCharging,
            StatusCode::BatteryChargeLow,
            StatusCode::CycleComplete
        ]
    );
}

#[test]
fn publish_failures_flash_error_and_are_counted() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    rig.node.mqtt.fail_publish = true;
    let mut svc = service();
    svc.wake(&mut rig.orch, &mut rig.node);

    let plan = svc.run_cycle(&mut rig.node);
    assert_eq!(plan.reason, SleepReason::Normal);
    assert_eq!((svc.published(), svc.publish_failures()), (0, 5));
    let errors = rig
        .leds()
        .into_iter()
        .filter(|s| *s == StatusCode::PublishError)
        .count();
    assert_eq!(errors, 5);
    assert_eq!(rig.leds().last(), Some(&StatusCode::CycleComplete));
}

// ── Wakeup failures ───────────────────────────────────────────

#[test]
fn partial_wakeup_failure_continues_the_cycle() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    rig.node.wifi.fail = true;
    rig.node.mqtt.fail_connect = true;
    let mut svc = service();

    assert_eq!(svc.wake(&mut rig.orch, &mut rig.node), None);
    assert_eq!(
        svc.state(),
        NodeState::Awake(LifecycleStatus::PartialFailure)
    );
    assert_eq!(rig.orch.get_metrics().wakeup_failures, 2);
    // Soil still started after the network failed.
    assert!(rig.calls().contains(&Call::SoilStart));

    svc.run_cycle(&mut rig.node);
    assert_eq!(svc.publish_failures(), 5);
}

#[test]
fn missing_probe_supply_is_not_a_failure() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    assert_eq!(rig.orch.run_wakeup(&mut rig.node), LifecycleStatus::Success);
    assert_eq!(rig.orch.get_metrics().wakeup_failures, 0);
}

#[test]
fn broken_hardware_is_a_partial_failure() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    rig.break_everything();
    let mut svc = service();

    assert_eq!(svc.wake(&mut rig.orch, &mut rig.node), None);
    assert_eq!(
        svc.state(),
        NodeState::Awake(LifecycleStatus::PartialFailure)
    );
    assert_eq!(rig.orch.get_metrics().wakeup_failures, 5);
}

#[test]
fn total_wakeup_failure_plans_conservation_sleep() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    rig.break_everything();
    let mut network_only: LifecycleOrchestrator<MockNode> = LifecycleOrchestrator::new();
    network_only.on_wakeup(
        "wifi",
        counted("wifi", |n: &mut MockNode| Ok(n.wifi.connect().map_err(soilnode::error::Error::from)?)),
    );
    network_only.on_wakeup(
        "mqtt",
        counted("mqtt", |n: &mut MockNode| Ok(n.mqtt.connect().map_err(soilnode::error::Error::from)?)),
    );
    let mut svc = service();

    let plan = svc.wake(&mut network_only, &mut rig.node);
    assert_eq!(
        plan,
        Some(SleepPlan {
            reason: SleepReason::Conservation,
            secs: 1200
        })
    );
    assert_eq!(svc.state(), NodeState::Awake(LifecycleStatus::TotalFailure));
    assert_eq!(network_only.get_metrics().wakeup_failures, 2);
}

// ── Sleep entry ───────────────────────────────────────────────

#[test]
fn prepare_sleep_arms_timer_after_teardown() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    let mut svc = service();
    let mut scheduler = DeepSleepScheduler::new(rig.sleep_control());
    svc.wake(&mut rig.orch, &mut rig.node);
    let plan = svc.run_cycle(&mut rig.node);

    let status = svc.prepare_sleep(&mut scheduler, &mut rig.orch, &mut rig.node, plan);
    assert_eq!(status, LifecycleStatus::Success);
    assert_eq!(svc.state(), NodeState::Isolated);

    let flush = rig.position(&Call::FlushConsole).unwrap();
    let clear = rig.position(&Call::DisableWakeSources).unwrap();
    let arm = rig.position(&Call::ArmTimer(7 * 3600 * 1_000_000)).unwrap();
    assert!(flush < clear && clear < arm);
    // Normal path: one isolation pass only.
    let radio_offs = rig.calls().iter().filter(|c| **c == Call::RadioOff).count();
    assert_eq!(radio_offs, 1);
}

#[test]
fn empty_sleep_phase_falls_back_to_emergency_isolation() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    let mut bare: LifecycleOrchestrator<_> = LifecycleOrchestrator::new();
    let mut svc = service();
    let mut scheduler = DeepSleepScheduler::new(rig.sleep_control());
    let plan = SleepPlan {
        reason: SleepReason::Conservation,
        secs: 1200,
    };

    let status = svc.prepare_sleep(&mut scheduler, &mut bare, &mut rig.node, plan);
    assert_eq!(status, LifecycleStatus::Success);
    assert!(rig.node.power.is_prepared());
    assert!(rig.calls().contains(&Call::HoldEnable(45)));
    assert!(rig.calls().contains(&Call::ArmTimer(1200 * 1_000_000)));
}

#[test]
#[should_panic(expected = "suspended")]
fn run_ends_in_suspend() {
    let mut rig = Rig::new(BoardVariant::Esp32C6);
    let mut svc = service();
    let mut scheduler = DeepSleepScheduler::new(rig.sleep_control());
    svc.run(&mut scheduler, &mut rig.orch, &mut rig.node);
}
