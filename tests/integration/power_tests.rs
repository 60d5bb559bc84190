//! Sleep preparation and timer arming over the mock HAL.

use soilnode::lifecycle::{LifecycleOrchestrator, LifecycleStatus};
use soilnode::pins::BoardVariant;
use soilnode::power::sleep::DeepSleepScheduler;

use super::mock_hw::{Call, Rig};

fn isolated_pins(calls: &[Call]) -> Vec<u8> {
    calls
        .iter()
        .filter_map(|c| match c {
            Call::Isolate(pin) => Some(*pin),
            _ => None,
        })
        .collect()
}

#[test]
fn console_pins_are_isolated_last() {
    for variant in [BoardVariant::Esp32C6, BoardVariant::Esp32S3] {
        let mut rig = Rig::new(variant);
        let profile = *rig.node.power.profile();
        rig.node.power.prepare_for_sleep();

        let calls = rig.calls();
        let flush = rig.position(&Call::FlushConsole).unwrap();
        let tail: Vec<Call> = profile
            .console_pins()
            .iter()
            .map(|&p| Call::Isolate(p))
            .collect();
        assert_eq!(&calls[flush + 1..], tail.as_slice(), "{variant}");
    }
}

#[test]
fn reserved_pins_are_never_isolated() {
    for variant in BoardVariant::ALL {
        let mut rig = Rig::new(variant);
        let profile = *rig.node.power.profile();
        rig.node.power.prepare_for_sleep();

        for pin in isolated_pins(&rig.calls()) {
            assert!(!profile.is_active(pin), "{variant}: GPIO{pin} is reserved");
            assert_ne!(pin, profile.peripheral_power);
        }
    }
}

#[test]
fn every_pin_is_isolated_at_most_once() {
    let mut rig = Rig::new(BoardVariant::Esp32C6);
    rig.node.power.prepare_for_sleep();
    let mut pins = isolated_pins(&rig.calls());
    let total = pins.len();
    pins.sort_unstable();
    pins.dedup();
    assert_eq!(pins.len(), total);
}

#[test]
fn hold_failure_marks_sleep_phase_failed() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    rig.node.power.hal_mut().fail_hold = true;

    let status = rig.orch.run_sleep_prep(&mut rig.node);
    assert_eq!(status, LifecycleStatus::PartialFailure);
    assert_eq!(rig.orch.get_metrics().sleep_failures, 1);
    // Console isolation still happened.
    assert_eq!(rig.calls().last(), Some(&Call::Isolate(20)));
}

#[test]
fn hold_release_failure_is_not_counted() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    rig.node.power.hal_mut().fail_release = true;

    let status = rig.orch.run_wakeup(&mut rig.node);
    assert_eq!(status, LifecycleStatus::Success);
    assert_eq!(rig.orch.get_metrics().wakeup_failures, 0);
    assert!(rig.calls().contains(&Call::HoldDisable(45)));
    assert!(rig.calls().contains(&Call::BatteryStart));
}

#[test]
fn scheduler_arms_after_sleep_phase() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    let mut scheduler = DeepSleepScheduler::new(rig.sleep_control());

    let status = scheduler.prepare(&mut rig.orch, &mut rig.node, 1200);
    assert_eq!(status, LifecycleStatus::Success);

    let calls = rig.calls();
    let n = calls.len();
    assert_eq!(
        &calls[n - 2..],
        &[Call::DisableWakeSources, Call::ArmTimer(1_200_000_000)]
    );
}

#[test]
fn zero_duration_is_raised_to_one_second() {
    let rig = Rig::new(BoardVariant::Esp32S3);
    let mut scheduler = DeepSleepScheduler::new(rig.sleep_control());
    assert_eq!(scheduler.arm(0), Ok(1_000_000));
    assert!(rig.calls().contains(&Call::ArmTimer(1_000_000)));
}

#[test]
fn timer_failure_still_reports_phase_status() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    let mut control = rig.sleep_control();
    control.fail_timer = true;
    let mut scheduler = DeepSleepScheduler::new(control);

    let status = scheduler.prepare(&mut rig.orch, &mut rig.node, 60);
    assert_eq!(status, LifecycleStatus::Success);
    assert!(rig.node.power.is_prepared());
}

#[test]
#[should_panic(expected = "suspended")]
fn enter_deep_sleep_never_returns() {
    let mut rig = Rig::new(BoardVariant::Esp32C6);
    let mut scheduler = DeepSleepScheduler::new(rig.sleep_control());
    scheduler.enter_deep_sleep(&mut rig.orch, &mut rig.node, 7 * 3600);
}

#[test]
fn empty_orchestrator_sleeps_without_isolating() {
    let mut rig = Rig::new(BoardVariant::Esp32S3);
    let mut bare = LifecycleOrchestrator::new();
    let mut scheduler = DeepSleepScheduler::new(rig.sleep_control());

    let status = scheduler.prepare(&mut bare, &mut rig.node, 60);
    assert_eq!(status, LifecycleStatus::Success);
    assert!(!rig.node.power.is_prepared());
    assert_eq!(
        rig.calls(),
        vec![Call::DisableWakeSources, Call::ArmTimer(60_000_000)]
    );
}
