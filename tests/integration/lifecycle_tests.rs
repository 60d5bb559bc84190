//! Orchestrator behaviour through the public API only.

use soilnode::lifecycle::{
    counted, log_and_continue, CallbackOutcome, LifecycleOrchestrator, LifecycleStatus, Phase,
    REGISTRY_CAPACITY,
};

type Trace = Vec<&'static str>;

fn step(label: &'static str) -> impl FnMut(&mut Trace) + 'static {
    move |t: &mut Trace| t.push(label)
}

fn failing(label: &'static str) -> impl FnMut(&mut Trace) -> CallbackOutcome + 'static {
    move |t: &mut Trace| {
        t.push(label);
        CallbackOutcome::Failed
    }
}

#[test]
fn phases_run_in_opposite_orders() {
    let mut orch = LifecycleOrchestrator::<Trace>::new();
    for label in ["rail", "gauge", "wifi", "mqtt"] {
        orch.on_wakeup(label, step(label));
        orch.on_sleep(label, step(label));
    }

    let mut trace = Trace::new();
    orch.run_wakeup(&mut trace);
    orch.run_sleep_prep(&mut trace);
    assert_eq!(
        trace,
        ["rail", "gauge", "wifi", "mqtt", "mqtt", "wifi", "gauge", "rail"]
    );
}

#[test]
fn full_registry_keeps_first_eight() {
    let labels = ["a", "b", "c", "d", "e", "f", "g", "h", "i"];
    let mut orch = LifecycleOrchestrator::<Trace>::new();
    let accepted = labels
        .iter()
        .filter(|&&l| orch.on_wakeup(l, step(l)))
        .count();
    assert_eq!(accepted, REGISTRY_CAPACITY);

    let mut trace = Trace::new();
    assert_eq!(orch.run_wakeup(&mut trace), LifecycleStatus::Success);
    assert_eq!(trace, labels[..REGISTRY_CAPACITY]);
}

#[test]
fn null_registration_is_refused() {
    let mut orch = LifecycleOrchestrator::<Trace>::new();
    assert!(!orch.register(Phase::Sleep, "ghost", None));
    assert!(orch.registry(Phase::Sleep).is_empty());
    assert_eq!(orch.get_metrics().sleep_registered, 0);
}

#[test]
fn failure_does_not_stop_later_callbacks() {
    let mut orch = LifecycleOrchestrator::<Trace>::new();
    orch.on_wakeup("rail", step("rail"));
    orch.on_wakeup("wifi", failing("wifi"));
    orch.on_wakeup("soil", step("soil"));

    let mut trace = Trace::new();
    assert_eq!(orch.run_wakeup(&mut trace), LifecycleStatus::PartialFailure);
    assert_eq!(trace, ["rail", "wifi", "soil"]);
    assert_eq!(orch.get_metrics().wakeup_failures, 1);
}

#[test]
fn every_sleep_callback_failing_is_total() {
    let mut orch = LifecycleOrchestrator::<Trace>::new();
    orch.on_sleep("a", failing("a"));
    orch.on_sleep("b", failing("b"));

    let mut trace = Trace::new();
    assert_eq!(orch.run_sleep_prep(&mut trace), LifecycleStatus::TotalFailure);
    assert_eq!(trace, ["b", "a"]);
    assert_eq!(orch.get_metrics().sleep_failures, 2);
}

#[test]
fn adapters_map_results_to_outcomes() {
    let mut orch = LifecycleOrchestrator::<Trace>::new();
    orch.on_wakeup(
        "gauge",
        counted("gauge", |_: &mut Trace| anyhow::bail!("no ACK at 0x36")),
    );
    orch.on_wakeup(
        "led",
        log_and_continue("led", |_: &mut Trace| anyhow::bail!("RMT busy")),
    );
    orch.on_wakeup("ok", counted("ok", |_: &mut Trace| Ok(())));

    assert_eq!(
        orch.run_wakeup(&mut Trace::new()),
        LifecycleStatus::PartialFailure
    );
    assert_eq!(orch.get_metrics().wakeup_failures, 1);
}

#[test]
fn metrics_track_each_phase_separately() {
    let mut orch = LifecycleOrchestrator::<Trace>::new();
    orch.on_wakeup("w", failing("w"));
    orch.on_sleep("s1", step("s1"));
    orch.on_sleep("s2", step("s2"));

    let mut trace = Trace::new();
    orch.run_wakeup(&mut trace);
    orch.run_sleep_prep(&mut trace);

    let m = orch.get_metrics();
    assert_eq!((m.wakeup_registered, m.wakeup_failures), (1, 1));
    assert_eq!((m.sleep_registered, m.sleep_failures), (2, 0));
    assert!(m.to_string().starts_with("wakeup 1 registered / 1 failed"));
}
