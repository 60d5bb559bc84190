//! Lifecycle orchestration: ordered startup and shutdown of subsystems.
//!
//! ```text
//!   boot ──▶ run_wakeup()  ── FIFO ──▶ [0] [1] [2] .. [n-1]
//!                                          │
//!                                   sense / publish
//!                                          │
//!   sleep ◀── run_sleep_prep() ◀─ LIFO ── [n-1] .. [2] [1] [0]
//! ```
//!
//! Each subsystem registers a callback per phase before the first run.
//! Every callback receives `&mut C`, the node context threaded through
//! the whole wake cycle, so callbacks never reach the orchestrator that is
//! running them.  A failed or vacant slot is counted and the run carries
//! on; the phase result is classified once every slot has been visited.

pub mod metrics;
pub mod registry;

use core::fmt;

use log::{info, warn};

use crate::adapters::time::MonotonicClock;

pub use metrics::{LifecycleMetrics, LifecycleStatus};
pub use registry::{CallbackRegistry, REGISTRY_CAPACITY};

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Runs in registration order right after boot.
    Wakeup,
    /// Runs in reverse registration order before deep sleep.
    Sleep,
}

impl Phase {
    /// Table index visited at `step` of a run over `len` slots.
    pub fn slot_index(self, step: usize, len: usize) -> Option<usize> {
        if step >= len {
            return None;
        }
        Some(match self {
            Self::Wakeup => step,
            Self::Sleep => len - 1 - step,
        })
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wakeup => write!(f, "wakeup"),
            Self::Sleep => write!(f, "sleep"),
        }
    }
}

// ---------------------------------------------------------------------------
// Callback interface
// ---------------------------------------------------------------------------

/// What a single callback reports back to the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Completed,
    /// Counted against the phase.
    Failed,
}

impl From<()> for CallbackOutcome {
    fn from((): ()) -> Self {
        Self::Completed
    }
}

/// A lifecycle step bound to the node context `C`.
///
/// Any `FnMut(&mut C)` returning `()` or [`CallbackOutcome`] qualifies.
pub trait LifecycleCallback<C> {
    fn execute(&mut self, ctx: &mut C) -> CallbackOutcome;
}

impl<C, F, R> LifecycleCallback<C> for F
where
    F: FnMut(&mut C) -> R,
    R: Into<CallbackOutcome>,
{
    fn execute(&mut self, ctx: &mut C) -> CallbackOutcome {
        self(ctx).into()
    }
}

/// Wrap a fallible step so an error is logged and the step still counts
/// as completed.
pub fn log_and_continue<C, F>(
    label: &'static str,
    mut step: F,
) -> impl FnMut(&mut C) -> CallbackOutcome
where
    F: FnMut(&mut C) -> anyhow::Result<()>,
{
    move |ctx| {
        if let Err(e) = step(ctx) {
            warn!("Lifecycle: '{}' failed, continuing: {:#}", label, e);
        }
        CallbackOutcome::Completed
    }
}

/// Wrap a fallible step so an error is logged and counted as a failure.
pub fn counted<C, F>(label: &'static str, mut step: F) -> impl FnMut(&mut C) -> CallbackOutcome
where
    F: FnMut(&mut C) -> anyhow::Result<()>,
{
    move |ctx| match step(ctx) {
        Ok(()) => CallbackOutcome::Completed,
        Err(e) => {
            warn!("Lifecycle: '{}' failed: {:#}", label, e);
            CallbackOutcome::Failed
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Owns both phase registries and the metrics of their latest runs.
///
/// Registration and execution both take `&mut self`, so the callback set
/// cannot change while a phase is running.
pub struct LifecycleOrchestrator<C> {
    wakeup: CallbackRegistry<C>,
    sleep: CallbackRegistry<C>,
    metrics: LifecycleMetrics,
    clock: MonotonicClock,
}

impl<C> Default for LifecycleOrchestrator<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> LifecycleOrchestrator<C> {
    pub fn new() -> Self {
        Self {
            wakeup: CallbackRegistry::new(Phase::Wakeup),
            sleep: CallbackRegistry::new(Phase::Sleep),
            metrics: LifecycleMetrics::default(),
            clock: MonotonicClock::new(),
        }
    }

    /// Append `callback` to `phase`.  `false` on a null callback or a full
    /// registry; nothing is stored in either case.
    pub fn register(
        &mut self,
        phase: Phase,
        label: &'static str,
        callback: Option<Box<dyn LifecycleCallback<C>>>,
    ) -> bool {
        self.registry_mut(phase).register(label, callback)
    }

    pub fn on_wakeup(
        &mut self,
        label: &'static str,
        callback: impl LifecycleCallback<C> + 'static,
    ) -> bool {
        self.register(Phase::Wakeup, label, Some(Box::new(callback)))
    }

    pub fn on_sleep(
        &mut self,
        label: &'static str,
        callback: impl LifecycleCallback<C> + 'static,
    ) -> bool {
        self.register(Phase::Sleep, label, Some(Box::new(callback)))
    }

    pub fn registry(&self, phase: Phase) -> &CallbackRegistry<C> {
        match phase {
            Phase::Wakeup => &self.wakeup,
            Phase::Sleep => &self.sleep,
        }
    }

    pub(crate) fn registry_mut(&mut self, phase: Phase) -> &mut CallbackRegistry<C> {
        match phase {
            Phase::Wakeup => &mut self.wakeup,
            Phase::Sleep => &mut self.sleep,
        }
    }

    /// Start every subsystem in registration order.
    pub fn run_wakeup(&mut self, ctx: &mut C) -> LifecycleStatus {
        self.metrics.wakeup_failures = 0;
        let start = self.clock.uptime_us();
        let (registered, failures) = run_phase(&mut self.wakeup, &self.clock, ctx);
        self.metrics.last_wakeup_duration = self.clock.since(start);
        self.metrics.wakeup_failures = failures;
        self.finish(Phase::Wakeup, failures, registered)
    }

    /// Shut every subsystem down in reverse registration order.
    pub fn run_sleep_prep(&mut self, ctx: &mut C) -> LifecycleStatus {
        self.metrics.sleep_failures = 0;
        let start = self.clock.uptime_us();
        let (registered, failures) = run_phase(&mut self.sleep, &self.clock, ctx);
        self.metrics.last_sleep_duration = self.clock.since(start);
        self.metrics.sleep_failures = failures;
        self.finish(Phase::Sleep, failures, registered)
    }

    pub fn get_metrics(&self) -> LifecycleMetrics {
        LifecycleMetrics {
            wakeup_registered: self.wakeup.len(),
            sleep_registered: self.sleep.len(),
            ..self.metrics
        }
    }

    pub fn log_metrics(&self) {
        info!("Lifecycle: metrics: {}", self.get_metrics());
    }

    fn finish(&self, phase: Phase, failures: usize, registered: usize) -> LifecycleStatus {
        let status = LifecycleStatus::classify(failures, registered);
        if registered == 0 {
            warn!("Lifecycle: {} phase ran with no callbacks registered", phase);
        }
        let duration = match phase {
            Phase::Wakeup => self.metrics.last_wakeup_duration,
            Phase::Sleep => self.metrics.last_sleep_duration,
        };
        info!(
            "Lifecycle: {} phase {} ({}/{} failed, {} ms)",
            phase,
            status,
            failures,
            registered,
            duration.as_millis()
        );
        status
    }
}

/// Visit every slot of `registry` in phase order.  Returns
/// `(registered, failures)`.
fn run_phase<C>(
    registry: &mut CallbackRegistry<C>,
    clock: &MonotonicClock,
    ctx: &mut C,
) -> (usize, usize) {
    let phase = registry.phase();
    let registered = registry.len();
    let mut failures = 0;

    for step in 0..registered {
        let Some(slot) = registry.slot_for_step(step) else {
            failures += 1;
            continue;
        };
        let label = slot.label;
        let Some(callback) = slot.callback.as_mut() else {
            warn!("Lifecycle: {} slot '{}' has no callback", phase, label);
            failures += 1;
            continue;
        };

        let start = clock.uptime_us();
        let outcome = callback.execute(ctx);
        let elapsed = clock.since(start);

        match outcome {
            CallbackOutcome::Completed => info!(
                "Lifecycle: [{}/{}] {} '{}' ok ({} ms)",
                step + 1,
                registered,
                phase,
                label,
                elapsed.as_millis()
            ),
            CallbackOutcome::Failed => {
                failures += 1;
                warn!(
                    "Lifecycle: [{}/{}] {} '{}' FAILED ({} ms)",
                    step + 1,
                    registered,
                    phase,
                    label,
                    elapsed.as_millis()
                );
            }
        }
    }

    (registered, failures)
}
