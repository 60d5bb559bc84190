//! Fixed-capacity, append-only callback table for one lifecycle phase.
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │  CallbackRegistry (Wakeup)                       │
//! │  ┌──────┬──────────────────┬──────────────────┐  │
//! │  │ slot │ label            │ callback         │  │
//! │  ├──────┼──────────────────┼──────────────────┤  │
//! │  │ 0    │ "periph_power"   │ Box<dyn ..>      │  │
//! │  │ 1    │ "release_holds"  │ Box<dyn ..>      │  │
//! │  │ ..   │ ..               │ ..               │  │
//! │  │ 7    │                  │                  │  │
//! │  └──────┴──────────────────┴──────────────────┘  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Wakeup walks the table top-down; sleep walks it bottom-up so subsystems
//! shut down in the reverse of their startup order.

use heapless::Vec;
use log::{debug, error};

use super::{LifecycleCallback, Phase};

/// Slots per phase.
pub const REGISTRY_CAPACITY: usize = 8;

/// One row of the table.  `callback` is only `None` for a slot that was
/// reserved without a handler; running it counts as a failure.
pub struct Slot<C> {
    pub label: &'static str,
    pub callback: Option<Box<dyn LifecycleCallback<C>>>,
}

/// Ordered callbacks for a single phase.
pub struct CallbackRegistry<C> {
    phase: Phase,
    slots: Vec<Slot<C>, REGISTRY_CAPACITY>,
}

impl<C> CallbackRegistry<C> {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            slots: Vec::new(),
        }
    }

    /// Append a callback.  Returns `false` and leaves the table unchanged
    /// when `callback` is `None` or the table is full.
    pub fn register(
        &mut self,
        label: &'static str,
        callback: Option<Box<dyn LifecycleCallback<C>>>,
    ) -> bool {
        let Some(callback) = callback else {
            error!("Lifecycle: null {} callback '{}' rejected", self.phase, label);
            return false;
        };
        let slot = Slot {
            label,
            callback: Some(callback),
        };
        if self.slots.push(slot).is_err() {
            error!(
                "Lifecycle: {} registry full ({}), '{}' dropped",
                self.phase, REGISTRY_CAPACITY, label
            );
            return false;
        }
        debug!(
            "Lifecycle: {} callback '{}' registered at slot {}",
            self.phase,
            label,
            self.slots.len() - 1
        );
        true
    }

    /// Reserve a slot with no handler.
    #[cfg(test)]
    pub(crate) fn reserve_vacant(&mut self, label: &'static str) -> bool {
        self.slots
            .push(Slot {
                label,
                callback: None,
            })
            .is_ok()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.is_full()
    }

    /// Labels in registration order.
    pub fn labels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|s| s.label)
    }

    /// The slot visited at `step` of a run, honouring the phase's order.
    pub fn slot_for_step(&mut self, step: usize) -> Option<&mut Slot<C>> {
        let idx = self.phase.slot_index(step, self.slots.len())?;
        self.slots.get_mut(idx)
    }
}
