//! Application core.
//!
//! The wake-cycle rules for the SoilNode: which subsystems start in which
//! order, what gets measured and published, and how long to sleep.  All
//! interaction with hardware happens through the **port traits** in
//! [`ports`], so this layer runs unchanged against mock adapters.

pub mod node;
pub mod ports;
pub mod service;
