//! Sensor drivers on the switched sensor rail.

pub mod battery;
pub mod soil;
