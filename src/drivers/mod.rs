//! Peripheral drivers and raw hardware helpers.

pub mod hw_init;
pub mod peripheral_power;
pub mod status_led;
