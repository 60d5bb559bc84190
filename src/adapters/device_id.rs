//! Node identity derived from the ESP32 factory MAC address.
//!
//! The client id `soilsensor_<mac>` names the node on the broker and is
//! the middle segment of every topic it publishes.  Bytes are written as
//! unpadded lowercase hex, so `0x0A` contributes `a`; deployed nodes keep
//! their topic names across firmware updates this way.

use core::fmt::Write;

/// Longest form: prefix + 12 hex digits.
pub type ClientId = heapless::String<24>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

pub const CLIENT_ID_PREFIX: &str = "soilsensor_";

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: writes exactly six bytes into `mac`.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn client_id(mac: &MacAddress) -> ClientId {
    let mut id = ClientId::new();
    // Capacity covers the longest form, so writes cannot fail.
    let _ = id.push_str(CLIENT_ID_PREFIX);
    for byte in mac {
        let _ = write!(id, "{:x}", byte);
    }
    id
}
