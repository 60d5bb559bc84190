//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                         | Connects to             |
//! |-------------|------------------------------------|-------------------------|
//! | `power_hal` | PowerHalPort                       | GPIO, sleep PD config   |
//! |             | SleepControlPort                   | RTC timer, deep sleep   |
//! | `wifi`      | ConnectivityPort                   | ESP-IDF WiFi STA        |
//! | `mqtt`      | PublishPort                        | ESP-MQTT client         |
//! | `time`      | monotonic clock for phase timing   | ESP32 system timer      |
//! | `device_id` | client id from the factory MAC     | eFuse                   |

pub mod device_id;
pub mod mqtt;
pub mod power_hal;
pub mod time;
pub(super) mod utils;
pub mod wifi;
