//! ESP-IDF power and sleep control.
//!
//! [`EspPowerHal`] implements [`PowerHalPort`] and [`EspSleepControl`]
//! implements [`SleepControlPort`].  Pin operations go through
//! [`crate::drivers::hw_init`], so host builds get the same inert stubs
//! the drivers use.  On host, `suspend` exits the process.

use std::io::Write as _;

use log::{info, warn};

use crate::app::ports::{PowerDomain, PowerHalPort, SleepControlPort};
use crate::drivers::hw_init;
use crate::error::HalError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ───────────────────────────────────────────────────────────────
// Power HAL
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct EspPowerHal;

impl EspPowerHal {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "espidf")]
fn pd_off(domain: esp_sleep_pd_domain_t) -> Result<(), HalError> {
    // SAFETY: only records the power-down option for the next sleep.
    let ret = unsafe { esp_sleep_pd_config(domain, esp_sleep_pd_option_t_ESP_PD_OPTION_OFF) };
    if ret != ESP_OK as i32 {
        return Err(HalError::PowerDomainFailed(ret));
    }
    Ok(())
}

impl PowerHalPort for EspPowerHal {
    #[cfg(target_os = "espidf")]
    fn radio_off(&mut self) -> Result<(), HalError> {
        // The WiFi adapter normally stopped the driver already.
        // SAFETY: esp_wifi_stop is safe to call in any driver state.
        let ret = unsafe { esp_wifi_stop() };
        let benign = [
            ESP_OK as i32,
            ESP_ERR_WIFI_NOT_INIT as i32,
            ESP_ERR_WIFI_NOT_STARTED as i32,
        ];
        if !benign.contains(&ret) {
            return Err(HalError::RadioShutdownFailed(ret));
        }
        #[cfg(esp_idf_bt_enabled)]
        {
            // SAFETY: returns INVALID_STATE when the controller never ran.
            let ret = unsafe { esp_bt_controller_disable() };
            if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
                return Err(HalError::RadioShutdownFailed(ret));
            }
        }
        info!("PowerHal: radio off");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn radio_off(&mut self) -> Result<(), HalError> {
        log::debug!("PowerHal(sim): radio off");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn power_down_domain(&mut self, domain: PowerDomain) -> Result<(), HalError> {
        match domain {
            PowerDomain::Xtal => pd_off(esp_sleep_pd_domain_t_ESP_PD_DOMAIN_XTAL),
            #[cfg(any(esp32, esp32s2, esp32s3))]
            PowerDomain::RtcPeripheral => pd_off(esp_sleep_pd_domain_t_ESP_PD_DOMAIN_RTC_PERIPH),
            #[cfg(not(any(esp32, esp32s2, esp32s3)))]
            PowerDomain::RtcPeripheral => {
                log::debug!("PowerHal: no separate RTC peripheral domain on this chip");
                Ok(())
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn power_down_domain(&mut self, domain: PowerDomain) -> Result<(), HalError> {
        log::debug!("PowerHal(sim): {:?} off", domain);
        Ok(())
    }

    fn isolate_pin(&mut self, pin: u8) -> Result<(), HalError> {
        hw_init::gpio_isolate(pin)
    }

    fn hold_enable(&mut self, pin: u8) -> Result<(), HalError> {
        hw_init::gpio_hold_enable(pin)
    }

    fn hold_disable(&mut self, pin: u8) -> Result<(), HalError> {
        hw_init::gpio_hold_disable(pin)
    }

    fn flush_console(&mut self) {
        if let Err(e) = std::io::stdout().flush() {
            warn!("PowerHal: console flush failed: {}", e);
        }
    }

    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}

// ───────────────────────────────────────────────────────────────
// Sleep control
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct EspSleepControl;

impl EspSleepControl {
    pub fn new() -> Self {
        Self
    }
}

impl SleepControlPort for EspSleepControl {
    #[cfg(target_os = "espidf")]
    fn disable_all_wake_sources(&mut self) -> Result<(), HalError> {
        // SAFETY: clears the wake source bitmap; no memory is touched.
        let ret = unsafe { esp_sleep_disable_wakeup_source(esp_sleep_source_t_ESP_SLEEP_WAKEUP_ALL) };
        if ret != ESP_OK as i32 {
            return Err(HalError::WakeSourceFailed(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn disable_all_wake_sources(&mut self) -> Result<(), HalError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn enable_timer_wakeup(&mut self, duration_us: u64) -> Result<(), HalError> {
        // SAFETY: arms the RTC timer; no memory is touched.
        let ret = unsafe { esp_sleep_enable_timer_wakeup(duration_us) };
        if ret != ESP_OK as i32 {
            return Err(HalError::WakeSourceFailed(ret));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn enable_timer_wakeup(&mut self, duration_us: u64) -> Result<(), HalError> {
        log::debug!("SleepControl(sim): timer armed for {} us", duration_us);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn suspend(&mut self) -> ! {
        // SAFETY: does not return; the chip resets on wake.
        unsafe { esp_deep_sleep_start() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn suspend(&mut self) -> ! {
        info!("SleepControl(sim): deep sleep, exiting");
        std::process::exit(0)
    }
}
