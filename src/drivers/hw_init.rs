//! Raw GPIO and ADC helpers over the ESP-IDF sys API.
//!
//! Everything the power manager and drivers need below the port traits:
//! pin direction and pull configuration, deep-sleep holds, and oneshot
//! ADC sampling.  Host builds get inert stand-ins so the same callers
//! compile and run in tests.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::error::HalError;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

// ── GPIO ──────────────────────────────────────────────────────

/// Park `pin` as an input with pull-down (no pull-up, no interrupt).
#[cfg(target_os = "espidf")]
pub fn gpio_isolate(pin: u8) -> Result<(), HalError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };
    // SAFETY: gpio_config only touches the IO MUX entry for `pin`.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HalError::GpioConfigFailed { pin, code: ret });
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_isolate(_pin: u8) -> Result<(), HalError> {
    Ok(())
}

/// Configure `pin` as a push-pull output and drive it to `high`.
#[cfg(target_os = "espidf")]
pub fn gpio_output(pin: u8, high: bool) -> Result<(), HalError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        ..Default::default()
    };
    // SAFETY: single-threaded boot/sleep path; pin is board-owned.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HalError::GpioConfigFailed { pin, code: ret });
    }
    gpio_write(pin, high);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_output(_pin: u8, _high: bool) -> Result<(), HalError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: u8, high: bool) {
    // SAFETY: writes the output register of an already-configured pin.
    unsafe {
        gpio_set_level(pin as i32, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: u8, _high: bool) {}

// ── Deep-sleep hold ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_hold_enable(pin: u8) -> Result<(), HalError> {
    // SAFETY: latches the pad state; no memory is touched.
    let ret = unsafe { gpio_hold_en(pin as i32) };
    if ret != ESP_OK as i32 {
        return Err(HalError::HoldEnableFailed { pin, code: ret });
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_hold_enable(_pin: u8) -> Result<(), HalError> {
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_hold_disable(pin: u8) -> Result<(), HalError> {
    // SAFETY: releases the pad latch; no memory is touched.
    let ret = unsafe { gpio_hold_dis(pin as i32) };
    if ret != ESP_OK as i32 {
        return Err(HalError::HoldReleaseFailed { pin, code: ret });
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_hold_disable(_pin: u8) -> Result<(), HalError> {
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_ADC_RAW: AtomicU16 = AtomicU16::new(0);

/// Inject the value every sim [`AdcPin`] returns.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(raw: u16) {
    SIM_ADC_RAW.store(raw, Ordering::Relaxed);
}

/// One ADC1 channel, resolved from its GPIO number.
pub struct AdcPin {
    #[cfg(target_os = "espidf")]
    unit: adc_oneshot_unit_handle_t,
    #[cfg(target_os = "espidf")]
    channel: adc_channel_t,
    gpio: u8,
}

impl AdcPin {
    /// Claim the ADC unit behind `gpio` with 12 dB attenuation, 12-bit.
    #[cfg(target_os = "espidf")]
    pub fn new(gpio: u8) -> Result<Self, HalError> {
        let mut unit_id: adc_unit_t = 0;
        let mut channel: adc_channel_t = 0;
        // SAFETY: out-params are valid locals.
        let ret = unsafe { adc_oneshot_io_to_channel(gpio as i32, &mut unit_id, &mut channel) };
        if ret != ESP_OK as i32 {
            return Err(HalError::GpioConfigFailed { pin: gpio, code: ret });
        }

        let init_cfg = adc_oneshot_unit_init_cfg_t {
            unit_id,
            ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        let mut unit: adc_oneshot_unit_handle_t = core::ptr::null_mut();
        // SAFETY: `unit` receives a driver-owned handle.
        let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut unit) };
        if ret != ESP_OK as i32 {
            return Err(HalError::GpioConfigFailed { pin: gpio, code: ret });
        }

        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        // SAFETY: `unit` was just created.
        let ret = unsafe { adc_oneshot_config_channel(unit, channel, &chan_cfg) };
        if ret != ESP_OK as i32 {
            return Err(HalError::GpioConfigFailed { pin: gpio, code: ret });
        }

        log::info!("hw_init: ADC on GPIO{} (unit {}, channel {})", gpio, unit_id, channel);
        Ok(Self {
            unit,
            channel,
            gpio,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(gpio: u8) -> Result<Self, HalError> {
        Ok(Self { gpio })
    }

    pub fn gpio(&self) -> u8 {
        self.gpio
    }

    /// One raw 12-bit sample; a failed conversion reads as 0.
    #[cfg(target_os = "espidf")]
    pub fn read(&mut self) -> u16 {
        let mut raw: i32 = 0;
        // SAFETY: `unit` is owned by this pin and only used from the main task.
        let ret = unsafe { adc_oneshot_read(self.unit, self.channel, &mut raw) };
        if ret != ESP_OK as i32 {
            return 0;
        }
        raw.max(0) as u16
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read(&mut self) -> u16 {
        SIM_ADC_RAW.load(Ordering::Relaxed)
    }
}

#[cfg(target_os = "espidf")]
impl Drop for AdcPin {
    fn drop(&mut self) {
        // SAFETY: handle came from adc_oneshot_new_unit and is dropped once.
        unsafe {
            adc_oneshot_del_unit(self.unit);
        }
    }
}
