//! One-shot signal-line initialization.
//!
//! Configures ADC1 channels and GPIO inputs for the enabled hazard sensors
//! using raw ESP-IDF sys calls.  Called from `main()` before the monitor
//! threads are spawned; reads happen afterwards from any monitor thread.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::error::SensorError;

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    AdcChannelFailed { channel: u32, rc: i32 },
    GpioConfigFailed { pin: i32, rc: i32 },
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={rc})"),
            Self::AdcChannelFailed { channel, rc } => {
                write!(f, "ADC1 channel {channel} config failed (rc={rc})")
            }
            Self::GpioConfigFailed { pin, rc } => {
                write!(f, "GPIO{pin} config failed (rc={rc})")
            }
        }
    }
}

/// Bit `n` set once ADC1 channel `n` has been configured.
static ADC1_CHANNELS: core::sync::atomic::AtomicU32 = core::sync::atomic::AtomicU32::new(0);

fn channel_bit(channel: u32) -> u32 {
    1u32.checked_shl(channel).unwrap_or(0)
}

fn adc_channel_ready(channel: u32) -> bool {
    let bit = channel_bit(channel);
    bit != 0 && ADC1_CHANNELS.load(core::sync::atomic::Ordering::Acquire) & bit != 0
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static ADC1_HANDLE: core::sync::atomic::AtomicPtr<adc_oneshot_unit_ctx_t> =
    core::sync::atomic::AtomicPtr::new(core::ptr::null_mut());

#[cfg(target_os = "espidf")]
fn adc1_unit() -> Result<adc_oneshot_unit_handle_t, HwInitError> {
    use core::sync::atomic::Ordering;

    let existing = ADC1_HANDLE.load(Ordering::Acquire);
    if !existing.is_null() {
        return Ok(existing);
    }
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    let mut handle: adc_oneshot_unit_handle_t = core::ptr::null_mut();
    // SAFETY: init path only, runs on the main task before monitors start.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut handle) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }
    ADC1_HANDLE.store(handle, Ordering::Release);
    log::info!("hw_init: ADC1 unit created");
    Ok(handle)
}

/// Configure one ADC1 channel for 12-bit reads at 12 dB attenuation.
#[cfg(target_os = "espidf")]
pub fn init_adc_channel(channel: u32) -> Result<(), HwInitError> {
    if adc_channel_ready(channel) {
        return Ok(());
    }
    let unit = adc1_unit()?;
    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    // SAFETY: `unit` is a live handle from adc1_unit().
    let ret = unsafe { adc_oneshot_config_channel(unit, channel, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcChannelFailed { channel, rc: ret });
    }
    ADC1_CHANNELS.fetch_or(channel_bit(channel), core::sync::atomic::Ordering::AcqRel);
    log::info!("hw_init: ADC1 CH{channel} configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_adc_channel(channel: u32) -> Result<(), HwInitError> {
    ADC1_CHANNELS.fetch_or(channel_bit(channel), core::sync::atomic::Ordering::AcqRel);
    log::info!("hw_init(sim): ADC1 CH{channel} configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<i32, SensorError> {
    if !adc_channel_ready(channel) {
        return Err(SensorError::NotConfigured);
    }
    let unit = ADC1_HANDLE.load(core::sync::atomic::Ordering::Acquire);
    let mut raw: i32 = 0;
    // SAFETY: the channel bit is only set after the unit handle is stored;
    // oneshot reads on distinct channels are serialised inside the driver.
    let ret = unsafe { adc_oneshot_read(unit, channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::AdcReadFailed(ret));
    }
    Ok(raw)
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(channel: u32) -> Result<i32, SensorError> {
    if !adc_channel_ready(channel) {
        return Err(SensorError::NotConfigured);
    }
    sim::adc(channel)
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_digital_input(pin: i32) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: init path only.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed { pin, rc: ret });
    }
    log::info!("hw_init: GPIO{pin} configured as input");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_digital_input(pin: i32) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): GPIO{pin} configured as input");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> Result<bool, SensorError> {
    // SAFETY: register read on a configured input pin.
    Ok((unsafe { gpio_get_level(pin) }) != 0)
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> Result<bool, SensorError> {
    sim::gpio(pin)
}

// ── Simulation inputs ─────────────────────────────────────────

/// Host-side signal lines, driven by tests.
#[cfg(not(target_os = "espidf"))]
pub mod sim {
    use core::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    use crate::error::SensorError;

    const GPIO_COUNT: usize = 40;
    const ADC_CHANNELS: usize = 10;

    static GPIO_LEVEL: [AtomicBool; GPIO_COUNT] = [const { AtomicBool::new(false) }; GPIO_COUNT];
    static GPIO_FAIL: [AtomicBool; GPIO_COUNT] = [const { AtomicBool::new(false) }; GPIO_COUNT];
    static ADC_RAW: [AtomicI32; ADC_CHANNELS] = [const { AtomicI32::new(0) }; ADC_CHANNELS];
    static ADC_FAIL: [AtomicBool; ADC_CHANNELS] = [const { AtomicBool::new(false) }; ADC_CHANNELS];

    pub fn set_gpio(pin: i32, high: bool) {
        if let Some(slot) = usize::try_from(pin).ok().and_then(|p| GPIO_LEVEL.get(p)) {
            slot.store(high, Ordering::Release);
        }
    }

    pub fn fail_gpio(pin: i32, fail: bool) {
        if let Some(slot) = usize::try_from(pin).ok().and_then(|p| GPIO_FAIL.get(p)) {
            slot.store(fail, Ordering::Release);
        }
    }

    pub fn set_adc(channel: u32, raw: i32) {
        if let Some(slot) = ADC_RAW.get(channel as usize) {
            slot.store(raw, Ordering::Release);
        }
    }

    pub fn fail_adc(channel: u32, fail: bool) {
        if let Some(slot) = ADC_FAIL.get(channel as usize) {
            slot.store(fail, Ordering::Release);
        }
    }

    pub(super) fn gpio(pin: i32) -> Result<bool, SensorError> {
        let idx = usize::try_from(pin).map_err(|_| SensorError::GpioReadFailed)?;
        match (GPIO_FAIL.get(idx), GPIO_LEVEL.get(idx)) {
            (Some(fail), _) if fail.load(Ordering::Acquire) => Err(SensorError::GpioReadFailed),
            (_, Some(level)) => Ok(level.load(Ordering::Acquire)),
            _ => Err(SensorError::GpioReadFailed),
        }
    }

    pub(super) fn adc(channel: u32) -> Result<i32, SensorError> {
        let idx = channel as usize;
        match (ADC_FAIL.get(idx), ADC_RAW.get(idx)) {
            (Some(fail), _) if fail.load(Ordering::Acquire) => Err(SensorError::AdcReadFailed(-1)),
            (_, Some(raw)) => Ok(raw.load(Ordering::Acquire)),
            _ => Err(SensorError::NotConfigured),
        }
    }
}
