//! Task Watchdog Timer (TWDT) driver.
//!
//! Subscribes the calling task (the main task, idle once the monitors are
//! running) and resets the device if it stops feeding for longer than the
//! configured timeout.

use core::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Default TWDT timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Watchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    feeds: core::cell::Cell<u64>,
}

impl Watchdog {
    /// Configure the TWDT and subscribe the current task.
    #[cfg(target_os = "espidf")]
    pub fn subscribe(timeout: Duration) -> Self {
        let timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        // SAFETY: TWDT calls on the current task handle (null = self).
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK {
                log::warn!("Watchdog: reconfigure returned {} (already configured?)", ret);
            }

            let ret = esp_task_wdt_add(core::ptr::null_mut());
            let subscribed = ret == ESP_OK;
            if subscribed {
                log::info!("Watchdog: subscribed ({}ms timeout, panic on trigger)", timeout_ms);
            } else {
                log::warn!("Watchdog: failed to subscribe ({})", ret);
            }
            Self { subscribed }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn subscribe(timeout: Duration) -> Self {
        log::info!("Watchdog(sim): {}ms timeout, no-op", timeout.as_millis());
        Self {
            feeds: core::cell::Cell::new(0),
        }
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the TWDT entry of the subscribed current task.
            unsafe {
                esp_task_wdt_reset();
            }
        }

        #[cfg(not(target_os = "espidf"))]
        self.feeds.set(self.feeds.get() + 1);
    }

    /// Feeds so far (host only).
    #[cfg(not(target_os = "espidf"))]
    pub fn feeds(&self) -> u64 {
        self.feeds.get()
    }
}
