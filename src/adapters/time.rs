//! System clock and restart adapter.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` for uptime,
//!   `FreeRtos::delay_ms` for sleeping, `esp_restart()` for reset.
//! - **`not(target_os = "espidf")`**: `std::time::Instant`, a real thread
//!   sleep, and a restart counter the host tests can observe.

use core::time::Duration;

use crate::app::ports::{Clock, RestartPort};

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(not(target_os = "espidf"))]
    restarts: u32,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            restarts: 0,
        }
    }

    /// Number of restarts requested (host only).
    #[cfg(not(target_os = "espidf"))]
    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

impl Clock for SystemClock {
    #[cfg(target_os = "espidf")]
    fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    #[cfg(target_os = "espidf")]
    fn sleep(&self, duration: Duration) {
        let ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl RestartPort for SystemClock {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        log::warn!("system: restarting");
        // SAFETY: esp_restart never returns; all persistent state is
        // already committed by the caller.
        unsafe { esp_idf_svc::sys::esp_restart() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        self.restarts += 1;
        log::warn!("system(sim): restart requested ({})", self.restarts);
    }
}
