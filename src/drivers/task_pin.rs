//! Core-pinned thread spawning for the ESP32 dual-core.
//!
//! ESP-IDF implements `std::thread` on pthreads, which wrap FreeRTOS tasks.
//! `esp_pthread_set_cfg()` configures the *next* `pthread_create()` from
//! the calling thread, so the config→spawn pair must not interleave with
//! other thread creation on the same thread.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers (Xtensa LX6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): Wi-Fi, lwIP, HTTP server.
    Pro = 0,
    /// Core 1 (APP_CPU): hazard monitors.
    App = 1,
}

/// Placement of one FreeRTOS task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPlacement {
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
}

impl TaskPlacement {
    /// Hazard monitors: app core, above idle, room for TLS alert posts.
    pub const MONITOR: Self = Self {
        core: Core::App,
        priority: 5,
        stack_kb: 8,
    };
}

/// Spawn `f` as a task placed per `placement`.
///
/// `name` must be NUL-terminated (e.g. `"gas-mon\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(
    placement: TaskPlacement,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    // SAFETY: the config struct is fully initialised by the IDF helper and
    // `name` is a 'static NUL-terminated string.
    let ret = unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.pin_to_core = placement.core as i32;
        cfg.prio = i32::from(placement.priority);
        cfg.stack_size = (placement.stack_kb * 1024) as _;
        cfg.thread_name = name.as_ptr().cast();
        esp_idf_svc::sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_svc::sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        display_name,
        placement.core,
        placement.priority,
        placement.stack_kb
    );

    std::thread::Builder::new().name(display_name.into()).spawn(f)
}

/// Host fallback: plain thread, no core pinning or priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(
    placement: TaskPlacement,
    name: &'static str,
    f: impl FnOnce() + Send + 'static,
) -> io::Result<JoinHandle<()>> {
    let display_name = name.trim_end_matches('\0');
    log::info!(
        "Spawning '{}' (sim, stack={}KB)",
        display_name,
        placement.stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(placement.stack_kb * 1024)
        .spawn(f)
}
