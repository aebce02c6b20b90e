//! Monitor bring-up after a configured boot.
//!
//! Each enabled hazard gets its own INA219 handle on the shared bus and
//! its own signal channel.  A hazard that fails to initialise is reported
//! to the collector as a malfunction and aborts startup.

use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

use embedded_hal::i2c::I2c;
use log::{error, info};

use super::monitor::{MonitorTiming, SensorMonitor};
use super::power::PowerHealthMonitor;
use super::profiles::profile;
use super::signal::PinSignal;
use super::HazardKind;
use crate::app::events::AlertEvent;
use crate::app::ports::{AlertPort, Clock};
use crate::config::{DeviceConfig, FirmwareConfig};
use crate::drivers::i2c_bus::SharedI2c;
use crate::drivers::task_pin::{TaskPlacement, spawn_on_core};
use crate::error::BootError;

pub type HazardMonitor<I, A> = SensorMonitor<PinSignal, PowerHealthMonitor<SharedI2c<I>>, A>;

/// Initialise one monitor per enabled hazard.
pub fn prepare_monitors<I, A>(
    cfg: &Arc<DeviceConfig>,
    bus: &SharedI2c<I>,
    alerts: &A,
    fw: &FirmwareConfig,
    now_ms: u64,
) -> Result<Vec<HazardMonitor<I, A>>, BootError>
where
    I: I2c,
    A: AlertPort + Clone,
{
    let timing = MonitorTiming::from(fw);
    let mut monitors = Vec::new();

    for kind in HazardKind::enabled(cfg) {
        let p = profile(kind);

        let power = match PowerHealthMonitor::init(bus.clone(), p.power_monitor_address) {
            Ok(power) => power,
            Err(e) => {
                error!("{}: power monitor 0x{:02x}: {}", kind, p.power_monitor_address, e);
                return Err(init_failed(kind, alerts, cfg));
            }
        };
        let signal = match PinSignal::init(p.channel) {
            Ok(signal) => signal,
            Err(e) => {
                error!("{}: signal channel: {}", kind, e);
                return Err(init_failed(kind, alerts, cfg));
            }
        };

        info!("{}: initialised", kind);
        monitors.push(SensorMonitor::new(
            p,
            signal,
            power,
            alerts.clone(),
            Arc::clone(cfg),
            timing,
            now_ms,
        ));
    }

    Ok(monitors)
}

fn init_failed<A: AlertPort>(kind: HazardKind, alerts: &A, cfg: &DeviceConfig) -> BootError {
    let message = format!("Failed to initialize {} sensor.", kind.name());
    alerts.send(
        &cfg.api_key,
        &AlertEvent::malfunction(kind.sensor_subtype(), &message),
    );
    BootError::SensorInit(kind)
}

/// Start every monitor on its own core-pinned task.
pub fn spawn_monitors<I, A, C>(
    monitors: Vec<HazardMonitor<I, A>>,
    clock: impl Fn() -> C,
) -> io::Result<Vec<JoinHandle<()>>>
where
    I: I2c + Send + 'static,
    A: AlertPort + Send + 'static,
    C: Clock + Send + 'static,
{
    monitors
        .into_iter()
        .map(|monitor| {
            let name = monitor.profile().kind.task_name();
            let clock = clock();
            spawn_on_core(TaskPlacement::MONITOR, name, move || {
                monitor.run(&clock);
            })
        })
        .collect()
}

/// Tell the collector the device is up.
pub fn announce_boot<A: AlertPort>(alerts: &A, api_key: &str) {
    alerts.send(
        api_key,
        &AlertEvent::log("esp32_boot", "Device booted successfully."),
    );
}
