//! HazardWatch firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  NvsAdapter     WifiAdapter      HttpServerAdapter  SystemClock│
//! │  (NvsBackend)   (NetworkPort)    (Endpoint)         (Clock)    │
//! │  PinSignal      PowerHealthMonitor  HttpAlertDispatcher        │
//! │  (SignalSource) (PowerProbe)        (AlertPort)                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ProvisioningCoordinator (boot FSM) · ConfigStore      │    │
//! │  │  SensorMonitor × enabled hazards                       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use core::time::Duration;

use anyhow::{Result, anyhow};
use log::{error, info};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::Hertz;

use hazardwatch::adapters::alerts::HttpAlertDispatcher;
use hazardwatch::adapters::http_server::HttpServerAdapter;
use hazardwatch::adapters::nvs::NvsAdapter;
use hazardwatch::adapters::time::SystemClock;
use hazardwatch::adapters::wifi::{ApSettings, WifiAdapter};
use hazardwatch::app::ports::Clock;
use hazardwatch::config::FirmwareConfig;
use hazardwatch::drivers::i2c_bus::SharedI2c;
use hazardwatch::drivers::watchdog::{self, Watchdog};
use hazardwatch::fsm::{BootOutcome, ProvisioningCoordinator};
use hazardwatch::pins;
use hazardwatch::sensors::startup::{announce_boot, prepare_monitors, spawn_monitors};

const IDLE_PERIOD: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  HazardWatch v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let firmware = FirmwareConfig::default();
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;

    // ── 2. Boot sequence: station or provisioning AP ──────────
    let wifi = WifiAdapter::new(peripherals.modem, sys_loop, ApSettings::from(&firmware))?;
    let mut coordinator = ProvisioningCoordinator::new(
        NvsAdapter::new(),
        wifi,
        HttpServerAdapter::new(),
        SystemClock::new(),
        firmware.clone(),
    );

    let config = match coordinator.run() {
        Ok(BootOutcome::Ready(cfg)) => cfg,
        Ok(BootOutcome::RestartPending(reason)) => {
            // esp_restart() does not return; this is only reached if it did.
            return Err(anyhow!("restart for '{}' did not happen", reason));
        }
        Err(e) => {
            error!("Boot: {}", e);
            return Err(e.into());
        }
    };
    // Dropping the adapter would stop the radio.
    let mut wifi = coordinator.into_network();

    // ── 3. Shared I²C bus for the INA219 power monitors ───────
    // SDA / SCL per pins::I2C_SDA_GPIO / pins::I2C_SCL_GPIO.
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;
    let bus = SharedI2c::new(i2c);

    // ── 4. Hazard monitors ────────────────────────────────────
    let clock = SystemClock::new();
    let alerts = HttpAlertDispatcher::new(firmware.collector_host);
    let monitors = prepare_monitors(&config, &bus, &alerts, &firmware, clock.uptime_ms())?;
    let count = monitors.len();
    let _tasks = spawn_monitors(monitors, SystemClock::new)?;
    info!("Boot: {} monitor(s) running", count);

    announce_boot(&alerts, &config.api_key);

    // ── 5. Idle: keep the watchdog fed and the station joined ─
    let wd = Watchdog::subscribe(watchdog::DEFAULT_TIMEOUT);
    loop {
        wd.feed();
        wifi.poll_link(clock.uptime_ms());
        clock.sleep(IDLE_PERIOD);
    }
}
