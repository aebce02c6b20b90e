//! End-to-end boot flows over the simulated NVS, Wi-Fi and HTTP adapters.
//!
//! A first boot provisions and restarts; the second boot over the same
//! simulated partition comes up in station mode.

use std::thread;

use core::time::Duration;

use hazardwatch::adapters::http_server::HttpServerAdapter;
use hazardwatch::adapters::nvs::NvsAdapter;
use hazardwatch::adapters::wifi::{ApSettings, WifiAdapter, WifiMode};
use hazardwatch::app::ports::{FlashInitError, StorageError};
use hazardwatch::config::FirmwareConfig;
use hazardwatch::error::BootError;
use hazardwatch::fsm::{BootOutcome, BootState, ProvisioningCoordinator, RestartReason};
use hazardwatch::store::{INIT_ATTEMPTS, NAMESPACE, keys};

use crate::mock_hw::ManualClock;

type Coordinator = ProvisioningCoordinator<NvsAdapter, WifiAdapter, HttpServerAdapter, ManualClock>;

const SUBMISSION: &[u8] = br#"{"api_key":"key-123","ssid":"HomeNet","password":"password1","motion":1,"sound":1,"gas":0,"fire":1}"#;

fn firmware() -> FirmwareConfig {
    FirmwareConfig {
        provisioning_timeout: Some(Duration::from_millis(300)),
        provisioning_log_interval: Duration::from_millis(50),
        ..FirmwareConfig::default()
    }
}

fn boot(nvs: &NvsAdapter, clock: &ManualClock) -> Coordinator {
    let fw = firmware();
    let wifi = WifiAdapter::new(ApSettings::from(&fw));
    ProvisioningCoordinator::new(nvs.clone(), wifi, HttpServerAdapter::new(), clock.clone(), fw)
}

#[test]
fn first_boot_provisions_then_second_boot_is_ready() {
    let nvs = NvsAdapter::new();
    let clock = ManualClock::new();

    // ── Boot 1: access point, submission, restart ─────────────
    let mut first = boot(&nvs, &clock);
    let ingest = first.ingest();
    let poster = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        ingest.handle_config(SUBMISSION)
    });

    let outcome = first.run().unwrap();
    assert_eq!(poster.join().unwrap().status, 200);
    assert_eq!(outcome, BootOutcome::RestartPending(RestartReason::Provisioned));
    assert_eq!(
        first.history(),
        &[
            BootState::Booting,
            BootState::Unconfigured,
            BootState::Provisioning,
            BootState::ProvisionedFreshly,
            BootState::RestartPending,
        ]
    );
    assert_eq!(
        first.network().mode(),
        &WifiMode::AccessPoint {
            ssid: "ESP32".into()
        }
    );
    assert_eq!(clock.restarts(), 1);
    // The reboot settle delay ran on the clock.
    assert!(clock_ms(&clock) >= 5_000);

    // ── Boot 2: same partition, station mode ──────────────────
    let mut second = boot(&nvs, &clock);
    let BootOutcome::Ready(cfg) = second.run().unwrap() else {
        panic!("second boot should be ready");
    };
    assert_eq!(cfg.api_key, "key-123");
    assert!(cfg.motion && cfg.sound && !cfg.gas && cfg.fire);
    assert_eq!(
        second.network().mode(),
        &WifiMode::Station {
            ssid: "HomeNet".into()
        }
    );
    assert_eq!(clock.restarts(), 1);
}

#[test]
fn unanswered_provisioning_times_out_and_restarts() {
    let nvs = NvsAdapter::new();
    let clock = ManualClock::new();
    let mut c = boot(&nvs, &clock);

    let outcome = c.run().unwrap();
    assert_eq!(outcome, BootOutcome::RestartPending(RestartReason::ProvisioningTimeout));
    assert_eq!(clock.restarts(), 1);
    assert!(!c.ingest().is_received());

    // A client that shows up after the window closed is told so.
    assert_eq!(c.ingest().handle_config(SUBMISSION).status, 503);
    assert!(!c.ingest().is_received());
}

#[test]
fn corrupt_partition_is_erased_into_provisioning() {
    let nvs = NvsAdapter::new();
    nvs.sim_put_str(NAMESPACE, keys::API_KEY, "k");
    nvs.sim_put_u8(NAMESPACE, keys::CONFIGURED, 1);
    nvs.sim_fail_inits(FlashInitError::NeedsErase(0x110d), 2);

    let clock = ManualClock::new();
    let mut c = boot(&nvs, &clock);

    // The erase wiped the old record, so the device asks to be provisioned.
    assert_eq!(
        c.run().unwrap(),
        BootOutcome::RestartPending(RestartReason::ProvisioningTimeout)
    );
    assert_eq!(nvs.sim_init_calls(), 3);
    assert_eq!(nvs.sim_erase_calls(), 2);
    assert!(matches!(c.network().mode(), WifiMode::AccessPoint { .. }));
    assert!(clock_ms(&clock) >= 1_000);
}

#[test]
fn storage_retry_budget_is_bounded() {
    let nvs = NvsAdapter::new();
    nvs.sim_fail_inits(FlashInitError::NeedsErase(0x110d), 10);
    let clock = ManualClock::new();
    let mut c = boot(&nvs, &clock);

    assert_eq!(
        c.run().unwrap_err(),
        BootError::Storage(StorageError::InitRetriesExhausted)
    );
    assert_eq!(nvs.sim_init_calls(), INIT_ATTEMPTS);
    assert_eq!(c.network().mode(), &WifiMode::Off);
    assert_eq!(c.state(), BootState::Failed);
    assert_eq!(clock.restarts(), 0);
}

#[test]
fn configured_flag_without_record_fails_boot() {
    let nvs = NvsAdapter::new();
    nvs.sim_put_u8(NAMESPACE, keys::CONFIGURED, 1);
    let clock = ManualClock::new();
    let mut c = boot(&nvs, &clock);

    assert_eq!(
        c.run().unwrap_err(),
        BootError::Storage(StorageError::MissingField(keys::API_KEY))
    );
    assert_eq!(c.network().mode(), &WifiMode::Off);
}

#[test]
fn access_point_failure_fails_boot() {
    let nvs = NvsAdapter::new();
    let fw = firmware();
    let mut wifi = WifiAdapter::new(ApSettings::from(&fw));
    wifi.sim_fail_next("no radio");
    let clock = ManualClock::new();
    let mut c = ProvisioningCoordinator::new(nvs.clone(), wifi, HttpServerAdapter::new(), clock.clone(), fw);

    assert_eq!(
        c.run().unwrap_err(),
        BootError::Network(hazardwatch::app::ports::NetworkError::Driver("no radio".into()))
    );
    assert_eq!(
        c.history(),
        &[BootState::Booting, BootState::Unconfigured, BootState::Failed]
    );
}

fn clock_ms(clock: &ManualClock) -> u64 {
    use hazardwatch::app::ports::Clock;
    clock.uptime_ms()
}
