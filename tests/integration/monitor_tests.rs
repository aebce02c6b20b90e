//! Monitor engine against the shipped hazard profiles.

use std::sync::Arc;

use core::time::Duration;

use hazardwatch::app::events::{AlertEvent, EventCategory};
use hazardwatch::config::{DeviceConfig, FirmwareConfig};
use hazardwatch::error::{DeviceError, SensorError};
use hazardwatch::sensors::monitor::{CycleOutcome, MonitorTiming, SensorMonitor, SensorState};
use hazardwatch::sensors::profiles::{GAS_WARMUP, WARMUP_POLL, profile};
use hazardwatch::sensors::{HazardKind, Malfunction};

use crate::mock_hw::{MockPower, RecordingAlerts, ScriptedSignal};

type Monitor = SensorMonitor<ScriptedSignal, MockPower, RecordingAlerts>;

fn config() -> Arc<DeviceConfig> {
    Arc::new(DeviceConfig {
        api_key: "test-key".into(),
        network_ssid: "HomeNet".into(),
        network_password: "password1".into(),
        motion: true,
        sound: true,
        gas: true,
        fire: true,
    })
}

fn monitor(kind: HazardKind, signal: ScriptedSignal, power: MockPower) -> (Monitor, RecordingAlerts) {
    let alerts = RecordingAlerts::new();
    let m = SensorMonitor::new(
        profile(kind),
        signal,
        power,
        alerts.clone(),
        config(),
        MonitorTiming::from(&FirmwareConfig::default()),
        0,
    );
    (m, alerts)
}

/// Uptime past the gas warm-up window.
fn after_warmup() -> u64 {
    GAS_WARMUP.as_millis() as u64
}

// ── Trigger threshold ─────────────────────────────────────────

#[test]
fn motion_alerts_on_third_consecutive_read() {
    let (mut m, alerts) = monitor(HazardKind::Motion, ScriptedSignal::new(0).then_n(1, 3), MockPower::healthy());

    m.step(0);
    m.step(100);
    assert_eq!(alerts.count(EventCategory::Alert), 0);
    m.step(200);

    let sent = alerts.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].event, AlertEvent::alert("motion_alert"));
    assert_eq!(sent[0].api_key, "test-key");
    assert_eq!(m.state(), SensorState::default());
}

#[test]
fn gas_alerts_on_every_qualifying_read() {
    let (mut m, alerts) = monitor(HazardKind::Gas, ScriptedSignal::new(100).then_n(900, 3), MockPower::healthy());

    for i in 0..4 {
        m.step(after_warmup() + i * 500);
    }
    assert_eq!(alerts.count(EventCategory::Alert), 3);
    assert_eq!(m.state(), SensorState::default());
}

#[test]
fn fire_triggers_on_low_reading() {
    let (mut m, alerts) = monitor(HazardKind::Fire, ScriptedSignal::new(4095).then_n(3500, 3), MockPower::healthy());
    for t in 0..3 {
        m.step(t * 521);
    }
    assert_eq!(alerts.sent()[0].event, AlertEvent::alert("fire_alert"));
}

// ── Reset window ──────────────────────────────────────────────

#[test]
fn single_fire_read_decays_after_ten_idle_cycles() {
    let (mut m, alerts) = monitor(HazardKind::Fire, ScriptedSignal::new(4095).then(100), MockPower::healthy());

    m.step(0);
    assert_eq!(m.state().times_triggered, 1);
    for t in 1..=10 {
        m.step(t * 521);
    }

    assert_eq!(m.state(), SensorState::default());
    assert!(alerts.sent().is_empty());
}

#[test]
fn scattered_motion_never_alerts() {
    // Two hits, then a quiet stretch longer than the 100-tick window.
    let signal = ScriptedSignal::new(0).then_n(1, 2).then_n(0, 100).then(1);
    let (mut m, alerts) = monitor(HazardKind::Motion, signal, MockPower::healthy());
    for t in 0..103 {
        m.step(t * 100);
    }
    assert_eq!(m.state().times_triggered, 1);
    assert!(alerts.sent().is_empty());
}

// ── Power health ──────────────────────────────────────────────

#[test]
fn low_power_takes_precedence_over_trigger() {
    let power = MockPower::at(5.0, 50.0);
    let (mut m, alerts) = monitor(HazardKind::Sound, ScriptedSignal::new(1), power.clone());

    for t in 0..5 {
        let report = m.step(t * 100);
        assert_eq!(report.delay, Duration::from_secs(5));
        assert!(matches!(
            report.outcome,
            CycleOutcome::Malfunction(Malfunction::LowPower { .. })
        ));
    }
    assert_eq!(alerts.count(EventCategory::Malfunction), 5);
    assert_eq!(alerts.count(EventCategory::Alert), 0);
    assert_eq!(m.state(), SensorState::default());

    let sent = alerts.sent();
    assert_eq!(sent[0].event.subtype, "sound_sensor");
    assert_eq!(
        sent[0].event.message.as_deref(),
        Some("Power consumption is too low. Sensor might be malfunctioning.")
    );

    // Power restored: the sensor goes back to normal evaluation.
    power.set(100.0, 50.0);
    for t in 0..3 {
        m.step(1_000 + t * 100);
    }
    assert_eq!(alerts.count(EventCategory::Alert), 1);
}

#[test]
fn low_current_is_reported_separately() {
    let (mut m, alerts) = monitor(HazardKind::Gas, ScriptedSignal::new(0), MockPower::at(900.0, 100.0));
    let report = m.step(after_warmup());
    assert!(matches!(
        report.outcome,
        CycleOutcome::Malfunction(Malfunction::LowCurrent { .. })
    ));
    let last = alerts.sent().pop().unwrap();
    assert_eq!(
        last.event.message.as_deref(),
        Some("Current consumption is too low. Sensor might be malfunctioning.")
    );
}

#[test]
fn power_read_error_skips_cycle() {
    let power = MockPower::healthy();
    power.fail(DeviceError::NotReady);
    let (mut m, alerts) = monitor(HazardKind::Sound, ScriptedSignal::new(1), power);

    let report = m.step(0);
    assert_eq!(report.outcome, CycleOutcome::PowerFault(DeviceError::NotReady));
    assert_eq!(m.state(), SensorState::default());
    assert!(alerts.sent().is_empty());
}

#[test]
fn power_read_error_skips_motion_until_the_monitor_answers() {
    let power = MockPower::healthy();
    power.fail(DeviceError::Overflow);
    let (mut m, alerts) = monitor(HazardKind::Motion, ScriptedSignal::new(1), power.clone());

    for t in 0..3 {
        let report = m.step(t * 100);
        assert_eq!(report.outcome, CycleOutcome::PowerFault(DeviceError::Overflow));
    }
    assert_eq!(m.state(), SensorState::default());
    assert!(alerts.sent().is_empty());

    power.set(1_000.0, 200.0);
    for t in 3..6 {
        m.step(t * 100);
    }
    assert_eq!(alerts.count(EventCategory::Alert), 1);
}

// ── Signal faults ─────────────────────────────────────────────

#[test]
fn adc_failure_leaves_counters_untouched() {
    let signal = ScriptedSignal::new(4095)
        .then(100)
        .then_fail(SensorError::AdcReadFailed(-1));
    let (mut m, _alerts) = monitor(HazardKind::Fire, signal, MockPower::healthy());

    m.step(0);
    let before = m.state();
    let report = m.step(521);
    assert_eq!(report.outcome, CycleOutcome::SignalFault(SensorError::AdcReadFailed(-1)));
    assert_eq!(m.state(), before);
}

// ── Warm-up ───────────────────────────────────────────────────

#[test]
fn gas_warms_up_then_announces_once() {
    let (mut m, alerts) = monitor(HazardKind::Gas, ScriptedSignal::new(900), MockPower::healthy());

    let report = m.step(after_warmup() - 1);
    assert_eq!(report.outcome, CycleOutcome::WarmingUp);
    assert_eq!(report.delay, WARMUP_POLL);
    assert!(alerts.sent().is_empty());

    m.step(after_warmup());
    m.step(after_warmup() + 500);

    let logs: Vec<_> = alerts
        .sent()
        .into_iter()
        .filter(|s| s.event.category == EventCategory::Log)
        .collect();
    assert_eq!(logs.len(), 1);
    assert_eq!(
        logs[0].event,
        AlertEvent::log("gas_sensor", "Gas sensor warm-up complete.")
    );
    assert_eq!(alerts.count(EventCategory::Alert), 2);
}
