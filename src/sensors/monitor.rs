//! Generic hazard monitor: warm-up gate, power-health check, debounce and
//! decay, alert dispatch.
//!
//! One `SensorMonitor` runs per enabled hazard, each on its own thread.
//! [`SensorMonitor::step`] performs exactly one cycle and reports how long
//! to wait before the next, so the whole state machine is testable without
//! threads or real time.
//!
//! ## Cycle
//!
//! ```text
//!   warming up? ──yes──▶ wait warmup_poll
//!        │no
//!   read power ──err──▶ wait device_fault_backoff
//!        │
//!   power below floor? ──yes──▶ malfunction event, wait cooldown
//!        │no
//!   read signal ──err──▶ wait poll_period
//!        │
//!   qualifying? ──▶ times_triggered += 1 ──▶ reached? ──▶ alert, reset
//!        │
//!   times_triggered > 0 ──▶ reset_ticks += 1 ──▶ window over? ──▶ reset
//!        │
//!   wait poll_period
//! ```

use core::time::Duration;
use std::sync::Arc;

use log::{debug, info, warn};

use super::{HazardProfile, Malfunction};
use crate::app::events::AlertEvent;
use crate::app::ports::{AlertPort, Clock, PowerProbe, SignalSource};
use crate::config::{DeviceConfig, FirmwareConfig};
use crate::error::{DeviceError, SensorError};

/// Debounce counters.  Both return to zero together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorState {
    pub times_triggered: u32,
    pub reset_ticks_count: u32,
}

/// Delays the monitor applies when the sensor itself is in trouble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorTiming {
    pub malfunction_cooldown: Duration,
    pub device_fault_backoff: Duration,
}

impl From<&FirmwareConfig> for MonitorTiming {
    fn from(fw: &FirmwareConfig) -> Self {
        Self {
            malfunction_cooldown: fw.malfunction_cooldown,
            device_fault_backoff: fw.device_fault_backoff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    WarmingUp,
    Malfunction(Malfunction),
    PowerFault(DeviceError),
    SignalFault(SensorError),
    Evaluated {
        value: i32,
        qualifying: bool,
        alerted: bool,
        decayed: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// How long to sleep before the next cycle.
    pub delay: Duration,
}

pub struct SensorMonitor<S, P, A> {
    profile: HazardProfile,
    state: SensorState,
    signal: S,
    power: P,
    alerts: A,
    config: Arc<DeviceConfig>,
    timing: MonitorTiming,
    /// Uptime at which warm-up ends; cleared once it has been reported.
    warmup_until_ms: Option<u64>,
}

impl<S: SignalSource, P: PowerProbe, A: AlertPort> SensorMonitor<S, P, A> {
    pub fn new(
        profile: HazardProfile,
        signal: S,
        power: P,
        alerts: A,
        config: Arc<DeviceConfig>,
        timing: MonitorTiming,
        started_at_ms: u64,
    ) -> Self {
        let warmup_until_ms = profile
            .warmup
            .map(|w| started_at_ms.saturating_add(w.as_millis() as u64));
        Self {
            profile,
            state: SensorState::default(),
            signal,
            power,
            alerts,
            config,
            timing,
            warmup_until_ms,
        }
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn profile(&self) -> &HazardProfile {
        &self.profile
    }

    pub fn is_warming_up(&self) -> bool {
        self.warmup_until_ms.is_some()
    }

    /// Run one cycle at uptime `now_ms`.
    pub fn step(&mut self, now_ms: u64) -> CycleReport {
        let kind = self.profile.kind;

        if let Some(until) = self.warmup_until_ms {
            if now_ms < until {
                debug!("monitor[{kind}]: warming up ({}s left)", (until - now_ms) / 1000);
                return self.report(CycleOutcome::WarmingUp, self.profile.warmup_poll);
            }
            self.warmup_until_ms = None;
            info!("monitor[{kind}]: warm-up complete");
            let msg = format!("{} sensor warm-up complete.", capitalize(kind.name()));
            self.send(AlertEvent::log(kind.sensor_subtype(), &msg));
        }

        let reading = match self.power.read() {
            Ok(reading) => reading,
            Err(e) => {
                warn!("monitor[{kind}]: power read failed: {e}");
                return self.report(CycleOutcome::PowerFault(e), self.timing.device_fault_backoff);
            }
        };
        if let Some(fault) = self.profile.power_floor.and_then(|floor| floor.check(&reading)) {
            warn!("monitor[{kind}]: {fault:?}, {}", fault.message());
            self.send(AlertEvent::malfunction(kind.sensor_subtype(), fault.message()));
            return self.report(CycleOutcome::Malfunction(fault), self.timing.malfunction_cooldown);
        }

        let value = match self.signal.read() {
            Ok(v) => v,
            Err(e) => {
                warn!("monitor[{kind}]: signal read failed: {e}");
                return self.report(CycleOutcome::SignalFault(e), self.profile.poll_period);
            }
        };

        let qualifying = self.profile.comparator.qualifies(value, self.profile.threshold);
        let mut alerted = false;
        if qualifying {
            self.state.times_triggered += 1;
            debug!(
                "monitor[{kind}]: qualifying read {value} ({}/{})",
                self.state.times_triggered, self.profile.times_to_trigger
            );
            if self.state.times_triggered >= self.profile.times_to_trigger {
                info!("monitor[{kind}]: ALERT (value={value})");
                self.send(AlertEvent::alert(kind.alert_subtype()));
                self.state = SensorState::default();
                alerted = true;
            }
        }

        let mut decayed = false;
        if self.state.times_triggered > 0 {
            self.state.reset_ticks_count += 1;
            if self.state.reset_ticks_count >= self.profile.required_reset_ticks_idle {
                debug!("monitor[{kind}]: trigger window expired, counters reset");
                self.state = SensorState::default();
                decayed = true;
            }
        }

        self.report(
            CycleOutcome::Evaluated {
                value,
                qualifying,
                alerted,
                decayed,
            },
            self.profile.poll_period,
        )
    }

    /// Cycle forever, sleeping on `clock` between steps.
    pub fn run<C: Clock>(mut self, clock: &C) -> ! {
        info!(
            "monitor[{}]: started (period={}ms, trigger={}, reset={})",
            self.profile.kind,
            self.profile.poll_period.as_millis(),
            self.profile.times_to_trigger,
            self.profile.required_reset_ticks_idle
        );
        loop {
            let report = self.step(clock.uptime_ms());
            clock.sleep(report.delay);
        }
    }

    fn send(&self, event: AlertEvent) {
        self.alerts.send(&self.config.api_key, &event);
    }

    fn report(&self, outcome: CycleOutcome, delay: Duration) -> CycleReport {
        CycleReport { outcome, delay }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::EventCategory;
    use crate::sensors::power::PowerReading;
    use crate::sensors::profiles::profile;
    use crate::sensors::HazardKind;
    use embedded_hal::i2c::ErrorKind;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    struct Script(VecDeque<Result<i32, SensorError>>);

    impl SignalSource for Script {
        fn read(&mut self) -> Result<i32, SensorError> {
            self.0.pop_front().unwrap_or(Ok(0))
        }
    }

    struct FixedPower(Result<PowerReading, DeviceError>);

    impl PowerProbe for FixedPower {
        fn read(&mut self) -> Result<PowerReading, DeviceError> {
            self.0
        }
    }

    fn healthy() -> FixedPower {
        FixedPower(Ok(PowerReading {
            bus_voltage_mv: 5000,
            shunt_voltage_uv: 15_000,
            current_ma: 150.0,
            power_mw: 800.0,
        }))
    }

    #[derive(Clone, Default)]
    struct Outbox(Rc<RefCell<Vec<(String, AlertEvent)>>>);

    impl AlertPort for Outbox {
        fn send(&self, api_key: &str, event: &AlertEvent) {
            self.0.borrow_mut().push((api_key.to_owned(), event.clone()));
        }
    }

    fn timing() -> MonitorTiming {
        MonitorTiming::from(&FirmwareConfig::default())
    }

    fn monitor(
        kind: HazardKind,
        reads: &[i32],
        power: FixedPower,
    ) -> (SensorMonitor<Script, FixedPower, Outbox>, Outbox) {
        let outbox = Outbox::default();
        let cfg = Arc::new(DeviceConfig {
            api_key: "k-123".into(),
            ..Default::default()
        });
        let script = Script(reads.iter().map(|v| Ok(*v)).collect());
        let mon = SensorMonitor::new(
            profile(kind),
            script,
            power,
            outbox.clone(),
            cfg,
            timing(),
            0,
        );
        (mon, outbox)
    }

    #[test]
    fn fire_alerts_on_third_qualifying_read() {
        let (mut mon, outbox) = monitor(HazardKind::Fire, &[3000, 3000, 3000], healthy());
        mon.step(0);
        mon.step(0);
        assert!(outbox.0.borrow().is_empty());
        let r = mon.step(0);
        assert!(matches!(r.outcome, CycleOutcome::Evaluated { alerted: true, .. }));
        assert_eq!(r.delay, Duration::from_millis(521));

        let sent = outbox.0.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "k-123");
        assert_eq!(sent[0].1.category, EventCategory::Alert);
        assert_eq!(sent[0].1.subtype, "fire_alert");
        assert_eq!(mon.state(), SensorState::default());
    }

    #[test]
    fn fire_counters_decay_after_idle_window() {
        let mut reads = vec![3000];
        reads.extend(std::iter::repeat_n(4000, 10));
        let (mut mon, outbox) = monitor(HazardKind::Fire, &reads, healthy());
        for _ in 0..11 {
            mon.step(0);
        }
        assert_eq!(mon.state(), SensorState::default());
        assert!(outbox.0.borrow().is_empty());
    }

    #[test]
    fn decay_counts_the_qualifying_cycle() {
        let mut reads = vec![3000];
        reads.extend(std::iter::repeat_n(4000, 8));
        let (mut mon, _) = monitor(HazardKind::Fire, &reads, healthy());
        for _ in 0..9 {
            mon.step(0);
        }
        assert_eq!(
            mon.state(),
            SensorState {
                times_triggered: 1,
                reset_ticks_count: 9
            }
        );
        let r = mon.step(0);
        assert!(matches!(r.outcome, CycleOutcome::Evaluated { decayed: true, .. }));
    }

    #[test]
    fn gas_waits_for_warmup_then_alerts_every_qualifying_read() {
        let (mut mon, outbox) = monitor(HazardKind::Gas, &[600, 600], healthy());
        let r = mon.step(1_000);
        assert_eq!(r.outcome, CycleOutcome::WarmingUp);
        assert_eq!(r.delay, Duration::from_secs(5));
        assert!(mon.is_warming_up());

        let done = 15 * 60 * 1000;
        mon.step(done);
        mon.step(done + 500);
        assert!(!mon.is_warming_up());

        let sent = outbox.0.borrow();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].1.category, EventCategory::Log);
        assert_eq!(sent[0].1.subtype, "gas_sensor");
        assert_eq!(sent[0].1.message.as_deref(), Some("Gas sensor warm-up complete."));
        assert_eq!(sent[1].1.subtype, "gas_alert");
        assert_eq!(sent[2].1.subtype, "gas_alert");
    }

    #[test]
    fn low_power_reports_malfunction_and_skips_signal() {
        let weak = FixedPower(Ok(PowerReading {
            power_mw: 1.0,
            current_ma: 1.0,
            ..Default::default()
        }));
        let (mut mon, outbox) = monitor(HazardKind::Sound, &[1, 1, 1], weak);
        let r = mon.step(0);
        assert!(matches!(r.outcome, CycleOutcome::Malfunction(Malfunction::LowPower { .. })));
        assert_eq!(r.delay, Duration::from_secs(5));
        assert_eq!(mon.state(), SensorState::default());

        let sent = outbox.0.borrow();
        assert_eq!(sent[0].1.category, EventCategory::Malfunction);
        assert_eq!(sent[0].1.subtype, "sound_sensor");
        assert_eq!(
            sent[0].1.message.as_deref(),
            Some("Power consumption is too low. Sensor might be malfunctioning.")
        );
    }

    #[test]
    fn low_current_has_its_own_message() {
        let starved = FixedPower(Ok(PowerReading {
            power_mw: 50.0,
            current_ma: 1.0,
            ..Default::default()
        }));
        let (mut mon, outbox) = monitor(HazardKind::Sound, &[], starved);
        mon.step(0);
        assert_eq!(
            outbox.0.borrow()[0].1.message.as_deref(),
            Some("Current consumption is too low. Sensor might be malfunctioning.")
        );
    }

    #[test]
    fn power_read_error_backs_off_without_events() {
        let broken = FixedPower(Err(DeviceError::NotReady));
        let (mut mon, outbox) = monitor(HazardKind::Sound, &[1], broken);
        let r = mon.step(0);
        assert_eq!(r.outcome, CycleOutcome::PowerFault(DeviceError::NotReady));
        assert_eq!(r.delay, Duration::from_secs(1));
        assert!(outbox.0.borrow().is_empty());
    }

    #[test]
    fn power_read_error_skips_hazards_without_floor() {
        let broken = FixedPower(Err(DeviceError::Bus(ErrorKind::Other)));
        let (mut mon, outbox) = monitor(HazardKind::Fire, &[3000, 3000, 3000], broken);
        for _ in 0..3 {
            let r = mon.step(0);
            assert_eq!(r.outcome, CycleOutcome::PowerFault(DeviceError::Bus(ErrorKind::Other)));
            assert_eq!(r.delay, Duration::from_secs(1));
        }
        assert_eq!(mon.state(), SensorState::default());
        assert!(outbox.0.borrow().is_empty());
    }

    #[test]
    fn signal_error_skips_cycle() {
        let outbox = Outbox::default();
        let script = Script(VecDeque::from([Err(SensorError::AdcReadFailed(-1))]));
        let mut mon = SensorMonitor::new(
            profile(HazardKind::Fire),
            script,
            healthy(),
            outbox.clone(),
            Arc::new(DeviceConfig::default()),
            timing(),
            0,
        );
        let r = mon.step(0);
        assert_eq!(r.outcome, CycleOutcome::SignalFault(SensorError::AdcReadFailed(-1)));
        assert_eq!(mon.state(), SensorState::default());
        assert!(outbox.0.borrow().is_empty());
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("gas"), "Gas");
        assert_eq!(capitalize(""), "");
    }
}
