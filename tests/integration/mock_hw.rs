//! Mock adapters for integration tests.
//!
//! Signal and power mocks replay scripted readings; the alert mock records
//! every event so tests can assert on the full outbound history.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use core::time::Duration;

use hazardwatch::app::events::{AlertEvent, EventCategory};
use hazardwatch::app::ports::{AlertPort, Clock, PowerProbe, RestartPort, SignalSource};
use hazardwatch::error::{DeviceError, SensorError};
use hazardwatch::sensors::power::PowerReading;

// ── Signal ────────────────────────────────────────────────────

/// Replays queued readings, then repeats `idle` forever.
pub struct ScriptedSignal {
    queue: VecDeque<Result<i32, SensorError>>,
    idle: i32,
}

#[allow(dead_code)]
impl ScriptedSignal {
    pub fn new(idle: i32) -> Self {
        Self {
            queue: VecDeque::new(),
            idle,
        }
    }

    pub fn then(mut self, value: i32) -> Self {
        self.queue.push_back(Ok(value));
        self
    }

    pub fn then_n(mut self, value: i32, n: usize) -> Self {
        self.queue.extend(std::iter::repeat_n(Ok(value), n));
        self
    }

    pub fn then_fail(mut self, err: SensorError) -> Self {
        self.queue.push_back(Err(err));
        self
    }
}

impl SignalSource for ScriptedSignal {
    fn read(&mut self) -> Result<i32, SensorError> {
        self.queue.pop_front().unwrap_or(Ok(self.idle))
    }
}

// ── Power ─────────────────────────────────────────────────────

/// Power source whose reading tests can change between cycles.
#[derive(Clone)]
pub struct MockPower {
    reading: Arc<Mutex<Result<PowerReading, DeviceError>>>,
}

#[allow(dead_code)]
impl MockPower {
    /// A draw comfortably above every hazard's floor.
    pub fn healthy() -> Self {
        Self::at(1_000.0, 200.0)
    }

    pub fn at(power_mw: f32, current_ma: f32) -> Self {
        Self {
            reading: Arc::new(Mutex::new(Ok(reading(power_mw, current_ma)))),
        }
    }

    pub fn set(&self, power_mw: f32, current_ma: f32) {
        *self.lock() = Ok(reading(power_mw, current_ma));
    }

    pub fn fail(&self, err: DeviceError) {
        *self.lock() = Err(err);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Result<PowerReading, DeviceError>> {
        self.reading.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn reading(power_mw: f32, current_ma: f32) -> PowerReading {
    PowerReading {
        bus_voltage_mv: 5_000,
        shunt_voltage_uv: (current_ma * 100.0) as i32,
        current_ma,
        power_mw,
    }
}

impl PowerProbe for MockPower {
    fn read(&mut self) -> Result<PowerReading, DeviceError> {
        *self.lock()
    }
}

// ── Alerts ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SentEvent {
    pub api_key: String,
    pub event: AlertEvent,
}

/// Records every event instead of posting it.
#[derive(Clone, Default)]
pub struct RecordingAlerts {
    sent: Arc<Mutex<Vec<SentEvent>>>,
}

#[allow(dead_code)]
impl RecordingAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEvent> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self, category: EventCategory) -> usize {
        self.sent()
            .iter()
            .filter(|s| s.event.category == category)
            .count()
    }
}

impl AlertPort for RecordingAlerts {
    fn send(&self, api_key: &str, event: &AlertEvent) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentEvent {
                api_key: api_key.into(),
                event: event.clone(),
            });
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Virtual time: `sleep` advances the clock instantly.
#[derive(Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
    restarts: Arc<AtomicU32>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn restarts(&self) -> u32 {
        self.restarts.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn uptime_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

impl RestartPort for ManualClock {
    fn restart(&mut self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }
}
