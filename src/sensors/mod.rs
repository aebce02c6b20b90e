//! Hazard sensing: one generic monitor engine plus per-hazard profiles.
//!
//! Every hazard runs the same [`SensorMonitor`](monitor::SensorMonitor)
//! loop.  Everything that differs between hazards lives in a
//! [`HazardProfile`].

pub mod monitor;
pub mod power;
pub mod profiles;
pub mod signal;
pub mod startup;

use core::fmt;
use core::time::Duration;

use crate::config::DeviceConfig;
use power::PowerReading;

// ---------------------------------------------------------------------------
// Hazard identity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HazardKind {
    Motion,
    Sound,
    Gas,
    Fire,
}

impl HazardKind {
    pub const ALL: [Self; 4] = [Self::Motion, Self::Sound, Self::Gas, Self::Fire];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Motion => "motion",
            Self::Sound => "sound",
            Self::Gas => "gas",
            Self::Fire => "fire",
        }
    }

    /// Subtype of confirmed-hazard events.
    pub const fn alert_subtype(self) -> &'static str {
        match self {
            Self::Motion => "motion_alert",
            Self::Sound => "sound_alert",
            Self::Gas => "gas_alert",
            Self::Fire => "fire_alert",
        }
    }

    /// Subtype of malfunction and log events about the sensor itself.
    pub const fn sensor_subtype(self) -> &'static str {
        match self {
            Self::Motion => "motion_sensor",
            Self::Sound => "sound_sensor",
            Self::Gas => "gas_sensor",
            Self::Fire => "fire_sensor",
        }
    }

    /// Thread name for the monitor task (NUL-terminated for FreeRTOS).
    pub const fn task_name(self) -> &'static str {
        match self {
            Self::Motion => "motion-mon\0",
            Self::Sound => "sound-mon\0",
            Self::Gas => "gas-mon\0",
            Self::Fire => "fire-mon\0",
        }
    }

    pub fn enabled_in(self, cfg: &DeviceConfig) -> bool {
        match self {
            Self::Motion => cfg.motion,
            Self::Sound => cfg.sound,
            Self::Gas => cfg.gas,
            Self::Fire => cfg.fire,
        }
    }

    /// Hazards enabled by `cfg`, in a stable order.
    pub fn enabled(cfg: &DeviceConfig) -> impl Iterator<Item = Self> + '_ {
        Self::ALL.into_iter().filter(move |k| k.enabled_in(cfg))
    }
}

impl fmt::Display for HazardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// How a raw reading is compared against the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `value >= threshold` (gas concentration rising).
    AtOrAbove,
    /// `value <= threshold` (flame sensor output drops near fire).
    AtOrBelow,
    /// Digital level; any non-zero value qualifies, threshold unused.
    Presence,
}

impl Comparator {
    pub fn qualifies(self, value: i32, threshold: i32) -> bool {
        match self {
            Self::AtOrAbove => value >= threshold,
            Self::AtOrBelow => value <= threshold,
            Self::Presence => value != 0,
        }
    }
}

/// Where the hazard's signal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalChannel {
    Digital { gpio: i32 },
    Analog { gpio: i32, adc_channel: u32 },
}

impl SignalChannel {
    pub fn is_digital(self) -> bool {
        matches!(self, Self::Digital { .. })
    }
}

/// Minimum draw of a healthy sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerFloor {
    pub min_power_mw: f32,
    pub min_current_ma: f32,
}

/// Why a sensor is considered broken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Malfunction {
    LowPower { measured_mw: f32 },
    LowCurrent { measured_ma: f32 },
}

impl Malfunction {
    pub const fn message(self) -> &'static str {
        match self {
            Self::LowPower { .. } => "Power consumption is too low. Sensor might be malfunctioning.",
            Self::LowCurrent { .. } => {
                "Current consumption is too low. Sensor might be malfunctioning."
            }
        }
    }
}

impl PowerFloor {
    /// Power is checked before current.
    pub fn check(&self, reading: &PowerReading) -> Option<Malfunction> {
        if reading.power_mw < self.min_power_mw {
            Some(Malfunction::LowPower {
                measured_mw: reading.power_mw,
            })
        } else if reading.current_ma < self.min_current_ma {
            Some(Malfunction::LowCurrent {
                measured_ma: reading.current_ma,
            })
        } else {
            None
        }
    }
}

/// Everything that distinguishes one hazard's monitor from another's.
#[derive(Debug, Clone, PartialEq)]
pub struct HazardProfile {
    pub kind: HazardKind,
    pub channel: SignalChannel,
    pub comparator: Comparator,
    pub threshold: i32,
    /// Qualifying reads needed for one alert.  0 alerts on every qualifying read.
    pub times_to_trigger: u32,
    /// Cycles after the first qualifying read before the counters reset.
    pub required_reset_ticks_idle: u32,
    pub poll_period: Duration,
    /// Settling time after boot before readings are evaluated.
    pub warmup: Option<Duration>,
    /// Poll interval while warming up.
    pub warmup_poll: Duration,
    /// `None` disables the malfunction check for this hazard.
    pub power_floor: Option<PowerFloor>,
    /// I²C address of this hazard's INA219.
    pub power_monitor_address: u8,
}
