//! Factory profiles for the four supported hazard sensors.

use core::time::Duration;

use super::{Comparator, HazardKind, HazardProfile, PowerFloor, SignalChannel};
use crate::pins;

/// Gas heater burn-in before readings are trusted.
pub const GAS_WARMUP: Duration = Duration::from_secs(15 * 60);
/// Poll interval while a sensor warms up.
pub const WARMUP_POLL: Duration = Duration::from_secs(5);

/// Flame sensor: raw ADC at or below this means fire.
pub const FIRE_THRESHOLD: i32 = 3500;
/// Gas sensor: raw ADC at or above this means gas.
pub const GAS_THRESHOLD: i32 = 500;

pub fn profile(kind: HazardKind) -> HazardProfile {
    match kind {
        HazardKind::Motion => HazardProfile {
            kind,
            channel: SignalChannel::Digital {
                gpio: pins::MOTION_GPIO,
            },
            comparator: Comparator::Presence,
            threshold: 0,
            times_to_trigger: 3,
            required_reset_ticks_idle: 100,
            poll_period: Duration::from_millis(100),
            warmup: None,
            warmup_poll: WARMUP_POLL,
            // PIR modules idle in the µA range; no usable floor.
            power_floor: None,
            power_monitor_address: pins::MOTION_INA219_ADDR,
        },
        HazardKind::Sound => HazardProfile {
            kind,
            channel: SignalChannel::Digital {
                gpio: pins::SOUND_GPIO,
            },
            comparator: Comparator::Presence,
            threshold: 0,
            times_to_trigger: 3,
            required_reset_ticks_idle: 200,
            poll_period: Duration::from_millis(100),
            warmup: None,
            warmup_poll: WARMUP_POLL,
            power_floor: Some(PowerFloor {
                min_power_mw: 20.0,
                min_current_ma: 5.0,
            }),
            power_monitor_address: pins::SOUND_INA219_ADDR,
        },
        HazardKind::Gas => HazardProfile {
            kind,
            channel: SignalChannel::Analog {
                gpio: pins::GAS_GPIO,
                adc_channel: pins::GAS_ADC_CHANNEL,
            },
            comparator: Comparator::AtOrAbove,
            threshold: GAS_THRESHOLD,
            times_to_trigger: 0,
            required_reset_ticks_idle: 5,
            poll_period: Duration::from_millis(500),
            warmup: Some(GAS_WARMUP),
            warmup_poll: WARMUP_POLL,
            // Heater element draws ~150 mA at 5 V.
            power_floor: Some(PowerFloor {
                min_power_mw: 790.0,
                min_current_ma: 140.0,
            }),
            power_monitor_address: pins::GAS_INA219_ADDR,
        },
        HazardKind::Fire => HazardProfile {
            kind,
            channel: SignalChannel::Analog {
                gpio: pins::FIRE_GPIO,
                adc_channel: pins::FIRE_ADC_CHANNEL,
            },
            comparator: Comparator::AtOrBelow,
            threshold: FIRE_THRESHOLD,
            times_to_trigger: 3,
            required_reset_ticks_idle: 10,
            poll_period: Duration::from_millis(521),
            warmup: None,
            warmup_poll: WARMUP_POLL,
            // No floor: the flame module's draw does not separate healthy
            // from broken.  A failed read still skips the cycle.
            power_floor: None,
            power_monitor_address: pins::FIRE_INA219_ADDR,
        },
    }
}
