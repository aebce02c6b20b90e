//! GPIO / peripheral assignments for the HazardWatch sensor board (ESP32-WROOM).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Hazard sensors: digital
// ---------------------------------------------------------------------------

/// PIR motion sensor output.  HIGH = motion.
pub const MOTION_GPIO: i32 = 13;
/// Sound sensor comparator output.  HIGH = sound above trim-pot level.
pub const SOUND_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// Hazard sensors: analog (ADC1)
// ---------------------------------------------------------------------------

/// MQ-series gas sensor, analog out.  GPIO 34 = ADC1 channel 6.
pub const GAS_GPIO: i32 = 34;
pub const GAS_ADC_CHANNEL: u32 = 6;

/// IR flame sensor, analog out.  GPIO 35 = ADC1 channel 7.
/// Reading drops as flame intensity rises.
pub const FIRE_GPIO: i32 = 35;
pub const FIRE_ADC_CHANNEL: u32 = 7;

// ---------------------------------------------------------------------------
// I²C bus (INA219 power monitors)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
pub const I2C_FREQ_HZ: u32 = 100_000;

/// One INA219 per hazard, strapped via A0/A1.
pub const MOTION_INA219_ADDR: u8 = 0x40;
pub const SOUND_INA219_ADDR: u8 = 0x41;
pub const GAS_INA219_ADDR: u8 = 0x44;
pub const FIRE_INA219_ADDR: u8 = 0x45;
