//! TI INA219 high-side current/power monitor driver.
//!
//! Generic over any [`embedded_hal::i2c::I2c`] bus so the same code runs on
//! the ESP-IDF `I2cDriver` and on a register-level mock in tests.
//!
//! Registers are 16-bit big-endian.  Calibration follows the datasheet
//! (§8.5.1):
//!
//! ```text
//! current_lsb = I_max / 2^15
//! cal         = trunc(0.04096 / (current_lsb · R_shunt))
//! power_lsb   = 20 · current_lsb
//! ```

use embedded_hal::i2c::{Error as _, I2c};
use log::{info, warn};

use crate::error::DeviceError;

pub const DEFAULT_ADDRESS: u8 = 0x40;

// ── Registers ─────────────────────────────────────────────────

pub const REG_CONFIG: u8 = 0x00;
pub const REG_SHUNT_VOLTAGE: u8 = 0x01;
pub const REG_BUS_VOLTAGE: u8 = 0x02;
pub const REG_POWER: u8 = 0x03;
pub const REG_CURRENT: u8 = 0x04;
pub const REG_CALIBRATION: u8 = 0x05;

// ── Config register fields ────────────────────────────────────

pub const CONFIG_BVOLTAGERANGE_32V: u16 = 0x2000;
pub const CONFIG_GAIN_8_320MV: u16 = 0x1800;
pub const CONFIG_BADCRES_12BIT: u16 = 0x0180;
pub const CONFIG_SADCRES_12BIT_1S: u16 = 0x0018;
pub const CONFIG_MODE_CONTINUOUS: u16 = 0x0007;

/// 32 V range, ±320 mV shunt, 12-bit bus and shunt, continuous.
pub const CONFIG_DEFAULT: u16 = CONFIG_BVOLTAGERANGE_32V
    | CONFIG_GAIN_8_320MV
    | CONFIG_BADCRES_12BIT
    | CONFIG_SADCRES_12BIT_1S
    | CONFIG_MODE_CONTINUOUS;

const BUS_CONVERSION_READY: u16 = 0x0002;
const BUS_MATH_OVERFLOW: u16 = 0x0001;
const BUS_VOLTAGE_LSB_MV: u16 = 4;
const SHUNT_VOLTAGE_LSB_UV: i32 = 10;

/// Calibration results, kept so current/power registers can be scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub register: u16,
    pub current_lsb_ma: f32,
    pub power_lsb_mw: f32,
}

/// Compute the calibration register and LSBs for a shunt and full-scale current.
pub fn compute_calibration(
    shunt_ohms: f32,
    max_expected_current_a: f32,
) -> Result<Calibration, DeviceError> {
    if shunt_ohms <= 0.0 || max_expected_current_a <= 0.0 {
        return Err(DeviceError::InvalidArgument);
    }
    let current_lsb_a = max_expected_current_a / 32768.0;
    let cal = 0.04096 / (current_lsb_a * shunt_ohms);
    if !(1.0..=f32::from(u16::MAX)).contains(&cal) {
        return Err(DeviceError::InvalidArgument);
    }
    Ok(Calibration {
        register: cal as u16,
        current_lsb_ma: current_lsb_a * 1000.0,
        power_lsb_mw: 20.0 * current_lsb_a * 1000.0,
    })
}

pub struct Ina219<I> {
    i2c: I,
    address: u8,
    shunt_ohms: f32,
    calibration: Option<Calibration>,
}

impl<I: I2c> Ina219<I> {
    /// Bind a device descriptor.  No bus traffic happens here.
    pub fn new(i2c: I, address: u8, shunt_ohms: f32) -> Self {
        info!(
            "INA219: descriptor addr=0x{:02X} Rshunt={:.3} Ohm",
            address, shunt_ohms
        );
        Self {
            i2c,
            address,
            shunt_ohms,
            calibration: None,
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn calibration(&self) -> Option<Calibration> {
        self.calibration
    }

    /// Write the config register.
    pub fn configure(&mut self, config: u16) -> Result<(), DeviceError> {
        self.write_register(REG_CONFIG, config)?;
        info!("INA219(0x{:02X}): configured 0x{:04X}", self.address, config);
        Ok(())
    }

    /// Compute and write the calibration register.
    ///
    /// On a failed write the driver stays uncalibrated.
    pub fn calibrate(&mut self, max_expected_current_a: f32) -> Result<(), DeviceError> {
        let cal = compute_calibration(self.shunt_ohms, max_expected_current_a)?;
        self.calibration = None;
        self.write_register(REG_CALIBRATION, cal.register)?;
        info!(
            "INA219(0x{:02X}): calibrated Imax={:.2}A cal={} current_lsb={:.6}mA power_lsb={:.6}mW",
            self.address, max_expected_current_a, cal.register, cal.current_lsb_ma, cal.power_lsb_mw
        );
        self.calibration = Some(cal);
        Ok(())
    }

    /// Bus voltage in millivolts.
    pub fn bus_voltage_mv(&mut self) -> Result<u16, DeviceError> {
        let raw = self.read_register(REG_BUS_VOLTAGE)?;
        if raw & BUS_CONVERSION_READY == 0 {
            warn!("INA219(0x{:02X}): bus voltage conversion not ready", self.address);
            return Err(DeviceError::NotReady);
        }
        if raw & BUS_MATH_OVERFLOW != 0 {
            warn!("INA219(0x{:02X}): bus voltage overflow", self.address);
            return Err(DeviceError::Overflow);
        }
        Ok((raw >> 3) * BUS_VOLTAGE_LSB_MV)
    }

    /// Shunt voltage in microvolts (signed).
    pub fn shunt_voltage_uv(&mut self) -> Result<i32, DeviceError> {
        let raw = self.read_register(REG_SHUNT_VOLTAGE)? as i16;
        Ok(i32::from(raw) * SHUNT_VOLTAGE_LSB_UV)
    }

    /// Current in milliamps (signed).
    pub fn current_ma(&mut self) -> Result<f32, DeviceError> {
        let cal = self.calibration.ok_or(DeviceError::InvalidState)?;
        let raw = self.read_register(REG_CURRENT)? as i16;
        Ok(f32::from(raw) * cal.current_lsb_ma)
    }

    /// Power in milliwatts.
    pub fn power_mw(&mut self) -> Result<f32, DeviceError> {
        let cal = self.calibration.ok_or(DeviceError::InvalidState)?;
        let raw = self.read_register(REG_POWER)?;
        Ok(f32::from(raw) * cal.power_lsb_mw)
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.i2c
    }

    fn write_register(&mut self, reg: u8, value: u16) -> Result<(), DeviceError> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[reg, hi, lo])
            .map_err(|e| DeviceError::Bus(e.kind()))
    }

    fn read_register(&mut self, reg: u8) -> Result<u16, DeviceError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(|e| DeviceError::Bus(e.kind()))?;
        Ok(u16::from_be_bytes(buf))
    }
}
