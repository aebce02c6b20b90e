//! Per-sensor power health, measured by an INA219 on the shared I²C bus.

use embedded_hal::i2c::I2c;
use log::debug;

use crate::app::ports::PowerProbe;
use crate::drivers::ina219::{CONFIG_DEFAULT, Ina219};
use crate::error::DeviceError;

/// Every board uses the same 0.1 Ω shunt.
pub const SHUNT_OHMS: f32 = 0.1;
/// Calibration range; no hazard sensor draws more than this.
pub const MAX_EXPECTED_CURRENT_A: f32 = 1.0;

/// One snapshot of a sensor's supply.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PowerReading {
    pub bus_voltage_mv: u16,
    pub shunt_voltage_uv: i32,
    pub current_ma: f32,
    pub power_mw: f32,
}

pub struct PowerHealthMonitor<I> {
    ina: Ina219<I>,
}

impl<I: I2c> PowerHealthMonitor<I> {
    /// Configure and calibrate the INA219 at `address`.
    pub fn init(i2c: I, address: u8) -> Result<Self, DeviceError> {
        let mut ina = Ina219::new(i2c, address, SHUNT_OHMS);
        ina.configure(CONFIG_DEFAULT)?;
        ina.calibrate(MAX_EXPECTED_CURRENT_A)?;
        debug!("power: INA219@0x{address:02x} calibrated");
        Ok(Self { ina })
    }

    pub fn address(&self) -> u8 {
        self.ina.address()
    }
}

impl<I: I2c> PowerProbe for PowerHealthMonitor<I> {
    fn read(&mut self) -> Result<PowerReading, DeviceError> {
        let reading = PowerReading {
            bus_voltage_mv: self.ina.bus_voltage_mv()?,
            shunt_voltage_uv: self.ina.shunt_voltage_uv()?,
            current_ma: self.ina.current_ma()?,
            power_mw: self.ina.power_mw()?,
        };
        debug!(
            "power@0x{:02x}: bus={}mV shunt={}uV current={:.2}mA power={:.2}mW",
            self.address(),
            reading.bus_voltage_mv,
            reading.shunt_voltage_uv,
            reading.current_ma,
            reading.power_mw
        );
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::i2c_bus::SharedI2c;
    use crate::drivers::ina219::tests::FakeIna219;
    use crate::drivers::ina219::{REG_BUS_VOLTAGE, REG_CALIBRATION, REG_CURRENT, REG_POWER};

    #[test]
    fn init_writes_calibration() {
        let bus = SharedI2c::new(FakeIna219::default());
        let _mon = PowerHealthMonitor::init(bus.clone(), 0x41).unwrap();

        let mut reader = bus;
        let mut buf = [0u8; 2];
        reader.write_read(0x41, &[REG_CALIBRATION], &mut buf).unwrap();
        assert_eq!(u16::from_be_bytes(buf), 13421);
    }

    #[test]
    fn read_scales_registers() {
        let mut fake = FakeIna219::default();
        // 5000 mV, conversion ready.
        fake.regs.insert(REG_BUS_VOLTAGE, (5000 / 4) << 3 | 0b10);
        fake.regs.insert(REG_CURRENT, 100);
        fake.regs.insert(REG_POWER, 10);
        let mut mon = PowerHealthMonitor::init(fake, 0x40).unwrap();

        let r = mon.read().unwrap();
        assert_eq!(r.bus_voltage_mv, 5000);
        assert!((r.current_ma - 3.051_757_8).abs() < 1e-3);
        assert!((r.power_mw - 6.103_515_6).abs() < 1e-3);
    }

    #[test]
    fn bus_failure_surfaces_as_device_error() {
        let fake = FakeIna219 {
            fail: true,
            ..Default::default()
        };
        assert!(matches!(
            PowerHealthMonitor::init(fake, 0x40),
            Err(DeviceError::Bus(_))
        ));
    }
}
