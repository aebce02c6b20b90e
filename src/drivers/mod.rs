//! Hardware initialisation, bus sharing, and RTOS helpers.

pub mod hw_init;
pub mod i2c_bus;
pub mod ina219;
pub mod task_pin;
pub mod watchdog;
