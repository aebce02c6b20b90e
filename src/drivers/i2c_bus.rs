//! Shared I²C bus.
//!
//! All four INA219 monitors sit on one bus, but each monitor lives on its
//! own thread.  [`SharedI2c`] hands out cheap clones that serialise every
//! transaction through one mutex, so a `write_read` from one thread can
//! never interleave with another thread's.

use std::sync::{Arc, Mutex, PoisonError};

use embedded_hal::i2c::{ErrorType, I2c, Operation};

pub struct SharedI2c<I> {
    bus: Arc<Mutex<I>>,
}

impl<I> Clone for SharedI2c<I> {
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
        }
    }
}

impl<I> SharedI2c<I> {
    pub fn new(bus: I) -> Self {
        Self {
            bus: Arc::new(Mutex::new(bus)),
        }
    }
}

impl<I: I2c> ErrorType for SharedI2c<I> {
    type Error = I::Error;
}

impl<I: I2c> I2c for SharedI2c<I> {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().unwrap_or_else(PoisonError::into_inner);
        bus.transaction(address, operations)
    }
}
