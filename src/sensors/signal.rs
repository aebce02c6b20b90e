//! Hazard signal lines (GPIO level or ADC1 count).

use crate::app::ports::SignalSource;
use crate::drivers::hw_init::{self, HwInitError};
use crate::error::SensorError;

use super::SignalChannel;

/// A configured signal line.  Construct with [`PinSignal::init`].
#[derive(Debug)]
pub struct PinSignal {
    channel: SignalChannel,
}

impl PinSignal {
    /// Configure the pin (or ADC channel) and return a reader for it.
    pub fn init(channel: SignalChannel) -> Result<Self, HwInitError> {
        match channel {
            SignalChannel::Digital { gpio } => hw_init::init_digital_input(gpio)?,
            SignalChannel::Analog { adc_channel, .. } => hw_init::init_adc_channel(adc_channel)?,
        }
        Ok(Self { channel })
    }
}

impl SignalSource for PinSignal {
    fn read(&mut self) -> Result<i32, SensorError> {
        match self.channel {
            SignalChannel::Digital { gpio } => hw_init::gpio_read(gpio).map(i32::from),
            SignalChannel::Analog { adc_channel, .. } => hw_init::adc1_read(adc_channel),
        }
    }
}
