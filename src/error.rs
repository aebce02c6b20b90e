//! Unified error types for the HazardWatch firmware.
//!
//! Hardware-facing errors ([`SensorError`], [`DeviceError`]) are `Copy` so a
//! monitor loop can log them and move on without allocating.  Boot-path
//! errors funnel into [`BootError`], which is what the coordinator returns
//! to `main`.

use core::fmt;

use crate::app::ports::{NetworkError, StorageError};
use crate::sensors::HazardKind;

// ---------------------------------------------------------------------------
// Sensor errors (signal path)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC oneshot read returned an error code.
    AdcReadFailed(i32),
    /// GPIO level read failed.
    GpioReadFailed,
    /// Channel was never configured by `hw_init`.
    NotConfigured,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed(rc) => write!(f, "ADC read failed (rc={})", rc),
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
            Self::NotConfigured => write!(f, "signal channel not configured"),
        }
    }
}

// ---------------------------------------------------------------------------
// Device errors (power-health path)
// ---------------------------------------------------------------------------

/// Errors from the INA219 power monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// The I²C transaction failed.
    Bus(embedded_hal::i2c::ErrorKind),
    /// Bus-voltage conversion-ready bit was clear.
    NotReady,
    /// Bus-voltage math overflow bit was set.
    Overflow,
    /// Current or power was requested before calibration.
    InvalidState,
    /// Calibration arguments were out of range.
    InvalidArgument,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(kind) => write!(f, "I2C bus error: {:?}", kind),
            Self::NotReady => write!(f, "conversion not ready"),
            Self::Overflow => write!(f, "bus voltage overflow"),
            Self::InvalidState => write!(f, "device not calibrated"),
            Self::InvalidArgument => write!(f, "invalid calibration argument"),
        }
    }
}

// ---------------------------------------------------------------------------
// Boot errors
// ---------------------------------------------------------------------------

/// Every hard failure that aborts the boot sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootError {
    /// Persistent store could not be opened, read or written.
    Storage(StorageError),
    /// Station or access-point bring-up failed.
    Network(NetworkError),
    /// Provisioning endpoint failed to start.
    Endpoint(NetworkError),
    /// A hazard's power monitor or signal channel failed to initialise.
    SensorInit(HazardKind),
    /// The state machine stopped in `Failed` without recording a cause.
    Incomplete,
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Endpoint(e) => write!(f, "provisioning endpoint: {e}"),
            Self::SensorInit(kind) => write!(f, "failed to initialise {} sensor", kind.name()),
            Self::Incomplete => write!(f, "boot sequence ended without an outcome"),
        }
    }
}

impl std::error::Error for BootError {}

impl From<StorageError> for BootError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<NetworkError> for BootError {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}
