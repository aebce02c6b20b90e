//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ConfigStore / SensorMonitor / ProvisioningCoordinator
//! ```
//!
//! Driven adapters (NVS, ADC/GPIO, INA219, HTTP, Wi-Fi, system clock)
//! implement these traits.  The domain consumes them via generics, so the
//! boot sequence and the monitor engine run unchanged on the host against
//! mocks.
//!
//! ## Security notes
//!
//! - **NetworkPort** implementations MUST validate credentials before use.
//! - Wi-Fi passwords and API keys MUST NOT be logged in clear.

use core::fmt;
use core::time::Duration;

use super::events::AlertEvent;
use crate::error::{DeviceError, SensorError};
use crate::provisioning::ConfigurationIngestService;
use crate::sensors::power::PowerReading;

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Outcome of a flash-partition init that did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashInitError {
    /// Partition is full or was written by a newer NVS version.
    /// Recoverable by erasing the partition.
    NeedsErase(i32),
    /// Any other failure.  Not recoverable.
    Fatal(i32),
}

/// Raw key/value access to a single NVS namespace.
///
/// The call order is `flash_init` → `open` → get/set … `commit` → `close`.
/// Writes are only observable by a later `open` once `commit` succeeded.
pub trait NvsBackend {
    fn flash_init(&mut self) -> Result<(), FlashInitError>;

    fn flash_erase(&mut self) -> Result<(), StorageError>;

    /// Open `namespace` read-write.
    fn open(&mut self, namespace: &str) -> Result<(), StorageError>;

    /// Release the namespace handle.  Uncommitted writes are discarded.
    fn close(&mut self);

    /// `Ok(None)` when the key does not exist.
    fn get_str(&self, key: &'static str) -> Result<Option<String>, StorageError>;

    fn set_str(&mut self, key: &'static str, value: &str) -> Result<(), StorageError>;

    /// `Ok(None)` when the key does not exist.
    fn get_u8(&self, key: &'static str) -> Result<Option<u8>, StorageError>;

    fn set_u8(&mut self, key: &'static str, value: u8) -> Result<(), StorageError>;

    fn commit(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One hazard's raw signal: a digital level (0/1) or a 12-bit ADC count.
pub trait SignalSource {
    fn read(&mut self) -> Result<i32, SensorError>;
}

/// The power draw of one hazard sensor.
pub trait PowerProbe {
    fn read(&mut self) -> Result<PowerReading, DeviceError>;
}

// ───────────────────────────────────────────────────────────────
// Alert port (driven adapter: domain → remote collector)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget delivery of alert / malfunction / log events.
///
/// Implementations log delivery failures and return; callers never retry.
pub trait AlertPort {
    fn send(&self, api_key: &str, event: &AlertEvent);
}

// ───────────────────────────────────────────────────────────────
// Network ports (driven adapter: domain → Wi-Fi stack, HTTP server)
// ───────────────────────────────────────────────────────────────

/// Brings the radio up in exactly one mode per boot.
pub trait NetworkPort {
    /// Join an existing network with the persisted credentials.
    fn start_station(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError>;

    /// Announce the provisioning access point.
    fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError>;
}

/// Hosts the provisioning endpoints for the lifetime of the returned handle.
///
/// Dropping the handle stops the listener.
pub trait ProvisioningEndpoint {
    type Handle;

    fn start(&mut self, service: ConfigurationIngestService) -> Result<Self::Handle, NetworkError>;
}

// ───────────────────────────────────────────────────────────────
// System ports (driven adapter: domain → RTOS)
// ───────────────────────────────────────────────────────────────

/// Monotonic time and blocking delay.
pub trait Clock {
    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64;

    fn sleep(&self, duration: Duration);
}

/// Software reset.  Never returns on hardware.
pub trait RestartPort {
    fn restart(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from the persistent configuration store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Erase-and-retry budget spent on a corrupt partition.
    InitRetriesExhausted,
    /// Flash init failed with a non-recoverable code.
    InitFailed(i32),
    /// Partition erase failed.
    EraseFailed(i32),
    /// Namespace could not be opened.
    OpenFailed(i32),
    /// A required key is absent.
    MissingField(&'static str),
    /// Reading a key failed for a reason other than absence.
    ReadFailed(&'static str),
    /// Writing a key failed.
    WriteFailed(&'static str),
    /// Commit failed; nothing from this batch is persisted.
    CommitFailed(i32),
    /// Store was used after `close`.
    Closed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitRetriesExhausted => write!(f, "flash init retries exhausted"),
            Self::InitFailed(rc) => write!(f, "flash init failed (rc={})", rc),
            Self::EraseFailed(rc) => write!(f, "flash erase failed (rc={})", rc),
            Self::OpenFailed(rc) => write!(f, "namespace open failed (rc={})", rc),
            Self::MissingField(key) => write!(f, "missing field '{}'", key),
            Self::ReadFailed(key) => write!(f, "read of '{}' failed", key),
            Self::WriteFailed(key) => write!(f, "write of '{}' failed", key),
            Self::CommitFailed(rc) => write!(f, "commit failed (rc={})", rc),
            Self::Closed => write!(f, "store is closed"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Errors from the Wi-Fi stack and the HTTP server / client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// No SSID configured.
    NoCredentials,
    /// SSID is not 1–32 printable ASCII bytes.
    InvalidSsid,
    /// Password is neither empty nor 8–64 bytes.
    InvalidPassword,
    /// The driver refused to start or connect.
    Driver(String),
    /// HTTP server or client failure.
    Http(String),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::Driver(msg) => write!(f, "WiFi driver: {}", msg),
            Self::Http(msg) => write!(f, "HTTP: {}", msg),
        }
    }
}

impl std::error::Error for NetworkError {}
