//! Persistent device configuration on top of an [`NvsBackend`].
//!
//! Record layout (namespace `config`):
//!
//! | key          | type | notes                                  |
//! |--------------|------|----------------------------------------|
//! | `configured` | u8   | 1 once provisioning completed          |
//! | `api_key`    | str  | required                               |
//! | `ssid`       | str  | required                               |
//! | `password`   | str  | required (may be empty for open nets)  |
//! | `motion`     | u8   | optional, absent = disabled            |
//! | `sound`      | u8   |                                        |
//! | `gas`        | u8   |                                        |
//! | `fire`       | u8   |                                        |
//!
//! `save` writes every field, then `configured`, then commits.  A failure
//! anywhere before the commit leaves the previously committed record as
//! the only observable state.

use core::time::Duration;

use log::{error, info, warn};

use crate::app::ports::{Clock, FlashInitError, NvsBackend, StorageError};
use crate::config::DeviceConfig;

pub const NAMESPACE: &str = "config";

/// Total flash-init attempts on a corrupt or outdated partition.
pub const INIT_ATTEMPTS: u32 = 5;
/// Fixed delay between init attempts.
pub const INIT_BACKOFF: Duration = Duration::from_millis(500);

pub mod keys {
    pub const CONFIGURED: &str = "configured";
    pub const API_KEY: &str = "api_key";
    pub const SSID: &str = "ssid";
    pub const PASSWORD: &str = "password";
    pub const MOTION: &str = "motion";
    pub const SOUND: &str = "sound";
    pub const GAS: &str = "gas";
    pub const FIRE: &str = "fire";
}

/// Open handle on the `config` namespace.
///
/// Dropping the store closes the namespace.
pub struct ConfigStore<B: NvsBackend> {
    backend: B,
    open: bool,
}

impl<B: NvsBackend> ConfigStore<B> {
    /// Initialise flash and open the `config` namespace.
    ///
    /// A partition reporting "no free pages" or "new version found" is
    /// erased and re-initialised, at most [`INIT_ATTEMPTS`] times in total.
    pub fn init<C: Clock>(mut backend: B, clock: &C) -> Result<Self, StorageError> {
        init_flash(&mut backend, clock)?;
        backend.open(NAMESPACE).inspect_err(|e| {
            error!("ConfigStore: failed to open \"{}\": {}", NAMESPACE, e);
        })?;
        info!("ConfigStore: initialised");
        Ok(Self {
            backend,
            open: true,
        })
    }

    /// `true` only when the `configured` flag exists and equals 1.
    pub fn is_configured(&self) -> bool {
        if !self.open {
            return false;
        }
        matches!(self.backend.get_u8(keys::CONFIGURED), Ok(Some(1)))
    }

    /// Load the persisted record.
    ///
    /// Missing strings are an error; missing hazard flags read as disabled.
    pub fn load(&self) -> Result<DeviceConfig, StorageError> {
        self.ensure_open()?;

        let mut cfg = DeviceConfig::new();
        cfg.set_api_key(&self.required_str(keys::API_KEY)?);
        cfg.set_network_ssid(&self.required_str(keys::SSID)?);
        cfg.set_network_password(&self.required_str(keys::PASSWORD)?);

        cfg.motion = self.flag(keys::MOTION);
        cfg.sound = self.flag(keys::SOUND);
        cfg.gas = self.flag(keys::GAS);
        cfg.fire = self.flag(keys::FIRE);

        info!("ConfigStore: loaded {}", cfg);
        Ok(cfg)
    }

    /// Persist `cfg` and mark the device configured.
    pub fn save(&mut self, cfg: &DeviceConfig) -> Result<(), StorageError> {
        self.ensure_open()?;

        let b = &mut self.backend;
        b.set_str(keys::API_KEY, &cfg.api_key)?;
        b.set_str(keys::SSID, &cfg.network_ssid)?;
        b.set_str(keys::PASSWORD, &cfg.network_password)?;
        b.set_u8(keys::MOTION, u8::from(cfg.motion))?;
        b.set_u8(keys::SOUND, u8::from(cfg.sound))?;
        b.set_u8(keys::GAS, u8::from(cfg.gas))?;
        b.set_u8(keys::FIRE, u8::from(cfg.fire))?;
        b.set_u8(keys::CONFIGURED, 1)?;
        b.commit().inspect_err(|e| error!("ConfigStore: {}", e))?;

        info!("ConfigStore: configuration saved");
        Ok(())
    }

    /// Close the namespace handle.  Safe to call more than once.
    pub fn close(&mut self) {
        if self.open {
            self.backend.close();
            self.open = false;
            info!("ConfigStore: closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.open { Ok(()) } else { Err(StorageError::Closed) }
    }

    fn required_str(&self, key: &'static str) -> Result<String, StorageError> {
        match self.backend.get_str(key) {
            Ok(Some(v)) => Ok(v),
            Ok(None) => {
                error!("ConfigStore: '{}' missing", key);
                Err(StorageError::MissingField(key))
            }
            Err(e) => {
                error!("ConfigStore: reading '{}': {}", key, e);
                Err(e)
            }
        }
    }

    fn flag(&self, key: &'static str) -> bool {
        match self.backend.get_u8(key) {
            Ok(Some(v)) => v == 1,
            Ok(None) => false,
            Err(e) => {
                warn!("ConfigStore: reading '{}': {}, treating as disabled", key, e);
                false
            }
        }
    }
}

impl<B: NvsBackend> Drop for ConfigStore<B> {
    fn drop(&mut self) {
        self.close();
    }
}

fn init_flash<B: NvsBackend, C: Clock>(backend: &mut B, clock: &C) -> Result<(), StorageError> {
    for attempt in 1..=INIT_ATTEMPTS {
        match backend.flash_init() {
            Ok(()) => return Ok(()),
            Err(FlashInitError::Fatal(rc)) => {
                error!("ConfigStore: NVS init failed (rc={})", rc);
                return Err(StorageError::InitFailed(rc));
            }
            Err(FlashInitError::NeedsErase(rc)) => {
                warn!(
                    "ConfigStore: NVS partition full or outdated (rc={}), attempt {}/{}",
                    rc, attempt, INIT_ATTEMPTS
                );
                if attempt == INIT_ATTEMPTS {
                    break;
                }
                backend.flash_erase()?;
                clock.sleep(INIT_BACKOFF);
            }
        }
    }
    error!("ConfigStore: failed to initialise NVS repeatedly");
    Err(StorageError::InitRetriesExhausted)
}

/// Release a configuration.  A `None` slot is a no-op.
pub fn close_config(config: &mut Option<DeviceConfig>) {
    if config.take().is_some() {
        info!("ConfigStore: configuration released");
    }
}
