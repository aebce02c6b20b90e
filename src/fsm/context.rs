//! Boot context threaded through every boot-state handler.
//!
//! Owns every resource the boot sequence acquires.  Handlers release
//! resources by clearing the `Option` slots, so a `Failed` boot drops
//! the store handle, HTTP listener and config memory on the way out.

use core::fmt;

use crate::app::ports::{NvsBackend, ProvisioningEndpoint};
use crate::config::{DeviceConfig, FirmwareConfig};
use crate::error::BootError;
use crate::provisioning::ConfigurationIngestService;
use crate::store::{ConfigStore, close_config};

/// Why the boot sequence asked for a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    /// A configuration was just saved; reboot into station mode.
    Provisioned,
    /// Nobody submitted a configuration in time; re-announce the AP.
    ProvisioningTimeout,
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provisioned => write!(f, "configuration saved"),
            Self::ProvisioningTimeout => write!(f, "provisioning timed out"),
        }
    }
}

pub struct BootContext<B: NvsBackend, W, E: ProvisioningEndpoint, S> {
    // -- Configuration --
    pub firmware: FirmwareConfig,

    // -- Ports --
    pub network: W,
    pub endpoint: E,
    pub system: S,

    // -- Acquired resources --
    /// Raw backend, consumed when the store is opened.
    pub backend: Option<B>,
    pub store: Option<ConfigStore<B>>,
    pub server: Option<E::Handle>,
    pub config: Option<DeviceConfig>,
    pub ingest: ConfigurationIngestService,

    // -- Outcome --
    pub error: Option<BootError>,
    pub restart_reason: Option<RestartReason>,
}

impl<B: NvsBackend, W, E: ProvisioningEndpoint, S> BootContext<B, W, E, S> {
    pub fn new(backend: B, network: W, endpoint: E, system: S, firmware: FirmwareConfig) -> Self {
        Self {
            firmware,
            network,
            endpoint,
            system,
            backend: Some(backend),
            store: None,
            server: None,
            config: None,
            ingest: ConfigurationIngestService::new(),
            error: None,
            restart_reason: None,
        }
    }

    /// Record a hard failure.  The first cause wins.
    pub fn fail(&mut self, err: impl Into<BootError>) {
        if self.error.is_none() {
            self.error = Some(err.into());
        }
    }

    /// Drop every acquired resource.
    pub fn release_all(&mut self) {
        self.server = None;
        if let Some(mut store) = self.store.take() {
            store.close();
        }
        close_config(&mut self.config);
    }
}
