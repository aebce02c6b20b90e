//! Boot sequence entry point: owns the FSM and its context.

use std::sync::Arc;

use super::context::{BootContext, RestartReason};
use super::states::build_state_table;
use super::{BootState, Fsm};
use crate::app::ports::{Clock, NetworkPort, NvsBackend, ProvisioningEndpoint, RestartPort};
use crate::config::{DeviceConfig, FirmwareConfig};
use crate::error::BootError;
use crate::provisioning::ConfigurationIngestService;

/// How a boot sequence that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootOutcome {
    /// Station mode is up; start monitoring with this configuration.
    Ready(Arc<DeviceConfig>),
    /// A restart was requested.  On hardware this is never observed.
    RestartPending(RestartReason),
}

pub struct ProvisioningCoordinator<B, W, E, S>
where
    B: NvsBackend,
    E: ProvisioningEndpoint,
{
    fsm: Fsm<BootContext<B, W, E, S>>,
    ctx: BootContext<B, W, E, S>,
}

impl<B, W, E, S> ProvisioningCoordinator<B, W, E, S>
where
    B: NvsBackend,
    W: NetworkPort,
    E: ProvisioningEndpoint,
    S: Clock + RestartPort,
{
    pub fn new(backend: B, network: W, endpoint: E, system: S, firmware: FirmwareConfig) -> Self {
        Self {
            fsm: Fsm::new(build_state_table::<B, W, E, S>(), BootState::Booting),
            ctx: BootContext::new(backend, network, endpoint, system, firmware),
        }
    }

    /// Handle on the ingest service the provisioning endpoint will serve.
    pub fn ingest(&self) -> ConfigurationIngestService {
        self.ctx.ingest.clone()
    }

    /// Drive the boot sequence to a terminal state.
    pub fn run(&mut self) -> Result<BootOutcome, BootError> {
        self.fsm.start(&mut self.ctx);
        match self.fsm.run_to_terminal(&mut self.ctx) {
            BootState::Ready => {
                let cfg = self.ctx.config.take().ok_or(BootError::Incomplete)?;
                Ok(BootOutcome::Ready(Arc::new(cfg)))
            }
            BootState::RestartPending => Ok(BootOutcome::RestartPending(
                self.ctx
                    .restart_reason
                    .unwrap_or(RestartReason::ProvisioningTimeout),
            )),
            _ => Err(self.ctx.error.take().unwrap_or(BootError::Incomplete)),
        }
    }

    pub fn state(&self) -> BootState {
        self.fsm.current_state()
    }

    pub fn history(&self) -> &[BootState] {
        self.fsm.history()
    }

    pub fn network(&self) -> &W {
        &self.ctx.network
    }

    pub fn system(&self) -> &S {
        &self.ctx.system
    }

    /// Hand the network adapter back; the radio must outlive the monitors.
    pub fn into_network(self) -> W {
        self.ctx.network
    }
}
