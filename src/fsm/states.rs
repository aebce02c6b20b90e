//! Boot state handlers and table builder.
//!
//! ```text
//!  BOOTING ──[configured]──▶ CONFIGURED ──[station up]──▶ READY
//!     │
//!  [unconfigured]
//!     ▼
//!  UNCONFIGURED ──[AP up]──▶ PROVISIONING ──[submission]──▶ PROVISIONED_FRESHLY
//!                                 │                                │
//!                             [timeout]                        [saved]
//!                                 └──────────▶ RESTART_PENDING ◀───┘
//!
//!  Any hard failure ──▶ FAILED (every resource released)
//! ```
//!
//! Exactly one of station mode or access point is brought up per boot.

use log::{error, info, warn};

use super::context::{BootContext, RestartReason};
use super::{BootState, StateDescriptor};
use crate::app::ports::{Clock, NetworkPort, NvsBackend, ProvisioningEndpoint, RestartPort};
use crate::error::BootError;
use crate::store::{ConfigStore, close_config};

/// Build the boot state table for one set of adapters.
pub fn build_state_table<B, W, E, S>() -> [StateDescriptor<BootContext<B, W, E, S>>; BootState::COUNT]
where
    B: NvsBackend,
    W: NetworkPort,
    E: ProvisioningEndpoint,
    S: Clock + RestartPort,
{
    [
        // Index 0: Booting
        StateDescriptor {
            id: BootState::Booting,
            name: "Booting",
            on_enter: None,
            on_exit: None,
            on_update: booting_update::<B, W, E, S>,
        },
        // Index 1: Unconfigured
        StateDescriptor {
            id: BootState::Unconfigured,
            name: "Unconfigured",
            on_enter: None,
            on_exit: None,
            on_update: unconfigured_update::<B, W, E, S>,
        },
        // Index 2: Provisioning
        StateDescriptor {
            id: BootState::Provisioning,
            name: "Provisioning",
            on_enter: Some(provisioning_enter::<B, W, E, S>),
            on_exit: None,
            on_update: provisioning_update::<B, W, E, S>,
        },
        // Index 3: ProvisionedFreshly
        StateDescriptor {
            id: BootState::ProvisionedFreshly,
            name: "ProvisionedFreshly",
            on_enter: None,
            on_exit: None,
            on_update: provisioned_update::<B, W, E, S>,
        },
        // Index 4: RestartPending
        StateDescriptor {
            id: BootState::RestartPending,
            name: "RestartPending",
            on_enter: Some(restart_enter::<B, W, E, S>),
            on_exit: None,
            on_update: terminal::<B, W, E, S>,
        },
        // Index 5: Configured
        StateDescriptor {
            id: BootState::Configured,
            name: "Configured",
            on_enter: None,
            on_exit: None,
            on_update: configured_update::<B, W, E, S>,
        },
        // Index 6: Ready
        StateDescriptor {
            id: BootState::Ready,
            name: "Ready",
            on_enter: Some(ready_enter::<B, W, E, S>),
            on_exit: None,
            on_update: terminal::<B, W, E, S>,
        },
        // Index 7: Failed
        StateDescriptor {
            id: BootState::Failed,
            name: "Failed",
            on_enter: Some(failed_enter::<B, W, E, S>),
            on_exit: None,
            on_update: terminal::<B, W, E, S>,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  BOOTING
// ═══════════════════════════════════════════════════════════════════════════

fn booting_update<B, W, E, S>(ctx: &mut BootContext<B, W, E, S>) -> Option<BootState>
where
    B: NvsBackend,
    E: ProvisioningEndpoint,
    S: Clock,
{
    let Some(backend) = ctx.backend.take() else {
        ctx.fail(BootError::Incomplete);
        return Some(BootState::Failed);
    };

    match ConfigStore::init(backend, &ctx.system) {
        Ok(store) => {
            let configured = store.is_configured();
            ctx.store = Some(store);
            if configured {
                Some(BootState::Configured)
            } else {
                info!("Boot: no configuration stored");
                Some(BootState::Unconfigured)
            }
        }
        Err(e) => {
            ctx.fail(e);
            Some(BootState::Failed)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONFIGURED → READY
// ═══════════════════════════════════════════════════════════════════════════

fn configured_update<B, W, E, S>(ctx: &mut BootContext<B, W, E, S>) -> Option<BootState>
where
    B: NvsBackend,
    W: NetworkPort,
    E: ProvisioningEndpoint,
    S: Clock,
{
    let loaded = match ctx.store.as_ref() {
        Some(store) => store.load(),
        None => {
            ctx.fail(BootError::Incomplete);
            return Some(BootState::Failed);
        }
    };
    let cfg = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            ctx.fail(e);
            return Some(BootState::Failed);
        }
    };

    if let Err(e) = ctx
        .network
        .start_station(&cfg.network_ssid, &cfg.network_password)
    {
        ctx.config = Some(cfg);
        ctx.fail(e);
        return Some(BootState::Failed);
    }

    ctx.system.sleep(ctx.firmware.station_settle);
    ctx.config = Some(cfg);
    Some(BootState::Ready)
}

fn ready_enter<B, W, E, S>(ctx: &mut BootContext<B, W, E, S>)
where
    B: NvsBackend,
    E: ProvisioningEndpoint,
{
    if let Some(mut store) = ctx.store.take() {
        store.close();
    }
    if let Some(cfg) = &ctx.config {
        info!("Boot: ready ({})", cfg);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNCONFIGURED → PROVISIONING
// ═══════════════════════════════════════════════════════════════════════════

fn unconfigured_update<B, W, E, S>(ctx: &mut BootContext<B, W, E, S>) -> Option<BootState>
where
    B: NvsBackend,
    W: NetworkPort,
    E: ProvisioningEndpoint,
{
    let (ssid, password) = (ctx.firmware.ap_ssid, ctx.firmware.ap_password);
    match ctx.network.start_access_point(ssid, password) {
        Ok(()) => Some(BootState::Provisioning),
        Err(e) => {
            ctx.fail(e);
            Some(BootState::Failed)
        }
    }
}

fn provisioning_enter<B, W, E, S>(ctx: &mut BootContext<B, W, E, S>)
where
    B: NvsBackend,
    E: ProvisioningEndpoint,
{
    match ctx.endpoint.start(ctx.ingest.clone()) {
        Ok(handle) => ctx.server = Some(handle),
        Err(e) => ctx.fail(BootError::Endpoint(e)),
    }
}

fn provisioning_update<B, W, E, S>(ctx: &mut BootContext<B, W, E, S>) -> Option<BootState>
where
    B: NvsBackend,
    E: ProvisioningEndpoint,
{
    if ctx.server.is_none() {
        return Some(BootState::Failed);
    }

    info!("Boot: waiting for configuration on the provisioning endpoint");
    let fw = &ctx.firmware;
    match ctx
        .ingest
        .await_submission(fw.provisioning_timeout, fw.provisioning_log_interval)
    {
        Ok(cfg) => {
            ctx.config = Some(cfg);
            Some(BootState::ProvisionedFreshly)
        }
        Err(timeout) => {
            warn!("Boot: {}", timeout);
            ctx.restart_reason = Some(RestartReason::ProvisioningTimeout);
            Some(BootState::RestartPending)
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PROVISIONED_FRESHLY → RESTART_PENDING
// ═══════════════════════════════════════════════════════════════════════════

fn provisioned_update<B, W, E, S>(ctx: &mut BootContext<B, W, E, S>) -> Option<BootState>
where
    B: NvsBackend,
    E: ProvisioningEndpoint,
    S: Clock,
{
    let saved = match (ctx.store.as_mut(), ctx.config.as_ref()) {
        (Some(store), Some(cfg)) => store.save(cfg).map_err(BootError::from),
        _ => Err(BootError::Incomplete),
    };
    if let Err(e) = saved {
        ctx.fail(e);
        return Some(BootState::Failed);
    }

    // The 200 reply has been written by now.
    ctx.server = None;
    if let Some(mut store) = ctx.store.take() {
        store.close();
    }
    close_config(&mut ctx.config);

    ctx.system.sleep(ctx.firmware.reboot_settle);
    ctx.restart_reason = Some(RestartReason::Provisioned);
    Some(BootState::RestartPending)
}

fn restart_enter<B, W, E, S>(ctx: &mut BootContext<B, W, E, S>)
where
    B: NvsBackend,
    E: ProvisioningEndpoint,
    S: RestartPort,
{
    ctx.release_all();
    match ctx.restart_reason {
        Some(reason) => info!("Boot: restarting ({})", reason),
        None => info!("Boot: restarting"),
    }
    ctx.system.restart();
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAILED
// ═══════════════════════════════════════════════════════════════════════════

fn failed_enter<B, W, E, S>(ctx: &mut BootContext<B, W, E, S>)
where
    B: NvsBackend,
    E: ProvisioningEndpoint,
{
    match &ctx.error {
        Some(e) => error!("Boot: failed: {}", e),
        None => error!("Boot: failed"),
    }
    ctx.release_all();
}

fn terminal<B, W, E, S>(_: &mut BootContext<B, W, E, S>) -> Option<BootState>
where
    B: NvsBackend,
    E: ProvisioningEndpoint,
{
    None
}
