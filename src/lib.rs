//! HazardWatch firmware library.
//!
//! Exposes the boot sequence, the monitor engine and the host simulation
//! adapters for integration testing.  All ESP-IDF-specific code is guarded
//! by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod pins;
pub mod provisioning;
pub mod store;

pub mod adapters;
pub mod drivers;
pub mod sensors;
