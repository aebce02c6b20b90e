//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements           | Connects to                   |
//! |---------------|----------------------|-------------------------------|
//! | `alerts`      | AlertPort            | Remote collector (HTTPS POST) |
//! | `http_server` | ProvisioningEndpoint | ESP-IDF HTTP server           |
//! | `nvs`         | NvsBackend           | NVS / in-memory partition     |
//! | `time`        | Clock, RestartPort   | ESP32 system timer, reset     |
//! | `wifi`        | NetworkPort          | ESP-IDF Wi-Fi STA / AP        |
//!
//! Signal and power-monitor adapters live under [`crate::sensors`] next to
//! the engine that polls them.

pub mod alerts;
pub mod http_server;
pub mod nvs;
pub mod time;
pub mod wifi;
