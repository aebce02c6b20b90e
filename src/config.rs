//! Device and firmware configuration.
//!
//! [`DeviceConfig`] is the operator-supplied identity: collector API key,
//! Wi-Fi credentials, and which hazards to monitor.  It is persisted in NVS
//! and, once the device boots configured, shared read-only between all
//! monitor threads.
//!
//! [`FirmwareConfig`] holds the build-time operational constants (AP
//! credentials, settle delays, provisioning timeout).  Tests shrink its
//! durations to keep boot flows fast.

use core::fmt;
use core::time::Duration;

/// SSID announced while the device waits for provisioning.
pub const AP_SSID: &str = "ESP32";
/// WPA2 passphrase of the provisioning access point.
pub const AP_PASSWORD: &str = "admin1234";

/// Remote collector host.  Override at build time with `HAZARDWATCH_COLLECTOR`.
pub const COLLECTOR_HOST: &str = match option_env!("HAZARDWATCH_COLLECTOR") {
    Some(host) => host,
    None => "node.alexandrubunea.cloud",
};

// ---------------------------------------------------------------------------
// DeviceConfig
// ---------------------------------------------------------------------------

/// Runtime device configuration.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DeviceConfig {
    pub api_key: String,
    pub network_ssid: String,
    pub network_password: String,
    pub motion: bool,
    pub sound: bool,
    pub gas: bool,
    pub fire: bool,
}

impl DeviceConfig {
    /// Empty configuration, as allocated at boot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the API key.  The previous value is dropped.
    pub fn set_api_key(&mut self, value: &str) {
        self.api_key = value.to_owned();
    }

    pub fn set_network_ssid(&mut self, value: &str) {
        self.network_ssid = value.to_owned();
    }

    pub fn set_network_password(&mut self, value: &str) {
        self.network_password = value.to_owned();
    }
}

/// Passwords and API keys are masked so the summary is safe to log.
impl fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "api_key={} ssid='{}' password={} motion={} sound={} gas={} fire={}",
            mask(&self.api_key),
            self.network_ssid,
            mask(&self.network_password),
            u8::from(self.motion),
            u8::from(self.sound),
            u8::from(self.gas),
            u8::from(self.fire),
        )
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceConfig {{ {} }}", self)
    }
}

fn mask(secret: &str) -> String {
    match secret.chars().count() {
        0 => "<unset>".into(),
        n if n <= 4 => "*".repeat(n),
        n => {
            let head: String = secret.chars().take(2).collect();
            format!("{}{}", head, "*".repeat(n - 2))
        }
    }
}

// ---------------------------------------------------------------------------
// FirmwareConfig
// ---------------------------------------------------------------------------

/// Build-time operational parameters.
#[derive(Debug, Clone)]
pub struct FirmwareConfig {
    // --- Provisioning AP ---
    pub ap_ssid: &'static str,
    pub ap_password: &'static str,
    /// Wi-Fi channel the provisioning AP is announced on.
    pub ap_channel: u8,
    /// Maximum simultaneous AP clients.
    pub ap_max_connections: u16,

    // --- Boot timing ---
    /// Delay between a fresh save and the restart.
    pub reboot_settle: Duration,
    /// Delay after station start before monitors are spawned.
    pub station_settle: Duration,
    /// How long to wait for a provisioning submission before restarting.
    /// `None` waits forever.
    pub provisioning_timeout: Option<Duration>,
    /// Interval of the "still waiting" log line while provisioning.
    pub provisioning_log_interval: Duration,

    // --- Monitoring ---
    /// Hold time after a malfunction report before the next cycle.
    pub malfunction_cooldown: Duration,
    /// Hold time after a failed power-monitor read.
    pub device_fault_backoff: Duration,

    /// Remote collector host (no scheme).
    pub collector_host: &'static str,
}

impl Default for FirmwareConfig {
    fn default() -> Self {
        Self {
            ap_ssid: AP_SSID,
            ap_password: AP_PASSWORD,
            ap_channel: 6,
            ap_max_connections: 4,

            reboot_settle: Duration::from_secs(5),
            station_settle: Duration::from_secs(5),
            provisioning_timeout: Some(Duration::from_secs(10 * 60)),
            provisioning_log_interval: Duration::from_secs(5),

            malfunction_cooldown: Duration::from_secs(5),
            device_fault_backoff: Duration::from_secs(1),

            collector_host: COLLECTOR_HOST,
        }
    }
}
