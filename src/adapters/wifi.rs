//! Wi-Fi adapter.
//!
//! Implements [`NetworkPort`]: the radio comes up exactly once per boot,
//! either as a station on the persisted network or as the provisioning
//! access point.
//!
//! A station that cannot associate at boot still counts as started; the
//! link goes to [`LinkState::Reconnecting`] and [`WifiAdapter::poll_link`]
//! retries with exponential backoff (2 s doubling to 60 s), the same path
//! taken when the router drops the device later.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `BlockingWifi<EspWifi>` from `esp_idf_svc`.
//! - **all other targets**: simulation that records the requested mode.

use log::{error, info, warn};

use crate::app::ports::{NetworkError, NetworkPort};
use crate::config::FirmwareConfig;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// 1–32 printable ASCII bytes.
pub fn validate_ssid(ssid: &str) -> Result<(), NetworkError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(NetworkError::InvalidSsid);
    }
    Ok(())
}

/// Empty (open network) or 8–64 bytes (WPA2).
pub fn validate_password(password: &str) -> Result<(), NetworkError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(NetworkError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Radio mode
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiMode {
    Off,
    Station { ssid: String },
    AccessPoint { ssid: String },
}

/// Access-point parameters that do not change per boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApSettings {
    pub channel: u8,
    pub max_connections: u16,
}

impl From<&FirmwareConfig> for ApSettings {
    fn from(fw: &FirmwareConfig) -> Self {
        Self {
            channel: fw.ap_channel,
            max_connections: fw.ap_max_connections,
        }
    }
}

/// Station association status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Down,
    Up,
    Reconnecting { attempt: u32 },
}

const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    mode: WifiMode,
    ap: ApSettings,
    link: LinkState,
    backoff_secs: u64,
    /// Uptime of the next reconnect attempt; `None` schedules on the next poll.
    next_attempt_ms: Option<u64>,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    /// Simulation: the next start request fails with this driver message.
    #[cfg(not(target_os = "espidf"))]
    sim_fail_next: Option<String>,
    /// Simulation: associations that fail before one succeeds.
    #[cfg(not(target_os = "espidf"))]
    sim_failing_associations: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_associated: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: esp_idf_svc::hal::modem::Modem,
        sys_loop: esp_idf_svc::eventloop::EspSystemEventLoop,
        ap: ApSettings,
    ) -> Result<Self, NetworkError> {
        use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

        // The NVS partition belongs to the config store.
        let esp_wifi = EspWifi::new(modem, sys_loop.clone(), None)
            .map_err(|e| NetworkError::Driver(e.to_string()))?;
        let wifi = BlockingWifi::wrap(esp_wifi, sys_loop)
            .map_err(|e| NetworkError::Driver(e.to_string()))?;
        Ok(Self {
            mode: WifiMode::Off,
            ap,
            link: LinkState::Down,
            backoff_secs: INITIAL_BACKOFF_SECS,
            next_attempt_ms: None,
            wifi,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(ap: ApSettings) -> Self {
        Self {
            mode: WifiMode::Off,
            ap,
            link: LinkState::Down,
            backoff_secs: INITIAL_BACKOFF_SECS,
            next_attempt_ms: None,
            sim_fail_next: None,
            sim_failing_associations: 0,
            sim_associated: false,
        }
    }

    pub fn mode(&self) -> &WifiMode {
        &self.mode
    }

    pub fn ap_settings(&self) -> ApSettings {
        self.ap
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    /// Keep the station associated.  Called from the idle loop at uptime
    /// `now_ms`; does nothing outside station mode.
    pub fn poll_link(&mut self, now_ms: u64) {
        if !matches!(self.mode, WifiMode::Station { .. }) {
            return;
        }
        let associated = self.platform_is_associated();
        match self.link {
            LinkState::Up if !associated => {
                warn!("WiFi: station link lost, entering reconnect");
                self.link = LinkState::Reconnecting { attempt: 0 };
                self.next_attempt_ms = None;
            }
            LinkState::Reconnecting { .. } if associated => {
                info!("WiFi: station link restored");
                self.link = LinkState::Up;
                self.backoff_secs = INITIAL_BACKOFF_SECS;
            }
            LinkState::Reconnecting { attempt } => {
                if self.next_attempt_ms.is_some_and(|at| now_ms < at) {
                    return;
                }
                info!("WiFi: reconnect attempt {} (backoff {}s)", attempt, self.backoff_secs);
                match self.platform_reconnect() {
                    Ok(()) if self.platform_is_associated() => {
                        info!("WiFi: reconnected");
                        self.link = LinkState::Up;
                        self.backoff_secs = INITIAL_BACKOFF_SECS;
                        return;
                    }
                    Ok(()) => {}
                    Err(e) => warn!("WiFi: reconnect failed: {}", e),
                }
                self.link = LinkState::Reconnecting { attempt: attempt + 1 };
                self.next_attempt_ms = Some(now_ms + self.backoff_secs * 1000);
                self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
            }
            _ => {}
        }
    }

    /// Make the next start request fail (host only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, message: &str) {
        self.sim_fail_next = Some(message.to_owned());
    }

    /// Fail the next `n` station associations (host only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_associations(&mut self, n: u32) {
        self.sim_failing_associations = n;
    }

    /// Drop the station association as a router reboot would (host only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim_associated = false;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_station(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError> {
        use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let driver = |e: esp_idf_svc::sys::EspError| NetworkError::Driver(e.to_string());
        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: ssid.try_into().map_err(|_| NetworkError::InvalidSsid)?,
                password: password
                    .try_into()
                    .map_err(|_| NetworkError::InvalidPassword)?,
                auth_method,
                ..Default::default()
            }))
            .map_err(driver)?;
        self.wifi.start().map_err(driver)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_station(&mut self, ssid: &str, _password: &str) -> Result<(), NetworkError> {
        if let Some(msg) = self.sim_fail_next.take() {
            return Err(NetworkError::Driver(msg));
        }
        info!("WiFi(sim): station configured for '{}'", ssid);
        Ok(())
    }

    /// Blocks until associated with an IP, or the driver gives up.
    #[cfg(target_os = "espidf")]
    fn platform_associate(&mut self) -> Result<(), NetworkError> {
        let driver = |e: esp_idf_svc::sys::EspError| NetworkError::Driver(e.to_string());
        self.wifi.connect().map_err(driver)?;
        self.wifi.wait_netif_up().map_err(driver)?;
        if let Ok(ip) = self.wifi.wifi().sta_netif().get_ip_info() {
            info!("WiFi: station IP {}", ip.ip);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_associate(&mut self) -> Result<(), NetworkError> {
        if self.sim_failing_associations > 0 {
            self.sim_failing_associations -= 1;
            return Err(NetworkError::Driver("association timeout".into()));
        }
        self.sim_associated = true;
        Ok(())
    }

    /// Issues the association request without waiting, so the idle loop
    /// keeps feeding the watchdog; a later poll observes the result.
    #[cfg(target_os = "espidf")]
    fn platform_reconnect(&mut self) -> Result<(), NetworkError> {
        self.wifi
            .wifi_mut()
            .connect()
            .map_err(|e| NetworkError::Driver(e.to_string()))
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_reconnect(&mut self) -> Result<(), NetworkError> {
        self.platform_associate()
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_associated(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_associated(&self) -> bool {
        self.sim_associated
    }

    #[cfg(target_os = "espidf")]
    fn platform_access_point(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError> {
        use embedded_svc::wifi::{AccessPointConfiguration, AuthMethod, Configuration};

        let driver = |e: esp_idf_svc::sys::EspError| NetworkError::Driver(e.to_string());
        self.wifi
            .set_configuration(&Configuration::AccessPoint(AccessPointConfiguration {
                ssid: ssid.try_into().map_err(|_| NetworkError::InvalidSsid)?,
                password: password
                    .try_into()
                    .map_err(|_| NetworkError::InvalidPassword)?,
                auth_method: AuthMethod::WPA2Personal,
                channel: self.ap.channel,
                max_connections: self.ap.max_connections,
                ..Default::default()
            }))
            .map_err(driver)?;
        self.wifi.start().map_err(driver)?;
        self.wifi.wait_netif_up().map_err(driver)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_access_point(&mut self, _ssid: &str, _password: &str) -> Result<(), NetworkError> {
        if let Some(msg) = self.sim_fail_next.take() {
            return Err(NetworkError::Driver(msg));
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// NetworkPort
// ───────────────────────────────────────────────────────────────

impl NetworkPort for WifiAdapter {
    fn start_station(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError> {
        if ssid.is_empty() {
            return Err(NetworkError::NoCredentials);
        }
        validate_ssid(ssid)?;
        validate_password(password)?;

        info!("WiFi: connecting to '{}'", ssid);
        if let Err(e) = self.platform_station(ssid, password) {
            error!("WiFi: station start failed: {}", e);
            return Err(e);
        }
        self.mode = WifiMode::Station { ssid: ssid.into() };

        match self.platform_associate() {
            Ok(()) => {
                self.link = LinkState::Up;
                info!("WiFi: station up");
            }
            Err(e) => {
                // Monitoring runs without the link; alerts resume once it is back.
                warn!("WiFi: association failed ({}), retrying in background", e);
                self.link = LinkState::Reconnecting { attempt: 0 };
                self.next_attempt_ms = None;
            }
        }
        Ok(())
    }

    fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError> {
        validate_ssid(ssid)?;
        validate_password(password)?;

        match self.platform_access_point(ssid, password) {
            Ok(()) => {
                self.mode = WifiMode::AccessPoint { ssid: ssid.into() };
                info!(
                    "WiFi: access point '{}' up (channel {}, max {} clients)",
                    ssid, self.ap.channel, self.ap.max_connections
                );
                Ok(())
            }
            Err(e) => {
                error!("WiFi: access point start failed: {}", e);
                Err(e)
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
