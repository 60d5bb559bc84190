//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`] for the wakeup path: bring the link up
//! once, publish, then shut the radio down again before sleep.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi` over the
//!   STA interface.
//! - **all other targets**: a simulated link whose behaviour tests script.
//!
//! ## Connect policy
//!
//! Up to 50 link checks with an incremental back-off (100 ms × attempt).
//! Every fifth attempt re-issues the association request.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use super::utils::is_printable_ascii;
use crate::app::ports::ConnectivityPort;
use crate::config::WifiConfig;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

pub const MAX_ATTEMPTS: u32 = 50;
pub const BASE_DELAY_MS: u32 = 100;
pub const RECONNECT_INTERVAL: u32 = 5;
const SHUTDOWN_SETTLE_MS: u32 = 100;

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    Failed,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

pub fn validate_ssid(ssid: &str) -> Result<(), CommsError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CommsError::InvalidCredentials);
    }
    Ok(())
}

/// Empty for an open network, otherwise a WPA2 passphrase of 8-64 bytes.
pub fn validate_password(password: &str) -> Result<(), CommsError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CommsError::InvalidCredentials);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter<D> {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    delay: D,
    attempts_made: u32,
    reconnects: u32,
    #[cfg(target_os = "espidf")]
    driver: BlockingWifi<EspWifi<'static>>,
    /// Simulation: attempt count at which the link comes up (`None` = never).
    #[cfg(not(target_os = "espidf"))]
    sim_link_after: Option<u32>,
}

impl<D: DelayNs> WifiAdapter<D> {
    #[cfg(target_os = "espidf")]
    pub fn new(driver: BlockingWifi<EspWifi<'static>>, config: &WifiConfig, delay: D) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: config.ssid.clone(),
            password: config.password.clone(),
            delay,
            attempts_made: 0,
            reconnects: 0,
            driver,
        }
    }

    /// Simulated link that comes up immediately.
    #[cfg(not(target_os = "espidf"))]
    pub fn new(config: &WifiConfig, delay: D) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: config.ssid.clone(),
            password: config.password.clone(),
            delay,
            attempts_made: 0,
            reconnects: 0,
            sim_link_after: Some(0),
        }
    }

    /// Simulation: the link needs `attempts` back-off rounds, or never
    /// comes up when `None`.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_link_after(mut self, attempts: Option<u32>) -> Self {
        self.sim_link_after = attempts;
        self
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    /// Back-off rounds spent by the last `connect`.
    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn reconnects(&self) -> u32 {
        self.reconnects
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_begin(&mut self) -> Result<(), CommsError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| CommsError::InvalidCredentials)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| CommsError::InvalidCredentials)?,
            auth_method,
            ..Default::default()
        };
        self.driver
            .set_configuration(&Configuration::Client(client))
            .map_err(|e| {
                warn!("WiFi: configuration rejected: {}", e);
                CommsError::WifiConnectFailed
            })?;
        self.driver.start().map_err(|e| {
            warn!("WiFi: start failed: {}", e);
            CommsError::WifiConnectFailed
        })?;
        // Association is polled below; the blocking connect would hide
        // the back-off schedule.
        if let Err(e) = self.driver.wifi_mut().connect() {
            warn!("WiFi: connect request failed: {}", e);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin(&mut self) -> Result<(), CommsError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_link_up(&mut self) -> bool {
        self.driver.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_link_up(&mut self) -> bool {
        self.sim_link_after.is_some_and(|n| self.attempts_made >= n)
    }

    #[cfg(target_os = "espidf")]
    fn platform_reconnect(&mut self) {
        if let Err(e) = self.driver.wifi_mut().connect() {
            warn!("WiFi: reconnect request failed: {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_reconnect(&mut self) {}

    #[cfg(target_os = "espidf")]
    fn platform_netif_up(&mut self) {
        if let Err(e) = self.driver.wait_netif_up() {
            warn!("WiFi: netif not up: {}", e);
        }
        if let Ok(ip) = self.driver.wifi().sta_netif().get_ip_info() {
            info!("WiFi: IP address {}", ip.ip);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_netif_up(&mut self) {}

    #[cfg(target_os = "espidf")]
    fn platform_shutdown(&mut self) {
        if let Err(e) = self.driver.disconnect() {
            warn!("WiFi: disconnect failed: {}", e);
        }
        if let Err(e) = self.driver.stop() {
            warn!("WiFi: stop failed: {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_shutdown(&mut self) {}
}

impl<D: DelayNs> ConnectivityPort for WifiAdapter<D> {
    fn connect(&mut self) -> Result<(), CommsError> {
        validate_ssid(&self.ssid)?;
        validate_password(&self.password)?;

        info!("WiFi: connecting to SSID '{}'", self.ssid);
        self.state = WifiState::Connecting;
        self.attempts_made = 0;
        self.reconnects = 0;
        if let Err(e) = self.platform_begin() {
            self.state = WifiState::Failed;
            return Err(e);
        }

        while !self.platform_link_up() && self.attempts_made < MAX_ATTEMPTS {
            self.attempts_made += 1;
            self.delay.delay_ms(BASE_DELAY_MS * self.attempts_made);
            if self.attempts_made % RECONNECT_INTERVAL == 0 {
                self.state = WifiState::Reconnecting {
                    attempt: self.attempts_made,
                };
                self.reconnects += 1;
                self.platform_reconnect();
            }
        }

        if !self.platform_link_up() {
            warn!("WiFi: no link after {} attempts", self.attempts_made);
            self.state = WifiState::Failed;
            return Err(CommsError::WifiConnectFailed);
        }

        self.platform_netif_up();
        self.state = WifiState::Connected;
        info!("WiFi: connected after {} attempts", self.attempts_made);
        Ok(())
    }

    fn shutdown(&mut self) {
        info!("WiFi: shutting down");
        self.platform_shutdown();
        self.delay.delay_ms(SHUTDOWN_SETTLE_MS);
        self.state = WifiState::Disconnected;
    }

    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }
}
