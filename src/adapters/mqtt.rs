//! MQTT publisher.
//!
//! Implements [`PublishPort`].  Every value goes to
//! `node/sensor/<client-id>/<metric>`; the session announces itself on
//! `node/sensor/<client-id>/availability` with a retained `online` and
//! registers a retained `offline` as its last will.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets**: a simulated broker that records every publish.

use core::fmt::Write;

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use super::device_id::ClientId;
use super::utils::is_printable_ascii;
use crate::app::ports::{Metric, PublishPort};
use crate::config::MqttConfig;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
};

pub const TOPIC_ROOT: &str = "node/sensor";
pub const AVAILABILITY_LEAF: &str = "availability";
pub const PAYLOAD_ONLINE: &str = "online";
pub const PAYLOAD_OFFLINE: &str = "offline";

pub const MAX_CONNECT_RETRIES: u32 = 25;
pub const CONNECT_RETRY_DELAY_MS: u32 = 2000;
const DISCONNECT_DRAIN_LOOPS: u32 = 10;
const DISCONNECT_DRAIN_MS: u32 = 200;
const DISCONNECT_SETTLE_MS: u32 = 100;

#[cfg(target_os = "espidf")]
const BUFFER_SIZE: usize = 1024;
#[cfg(target_os = "espidf")]
const CONNECT_WAIT_MS: u32 = 3000;
#[cfg(target_os = "espidf")]
const CONNECT_POLL_MS: u32 = 100;

pub type Topic = heapless::String<96>;

// ───────────────────────────────────────────────────────────────
// Topics
// ───────────────────────────────────────────────────────────────

/// `node/sensor/<client_id>/<leaf>`.
pub fn topic(client_id: &str, leaf: &str) -> Result<Topic, CommsError> {
    let mut t = Topic::new();
    write!(t, "{}/{}/{}", TOPIC_ROOT, client_id, leaf).map_err(|_| CommsError::TopicTooLong)?;
    Ok(t)
}

pub fn metric_topic(client_id: &str, metric: Metric) -> Result<Topic, CommsError> {
    topic(client_id, metric.topic_suffix())
}

pub fn availability_topic(client_id: &str) -> Result<Topic, CommsError> {
    topic(client_id, AVAILABILITY_LEAF)
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct MqttAdapter<D> {
    config: MqttConfig,
    client_id: ClientId,
    delay: D,
    connected: bool,
    connect_attempts: u32,
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    link: Arc<AtomicBool>,
    /// Simulation: attempt on which the broker accepts (`None` = never).
    #[cfg(not(target_os = "espidf"))]
    sim_accept_on: Option<u32>,
    #[cfg(not(target_os = "espidf"))]
    sim_reject_publish: bool,
    /// Simulation: `(topic, payload, retained)` in publish order.
    #[cfg(not(target_os = "espidf"))]
    pub sent: std::vec::Vec<(Topic, std::string::String, bool)>,
}

impl<D: DelayNs> MqttAdapter<D> {
    pub fn new(config: &MqttConfig, client_id: ClientId, delay: D) -> Self {
        Self {
            config: config.clone(),
            client_id,
            delay,
            connected: false,
            connect_attempts: 0,
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            link: Arc::new(AtomicBool::new(false)),
            #[cfg(not(target_os = "espidf"))]
            sim_accept_on: Some(1),
            #[cfg(not(target_os = "espidf"))]
            sim_reject_publish: false,
            #[cfg(not(target_os = "espidf"))]
            sent: std::vec::Vec::new(),
        }
    }

    /// Simulation: broker accepts on the `attempt`-th try, or never.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_accept_on(mut self, attempt: Option<u32>) -> Self {
        self.sim_accept_on = attempt;
        self
    }

    /// Simulation: every data publish fails after connect.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_reject_publish(mut self, reject: bool) -> Self {
        self.sim_reject_publish = reject;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn open_client(&mut self) -> Result<EspMqttClient<'static>, esp_idf_svc::sys::EspError> {
        let mut url: heapless::String<96> = heapless::String::new();
        // Host name is bounded to 64 bytes, so the URL always fits.
        let _ = write!(
            url,
            "mqtt://{}:{}",
            self.config.broker_host, self.config.broker_port
        );
        let will = availability_topic(&self.client_id).unwrap_or_default();
        let conf = MqttClientConfiguration {
            client_id: Some(self.client_id.as_str()),
            username: (!self.config.username.is_empty()).then_some(self.config.username.as_str()),
            password: (!self.config.password.is_empty()).then_some(self.config.password.as_str()),
            keep_alive_interval: Some(core::time::Duration::from_secs(u64::from(
                self.config.keepalive_secs,
            ))),
            lwt: Some(LwtConfiguration {
                topic: will.as_str(),
                payload: PAYLOAD_OFFLINE.as_bytes(),
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            buffer_size: BUFFER_SIZE,
            ..Default::default()
        };
        let link = self.link.clone();
        EspMqttClient::new_cb(&url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => link.store(true, Ordering::Release),
            EventPayload::Disconnected => link.store(false, Ordering::Release),
            _ => {}
        })
    }

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, _attempt: u32) -> bool {
        if self.client.is_none() {
            match self.open_client() {
                Ok(client) => self.client = Some(client),
                Err(e) => {
                    warn!("MQTT: client init failed: {}", e);
                    return false;
                }
            }
        }
        let mut waited = 0;
        while waited < CONNECT_WAIT_MS {
            if self.link.load(Ordering::Acquire) {
                return true;
            }
            self.delay.delay_ms(CONNECT_POLL_MS);
            waited += CONNECT_POLL_MS;
        }
        self.link.load(Ordering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, attempt: u32) -> bool {
        self.sim_accept_on.is_some_and(|n| attempt >= n)
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self, topic: &str, payload: &str, retain: bool) -> bool {
        let Some(client) = self.client.as_mut() else {
            return false;
        };
        match client.publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes()) {
            Ok(_) => true,
            Err(e) => {
                warn!("MQTT: publish to {} failed: {}", topic, e);
                false
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self, topic: &str, payload: &str, retain: bool) -> bool {
        if self.sim_reject_publish && payload != PAYLOAD_ONLINE && payload != PAYLOAD_OFFLINE {
            return false;
        }
        let Ok(t) = Topic::try_from(topic) else {
            return false;
        };
        self.sent.push((t, payload.into(), retain));
        true
    }

    #[cfg(target_os = "espidf")]
    fn platform_close(&mut self) {
        self.client = None;
        self.link.store(false, Ordering::Release);
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_close(&mut self) {}

    #[cfg(target_os = "espidf")]
    fn platform_link_ok(&self) -> bool {
        self.link.load(Ordering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_link_ok(&self) -> bool {
        true
    }

    fn announce(&mut self, payload: &str) {
        match availability_topic(&self.client_id) {
            Ok(t) => {
                if !self.platform_publish(&t, payload, true) {
                    warn!("MQTT: availability '{}' not published", payload);
                }
            }
            Err(e) => warn!("MQTT: {}", e),
        }
    }
}

impl<D: DelayNs> PublishPort for MqttAdapter<D> {
    fn connect(&mut self) -> Result<(), CommsError> {
        if self.config.broker_host.is_empty() || !is_printable_ascii(&self.config.broker_host) {
            warn!("MQTT: broker host invalid");
            return Err(CommsError::MqttConnectFailed);
        }
        // Topics must fit before anything goes on the wire.
        availability_topic(&self.client_id)?;

        self.connect_attempts = 0;
        while self.connect_attempts < MAX_CONNECT_RETRIES {
            self.connect_attempts += 1;
            info!(
                "MQTT: connecting to {}:{} as {} (attempt {}/{})",
                self.config.broker_host,
                self.config.broker_port,
                self.client_id,
                self.connect_attempts,
                MAX_CONNECT_RETRIES
            );
            if self.platform_connect(self.connect_attempts) {
                self.connected = true;
                info!("MQTT: connected");
                self.announce(PAYLOAD_ONLINE);
                return Ok(());
            }
            warn!("MQTT: connection refused, retrying...");
            self.delay.delay_ms(CONNECT_RETRY_DELAY_MS);
        }

        warn!("MQTT: no session after {} attempts", self.connect_attempts);
        Err(CommsError::MqttConnectFailed)
    }

    fn publish(&mut self, metric: Metric, payload: &str) -> Result<(), CommsError> {
        if !self.is_connected() {
            warn!("MQTT: cannot publish {:?}, not connected", metric);
            return Err(CommsError::MqttNotConnected);
        }
        let t = metric_topic(&self.client_id, metric)?;
        if !self.platform_publish(&t, payload, false) {
            return Err(CommsError::MqttPublishFailed);
        }
        info!("MQTT: {} <- {}", t, payload);
        Ok(())
    }

    fn disconnect(&mut self) {
        if !self.connected {
            info!("MQTT: already disconnected");
            return;
        }
        self.announce(PAYLOAD_OFFLINE);
        for _ in 0..DISCONNECT_DRAIN_LOOPS {
            self.delay.delay_ms(DISCONNECT_DRAIN_MS);
        }
        self.platform_close();
        self.connected = false;
        self.delay.delay_ms(DISCONNECT_SETTLE_MS);
        info!("MQTT: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.connected && self.platform_link_ok()
    }
}
