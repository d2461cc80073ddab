//! Client configuration.
//!
//! A [`ClientConfig`] can be built in code ([`ClientConfig::builder`]),
//! deserialized from JSON by the host application, or both, with
//! environment variables applied on top:
//!
//! | Variable | Field |
//! |---|---|
//! | `VIEWER_LINK_URL` | `url` |
//! | `VIEWER_LINK_API_KEY` | `api_key` |
//! | `VIEWER_LINK_EVENT_LOG` | `event_logging` (`1`/`true`/`0`/`false`) |
//!
//! The API key is never serialized.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_EVENT_LOG_CAPACITY, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_PING_INTERVAL,
    DEFAULT_RECONNECT_DELAY,
};

/// Configuration for a [`ProtocolClient`](crate::ProtocolClient).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend WebSocket URL (`ws://`, `wss://`, or `http(s)://`).
    pub url: String,
    /// API key sent in the handshake. Not serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Record every frame in the event log.
    pub event_logging: bool,
    /// Delay before each reconnection attempt, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Give up after this many consecutive failed reconnects. `None` retries forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_reconnect_attempts: Option<u32>,
    /// How long to wait for the handshake acknowledgement, in milliseconds.
    pub handshake_timeout_ms: u64,
    /// Default per-request timeout in milliseconds. `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
    /// Keep-alive ping interval in milliseconds. `None` disables pings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_interval_ms: Option<u64>,
    /// Number of entries the event log keeps.
    pub event_log_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: None,
            event_logging: false,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY.as_millis() as u64,
            max_reconnect_attempts: None,
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT.as_millis() as u64,
            request_timeout_ms: None,
            ping_interval_ms: Some(DEFAULT_PING_INTERVAL.as_millis() as u64),
            event_log_capacity: DEFAULT_EVENT_LOG_CAPACITY,
        }
    }
}

impl ClientConfig {
    /// Start building a configuration from the defaults.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Parse a JSON configuration document. Missing fields take defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply `VIEWER_LINK_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_with(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("VIEWER_LINK_URL") {
            self.url = url;
        }

        if let Some(key) = lookup("VIEWER_LINK_API_KEY") {
            self.api_key = Some(key);
        }

        if let Some(flag) = lookup("VIEWER_LINK_EVENT_LOG") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.event_logging = true,
                "0" | "false" | "no" | "off" => self.event_logging = false,
                other => log::warn!("Ignoring VIEWER_LINK_EVENT_LOG={other:?}"),
            }
        }
    }

    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Handshake timeout as a [`Duration`].
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Default request timeout, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Ping interval, if pings are enabled.
    pub fn ping_interval(&self) -> Option<Duration> {
        self.ping_interval_ms
            .filter(|&ms| ms > 0)
            .map(Duration::from_millis)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Backend URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// API key presented in the handshake.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Enable or disable the event log.
    #[must_use]
    pub fn event_logging(mut self, enable: bool) -> Self {
        self.config.event_logging = enable;
        self
    }

    /// Delay between reconnection attempts.
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.config.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Bound the number of consecutive reconnection attempts.
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.config.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Handshake timeout.
    #[must_use]
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Default timeout applied to every request.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Keep-alive interval; `None` disables pings.
    #[must_use]
    pub fn ping_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.ping_interval_ms = interval.map(|d| d.as_millis() as u64);
        self
    }

    /// Event log ring size.
    #[must_use]
    pub fn event_log_capacity(mut self, capacity: usize) -> Self {
        self.config.event_log_capacity = capacity;
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
