//! Service configuration.
//!
//! Layered the usual way: defaults, then an optional `config.toml`, then
//! `PAYNOW_`-prefixed environment variables (`PAYNOW_GATEWAY__MERCHANT_ID`
//! and so on). The binary also loads a `.env` file before reading any of
//! this.

use serde::Deserialize;
use std::time::Duration;

/// Paynow's production initiate endpoint.
pub const DEFAULT_INITIATE_URL: &str = "https://www.paynow.co.zw/Interface/InitiateTransaction";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub poller: PollerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Gateway account and endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub merchant_id: String,
    /// Shared secret used for signing and verification.
    pub integration_key: String,
    #[serde(default = "default_initiate_url")]
    pub initiate_url: String,
    /// Where the gateway sends the user's browser back after checkout.
    pub return_url: String,
    /// Where the gateway posts server-to-server notifications.
    pub result_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Poll fallback settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How often the fallback wakes up (seconds).
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    /// Poll attempts still pending after this long with no notification
    /// (seconds).
    #[serde(default = "default_pending_age_secs")]
    pub pending_age_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_secs: default_poll_interval_secs(),
            pending_age_secs: default_pending_age_secs(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn pending_age(&self) -> Duration {
        Duration::from_secs(self.pending_age_secs)
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("PAYNOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_initiate_url() -> String {
    DEFAULT_INITIATE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_pending_age_secs() -> u64 {
    120
}
