//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the wallet relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Settings shared by every RPC transport.
    pub rpc: RpcConfig,

    /// Chains the relay can read from and monitor.
    pub chains: Vec<ChainConfig>,

    /// Balance monitor behaviour.
    pub monitor: MonitorConfig,

    /// Bridge service settings.
    pub bridge: BridgeConfig,

    /// Addresses to start monitoring at boot.
    pub watch: Vec<WatchConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

impl RelayConfig {
    /// Find a chain by name (case-insensitive).
    pub fn chain(&self, name: &str) -> Option<&ChainConfig> {
        self.chains
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Transport settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// A single chain and the node providers serving it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    /// Chain name used as the monitor key (e.g. "avalanche-fuji").
    pub name: String,

    /// Expected chain ID. Checked once at startup when set.
    #[serde(default)]
    pub chain_id: Option<u64>,

    /// JSON-RPC endpoint URLs in preference order.
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// WebSocket endpoint for new-head subscriptions.
    #[serde(default)]
    pub ws_url: Option<String>,
}

/// Balance monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Fixed delay between reconnect attempts in milliseconds.
    pub reconnect_interval_ms: u64,

    /// Upper bound of random jitter added to the reconnect delay.
    pub reconnect_jitter_ms: u64,

    /// Consecutive reconnects allowed before the monitor gives up.
    pub max_reconnect_attempts: u32,

    /// Minimum balance increase, in ether, that triggers a bridge.
    pub min_increase: String,

    /// Amount to bridge: a fixed ether amount ("0.5") or a share of the increase ("50%").
    pub bridge_amount: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_ms: 5_000,
            reconnect_jitter_ms: 0,
            max_reconnect_attempts: 10,
            min_increase: "0.01".to_string(),
            bridge_amount: "100%".to_string(),
        }
    }
}

/// Bridge service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Send transfers to the bridge service. When false, triggers are only logged.
    pub enabled: bool,

    /// Base URL of the bridge service.
    pub api_url: String,

    /// Chain that receives bridged funds.
    pub destination_chain: String,

    /// Environment variable holding the signing key.
    pub private_key_env: String,

    /// Attestation polling interval in seconds.
    pub poll_interval_secs: u64,

    /// Maximum time to wait for an attestation in seconds.
    pub attestation_timeout_secs: u64,

    /// Timeout for a single bridge service request in seconds.
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "http://localhost:8700".to_string(),
            destination_chain: "monad-testnet".to_string(),
            private_key_env: crate::bridge::credential::PRIVATE_KEY_ENV_VAR.to_string(),
            poll_interval_secs: 15,
            attestation_timeout_secs: 25 * 60,
            request_timeout_secs: 30,
        }
    }
}

/// An address to monitor at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Chain name, must match an entry in `chains`.
    pub chain: String,

    /// Address to watch. Defaults to the signing credential's address.
    #[serde(default)]
    pub address: Option<String>,

    /// Owner of the address, forwarded to the bridge.
    #[serde(default = "default_user_id")]
    pub user_id: u64,
}

fn default_user_id() -> u64 {
    1
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log output format.
    pub log_format: LogFormat,

    /// Expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the admin API.
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:8081").
    pub bind_address: String,

    /// Bearer token required on every admin request.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8081".to_string(),
            api_key: String::new(),
        }
    }
}
