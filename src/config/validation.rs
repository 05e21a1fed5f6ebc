//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that parse but make no
//! sense (empty pools, bad URLs, unparseable amounts). All problems are
//! collected so an operator sees every mistake in one run.

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::monitor::policy::{parse_ether_amount, BridgePolicy};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no chains configured")]
    NoChains,

    #[error("duplicate chain name '{0}'")]
    DuplicateChain(String),

    #[error("chain '{0}' has no RPC endpoints")]
    NoEndpoints(String),

    #[error("chain '{chain}': invalid endpoint '{url}'")]
    InvalidEndpoint { chain: String, url: String },

    #[error("chain '{chain}': invalid ws_url '{url}'")]
    InvalidWsUrl { chain: String, url: String },

    #[error("rpc.timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("monitor.min_increase '{0}' is not a valid ether amount")]
    InvalidThreshold(String),

    #[error("monitor.bridge_amount '{0}' is not a valid amount or percentage")]
    InvalidBridgeAmount(String),

    #[error("watch entry references unknown chain '{0}'")]
    UnknownWatchChain(String),

    #[error("watch entry for chain '{0}' but that chain has no ws_url")]
    WatchWithoutWs(String),

    #[error("watch entry has invalid address '{0}'")]
    InvalidWatchAddress(String),

    #[error("bridge.api_url '{0}' is not a valid URL")]
    InvalidBridgeUrl(String),

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingAdminKey,
}

/// Validate a parsed configuration, returning every error found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.chains.is_empty() {
        errors.push(ValidationError::NoChains);
    }

    let mut seen = HashSet::new();
    for chain in &config.chains {
        if !seen.insert(chain.name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateChain(chain.name.clone()));
        }

        if chain.endpoints.iter().all(|e| e.trim().is_empty()) {
            errors.push(ValidationError::NoEndpoints(chain.name.clone()));
        }

        for url in chain.endpoints.iter().filter(|e| !e.trim().is_empty()) {
            if !is_scheme(url, &["http", "https"]) {
                errors.push(ValidationError::InvalidEndpoint {
                    chain: chain.name.clone(),
                    url: url.clone(),
                });
            }
        }

        if let Some(ws) = &chain.ws_url {
            if !is_scheme(ws, &["ws", "wss"]) {
                errors.push(ValidationError::InvalidWsUrl {
                    chain: chain.name.clone(),
                    url: ws.clone(),
                });
            }
        }
    }

    if config.rpc.timeout_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if parse_ether_amount(&config.monitor.min_increase).is_err() {
        errors.push(ValidationError::InvalidThreshold(config.monitor.min_increase.clone()));
    }

    if config.monitor.bridge_amount.parse::<BridgePolicy>().is_err() {
        errors.push(ValidationError::InvalidBridgeAmount(config.monitor.bridge_amount.clone()));
    }

    for watch in &config.watch {
        match config.chain(&watch.chain) {
            None => errors.push(ValidationError::UnknownWatchChain(watch.chain.clone())),
            Some(chain) if chain.ws_url.is_none() => {
                errors.push(ValidationError::WatchWithoutWs(watch.chain.clone()))
            }
            Some(_) => {}
        }
        if let Some(address) = &watch.address {
            if address.parse::<alloy::primitives::Address>().is_err() {
                errors.push(ValidationError::InvalidWatchAddress(address.clone()));
            }
        }
    }

    if config.bridge.enabled && !is_scheme(&config.bridge.api_url, &["http", "https"]) {
        errors.push(ValidationError::InvalidBridgeUrl(config.bridge.api_url.clone()));
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::MissingAdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_scheme(raw: &str, schemes: &[&str]) -> bool {
    url::Url::parse(raw)
        .map(|u| schemes.contains(&u.scheme()))
        .unwrap_or(false)
}
