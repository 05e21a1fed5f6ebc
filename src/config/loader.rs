//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Prefix of the per-chain endpoint override, e.g. `RELAY_RPC_URLS_AVALANCHE_FUJI`.
pub const RPC_URLS_ENV_PREFIX: &str = "RELAY_RPC_URLS_";

/// Prefix of the per-chain WebSocket override, e.g. `RELAY_WS_URL_AVALANCHE_FUJI`.
pub const WS_URL_ENV_PREFIX: &str = "RELAY_WS_URL_";

/// Overrides `admin.api_key`.
pub const ADMIN_KEY_ENV: &str = "RELAY_ADMIN_API_KEY";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load a TOML file, apply environment overrides, and validate.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: RelayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides using the given lookup.
///
/// Endpoint lists are comma separated; blank entries are dropped.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for chain in &mut config.chains {
        let suffix = env_suffix(&chain.name);

        if let Some(urls) = lookup(&format!("{}{}", RPC_URLS_ENV_PREFIX, suffix)) {
            chain.endpoints = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from)
                .collect();
            tracing::debug!(chain = %chain.name, count = chain.endpoints.len(), "RPC endpoints overridden from environment");
        }

        if let Some(ws) = lookup(&format!("{}{}", WS_URL_ENV_PREFIX, suffix)) {
            chain.ws_url = Some(ws.trim().to_string());
        }
    }

    if let Some(key) = lookup(ADMIN_KEY_ENV) {
        config.admin.api_key = key;
    }
}

fn env_suffix(chain: &str) -> String {
    chain
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}
