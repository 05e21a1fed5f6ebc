//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, environment overrides)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → handed to each subsystem at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no runtime reconfiguration
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, BridgeConfig, ChainConfig, LogFormat, MonitorConfig, ObservabilityConfig,
    RelayConfig, RpcConfig, WatchConfig,
};
