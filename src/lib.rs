//! Wallet relay library.
//!
//! Multi-endpoint JSON-RPC failover plus per-address balance monitors that
//! bridge detected deposits to another chain.

// Chain access
pub mod config;
pub mod rpc;

// Deposit detection and bridging
pub mod bridge;
pub mod monitor;

// Operator surface
pub mod admin;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::RelayConfig;
pub use lifecycle::Shutdown;
pub use monitor::MonitorRegistry;
pub use rpc::{ChainClient, FailoverTransport};
