//! Cross-chain bridge integration.
//!
//! # Data Flow
//! ```text
//! Monitor detects deposit
//!     → dispatch.rs (spawn job, log outcome)
//!     → BridgeTrigger impl:
//!         - http.rs (initiate → attest → redeem via bridge service)
//!         - DryRunBridge (bridging disabled)
//! ```
//!
//! # Security Constraints
//! - credential.rs loads keys only from the environment
//! - Keys and signatures are never logged

pub mod credential;
pub mod dispatch;
pub mod http;
pub mod types;

pub use credential::SigningCredential;
pub use dispatch::{BridgeHandle, DryRunBridge};
pub use http::HttpBridgeTrigger;
pub use types::{BridgeError, BridgeReceipt, BridgeRequest, BridgeResult, BridgeTrigger};
