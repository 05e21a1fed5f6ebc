//! Balance monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! registry.rs (one monitor per chain/address)
//!     → balance.rs
//!         connection task: subscription.rs (eth_subscribe newHeads) → channel
//!         handler task:    re-read balance → tracker.rs (delta, threshold, policy.rs)
//!                          → bridge dispatch (background, never awaited)
//! ```
//!
//! # States
//! ```text
//! Disconnected ──start──▶ Connecting ──confirmed──▶ Subscribed
//!                             ▲                          │
//!                             └──── disconnect ──────────┘
//! attempts exhausted ──▶ Disconnected (until start)
//! stop ──▶ Disconnected (from any state)
//! ```

pub mod balance;
pub mod policy;
pub mod registry;
pub mod state;
pub mod subscription;
pub mod tracker;

pub use balance::{
    BalanceMonitor, ChainHandle, MonitorError, MonitorKey, MonitorResult, MonitorSettings,
    MonitorSnapshot,
};
pub use policy::BridgePolicy;
pub use registry::MonitorRegistry;
pub use state::ConnectionState;
pub use subscription::{HeadSubscription, NewHead, SubscriptionError};
