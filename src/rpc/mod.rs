//! Blockchain RPC subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration (endpoint URLs, timeout)
//!     → pool.rs (ordered endpoints + rotation pointer)
//!     → transport.rs (one failover pass per logical call)
//!     → client.rs (typed chain reads/writes)
//! ```
//!
//! # Failover Order
//! ```text
//! pool = [A, B, C], start = 1
//!     attempt 0 → B
//!     attempt 1 → C
//!     attempt 2 → A   (wraps once, never revisits)
//! success at idx  → start = idx
//! all failed      → start unchanged, AllEndpointsFailed
//! ```
//!
//! # Constraints
//! - Every attempt has a hard timeout
//! - Never log request parameters that may carry signed payloads

pub mod client;
pub mod pool;
pub mod transport;
pub mod types;

pub use client::ChainClient;
pub use pool::EndpointPool;
pub use transport::FailoverTransport;
pub use types::{AllEndpointsFailed, AttemptError, RpcError, RpcResult};
