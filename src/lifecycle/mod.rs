//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build chain clients → Start monitors → Admin API
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop monitors → Stop admin API → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup configuration error is fatal
//! - Dispatched bridge jobs are not awaited on shutdown

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
