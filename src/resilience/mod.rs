//! Resilience helpers.
//!
//! Endpoint failover lives in `rpc::transport`; this module holds the
//! timing policy shared by reconnecting subscribers.

pub mod backoff;
