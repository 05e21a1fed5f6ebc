//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_rpc_attempts_total` (counter): endpoint attempts by outcome
//! - `relay_rpc_failovers_total` (counter): calls that succeeded on a non-first endpoint
//! - `relay_rpc_exhausted_total` (counter): calls where every endpoint failed
//! - `relay_chain_health` (gauge): 1=healthy, 0=unhealthy, per chain
//! - `relay_monitor_state` (gauge): 0=disconnected, 1=connecting, 2=subscribed
//! - `relay_monitor_notifications_total` (counter): new heads processed
//! - `relay_monitor_reconnects_total` (counter): reconnect attempts
//! - `relay_active_monitors` (gauge): registry size
//! - `relay_bridge_dispatches_total` (counter): bridge jobs by outcome
//!
//! Recording is a no-op until a recorder is installed, so tests and the CLI
//! can call these freely.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rpc_attempt(outcome: &'static str) {
    counter!("relay_rpc_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_failover() {
    counter!("relay_rpc_failovers_total").increment(1);
}

pub fn record_rpc_exhausted() {
    counter!("relay_rpc_exhausted_total").increment(1);
}

pub fn record_chain_health(chain: &str, healthy: bool) {
    gauge!("relay_chain_health", "chain" => chain.to_string()).set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_monitor_state(chain: &str, address: &str, state: u8) {
    gauge!(
        "relay_monitor_state",
        "chain" => chain.to_string(),
        "address" => address.to_string()
    )
    .set(state as f64);
}

pub fn record_notification(chain: &str) {
    counter!("relay_monitor_notifications_total", "chain" => chain.to_string()).increment(1);
}

pub fn record_reconnect(chain: &str) {
    counter!("relay_monitor_reconnects_total", "chain" => chain.to_string()).increment(1);
}

pub fn record_active_monitors(count: usize) {
    gauge!("relay_active_monitors").set(count as f64);
}

pub fn record_bridge_dispatch(outcome: &'static str) {
    counter!("relay_bridge_dispatches_total", "outcome" => outcome).increment(1);
}
