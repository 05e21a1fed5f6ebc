//! Admin API.
//!
//! # Routes
//! ```text
//! GET    /admin/status                       version, chains, current endpoints
//! GET    /admin/endpoints                    endpoint pools and rotation start
//! GET    /admin/monitors                     monitor snapshots
//! POST   /admin/monitors                     start monitoring (idempotent)
//! DELETE /admin/monitors/{chain}/{address}   stop monitoring
//! ```
//!
//! Every route requires the configured bearer token.

pub mod auth;
pub mod handlers;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::monitor::MonitorRegistry;

use self::auth::require_api_key;
use self::handlers::*;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// State shared by admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub registry: Arc<MonitorRegistry>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(registry: Arc<MonitorRegistry>, api_key: &str) -> Self {
        Self {
            registry,
            api_key: Arc::from(api_key),
        }
    }
}

#[allow(deprecated)]
pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/endpoints", get(get_endpoints))
        .route("/admin/monitors", get(list_monitors).post(start_monitor))
        .route("/admin/monitors/{chain}/{address}", delete(stop_monitor))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
}

/// Serve the admin API until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AdminState, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
