use std::str::FromStr;

use alloy::primitives::Address;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::monitor::{MonitorError, MonitorSnapshot};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub chains: Vec<ChainStatus>,
    pub monitors: usize,
}

#[derive(Serialize)]
pub struct ChainStatus {
    pub name: String,
    pub current_endpoint: String,
}

#[derive(Serialize)]
pub struct EndpointStatus {
    pub chain: String,
    pub endpoints: Vec<String>,
    pub start_index: usize,
    pub current: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct StartMonitorRequest {
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub user_id: Option<u64>,
}

/// Error body: `{"error": "..."}`. Never carries internal detail.
pub struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl ApiError {
    fn new(status: StatusCode, message: &'static str) -> Self {
        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        match e {
            MonitorError::UnknownChain(_) => ApiError::new(StatusCode::NOT_FOUND, "unknown chain"),
            MonitorError::NoSubscriptionEndpoint(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "chain has no subscription endpoint")
            }
            MonitorError::Rpc(_) => ApiError::new(StatusCode::BAD_GATEWAY, "balance read failed"),
            MonitorError::InvalidSettings(_) => {
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "invalid monitor settings")
            }
        }
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let chains = state
        .registry
        .chains()
        .into_iter()
        .map(|c| ChainStatus {
            name: c.name().to_string(),
            current_endpoint: c.client.pool().current().to_string(),
        })
        .collect();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        chains,
        monitors: state.registry.len(),
    })
}

pub async fn get_endpoints(State(state): State<AdminState>) -> Json<Vec<EndpointStatus>> {
    let statuses = state
        .registry
        .chains()
        .into_iter()
        .map(|c| {
            let pool = c.client.pool();
            EndpointStatus {
                chain: c.name().to_string(),
                endpoints: pool.list().to_vec(),
                start_index: pool.start_index(),
                current: pool.current().to_string(),
            }
        })
        .collect();

    Json(statuses)
}

pub async fn list_monitors(State(state): State<AdminState>) -> Json<Vec<MonitorSnapshot>> {
    Json(state.registry.list().iter().map(|m| m.snapshot()).collect())
}

pub async fn start_monitor(
    State(state): State<AdminState>,
    Json(request): Json<StartMonitorRequest>,
) -> Result<Json<MonitorSnapshot>, ApiError> {
    let chain = match request.chain {
        Some(chain) => chain,
        None => {
            let chains = state.registry.chains();
            match chains.as_slice() {
                [only] => only.name().to_string(),
                _ => return Err(ApiError::new(StatusCode::BAD_REQUEST, "chain is required")),
            }
        }
    };

    let address = match request.address {
        Some(raw) => parse_address(&raw)?,
        None => state
            .registry
            .default_address()
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "address is required"))?,
    };

    let monitor = state
        .registry
        .start_monitoring(&chain, address, request.user_id.unwrap_or(1))
        .await?;

    Ok(Json(monitor.snapshot()))
}

pub async fn stop_monitor(
    State(state): State<AdminState>,
    Path((chain, address)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let address = parse_address(&address)?;
    if state.registry.stop_monitoring(&chain, address).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::new(StatusCode::NOT_FOUND, "monitor not found"))
    }
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Address::from_str(raw.trim())
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, "invalid address"))
}
