//! Failover JSON-RPC transport.
//!
//! # Responsibilities
//! - Execute one logical JSON-RPC call against the endpoint pool
//! - Try each endpoint at most once, starting at the pool's rotation pointer
//! - Enforce a hard per-attempt timeout
//! - Report every per-endpoint failure when the whole pass fails
//!
//! # Design Decisions
//! - One pass per call; callers that want more retries call again
//! - Only a success moves the rotation pointer
//! - Any non-2xx status, JSON-RPC `error` object, or unreadable body counts
//!   as an endpoint failure and moves on to the next endpoint

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::timeout;

use crate::observability::metrics;
use crate::rpc::pool::EndpointPool;
use crate::rpc::types::{
    AllEndpointsFailed, AttemptError, EndpointFailure, JsonRpcRequest, JsonRpcResponse, RpcError,
    RpcResult,
};

/// Process-wide JSON-RPC request id counter.
static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> u64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

/// Retry-and-rotate transport over an [`EndpointPool`].
#[derive(Clone)]
pub struct FailoverTransport {
    pool: Arc<EndpointPool>,
    http: reqwest::Client,
    timeout: Duration,
}

impl FailoverTransport {
    /// Create a transport with the given per-attempt timeout.
    pub fn new(pool: Arc<EndpointPool>, timeout: Duration) -> RpcResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RpcError::Client(e.to_string()))?;

        Ok(Self {
            pool,
            http,
            timeout,
        })
    }

    /// The underlying endpoint pool.
    pub fn pool(&self) -> &Arc<EndpointPool> {
        &self.pool
    }

    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute `method` and return the raw `result` value.
    pub async fn execute(&self, method: &str, params: Value) -> RpcResult<Value> {
        let len = self.pool.len();
        let start = self.pool.start_index();
        let mut failures = Vec::with_capacity(len);

        for attempt in 0..len {
            let idx = self.pool.rotation_index(start, attempt);

            match self.attempt(idx, method, &params).await {
                Ok(result) => {
                    self.pool.record_success(idx);
                    metrics::record_rpc_attempt("success");
                    if attempt > 0 {
                        metrics::record_failover();
                        tracing::info!(
                            method = %method,
                            endpoint_idx = idx,
                            endpoint = %self.pool.list()[idx],
                            failed_attempts = attempt,
                            "RPC request succeeded after failover"
                        );
                    }
                    return Ok(result);
                }
                Err(error) => {
                    metrics::record_rpc_attempt(attempt_outcome(&error));
                    tracing::warn!(
                        method = %method,
                        endpoint_idx = idx,
                        endpoint = %self.pool.list()[idx],
                        error = %error,
                        "RPC request failed, trying next endpoint"
                    );
                    failures.push(EndpointFailure {
                        index: idx,
                        endpoint: self.pool.list()[idx].clone(),
                        error,
                    });
                }
            }
        }

        metrics::record_rpc_exhausted();
        Err(RpcError::AllEndpointsFailed(AllEndpointsFailed {
            method: method.to_string(),
            failures,
        }))
    }

    /// Execute `method` and deserialize the result.
    pub async fn execute_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        let value = self.execute(method, params).await?;
        serde_json::from_value(value).map_err(|source| RpcError::Decode {
            method: method.to_string(),
            source,
        })
    }

    async fn attempt(&self, idx: usize, method: &str, params: &Value) -> Result<Value, AttemptError> {
        let request = JsonRpcRequest::new(next_request_id(), method, params);
        let fut = self.send(idx, &request);

        match timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AttemptError::Timeout(self.timeout)),
        }
    }

    async fn send(&self, idx: usize, request: &JsonRpcRequest<'_>) -> Result<Value, AttemptError> {
        let response = self
            .http
            .post(self.pool.url(idx).clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let parsed: JsonRpcResponse = serde_json::from_slice(&body)
            .map_err(|e| AttemptError::InvalidResponse(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(AttemptError::Rpc {
                code: err.code,
                message: if err.message.is_empty() {
                    "RPC error".to_string()
                } else {
                    err.message
                },
            });
        }

        // A present-but-null result is legitimate (e.g. an unknown receipt).
        parsed
            .result
            .ok_or_else(|| AttemptError::InvalidResponse("missing result and error".to_string()))
    }
}

fn attempt_outcome(error: &AttemptError) -> &'static str {
    match error {
        AttemptError::Timeout(_) => "timeout",
        AttemptError::Transport(_) => "transport",
        AttemptError::Status(_) => "http_status",
        AttemptError::Rpc { .. } => "rpc_error",
        AttemptError::InvalidResponse(_) => "invalid_response",
    }
}

impl std::fmt::Debug for FailoverTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverTransport")
            .field("endpoints", &self.pool.len())
            .field("start_index", &self.pool.start_index())
            .field("timeout", &self.timeout)
            .finish()
    }
}
