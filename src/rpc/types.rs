//! JSON-RPC wire types and error definitions.

use std::fmt;
use std::time::Duration;

use alloy::primitives::{B256, U64};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Outgoing JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: &'a Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Incoming JSON-RPC response. Exactly one of `result`/`error` is expected.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    /// `None` when the key is absent, `Some(Value::Null)` for an explicit `null`.
    #[serde(default, deserialize_with = "present")]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Why a single endpoint attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// No response within the per-attempt deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Connection refused, DNS failure, TLS error, body read error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-2xx status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// Endpoint answered with a JSON-RPC error object.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Body was not a usable JSON-RPC response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One endpoint's failure within a logical call.
#[derive(Debug)]
pub struct EndpointFailure {
    /// Index of the endpoint in the pool.
    pub index: usize,
    /// Endpoint URL.
    pub endpoint: String,
    /// What went wrong.
    pub error: AttemptError,
}

/// Every endpoint in the pool failed for one logical call.
///
/// Failures are kept in attempt order, so the last entry is the last
/// underlying error.
#[derive(Debug)]
pub struct AllEndpointsFailed {
    pub method: String,
    pub failures: Vec<EndpointFailure>,
}

impl AllEndpointsFailed {
    /// The error from the final endpoint tried.
    pub fn last_error(&self) -> Option<&AttemptError> {
        self.failures.last().map(|f| &f.error)
    }
}

impl fmt::Display for AllEndpointsFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "All {} RPC endpoints failed for {}",
            self.failures.len(),
            self.method
        )?;
        if let Some(last) = self.failures.last() {
            write!(f, "; last error from {}: {}", last.endpoint, last.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AllEndpointsFailed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.last_error()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Errors that can occur during RPC operations.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Endpoint pool built from an empty list.
    #[error("no RPC endpoints configured")]
    EmptyPool,

    /// Endpoint URL did not parse.
    #[error("invalid RPC endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    /// HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// One full pass over the pool failed.
    #[error(transparent)]
    AllEndpointsFailed(#[from] AllEndpointsFailed),

    /// An endpoint answered but the result had an unexpected shape.
    #[error("failed to decode result of {method}: {source}")]
    Decode {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    /// Connected chain differs from configuration.
    #[error("chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// The fields of a block header the relay cares about.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BlockSummary {
    pub number: U64,
    pub hash: B256,
    pub timestamp: U64,
}

/// The fields of a receipt the relay cares about.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptSummary {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub status: Option<U64>,
}

impl ReceiptSummary {
    /// True when the receipt reports a successful execution.
    pub fn succeeded(&self) -> bool {
        self.status.map(|s| s == U64::from(1)).unwrap_or(false)
    }
}
