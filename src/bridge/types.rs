//! Bridge request/receipt types and error definitions.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bridge::credential::SigningCredential;

/// A cross-chain transfer to perform.
#[derive(Debug, Clone)]
pub struct BridgeRequest {
    /// Chain the funds leave from.
    pub source_chain: String,
    /// Chain the funds arrive on.
    pub destination_chain: String,
    /// Key that signs on both sides.
    pub credential: Arc<SigningCredential>,
    /// Amount in wei.
    pub amount: U256,
    /// Owner of the funds.
    pub user_id: u64,
}

/// Outcome of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeReceipt {
    pub transfer_id: String,
    pub source_tx: Option<String>,
    pub destination_tx: Option<String>,
}

/// Phase of a bridge transfer, used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    Initiate,
    Attest,
    Redeem,
}

impl std::fmt::Display for BridgePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BridgePhase::Initiate => "initiate",
            BridgePhase::Attest => "attest",
            BridgePhase::Redeem => "redeem",
        })
    }
}

/// Errors that can occur while bridging.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Signing key missing or malformed.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Request signing failed.
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Bridge service URL or client setup is invalid.
    #[error("Bridge client error: {0}")]
    Client(String),

    /// Network failure talking to the bridge service.
    #[error("Bridge request failed during {phase}: {source}")]
    Request {
        phase: BridgePhase,
        #[source]
        source: reqwest::Error,
    },

    /// Bridge service answered with a non-2xx status.
    #[error("Bridge service returned HTTP {status} during {phase}")]
    Status { phase: BridgePhase, status: u16 },

    /// Attestation reported as failed.
    #[error("Attestation failed: {0}")]
    AttestationFailed(String),

    /// Attestation not ready in time.
    #[error("Attestation not ready after {0:?}")]
    AttestationTimeout(Duration),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Performs a cross-chain transfer end to end.
///
/// Implementations may run for tens of minutes; callers that must not
/// block go through [`crate::bridge::BridgeHandle::dispatch`].
pub trait BridgeTrigger: Send + Sync + 'static {
    fn bridge(&self, request: BridgeRequest) -> BoxFuture<'_, BridgeResult<BridgeReceipt>>;
}
