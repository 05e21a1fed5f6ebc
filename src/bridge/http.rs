//! HTTP client for the external bridge service.
//!
//! # Transfer Lifecycle
//! ```text
//! POST /transfers              → { id, source_tx }       (initiate)
//! GET  /transfers/{id}         → { status, message }     (poll until attested)
//! POST /transfers/{id}/redeem  → { destination_tx }      (redeem)
//! ```
//!
//! Every request carries `x-relay-address` and `x-relay-signature`, an
//! EIP-191 signature over the request body (or the path for GETs).

use std::time::Duration;

use alloy::primitives::utils::format_ether;
use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::bridge::credential::SigningCredential;
use crate::bridge::types::{
    BridgeError, BridgePhase, BridgeReceipt, BridgeRequest, BridgeResult, BridgeTrigger,
};
use crate::config::BridgeConfig;

pub const ADDRESS_HEADER: &str = "x-relay-address";
pub const SIGNATURE_HEADER: &str = "x-relay-signature";

#[derive(Debug, Serialize)]
struct InitiateBody<'a> {
    source_chain: &'a str,
    destination_chain: &'a str,
    /// Decimal wei.
    amount_wei: String,
    /// Human-readable ether.
    amount: String,
    recipient: String,
    user_id: u64,
}

#[derive(Debug, Deserialize)]
struct InitiateResponse {
    id: String,
    #[serde(default)]
    source_tx: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct RedeemBody<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RedeemResponse {
    #[serde(default)]
    destination_tx: Option<String>,
}

/// Bridge trigger backed by an HTTP bridge service.
#[derive(Debug, Clone)]
pub struct HttpBridgeTrigger {
    http: reqwest::Client,
    base: Url,
    poll_interval: Duration,
    attestation_timeout: Duration,
}

impl HttpBridgeTrigger {
    /// Create a client from configuration.
    pub fn new(config: &BridgeConfig) -> BridgeResult<Self> {
        let mut base = Url::parse(&config.api_url)
            .map_err(|e| BridgeError::Client(format!("Invalid bridge URL '{}': {}", config.api_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BridgeError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            attestation_timeout: Duration::from_secs(config.attestation_timeout_secs),
        })
    }

    /// Override polling cadence (used by tests and short-lived chains).
    pub fn with_polling(mut self, poll_interval: Duration, attestation_timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.attestation_timeout = attestation_timeout;
        self
    }

    fn endpoint(&self, path: &str) -> BridgeResult<Url> {
        self.base
            .join(path)
            .map_err(|e| BridgeError::Client(format!("Invalid bridge path '{}': {}", path, e)))
    }

    async fn transfer(&self, request: &BridgeRequest) -> BridgeResult<BridgeReceipt> {
        let credential = request.credential.as_ref();

        // 1) Initiate on the source chain.
        let body = InitiateBody {
            source_chain: &request.source_chain,
            destination_chain: &request.destination_chain,
            amount_wei: request.amount.to_string(),
            amount: format_ether(request.amount),
            recipient: credential.address().to_string(),
            user_id: request.user_id,
        };
        let initiated: InitiateResponse = self
            .signed_post("transfers", &body, credential, BridgePhase::Initiate)
            .await?;
        tracing::info!(
            transfer_id = %initiated.id,
            source_tx = ?initiated.source_tx,
            "Bridge transfer initiated"
        );

        // 2) Wait for the attestation.
        match tokio::time::timeout(
            self.attestation_timeout,
            self.await_attestation(&initiated.id, credential),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(BridgeError::AttestationTimeout(self.attestation_timeout)),
        }
        tracing::info!(transfer_id = %initiated.id, "Bridge attestation ready");

        // 3) Redeem on the destination chain.
        let redeemed: RedeemResponse = self
            .signed_post(
                &format!("transfers/{}/redeem", initiated.id),
                &RedeemBody { id: &initiated.id },
                credential,
                BridgePhase::Redeem,
            )
            .await?;

        Ok(BridgeReceipt {
            transfer_id: initiated.id,
            source_tx: initiated.source_tx,
            destination_tx: redeemed.destination_tx,
        })
    }

    async fn await_attestation(&self, id: &str, credential: &SigningCredential) -> BridgeResult<()> {
        let path = format!("transfers/{}", id);
        loop {
            // The source leg is already initiated; only a reported failure or the
            // outer deadline abandons it.
            let status: StatusResponse = match self.signed_get(&path, credential, BridgePhase::Attest).await {
                Ok(status) => status,
                Err(e @ (BridgeError::Request { .. } | BridgeError::Status { .. })) => {
                    tracing::warn!(transfer_id = %id, error = %e, "Attestation poll failed, retrying");
                    tokio::time::sleep(self.poll_interval).await;
                    continue;
                }
                Err(e) => return Err(e),
            };
            match status.status.as_str() {
                "attested" | "completed" => return Ok(()),
                "failed" => {
                    return Err(BridgeError::AttestationFailed(
                        status.message.unwrap_or_else(|| "no reason given".to_string()),
                    ))
                }
                other => {
                    tracing::debug!(transfer_id = %id, status = %other, "Attestation pending");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn signed_post<B, R>(
        &self,
        path: &str,
        body: &B,
        credential: &SigningCredential,
        phase: BridgePhase,
    ) -> BridgeResult<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| BridgeError::Client(format!("Failed to encode {} body: {}", phase, e)))?;
        let signature = credential.sign(&payload).await?;

        let response = self
            .http
            .post(self.endpoint(path)?)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(ADDRESS_HEADER, credential.address().to_string())
            .header(SIGNATURE_HEADER, signature)
            .body(payload)
            .send()
            .await
            .map_err(|source| BridgeError::Request { phase, source })?;

        Self::decode(response, phase).await
    }

    async fn signed_get<R: DeserializeOwned>(
        &self,
        path: &str,
        credential: &SigningCredential,
        phase: BridgePhase,
    ) -> BridgeResult<R> {
        let signature = credential.sign(path.as_bytes()).await?;

        let response = self
            .http
            .get(self.endpoint(path)?)
            .header(ADDRESS_HEADER, credential.address().to_string())
            .header(SIGNATURE_HEADER, signature)
            .send()
            .await
            .map_err(|source| BridgeError::Request { phase, source })?;

        Self::decode(response, phase).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response, phase: BridgePhase) -> BridgeResult<R> {
        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Status {
                phase,
                status: status.as_u16(),
            });
        }
        response
            .json()
            .await
            .map_err(|source| BridgeError::Request { phase, source })
    }
}

impl BridgeTrigger for HttpBridgeTrigger {
    fn bridge(&self, request: BridgeRequest) -> BoxFuture<'_, BridgeResult<BridgeReceipt>> {
        Box::pin(async move { self.transfer(&request).await })
    }
}
