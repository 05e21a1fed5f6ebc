//! Fire-and-forget bridge dispatch.
//!
//! A dispatched job runs on its own task. Its outcome is logged and
//! counted, never reported back to the caller, and never retried: a retry
//! of the same deposit would bridge it twice.

use std::sync::Arc;

use alloy::primitives::utils::format_ether;
use alloy::primitives::U256;
use futures_util::future::BoxFuture;
use uuid::Uuid;

use crate::bridge::credential::SigningCredential;
use crate::bridge::types::{BridgeReceipt, BridgeRequest, BridgeResult, BridgeTrigger};
use crate::observability::metrics;

/// Everything a monitor needs to launch a bridge.
#[derive(Clone)]
pub struct BridgeHandle {
    trigger: Arc<dyn BridgeTrigger>,
    credential: Option<Arc<SigningCredential>>,
    destination_chain: String,
}

impl BridgeHandle {
    pub fn new(
        trigger: Arc<dyn BridgeTrigger>,
        credential: Option<Arc<SigningCredential>>,
        destination_chain: impl Into<String>,
    ) -> Self {
        Self {
            trigger,
            credential,
            destination_chain: destination_chain.into(),
        }
    }

    /// Signing credential, if one was loaded.
    pub fn credential(&self) -> Option<&Arc<SigningCredential>> {
        self.credential.as_ref()
    }

    /// Spawn a bridge of `amount` wei from `source_chain`.
    ///
    /// Returns the job id, or `None` when no credential is available.
    pub fn dispatch(&self, source_chain: &str, amount: U256, user_id: u64) -> Option<Uuid> {
        let Some(credential) = self.credential.clone() else {
            tracing::error!(user_id, "No signing credential available, skipping bridge");
            metrics::record_bridge_dispatch("skipped");
            return None;
        };

        let job_id = Uuid::new_v4();
        let request = BridgeRequest {
            source_chain: source_chain.to_string(),
            destination_chain: self.destination_chain.clone(),
            credential,
            amount,
            user_id,
        };
        let trigger = self.trigger.clone();

        tracing::info!(
            job_id = %job_id,
            source_chain = %request.source_chain,
            destination_chain = %request.destination_chain,
            amount = %format_ether(amount),
            user_id,
            "Dispatching bridge"
        );
        metrics::record_bridge_dispatch("dispatched");

        tokio::spawn(async move {
            match trigger.bridge(request).await {
                Ok(receipt) => {
                    metrics::record_bridge_dispatch("succeeded");
                    tracing::info!(
                        job_id = %job_id,
                        transfer_id = %receipt.transfer_id,
                        source_tx = ?receipt.source_tx,
                        destination_tx = ?receipt.destination_tx,
                        "Bridge completed"
                    );
                }
                Err(e) => {
                    metrics::record_bridge_dispatch("failed");
                    tracing::error!(job_id = %job_id, error = %e, "Bridge failed");
                }
            }
        });

        Some(job_id)
    }
}

impl std::fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeHandle")
            .field("credential", &self.credential)
            .field("destination_chain", &self.destination_chain)
            .finish_non_exhaustive()
    }
}

/// Trigger used when bridging is disabled: logs what would have been sent.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunBridge;

impl BridgeTrigger for DryRunBridge {
    fn bridge(&self, request: BridgeRequest) -> BoxFuture<'_, BridgeResult<BridgeReceipt>> {
        Box::pin(async move {
            tracing::info!(
                source_chain = %request.source_chain,
                destination_chain = %request.destination_chain,
                amount = %format_ether(request.amount),
                user_id = request.user_id,
                "Bridging disabled, dry run only"
            );
            Ok(BridgeReceipt {
                transfer_id: "dry-run".to_string(),
                source_tx: None,
                destination_tx: None,
            })
        })
    }
}
