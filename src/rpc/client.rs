//! Chain client facade over the failover transport.
//!
//! # Responsibilities
//! - Expose typed chain reads (chain id, blocks, balances, nonces, gas)
//! - Submit signed raw transactions
//! - Provide a health check for chain connectivity

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U128, U256, U64};
use serde_json::json;

use crate::config::ChainConfig;
use crate::observability::metrics;
use crate::rpc::pool::EndpointPool;
use crate::rpc::transport::FailoverTransport;
use crate::rpc::types::{BlockSummary, ReceiptSummary, RpcError, RpcResult};

/// Typed chain reads and writes for one named chain.
#[derive(Clone)]
pub struct ChainClient {
    name: String,
    transport: FailoverTransport,
}

impl ChainClient {
    /// Wrap an existing transport.
    pub fn new(name: impl Into<String>, transport: FailoverTransport) -> Self {
        Self {
            name: name.into().trim().to_ascii_lowercase(),
            transport,
        }
    }

    /// Build a client (pool + transport) from chain configuration.
    pub fn from_config(config: &ChainConfig, timeout: Duration) -> RpcResult<Self> {
        let pool = Arc::new(EndpointPool::new(&config.endpoints)?);
        let transport = FailoverTransport::new(pool, timeout)?;

        tracing::info!(
            chain = %config.name,
            endpoints = transport.pool().len(),
            timeout_ms = timeout.as_millis() as u64,
            "Chain client initialized"
        );

        Ok(Self::new(config.name.clone(), transport))
    }

    /// Trimmed, lowercase chain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The failover transport behind this client.
    pub fn transport(&self) -> &FailoverTransport {
        &self.transport
    }

    /// The endpoint pool behind this client.
    pub fn pool(&self) -> &Arc<EndpointPool> {
        self.transport.pool()
    }

    /// Get the chain ID.
    pub async fn chain_id(&self) -> RpcResult<u64> {
        let id: U64 = self.transport.execute_as("eth_chainId", json!([])).await?;
        Ok(id.to::<u64>())
    }

    /// Verify the connected chain ID matches `expected`.
    pub async fn verify_chain_id(&self, expected: u64) -> RpcResult<()> {
        let actual = self.chain_id().await?;
        if actual != expected {
            return Err(RpcError::ChainMismatch { expected, actual });
        }
        Ok(())
    }

    /// Get the latest block number.
    pub async fn block_number(&self) -> RpcResult<u64> {
        let number: U64 = self.transport.execute_as("eth_blockNumber", json!([])).await?;
        Ok(number.to::<u64>())
    }

    /// Get the latest block header summary.
    pub async fn latest_block(&self) -> RpcResult<BlockSummary> {
        self.transport
            .execute_as("eth_getBlockByNumber", json!(["latest", false]))
            .await
    }

    /// Get the balance of an address in wei.
    pub async fn balance(&self, address: Address) -> RpcResult<U256> {
        self.transport
            .execute_as("eth_getBalance", json!([address, "latest"]))
            .await
    }

    /// Get the transaction count (nonce) for an address.
    pub async fn transaction_count(&self, address: Address) -> RpcResult<u64> {
        let count: U64 = self
            .transport
            .execute_as("eth_getTransactionCount", json!([address, "latest"]))
            .await?;
        Ok(count.to::<u64>())
    }

    /// Get current gas price in wei.
    pub async fn gas_price(&self) -> RpcResult<u128> {
        let price: U128 = self.transport.execute_as("eth_gasPrice", json!([])).await?;
        Ok(price.to::<u128>())
    }

    /// Broadcast a signed transaction.
    pub async fn send_raw_transaction(&self, raw: Bytes) -> RpcResult<TxHash> {
        self.transport
            .execute_as("eth_sendRawTransaction", json!([raw]))
            .await
    }

    /// Get a transaction receipt, `None` while pending.
    pub async fn transaction_receipt(&self, hash: TxHash) -> RpcResult<Option<ReceiptSummary>> {
        self.transport
            .execute_as("eth_getTransactionReceipt", json!([hash]))
            .await
    }

    /// Check if the chain is reachable.
    ///
    /// Returns true if we can query the block number.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.block_number().await.is_ok();
        metrics::record_chain_health(&self.name, healthy);
        healthy
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("name", &self.name)
            .field("current_endpoint", &self.pool().current())
            .field("timeout", &self.transport.timeout())
            .finish()
    }
}
