//! Signing credential for bridge requests.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized; `Debug` shows the address only

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;

use crate::bridge::types::{BridgeError, BridgeResult};

/// Default environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "RELAY_PRIVATE_KEY";

/// A local key used to authenticate bridge requests.
pub struct SigningCredential {
    signer: PrivateKeySigner,
}

impl SigningCredential {
    /// Parse a hex-encoded private key (with or without 0x prefix).
    pub fn from_private_key(private_key_hex: &str) -> BridgeResult<Self> {
        let key_hex = private_key_hex
            .trim()
            .strip_prefix("0x")
            .unwrap_or(private_key_hex.trim());

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| BridgeError::Credential(format!("Invalid private key format: {}", e)))?;

        tracing::info!(address = %signer.address(), "Signing credential loaded");

        Ok(Self { signer })
    }

    /// Load the key from the named environment variable.
    pub fn from_env(var: &str) -> BridgeResult<Self> {
        let private_key = std::env::var(var).map_err(|_| {
            BridgeError::Credential(format!("Environment variable {} not set", var))
        })?;

        Self::from_private_key(&private_key)
    }

    /// Address controlled by this key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// EIP-191 signature over `payload`, 0x-prefixed hex.
    pub async fn sign(&self, payload: &[u8]) -> BridgeResult<String> {
        let signature = self
            .signer
            .sign_message(payload)
            .await
            .map_err(|e| BridgeError::Signing(e.to_string()))?;
        Ok(alloy::hex::encode_prefixed(signature.as_bytes()))
    }
}

impl std::fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCredential")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}
