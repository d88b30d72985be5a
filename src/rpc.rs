//! Ledger RPC Module
//!
//! The orchestrator only needs two things from the ledger: a recent blockhash to
//! sign against, and a way to submit a signed transaction and wait until it is
//! confirmed. `LedgerRpc` is that seam; `SolanaRpc` implements it over the
//! Solana JSON-RPC API.

use anyhow::Result;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, signature::Signature,
    transaction::Transaction,
};

use crate::config::NetworkConfig;
use crate::error::RpcError;

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    /// Fetches a blockhash recent enough to sign a new transaction against.
    async fn latest_blockhash(&self) -> Result<Hash, RpcError>;

    /// Submits a signed transaction and resolves once it reaches the client's
    /// commitment level, or fails if the ledger rejects it.
    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature, RpcError>;
}

pub struct SolanaRpc {
    rpc_client: RpcClient,
}

impl SolanaRpc {
    pub fn new(rpc_url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            rpc_client: RpcClient::new_with_commitment(rpc_url.into(), commitment),
        }
    }

    /// Creates a client from the `[network]` config section.
    ///
    /// # Returns
    ///
    /// * `Ok(SolanaRpc)` - Client bound to the configured endpoint and commitment
    /// * `Err(anyhow::Error)` - Unknown commitment level
    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        Ok(Self::new(config.rpc_url.clone(), config.commitment_config()?))
    }

    pub fn url(&self) -> String {
        self.rpc_client.url()
    }
}

#[async_trait]
impl LedgerRpc for SolanaRpc {
    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        self.rpc_client
            .get_latest_blockhash()
            .await
            .map_err(|e| RpcError::Blockhash(e.to_string()))
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature, RpcError> {
        self.rpc_client
            .send_and_confirm_transaction(transaction)
            .await
            .map_err(|e| match e.get_transaction_error() {
                Some(tx_error) => RpcError::Rejected(tx_error.to_string()),
                None => RpcError::Unconfirmed(e.to_string()),
            })
    }
}
