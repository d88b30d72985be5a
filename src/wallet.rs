//! Wallet (signer identity) Module
//!
//! The signer the presentation layer hands to the orchestrator. A wallet is
//! either connected, holding a signer whose public key is the user's identity,
//! or disconnected.

use anyhow::{Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
};
use std::sync::Arc;

use crate::config::WalletConfig;

pub type SharedSigner = Arc<dyn Signer + Send + Sync>;

#[derive(Clone, Default)]
pub struct Wallet {
    signer: Option<SharedSigner>,
}

impl Wallet {
    pub fn connected(signer: SharedSigner) -> Self {
        Self {
            signer: Some(signer),
        }
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self::connected(Arc::new(keypair))
    }

    pub fn disconnected() -> Self {
        Self { signer: None }
    }

    /// Loads the wallet described by the `[wallet]` config section.
    ///
    /// A keypair file takes precedence over a base58 private key env var. With
    /// neither configured the wallet is disconnected.
    ///
    /// # Returns
    ///
    /// * `Ok(Wallet)` - Connected or disconnected wallet
    /// * `Err(anyhow::Error)` - A configured source could not be read or decoded
    pub fn from_config(config: &WalletConfig) -> Result<Self> {
        if let Some(path) = &config.keypair_path {
            let keypair = read_keypair_file(path)
                .map_err(|e| anyhow::anyhow!("Failed to read keypair file {}: {}", path, e))?;
            return Ok(Self::from_keypair(keypair));
        }

        if let Some(env_name) = &config.private_key_env {
            let private_key_b58 = std::env::var(env_name)
                .with_context(|| format!("Missing private key env var: {}", env_name))?;
            let keypair = keypair_from_base58(&private_key_b58)
                .context("Failed to decode private key from base58")?;
            return Ok(Self::from_keypair(keypair));
        }

        Ok(Self::disconnected())
    }

    pub fn is_connected(&self) -> bool {
        self.signer.is_some()
    }

    /// The identity of the connected signer, if any.
    pub fn identity(&self) -> Option<Pubkey> {
        self.signer.as_ref().map(|signer| signer.pubkey())
    }

    pub fn signer(&self) -> Option<&SharedSigner> {
        self.signer.as_ref()
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("identity", &self.identity())
            .finish()
    }
}

/// Decodes a base58 private key string into a Keypair.
///
/// Solana private keys are 64 bytes (seed + public key) encoded as base58.
///
/// # Arguments
///
/// * `b58` - Base58-encoded private key string
///
/// # Returns
///
/// * `Ok(Keypair)` - Decoded keypair
/// * `Err(anyhow::Error)` - Invalid base58 or wrong length
pub fn keypair_from_base58(b58: &str) -> Result<Keypair> {
    let bytes = bs58::decode(b58.trim())
        .into_vec()
        .context("Invalid base58 encoding")?;
    Keypair::try_from(bytes.as_slice()).map_err(|e| anyhow::anyhow!("Invalid keypair bytes: {}", e))
}
