//! Configuration Management Module
//!
//! This module handles loading and validating configuration for the stake client.
//! Configuration covers the ledger RPC connection, the deployed staking program,
//! and where the signing keypair comes from.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::str::FromStr;

use crate::pda::{DEFAULT_STATE_SEED, TOKEN_2022_PROGRAM_ID};

/// Program the client talks to unless configured otherwise.
pub const DEFAULT_PROGRAM_ID: &str = "6aVUKLFu9QKUEpApA8i1vqP8A3DdJqmebQ7QeYsCs6Lz";
pub const DEFAULT_RPC_URL: &str = "https://api.devnet.solana.com";

/// Longest seed `find_program_address` accepts.
const MAX_SEED_LEN: usize = 32;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure containing all stake client settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StakeConfig {
    /// Ledger RPC connection
    #[serde(default)]
    pub network: NetworkConfig,
    /// Deployed staking program
    #[serde(default)]
    pub program: ProgramConfig,
    /// Signer source
    #[serde(default)]
    pub wallet: WalletConfig,
}

/// Ledger RPC connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// RPC endpoint URL (e.g., "https://api.devnet.solana.com")
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Commitment level each step waits for: processed, confirmed or finalized
    #[serde(default = "default_commitment")]
    pub commitment: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            commitment: default_commitment(),
        }
    }
}

impl NetworkConfig {
    /// Parses the configured commitment level.
    pub fn commitment_config(&self) -> anyhow::Result<CommitmentConfig> {
        match self.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(anyhow::anyhow!(
                "Unknown commitment '{}': expected processed, confirmed or finalized",
                other
            )),
        }
    }
}

/// Deployed staking program settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramConfig {
    /// Program ID of the staking program (base58)
    #[serde(default = "default_program_id")]
    pub program_id: String,
    /// Seed for the per-identity state record PDA
    #[serde(default = "default_state_seed")]
    pub state_seed: String,
    /// Token program owning receipt mints (Token-2022 by default)
    #[serde(default = "default_token_program_id")]
    pub token_program_id: String,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: default_program_id(),
            state_seed: default_state_seed(),
            token_program_id: default_token_program_id(),
        }
    }
}

/// Where the signing keypair is loaded from. `keypair_path` wins when both are set.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WalletConfig {
    /// Path to a JSON keypair file (solana-keygen format)
    #[serde(default)]
    pub keypair_path: Option<String>,
    /// Environment variable name containing a base58 private key
    #[serde(default)]
    pub private_key_env: Option<String>,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_program_id() -> String {
    DEFAULT_PROGRAM_ID.to_string()
}

fn default_state_seed() -> String {
    DEFAULT_STATE_SEED.to_string()
}

fn default_token_program_id() -> String {
    TOKEN_2022_PROGRAM_ID.to_string()
}

impl StakeConfig {
    /// Loads configuration from a TOML file.
    ///
    /// This function:
    /// 1. Uses the provided path, or STAKE_CONFIG_PATH env var, or config/stake.toml
    /// 2. If it exists, loads and parses the configuration
    /// 3. Validates the configuration
    /// 4. If it doesn't exist, returns an error asking user to copy template
    ///
    /// # Arguments
    ///
    /// * `path` - Optional path to config file. If None, uses STAKE_CONFIG_PATH env var or default.
    ///
    /// # Returns
    ///
    /// * `Ok(StakeConfig)` - Successfully loaded and validated configuration
    /// * `Err(anyhow::Error)` - File doesn't exist, failed to parse, or validation failed
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        // Use provided path, or check for custom config path via environment variable, or use default
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var("STAKE_CONFIG_PATH").ok())
            .unwrap_or_else(|| "config/stake.toml".to_string());

        if !std::path::Path::new(&config_path).exists() {
            // Configuration file doesn't exist - user needs to copy template
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/stake.template.toml config/stake.toml\n\
                Then edit config/stake.toml with your actual values.",
                config_path
            ));
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path))?;
        let config: StakeConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path))?;
        // Validate before handing out ids and seeds that PDA derivation relies on
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location (see `load_from_path`).
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// Checks:
    /// - RPC URL is http(s) and commitment is a known level
    /// - Program and token program ids are valid base58 pubkeys
    /// - State seed is between 1 and 32 bytes
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Configuration is valid
    /// * `Err(anyhow::Error)` - Validation failed with error message
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.network.rpc_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!(
                "Configuration error: rpc_url must start with http:// or https://, got '{}'",
                url
            );
        }
        self.network.commitment_config()?;

        Pubkey::from_str(&self.program.program_id)
            .map_err(|_| anyhow::anyhow!("Configuration error: invalid program_id (expected base58 pubkey)"))?;
        Pubkey::from_str(&self.program.token_program_id).map_err(|_| {
            anyhow::anyhow!("Configuration error: invalid token_program_id (expected base58 pubkey)")
        })?;

        let seed_len = self.program.state_seed.len();
        if seed_len == 0 || seed_len > MAX_SEED_LEN {
            anyhow::bail!(
                "Configuration error: state_seed must be 1..={} bytes, got {}",
                MAX_SEED_LEN,
                seed_len
            );
        }

        Ok(())
    }
}
