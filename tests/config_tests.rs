//! Unit tests for configuration module

use stake_client::config::{
    NetworkConfig, ProgramConfig, StakeConfig, WalletConfig, DEFAULT_PROGRAM_ID, DEFAULT_RPC_URL,
};
use stake_client::StakeProgram;
use std::io::Write;

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{DUMMY_PROGRAM_ID, DUMMY_RPC_URL, DUMMY_STATE_SEED};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Create a minimal valid StakeConfig for testing
fn create_test_config() -> StakeConfig {
    StakeConfig {
        network: NetworkConfig {
            rpc_url: DUMMY_RPC_URL.to_string(),
            commitment: "confirmed".to_string(),
        },
        program: ProgramConfig {
            program_id: DUMMY_PROGRAM_ID.to_string(),
            state_seed: DUMMY_STATE_SEED.to_string(),
            token_program_id: "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb".to_string(),
        },
        wallet: WalletConfig::default(),
    }
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// ============================================================================
// VALIDATION TESTS
// ============================================================================

/// What is tested: StakeConfig::validate() accepts valid configuration
/// Why: Ensure valid configs pass validation
#[test]
fn test_config_validation_success() {
    assert!(create_test_config().validate().is_ok());
    assert!(StakeConfig::default().validate().is_ok());
}

/// What is tested: StakeConfig::validate() rejects a non-http RPC URL
#[test]
fn test_config_validation_rejects_bad_rpc_url() {
    let mut config = create_test_config();
    config.network.rpc_url = "ws://127.0.0.1:8900".to_string();

    let result = config.validate();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("rpc_url"));
}

/// What is tested: StakeConfig::validate() rejects an unknown commitment level
#[test]
fn test_config_validation_rejects_unknown_commitment() {
    let mut config = create_test_config();
    config.network.commitment = "max".to_string();

    let result = config.validate();
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Unknown commitment"));
}

/// What is tested: StakeConfig::validate() rejects malformed program ids
/// Why: A bad id would only surface later as an opaque RPC failure
#[test]
fn test_config_validation_rejects_invalid_program_id() {
    let mut config = create_test_config();
    config.program.program_id = "not-a-pubkey".to_string();
    let result = config.validate();
    assert!(result.unwrap_err().to_string().contains("program_id"));

    let mut config = create_test_config();
    config.program.token_program_id = "0x1234".to_string();
    let result = config.validate();
    assert!(result.unwrap_err().to_string().contains("token_program_id"));
}

/// What is tested: StakeConfig::validate() bounds the state seed length
/// Why: PDA seeds longer than 32 bytes cannot be derived
#[test]
fn test_config_validation_rejects_bad_seed_length() {
    let mut config = create_test_config();
    config.program.state_seed = String::new();
    assert!(config.validate().is_err());

    config.program.state_seed = "s".repeat(33);
    assert!(config.validate().unwrap_err().to_string().contains("state_seed"));

    config.program.state_seed = "s".repeat(32);
    assert!(config.validate().is_ok());
}

// ============================================================================
// LOADING TESTS
// ============================================================================

/// What is tested: StakeConfig::load_from_path() parses a full TOML file
#[test]
fn test_load_from_path_full_file() {
    let file = write_config(&format!(
        r#"
[network]
rpc_url = "{}"
commitment = "finalized"

[program]
program_id = "{}"
state_seed = "{}"

[wallet]
private_key_env = "STAKE_PRIVATE_KEY"
"#,
        DUMMY_RPC_URL, DUMMY_PROGRAM_ID, DUMMY_STATE_SEED
    ));

    let config = StakeConfig::load_from_path(file.path().to_str()).unwrap();
    assert_eq!(config.network.rpc_url, DUMMY_RPC_URL);
    assert_eq!(config.network.commitment, "finalized");
    assert_eq!(config.program.program_id, DUMMY_PROGRAM_ID);
    assert_eq!(
        config.program.token_program_id,
        "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb"
    );
    assert_eq!(config.wallet.keypair_path, None);
    assert_eq!(config.wallet.private_key_env.as_deref(), Some("STAKE_PRIVATE_KEY"));

    let program = StakeProgram::from_config(&config.program).unwrap();
    assert_eq!(program.state_seed(), DUMMY_STATE_SEED);
}

/// What is tested: StakeConfig::load_from_path() fills omitted sections with defaults
/// Why: An empty file should talk to the devnet deployment
#[test]
fn test_load_from_path_defaults() {
    let file = write_config("");

    let config = StakeConfig::load_from_path(file.path().to_str()).unwrap();
    assert_eq!(config.network.rpc_url, DEFAULT_RPC_URL);
    assert_eq!(config.network.commitment, "confirmed");
    assert_eq!(config.program.program_id, DEFAULT_PROGRAM_ID);
    assert_eq!(config.program.state_seed, "client1");
}

/// What is tested: StakeConfig::load_from_path() with a missing file
/// Why: The error should point the user at the template
#[test]
fn test_load_from_path_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stake.toml");

    let result = StakeConfig::load_from_path(path.to_str());
    let message = result.unwrap_err().to_string();
    assert!(message.contains("not found"));
    assert!(message.contains("stake.template.toml"));
}

/// What is tested: StakeConfig::load_from_path() validates after parsing
#[test]
fn test_load_from_path_runs_validation() {
    let file = write_config(
        r#"
[network]
rpc_url = "127.0.0.1:8899"
"#,
    );

    assert!(StakeConfig::load_from_path(file.path().to_str()).is_err());
}

/// What is tested: StakeConfig::load_from_path() rejects malformed TOML
#[test]
fn test_load_from_path_rejects_malformed_toml() {
    let file = write_config("[network\nrpc_url = ");
    assert!(StakeConfig::load_from_path(file.path().to_str()).is_err());
}
