//! Stake CLI
//!
//! Command-line front end for the deposit orchestrator. It plays the part of
//! the staking form: it supplies the connected signer and the two form values,
//! then prints every status the attempt goes through.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin stake -- --config config/stake.toml deposit --amount 1.5 --minutes 60
//! cargo run --bin stake -- addresses
//! ```
//!
//! Or set the config path via environment variable:
//!
//! ```bash
//! STAKE_CONFIG_PATH=config/stake.toml cargo run --bin stake -- deposit --amount 2 --minutes 30
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stake_client::{
    config::StakeConfig, AttemptStatus, DepositForm, DepositOrchestrator, SolanaRpc, StakeProgram,
    Wallet,
};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "stake")]
#[command(about = "Lock SOL in the time-lock staking program and receive a receipt token")]
struct Args {
    /// Path to configuration file (default: config/stake.toml or STAKE_CONFIG_PATH env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Provision the staking accounts and deposit
    Deposit {
        /// Amount to lock, in SOL
        #[arg(long)]
        amount: String,
        /// Lock time, in minutes
        #[arg(long)]
        minutes: String,
    },
    /// Print the addresses derived for the configured wallet
    Addresses,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments first (before initializing logging)
    let args = Args::parse();

    // Initialize structured logging
    tracing_subscriber::fmt::init();

    // Load configuration
    // Priority: CLI arg > env var > default
    let config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            StakeConfig::load_from_path(Some(path))?
        }
        None => {
            match std::env::var("STAKE_CONFIG_PATH") {
                Ok(path) => info!("Loading configuration from STAKE_CONFIG_PATH: {}", path),
                Err(_) => info!("Loading configuration from default location"),
            }
            StakeConfig::load()?
        }
    };

    info!("RPC endpoint: {} ({})", config.network.rpc_url, config.network.commitment);
    info!("Staking program: {}", config.program.program_id);

    let program = StakeProgram::from_config(&config.program)?;
    let wallet = Wallet::from_config(&config.wallet).context("Failed to load wallet")?;

    match args.command {
        Command::Addresses => {
            let identity = wallet
                .identity()
                .context("No wallet configured: set [wallet] keypair_path or private_key_env")?;
            println!("Identity:  {}", identity);
            println!("State PDA: {}", program.state_address(&identity));
            Ok(())
        }
        Command::Deposit { amount, minutes } => {
            let rpc = SolanaRpc::from_config(&config.network)?;
            let orchestrator = DepositOrchestrator::new(Arc::new(rpc), program);

            // Print progress; the terminal status is printed below
            let mut updates = orchestrator.subscribe().await;
            let printer = tokio::spawn(async move {
                while let Some(status) = updates.recv().await {
                    if status.is_in_progress() {
                        println!("{}", status);
                    }
                }
            });

            let form = DepositForm::new(amount, minutes);
            let status = orchestrator.attempt_deposit(&form, &wallet).await;
            if let Some(identity) = wallet.identity() {
                if let Some(receipt) = orchestrator.last_receipt(&identity).await {
                    info!("Receipt mint: {}", receipt.mint);
                    info!("Holding account: {}", receipt.holding);
                    info!("Deposit signature: {}", receipt.signature);
                }
                if let Some(cause) = orchestrator.last_failure(&identity).await {
                    error!("Deposit failed: {}", cause);
                }
            }

            // Dropping the orchestrator closes the status channel and ends the printer.
            drop(orchestrator);
            let _ = printer.await;

            println!("{}", status);
            if !matches!(status, AttemptStatus::Succeeded { .. }) {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
