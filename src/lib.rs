//! Stake client library
//!
//! Client-side orchestration for the SOL time-lock staking program: derives the
//! program addresses, provisions the accounts a deposit needs, and submits the
//! deposit, reporting a single status per attempt.

pub mod config;
pub mod deposit;
pub mod error;
pub mod pda;
pub mod program;
pub mod provision;
pub mod rpc;
pub mod units;
pub mod wallet;

// Re-export public types for convenience
pub use config::StakeConfig;
pub use deposit::{AttemptStatus, DepositOrchestrator, DepositReceipt};
pub use error::{DepositError, InputError, RpcError};
pub use program::StakeProgram;
pub use provision::{AccountProvisioner, LedgerStep, ProvisionLedger, ProvisionedAccounts};
pub use rpc::{LedgerRpc, SolanaRpc};
pub use units::{DepositForm, DepositRequest};
pub use wallet::Wallet;
