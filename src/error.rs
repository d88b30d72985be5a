//! Error types
//!
//! Structured failure causes for a deposit attempt. The orchestrator converts
//! every one of these into a generic `AttemptStatus::Failed` for the caller and
//! keeps the structured value on its diagnostic channel.

use thiserror::Error;

use crate::provision::LedgerStep;

/// Failure reported by the ledger RPC collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("Failed to fetch latest blockhash: {0}")]
    Blockhash(String),

    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Transaction not confirmed: {0}")]
    Unconfirmed(String),
}

/// Form input that could not be turned into protocol units.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Amount is not a non-negative decimal number: {0:?}")]
    InvalidAmount(String),

    #[error("Lock time is not a non-negative number of minutes: {0:?}")]
    InvalidDuration(String),

    #[error("Amount {0:?} does not fit in u64 lamports")]
    AmountOverflow(String),

    #[error("Lock time {0:?} does not fit in u64 seconds")]
    DurationOverflow(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DepositError {
    #[error("Wallet not connected")]
    NotConnected,

    #[error("Amount and lock time are both required")]
    MissingInput,

    #[error(transparent)]
    InvalidInput(#[from] InputError),

    #[error("Failed to sign {step} transaction: {message}")]
    Signing { step: LedgerStep, message: String },

    #[error("{step} failed: {source}")]
    Step {
        step: LedgerStep,
        #[source]
        source: RpcError,
    },
}

impl DepositError {
    /// The ledger step this failure happened at, if it got that far.
    pub fn step(&self) -> Option<LedgerStep> {
        match self {
            DepositError::Signing { step, .. } | DepositError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}
