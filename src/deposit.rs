//! Deposit Orchestrator
//!
//! Runs one deposit attempt end to end:
//! 1. **Validating**: wallet connected, both form fields present and parseable
//! 2. **Submitting**: provision state record, mint and holding account, then `store`
//! 3. **Succeeded / Failed**: a single terminal status for the caller
//!
//! Every failure is caught here. The caller only ever sees a generic
//! `AttemptStatus::Failed`; the structured cause is logged and kept per identity
//! (see `last_failure`). Attempts for the same identity are serialized through
//! the provisioning ledger's identity locks; a queued attempt publishes nothing
//! until the one ahead of it has reached its terminal status.

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Signature, Signer},
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};

use crate::error::DepositError;
use crate::program::{StakeProgram, StoreArgs};
use crate::provision::{AccountProvisioner, LedgerStep, ProvisionLedger};
use crate::rpc::LedgerRpc;
use crate::units::{DepositForm, DepositRequest};
use crate::wallet::Wallet;

pub const NOT_CONNECTED_MESSAGE: &str = "Please connect your wallet first";
pub const MISSING_INPUT_MESSAGE: &str = "Please fill in all fields";
pub const INVALID_INPUT_MESSAGE: &str = "Please enter a valid amount and lock time";
pub const STEP_FAILED_MESSAGE: &str = "Staking failed. Please try again.";

/// Status of the current deposit attempt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttemptStatus {
    /// No attempt has run yet
    #[default]
    Idle,
    /// Checking the wallet and form input
    Validating,
    /// Provisioning and deposit transactions are in flight
    Submitting,
    /// Deposit confirmed; echoes the form text the user entered
    Succeeded { amount: String, duration: String },
    /// Attempt aborted; message is safe to show to the user
    Failed { message: String },
}

impl AttemptStatus {
    fn failed(message: &str) -> Self {
        AttemptStatus::Failed {
            message: message.to_string(),
        }
    }

    /// True while an attempt is running (the form's "processing" state).
    pub fn is_in_progress(&self) -> bool {
        matches!(self, AttemptStatus::Validating | AttemptStatus::Submitting)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptStatus::Succeeded { .. } | AttemptStatus::Failed { .. }
        )
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::Idle => Ok(()),
            AttemptStatus::Validating => f.write_str("Validating..."),
            AttemptStatus::Submitting => f.write_str("Processing stake..."),
            AttemptStatus::Succeeded { amount, duration } => write!(
                f,
                "Successfully staked {} SOL for {} minutes!",
                amount, duration
            ),
            AttemptStatus::Failed { message } => f.write_str(message),
        }
    }
}

/// Receipt of a confirmed deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReceipt {
    pub identity: Pubkey,
    pub request: DepositRequest,
    pub state: Pubkey,
    pub mint: Pubkey,
    pub holding: Pubkey,
    pub signature: Signature,
}

pub struct DepositOrchestrator {
    provisioner: AccountProvisioner,
    program: StakeProgram,
    status: RwLock<AttemptStatus>,
    /// Every subscriber receives every transition, in order
    subscribers: RwLock<Vec<mpsc::UnboundedSender<AttemptStatus>>>,
    /// Structured cause of the latest failed attempt per identity
    failures: RwLock<HashMap<Pubkey, DepositError>>,
    /// Latest confirmed deposit per identity
    receipts: RwLock<HashMap<Pubkey, DepositReceipt>>,
}

impl DepositOrchestrator {
    /// Creates an orchestrator with its own session-scoped provisioning ledger.
    ///
    /// # Arguments
    ///
    /// * `rpc` - Ledger RPC client every step is submitted through
    /// * `program` - Staking program handle
    pub fn new(rpc: Arc<dyn LedgerRpc>, program: StakeProgram) -> Self {
        Self::with_ledger(rpc, program, ProvisionLedger::new())
    }

    /// Creates an orchestrator sharing an existing provisioning ledger, and with
    /// it the identity locks: attempts for one identity stay serialized across
    /// every orchestrator built on the same ledger.
    pub fn with_ledger(
        rpc: Arc<dyn LedgerRpc>,
        program: StakeProgram,
        ledger: ProvisionLedger,
    ) -> Self {
        Self {
            provisioner: AccountProvisioner::new(rpc, program.clone(), ledger),
            program,
            status: RwLock::new(AttemptStatus::Idle),
            subscribers: RwLock::new(Vec::new()),
            failures: RwLock::new(HashMap::new()),
            receipts: RwLock::new(HashMap::new()),
        }
    }

    /// Most recently published status.
    pub async fn status(&self) -> AttemptStatus {
        self.status.read().await.clone()
    }

    /// Receiver of every status transition from now on. The stream ends when
    /// the orchestrator is dropped.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<AttemptStatus> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.write().await.push(tx);
        rx
    }

    /// Structured cause of the latest failed attempt for an identity.
    pub async fn last_failure(&self, identity: &Pubkey) -> Option<DepositError> {
        self.failures.read().await.get(identity).cloned()
    }

    /// Latest confirmed deposit for an identity.
    pub async fn last_receipt(&self, identity: &Pubkey) -> Option<DepositReceipt> {
        self.receipts.read().await.get(identity).cloned()
    }

    pub fn ledger(&self) -> &ProvisionLedger {
        self.provisioner.ledger()
    }

    /// Runs one deposit attempt and returns its terminal status.
    ///
    /// Never returns an error: validation problems and step failures all become
    /// `AttemptStatus::Failed`. Validation failures make no network calls.
    ///
    /// # Arguments
    ///
    /// * `form` - Amount (SOL) and lock time (minutes) as entered
    /// * `wallet` - Signer identity; must be connected
    ///
    /// # Returns
    ///
    /// * `AttemptStatus::Succeeded` - Deposit confirmed
    /// * `AttemptStatus::Failed` - Attempt aborted; see `last_failure` for the cause
    pub async fn attempt_deposit(&self, form: &DepositForm, wallet: &Wallet) -> AttemptStatus {
        let Some(signer) = wallet.signer() else {
            warn!("Deposit rejected: {}", DepositError::NotConnected);
            self.publish(AttemptStatus::Validating).await;
            return self
                .publish(AttemptStatus::failed(NOT_CONNECTED_MESSAGE))
                .await;
        };
        let identity = signer.pubkey();

        let _guard = self.ledger().lock_identity(&identity).await;
        self.publish(AttemptStatus::Validating).await;

        let request = match validate(form) {
            Ok(request) => request,
            Err(e) => {
                warn!("Rejected deposit input for {}: {}", identity, e);
                let message = match e {
                    DepositError::MissingInput => MISSING_INPUT_MESSAGE,
                    _ => INVALID_INPUT_MESSAGE,
                };
                self.record_failure(identity, e).await;
                return self.publish(AttemptStatus::failed(message)).await;
            }
        };

        self.publish(AttemptStatus::Submitting).await;
        info!(
            "Depositing {} lamports for {}s from {}",
            request.amount_lamports, request.duration_seconds, identity
        );

        match self.deposit(signer.as_ref(), request).await {
            Ok(receipt) => {
                info!(
                    "Deposit confirmed for {}: mint {}, signature {}",
                    identity, receipt.mint, receipt.signature
                );
                self.receipts.write().await.insert(identity, receipt);
                self.failures.write().await.remove(&identity);
                self.publish(AttemptStatus::Succeeded {
                    amount: form.amount.clone(),
                    duration: form.duration.clone(),
                })
                .await
            }
            Err(e) => {
                error!("Staking error for {}: {}", identity, e);
                self.record_failure(identity, e).await;
                self.publish(AttemptStatus::failed(STEP_FAILED_MESSAGE))
                    .await
            }
        }
    }

    async fn deposit(
        &self,
        payer: &(dyn Signer + Send + Sync),
        request: DepositRequest,
    ) -> Result<DepositReceipt, DepositError> {
        let identity = payer.pubkey();
        let accounts = self.provisioner.provision(payer).await?;

        let ix = self
            .program
            .store(
                StoreArgs {
                    amount: request.amount_lamports,
                    duration: request.duration_seconds,
                },
                &accounts.state,
                &identity,
                &accounts.mint,
                &accounts.holding,
            )
            .map_err(|e| DepositError::Signing {
                step: LedgerStep::Store,
                message: e.to_string(),
            })?;
        let signature = self
            .provisioner
            .submit(LedgerStep::Store, &[ix], payer, None)
            .await?;

        // The next deposit needs a fresh mint and holding account.
        self.provisioner.ledger().clear(&identity).await;

        Ok(DepositReceipt {
            identity,
            request,
            state: accounts.state,
            mint: accounts.mint,
            holding: accounts.holding,
            signature,
        })
    }

    async fn record_failure(&self, identity: Pubkey, error: DepositError) {
        self.failures.write().await.insert(identity, error);
    }

    async fn publish(&self, status: AttemptStatus) -> AttemptStatus {
        *self.status.write().await = status.clone();
        // Dropped receivers fall out here.
        self.subscribers
            .write()
            .await
            .retain(|tx| tx.send(status.clone()).is_ok());
        status
    }
}

/// Checks the form and converts it to protocol units.
pub fn validate(form: &DepositForm) -> Result<DepositRequest, DepositError> {
    if form.is_incomplete() {
        return Err(DepositError::MissingInput);
    }
    Ok(DepositRequest::from_form(form)?)
}
