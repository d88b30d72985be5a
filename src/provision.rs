//! Account Provisioning
//!
//! Brings the accounts a deposit needs into existence, one confirmed
//! transaction per step:
//! 1. **InitializeState**: the per-identity state record PDA
//! 2. **CreateMint**: a fresh receipt-token mint, co-signed by the new mint keypair
//! 3. **CreateHoldingAccount**: the identity's associated token account for that mint
//!
//! Each step is awaited before the next one starts. A failure stops the
//! sequence; nothing already confirmed is rolled back. Confirmed steps are
//! recorded per identity in the `ProvisionLedger` so the next attempt for the
//! same identity resumes after the last confirmed step. The ledger also owns the
//! per-identity locks, so everything sharing a ledger is serialized per identity.

use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::error::DepositError;
use crate::program::StakeProgram;
use crate::rpc::LedgerRpc;

/// One ledger round-trip of a deposit attempt, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerStep {
    InitializeState,
    CreateMint,
    CreateHoldingAccount,
    Store,
}

impl fmt::Display for LedgerStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LedgerStep::InitializeState => "initialize",
            LedgerStep::CreateMint => "create_mint",
            LedgerStep::CreateHoldingAccount => "create_holding_account",
            LedgerStep::Store => "store",
        };
        f.write_str(name)
    }
}

/// Accounts a deposit is submitted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionedAccounts {
    pub state: Pubkey,
    pub mint: Pubkey,
    pub holding: Pubkey,
}

/// Which provisioning steps have been confirmed for an identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionProgress {
    /// State record address, set once `initialize` is confirmed
    pub state: Option<Pubkey>,
    /// Receipt mint, set once `create_mint` is confirmed
    pub mint: Option<Pubkey>,
    /// Holding account, set once its creation is confirmed
    pub holding: Option<Pubkey>,
}

impl ProvisionProgress {
    /// The first step that has not been confirmed yet, or None when fully provisioned.
    pub fn next_step(&self) -> Option<LedgerStep> {
        if self.state.is_none() {
            Some(LedgerStep::InitializeState)
        } else if self.mint.is_none() {
            Some(LedgerStep::CreateMint)
        } else if self.holding.is_none() {
            Some(LedgerStep::CreateHoldingAccount)
        } else {
            None
        }
    }

    pub fn is_partial(&self) -> bool {
        self.state.is_some() && self.next_step().is_some()
    }
}

type IdentityLocks = Arc<Mutex<HashMap<Pubkey, Arc<AsyncMutex<()>>>>>;

/// Session-scoped record of confirmed provisioning steps, keyed by identity.
///
/// Clones share both the progress entries and the identity locks.
#[derive(Debug, Default, Clone)]
pub struct ProvisionLedger {
    entries: Arc<RwLock<HashMap<Pubkey, ProvisionProgress>>>,
    locks: IdentityLocks,
}

/// Exclusive hold on one identity. Releasing the last hold drops the lock entry.
pub struct IdentityGuard {
    identity: Pubkey,
    locks: IdentityLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdentityGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own reference left: nobody holds or waits on it.
        if locks
            .get(&self.identity)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.identity);
        }
    }
}

impl ProvisionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn progress(&self, identity: &Pubkey) -> ProvisionProgress {
        let entries = self.entries.read().await;
        entries.get(identity).cloned().unwrap_or_default()
    }

    async fn update(&self, identity: &Pubkey, apply: impl FnOnce(&mut ProvisionProgress)) {
        let mut entries = self.entries.write().await;
        apply(entries.entry(*identity).or_default());
    }

    /// Forgets an identity's progress. Called once a deposit has consumed the provisioned accounts.
    pub async fn clear(&self, identity: &Pubkey) {
        let mut entries = self.entries.write().await;
        entries.remove(identity);
    }

    /// Waits until no other holder of this ledger is working on `identity`.
    pub async fn lock_identity(&self, identity: &Pubkey) -> IdentityGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(*identity).or_default().clone()
        };
        let guard = lock.lock_owned().await;
        IdentityGuard {
            identity: *identity,
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Number of identities currently holding or waiting on a lock.
    pub fn locked_identities(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

pub struct AccountProvisioner {
    rpc: Arc<dyn LedgerRpc>,
    program: StakeProgram,
    ledger: ProvisionLedger,
}

impl AccountProvisioner {
    pub fn new(rpc: Arc<dyn LedgerRpc>, program: StakeProgram, ledger: ProvisionLedger) -> Self {
        Self {
            rpc,
            program,
            ledger,
        }
    }

    pub fn ledger(&self) -> &ProvisionLedger {
        &self.ledger
    }

    /// Runs the remaining provisioning steps for the payer's identity.
    ///
    /// # Arguments
    ///
    /// * `payer` - Connected signer; its public key is the identity and fee payer
    ///
    /// # Returns
    ///
    /// * `Ok(ProvisionedAccounts)` - All three accounts exist on-chain
    /// * `Err(DepositError)` - A step failed; later steps were not submitted
    pub async fn provision(
        &self,
        payer: &(dyn Signer + Send + Sync),
    ) -> Result<ProvisionedAccounts, DepositError> {
        let identity = payer.pubkey();
        let progress = self.ledger.progress(&identity).await;
        if progress.is_partial() {
            info!(
                "Resuming provisioning for {} at step {:?}",
                identity,
                progress.next_step()
            );
        }

        let state = match progress.state {
            Some(state) => state,
            None => {
                let state = self.program.state_address(&identity);
                let ix = self.program.initialize(&state, &identity);
                self.submit(LedgerStep::InitializeState, &[ix], payer, None)
                    .await?;
                self.ledger
                    .update(&identity, |p| p.state = Some(state))
                    .await;
                state
            }
        };

        let mint = match progress.mint {
            Some(mint) => mint,
            None => {
                let mint_keypair = Keypair::new();
                let mint = mint_keypair.pubkey();
                let ix = self.program.create_mint(&identity, &state, &mint);
                self.submit(LedgerStep::CreateMint, &[ix], payer, Some(&mint_keypair))
                    .await?;
                self.ledger.update(&identity, |p| p.mint = Some(mint)).await;
                mint
            }
        };

        let holding = match progress.holding {
            Some(holding) => holding,
            None => {
                let holding = self.program.holding_address(&identity, &mint);
                let ix = self
                    .program
                    .create_holding_account(&identity, &identity, &mint);
                self.submit(LedgerStep::CreateHoldingAccount, &[ix], payer, None)
                    .await?;
                self.ledger
                    .update(&identity, |p| p.holding = Some(holding))
                    .await;
                holding
            }
        };

        Ok(ProvisionedAccounts {
            state,
            mint,
            holding,
        })
    }

    /// Signs `instructions` with the payer (and co-signer, if any) against a
    /// fresh blockhash, then submits and waits for confirmation.
    pub async fn submit(
        &self,
        step: LedgerStep,
        instructions: &[Instruction],
        payer: &(dyn Signer + Send + Sync),
        co_signer: Option<&Keypair>,
    ) -> Result<Signature, DepositError> {
        let blockhash = self
            .rpc
            .latest_blockhash()
            .await
            .map_err(|source| DepositError::Step { step, source })?;
        let transaction = sign_transaction(step, instructions, payer, co_signer, blockhash)?;

        debug!("Submitting {} transaction for {}", step, payer.pubkey());
        match self.rpc.send_and_confirm(&transaction).await {
            Ok(signature) => {
                info!("{} confirmed: {}", step, signature);
                Ok(signature)
            }
            Err(source) => {
                warn!("{} failed for {}: {}", step, payer.pubkey(), source);
                Err(DepositError::Step { step, source })
            }
        }
    }
}

fn sign_transaction(
    step: LedgerStep,
    instructions: &[Instruction],
    payer: &(dyn Signer + Send + Sync),
    co_signer: Option<&Keypair>,
    blockhash: solana_sdk::hash::Hash,
) -> Result<Transaction, DepositError> {
    let payer: &dyn Signer = payer;
    let mut signers: Vec<&dyn Signer> = vec![payer];
    if let Some(co_signer) = co_signer {
        if co_signer.pubkey() != payer.pubkey() {
            signers.push(co_signer);
        }
    }

    let mut transaction = Transaction::new_with_payer(instructions, Some(&payer.pubkey()));
    transaction
        .try_sign(&signers, blockhash)
        .map_err(|e| DepositError::Signing {
            step,
            message: e.to_string(),
        })?;
    Ok(transaction)
}
