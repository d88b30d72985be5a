//! Shared test helpers for stake client tests
//!
//! This module provides constants, config builders and an in-memory ledger that
//! stands in for the Solana RPC endpoint.

#![allow(dead_code)]

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use stake_client::pda::{ASSOCIATED_TOKEN_PROGRAM_ID, TOKEN_2022_PROGRAM_ID};
use stake_client::program::{
    instruction_discriminator, CREATE_MINT_IX, INITIALIZE_IX, STORE_IX,
};
use stake_client::{DepositOrchestrator, LedgerRpc, RpcError, StakeProgram, Wallet};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Program id the client talks to on devnet
pub const DUMMY_PROGRAM_ID: &str = "6aVUKLFu9QKUEpApA8i1vqP8A3DdJqmebQ7QeYsCs6Lz";

/// Seed of the per-identity state record
pub const DUMMY_STATE_SEED: &str = "client1";

/// Local validator RPC endpoint
pub const DUMMY_RPC_URL: &str = "http://127.0.0.1:8899";

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

pub fn create_test_program() -> StakeProgram {
    StakeProgram::new(
        Pubkey::from_str(DUMMY_PROGRAM_ID).unwrap(),
        DUMMY_STATE_SEED,
        TOKEN_2022_PROGRAM_ID,
    )
}

/// Create an orchestrator wired to the given mock ledger.
pub fn create_test_orchestrator(ledger: &Arc<MockLedger>) -> DepositOrchestrator {
    let rpc: Arc<dyn LedgerRpc> = ledger.clone();
    DepositOrchestrator::new(rpc, create_test_program())
}

/// Create a connected wallet with a fresh keypair.
pub fn create_connected_wallet() -> Wallet {
    Wallet::from_keypair(Keypair::new())
}

// ============================================================================
// MOCK LEDGER
// ============================================================================

/// Which ledger operation a submitted transaction performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerCall {
    Initialize,
    CreateMint,
    CreateHoldingAccount,
    Store,
}

/// A transaction the mock ledger received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: LedgerCall,
    /// Accounts of the first instruction, in order
    pub accounts: Vec<Pubkey>,
    /// Keys that signed the transaction
    pub signers: Vec<Pubkey>,
    pub data: Vec<u8>,
    /// Whether the ledger confirmed it
    pub confirmed: bool,
}

#[derive(Default)]
struct MockState {
    calls: Vec<RecordedCall>,
    blockhash_requests: usize,
    fail_blockhash: usize,
    failures: HashMap<LedgerCall, usize>,
    initialized: HashSet<Pubkey>,
    mints: HashSet<Pubkey>,
    holdings: HashSet<Pubkey>,
}

/// In-memory ledger that decodes each transaction, enforces the program's
/// account preconditions, and records every call in submission order.
pub struct MockLedger {
    program_id: Pubkey,
    state: Mutex<MockState>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            program_id: Pubkey::from_str(DUMMY_PROGRAM_ID).unwrap(),
            state: Mutex::new(MockState::default()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Reject the next submission of `call`.
    pub fn fail_next(&self, call: LedgerCall) {
        let mut state = self.state.lock().unwrap();
        *state.failures.entry(call).or_default() += 1;
    }

    /// Fail the next blockhash request.
    pub fn fail_next_blockhash(&self) {
        self.state.lock().unwrap().fail_blockhash += 1;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Kinds of every submitted transaction, in order.
    pub fn call_sequence(&self) -> Vec<LedgerCall> {
        self.calls().iter().map(|c| c.call).collect()
    }

    /// Total number of RPC requests of any kind.
    pub fn request_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.calls.len() + state.blockhash_requests
    }

    /// Highest number of submissions that were in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self, state_pda: &Pubkey) -> bool {
        self.state.lock().unwrap().initialized.contains(state_pda)
    }

    fn classify(&self, transaction: &Transaction) -> Option<(LedgerCall, Vec<Pubkey>, Vec<u8>)> {
        let message = &transaction.message;
        let ix = message.instructions.first()?;
        let program = message.account_keys[ix.program_id_index as usize];
        let accounts = ix
            .accounts
            .iter()
            .map(|index| message.account_keys[*index as usize])
            .collect();

        let call = if program == ASSOCIATED_TOKEN_PROGRAM_ID {
            LedgerCall::CreateHoldingAccount
        } else if program == self.program_id && ix.data.len() >= 8 {
            let discriminator = &ix.data[..8];
            if discriminator == instruction_discriminator(INITIALIZE_IX) {
                LedgerCall::Initialize
            } else if discriminator == instruction_discriminator(CREATE_MINT_IX) {
                LedgerCall::CreateMint
            } else if discriminator == instruction_discriminator(STORE_IX) {
                LedgerCall::Store
            } else {
                return None;
            }
        } else {
            return None;
        };
        Some((call, accounts, ix.data.clone()))
    }

    /// Applies a transaction to the simulated chain state.
    fn execute(state: &mut MockState, call: LedgerCall, accounts: &[Pubkey]) -> Result<(), RpcError> {
        match call {
            LedgerCall::Initialize => {
                if !state.initialized.insert(accounts[0]) {
                    return Err(RpcError::Rejected(
                        "Allocate: account already in use".to_string(),
                    ));
                }
            }
            LedgerCall::CreateMint => {
                if !state.initialized.contains(&accounts[1]) {
                    return Err(RpcError::Rejected("state account not initialized".to_string()));
                }
                state.mints.insert(accounts[2]);
            }
            LedgerCall::CreateHoldingAccount => {
                if !state.mints.contains(&accounts[3]) {
                    return Err(RpcError::Rejected("mint does not exist".to_string()));
                }
                if !state.holdings.insert(accounts[1]) {
                    return Err(RpcError::Rejected("holding account already exists".to_string()));
                }
            }
            LedgerCall::Store => {
                if !state.holdings.contains(&accounts[5]) {
                    return Err(RpcError::Rejected("holding account does not exist".to_string()));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        let mut state = self.state.lock().unwrap();
        state.blockhash_requests += 1;
        if state.fail_blockhash > 0 {
            state.fail_blockhash -= 1;
            return Err(RpcError::Blockhash("connection refused".to_string()));
        }
        Ok(Hash::new_unique())
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature, RpcError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Suspend like a real confirmation wait so overlapping callers would interleave.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let result = match self.classify(transaction) {
            None => Err(RpcError::Rejected("unknown instruction".to_string())),
            Some(decoded) => self.record(transaction, decoded),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl MockLedger {
    fn record(
        &self,
        transaction: &Transaction,
        (call, accounts, data): (LedgerCall, Vec<Pubkey>, Vec<u8>),
    ) -> Result<Signature, RpcError> {
        let mut state = self.state.lock().unwrap();
        let num_signers = transaction.message.header.num_required_signatures as usize;
        let signers = transaction.message.account_keys[..num_signers].to_vec();

        let outcome = if transaction.verify().is_err() {
            Err(RpcError::Rejected("signature verification failed".to_string()))
        } else if state.failures.get(&call).copied().unwrap_or(0) > 0 {
            *state.failures.entry(call).or_default() -= 1;
            Err(RpcError::Unconfirmed(format!("injected failure at {:?}", call)))
        } else {
            Self::execute(&mut state, call, &accounts)
        };

        state.calls.push(RecordedCall {
            call,
            accounts,
            signers,
            data,
            confirmed: outcome.is_ok(),
        });
        outcome.map(|_| transaction.signatures[0])
    }
}
