//! Staking Program Interface
//!
//! Instruction builders for the deployed staking program and the associated
//! token account program. Building instructions is pure; submitting them is the
//! provisioner's job.
//!
//! The staking program is Anchor-based: instruction data is an 8-byte
//! discriminator (`sha256("global:<name>")[..8]`) followed by Borsh-encoded args.

use anyhow::{Context, Result};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_sdk::{
    hash::hashv,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};
use std::str::FromStr;

use crate::config::ProgramConfig;
use crate::pda::{derive_holding_account, derive_state_pda, ASSOCIATED_TOKEN_PROGRAM_ID};

pub const INITIALIZE_IX: &str = "initialize";
pub const CREATE_MINT_IX: &str = "create_mint";
pub const STORE_IX: &str = "store";

/// Arguments of the `store` instruction.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreArgs {
    pub amount: u64,
    pub duration: u64,
}

/// Handle on the deployed staking program: its id, the state seed and the token
/// program its receipt mints live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeProgram {
    program_id: Pubkey,
    state_seed: String,
    token_program_id: Pubkey,
}

impl StakeProgram {
    pub fn new(program_id: Pubkey, state_seed: impl Into<String>, token_program_id: Pubkey) -> Self {
        Self {
            program_id,
            state_seed: state_seed.into(),
            token_program_id,
        }
    }

    /// Creates a program handle from the `[program]` config section.
    ///
    /// # Returns
    ///
    /// * `Ok(StakeProgram)` - Handle with parsed program ids
    /// * `Err(anyhow::Error)` - A configured program id is not a valid pubkey
    pub fn from_config(config: &ProgramConfig) -> Result<Self> {
        let program_id =
            Pubkey::from_str(&config.program_id).context("Invalid staking program_id")?;
        let token_program_id =
            Pubkey::from_str(&config.token_program_id).context("Invalid token_program_id")?;
        Ok(Self::new(program_id, config.state_seed.clone(), token_program_id))
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn state_seed(&self) -> &str {
        &self.state_seed
    }

    pub fn token_program_id(&self) -> Pubkey {
        self.token_program_id
    }

    /// State record address for an identity.
    pub fn state_address(&self, identity: &Pubkey) -> Pubkey {
        derive_state_pda(&self.program_id, &self.state_seed, identity).0
    }

    /// Holding account address for an identity and receipt mint.
    pub fn holding_address(&self, identity: &Pubkey, mint: &Pubkey) -> Pubkey {
        derive_holding_account(identity, mint, &self.token_program_id)
    }

    /// Builds `initialize(state, payer)`.
    pub fn initialize(&self, state: &Pubkey, payer: &Pubkey) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(*state, false),
                AccountMeta::new(*payer, true),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data: instruction_discriminator(INITIALIZE_IX).to_vec(),
        }
    }

    /// Builds `create_mint(payer, state, mint)`. The mint must co-sign.
    pub fn create_mint(&self, payer: &Pubkey, state: &Pubkey, mint: &Pubkey) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(*state, false),
                AccountMeta::new(*mint, true),
                AccountMeta::new_readonly(self.token_program_id, false),
                AccountMeta::new_readonly(system_program::id(), false),
            ],
            data: instruction_discriminator(CREATE_MINT_IX).to_vec(),
        }
    }

    /// Builds `store(amount, duration)` against the provisioned accounts.
    pub fn store(
        &self,
        args: StoreArgs,
        state: &Pubkey,
        payer: &Pubkey,
        mint: &Pubkey,
        holding: &Pubkey,
    ) -> Result<Instruction> {
        let mut data = instruction_discriminator(STORE_IX).to_vec();
        data.extend(args.try_to_vec().context("Failed to serialize store args")?);

        Ok(Instruction {
            program_id: self.program_id,
            accounts: vec![
                AccountMeta::new(*state, false),
                AccountMeta::new(*payer, true),
                AccountMeta::new_readonly(system_program::id(), false),
                AccountMeta::new_readonly(self.token_program_id, false),
                AccountMeta::new(*mint, false),
                AccountMeta::new(*holding, false),
            ],
            data,
        })
    }

    /// Builds a CreateAssociatedTokenAccount instruction for `owner`'s holding
    /// account of `mint`, funded by `payer`.
    pub fn create_holding_account(&self, payer: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
        let holding = self.holding_address(owner, mint);

        Instruction {
            program_id: ASSOCIATED_TOKEN_PROGRAM_ID,
            accounts: vec![
                AccountMeta::new(*payer, true),
                AccountMeta::new(holding, false),
                AccountMeta::new_readonly(*owner, false),
                AccountMeta::new_readonly(*mint, false),
                AccountMeta::new_readonly(system_program::id(), false),
                AccountMeta::new_readonly(self.token_program_id, false),
            ],
            data: vec![],
        }
    }
}

/// Anchor instruction discriminator: first 8 bytes of `sha256("global:<name>")`.
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    let preimage = format!("global:{}", name);
    let hash = hashv(&[preimage.as_bytes()]);
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash.as_ref()[..8]);
    out
}
