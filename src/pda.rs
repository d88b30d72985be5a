//! Address Derivation Module
//!
//! Pure, deterministic address derivation for the staking program: the
//! per-identity state record PDA and the associated token account that holds
//! the receipt tokens. No I/O and no randomness.

use solana_sdk::pubkey::Pubkey;

// Well-known program IDs from Solana mainnet/devnet docs.
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
pub const TOKEN_2022_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb");

/// Seed the deployed program uses for the per-identity state record.
pub const DEFAULT_STATE_SEED: &str = "client1";

/// Derives the state record PDA for an identity.
///
/// Seeds are `[seed, identity]` under the staking program id, so every identity
/// gets exactly one state address per seed.
///
/// # Arguments
///
/// * `program_id` - Staking program id
/// * `seed` - Fixed textual seed (e.g. `client1`)
/// * `identity` - The user's public key
///
/// # Returns
///
/// * `(Pubkey, u8)` - State PDA and its bump
pub fn derive_state_pda(program_id: &Pubkey, seed: &str, identity: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[seed.as_bytes(), identity.as_ref()], program_id)
}

/// Derives the associated token account for an owner and mint under a token program.
///
/// # Arguments
///
/// * `owner` - Token account owner
/// * `mint` - Receipt token mint
/// * `token_program_id` - Token program owning the mint (Token-2022 by default)
///
/// # Returns
///
/// * `Pubkey` - Derived holding account address
pub fn derive_holding_account(owner: &Pubkey, mint: &Pubkey, token_program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), token_program_id.as_ref(), mint.as_ref()],
        &ASSOCIATED_TOKEN_PROGRAM_ID,
    )
    .0
}
