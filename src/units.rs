//! Form input to protocol units.
//!
//! Amounts are entered in SOL and sent in lamports (10^9 per SOL), truncated
//! toward zero. Lock time is entered in minutes and sent in seconds.

use crate::error::InputError;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
pub const SECONDS_PER_MINUTE: u64 = 60;

/// Decimal places of a lamport amount.
const LAMPORT_DECIMALS: usize = 9;

/// Raw text of the two form fields, exactly as the user entered it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositForm {
    /// Amount in SOL
    pub amount: String,
    /// Lock time in minutes
    pub duration: String,
}

impl DepositForm {
    pub fn new(amount: impl Into<String>, duration: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            duration: duration.into(),
        }
    }

    /// True when either field is blank.
    pub fn is_incomplete(&self) -> bool {
        self.amount.trim().is_empty() || self.duration.trim().is_empty()
    }
}

/// Deposit parameters in protocol units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositRequest {
    pub amount_lamports: u64,
    pub duration_seconds: u64,
}

impl DepositRequest {
    pub fn from_form(form: &DepositForm) -> Result<Self, InputError> {
        Ok(Self {
            amount_lamports: sol_text_to_lamports(&form.amount)?,
            duration_seconds: minutes_text_to_seconds(&form.duration)?,
        })
    }
}

/// Converts SOL text to lamports, discarding fractional lamports.
///
/// The conversion is done on the decimal digits, so "0.3" is exactly
/// 300_000_000 and "0.00000000199" is 1. This deliberately differs from a
/// float multiply-and-truncate, which turns "1.005" into 1_004_999_999.
pub fn sol_text_to_lamports(text: &str) -> Result<u64, InputError> {
    let invalid = || InputError::InvalidAmount(text.to_string());
    let (whole, fraction) = split_decimal(text.trim()).ok_or_else(invalid)?;

    let overflow = || InputError::AmountOverflow(text.to_string());

    let whole_lamports = parse_digits(whole)
        .and_then(|sol| sol.checked_mul(LAMPORTS_PER_SOL))
        .ok_or_else(overflow)?;

    let kept = &fraction[..fraction.len().min(LAMPORT_DECIMALS)];
    let fraction_lamports = parse_digits(kept).ok_or_else(invalid)?
        * 10u64.pow((LAMPORT_DECIMALS - kept.len()) as u32);

    whole_lamports.checked_add(fraction_lamports).ok_or_else(overflow)
}

/// Converts minutes text to seconds. Fractional minutes are dropped, so "90.7" is 90 minutes.
pub fn minutes_text_to_seconds(text: &str) -> Result<u64, InputError> {
    let invalid = || InputError::InvalidDuration(text.to_string());
    let (whole, _) = split_decimal(text.trim()).ok_or_else(invalid)?;

    parse_digits(whole)
        .and_then(|minutes| minutes.checked_mul(SECONDS_PER_MINUTE))
        .ok_or_else(|| InputError::DurationOverflow(text.to_string()))
}

/// Splits an unsigned decimal into whole and fraction digit strings.
/// Returns None for signs, exponents, stray characters, or no digits at all.
fn split_decimal(text: &str) -> Option<(&str, &str)> {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return None;
    }
    Some((whole, fraction))
}

/// Parses ASCII digits into u64. Empty counts as zero; None means overflow.
fn parse_digits(digits: &str) -> Option<u64> {
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse::<u64>().ok()
}
