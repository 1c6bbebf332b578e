use ethers_core::{types::U256, utils::parse_ether};
use thiserror::Error;

pub const DEFAULT_TIP_AMOUNT: &str = "0.000001";
const ETHER_DECIMALS: usize = 18;

/// A validated tip in both its user-facing and base-unit forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TipAmount {
    pub ether: String,
    pub wei: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("tip amount is empty")]
    Empty,
    #[error("tip amount `{0}` is not a plain decimal number")]
    NotDecimal(String),
    #[error("tip amount `{0}` has more than 18 decimal places")]
    TooPrecise(String),
    #[error("tip amount `{0}` must be greater than zero")]
    NotPositive(String),
    #[error("tip amount `{0}` is out of range: {1}")]
    OutOfRange(String, String),
}

/// Validates a user-entered amount, falling back to `default_amount` when the
/// input is blank. Only unsigned plain decimals (`1`, `0.5`, `.25`) are accepted.
pub fn validate_tip_amount(raw: &str, default_amount: &str) -> Result<TipAmount, AmountError> {
    let trimmed = raw.trim();
    let candidate = if trimmed.is_empty() {
        default_amount.trim()
    } else {
        trimmed
    };
    if candidate.is_empty() {
        return Err(AmountError::Empty);
    }

    let (whole, fraction) = match candidate.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (candidate, ""),
    };
    let is_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) || (whole.is_empty() && fraction.is_empty()) {
        return Err(AmountError::NotDecimal(candidate.to_string()));
    }
    if fraction.len() > ETHER_DECIMALS {
        return Err(AmountError::TooPrecise(candidate.to_string()));
    }

    let normalized = format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        if fraction.is_empty() { "0" } else { fraction }
    );
    let wei = parse_ether(&normalized)
        .map_err(|err| AmountError::OutOfRange(candidate.to_string(), err.to_string()))?;
    if wei.is_zero() {
        return Err(AmountError::NotPositive(candidate.to_string()));
    }

    Ok(TipAmount {
        ether: candidate.to_string(),
        wei,
    })
}
