//! Conversion between decimal ether amounts and wei

use alloy::primitives::{utils, U256};
use thiserror::Error;

/// Number of decimals in one ether
pub const ETHER_DECIMALS: usize = 18;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,

    #[error("negative amount not allowed:: {0}")]
    Negative(String),

    #[error("amount {0} has more than 18 decimals")]
    TooPrecise(String),

    #[error("invalid amount {amount}:: {reason}")]
    Invalid { amount: String, reason: String },
}

/// Parse a decimal ether amount ("0.01") into wei
pub fn parse_ether(amount: &str) -> Result<U256, UnitsError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(UnitsError::Empty);
    }
    if amount.starts_with('-') {
        return Err(UnitsError::Negative(amount.to_string()));
    }
    if let Some((_, fraction)) = amount.split_once('.') {
        if fraction.len() > ETHER_DECIMALS {
            return Err(UnitsError::TooPrecise(amount.to_string()));
        }
    }

    utils::parse_ether(amount).map_err(|e| UnitsError::Invalid {
        amount: amount.to_string(),
        reason: e.to_string(),
    })
}

/// Format wei as a decimal ether amount
pub fn format_ether(wei: U256) -> String {
    utils::format_ether(wei)
}
