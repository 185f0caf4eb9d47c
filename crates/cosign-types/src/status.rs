//! Approval lifecycle of a pending transaction

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a pending transaction stands in its approval lifecycle.
///
/// The state lives in the relay and on chain; this is only a view derived
/// from what they report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Registered with the relay, no signatures yet
    Proposed,
    /// Some, but fewer than `threshold`, owner signatures
    PartiallyApproved,
    /// At least `threshold` signatures, eligible for execution
    Approved,
    /// Executed on chain, terminal
    Executed,
}

impl TransactionStatus {
    pub fn from_confirmations(confirmations: usize, required: u64, is_executed: bool) -> Self {
        if is_executed {
            return TransactionStatus::Executed;
        }
        let confirmations = confirmations as u64;
        if confirmations >= required && required > 0 {
            TransactionStatus::Approved
        } else if confirmations > 0 {
            TransactionStatus::PartiallyApproved
        } else {
            TransactionStatus::Proposed
        }
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, TransactionStatus::Approved)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionStatus::Proposed => "proposed",
            TransactionStatus::PartiallyApproved => "partially-approved",
            TransactionStatus::Approved => "approved",
            TransactionStatus::Executed => "executed",
        };
        f.write_str(s)
    }
}
