//! Core types for cosign
//!
//! Shared wallet configuration, Safe transaction data, the approval lifecycle
//! of a pending transaction, and ether unit conversion.

pub mod safe;
pub mod status;
pub mod units;

pub use alloy::primitives::{Address, Bytes, B256, U256};
pub use safe::{
    OperationType, SafeAccountConfig, SafeDeployment, SafeTransactionData,
    SafeTransactionDataPartial,
};
pub use status::TransactionStatus;
pub use units::{format_ether, parse_ether, UnitsError, ETHER_DECIMALS};
