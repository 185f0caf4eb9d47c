//! Safe wallet configuration and transaction data

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid operation type:: {0}")]
pub struct InvalidOperation(pub u8);

/// Kind of call the Safe performs when executing a transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OperationType {
    #[default]
    Call = 0,
    DelegateCall = 1,
}

impl TryFrom<u8> for OperationType {
    type Error = InvalidOperation;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OperationType::Call),
            1 => Ok(OperationType::DelegateCall),
            other => Err(InvalidOperation(other)),
        }
    }
}

impl From<OperationType> for u8 {
    fn from(op: OperationType) -> Self {
        op as u8
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationType::Call => f.write_str("call"),
            OperationType::DelegateCall => f.write_str("delegatecall"),
        }
    }
}

/// Owner set and approval threshold of a shared wallet.
///
/// `threshold <= owners.len()` is not checked here. The wallet service
/// rejects an unsatisfiable configuration when the wallet is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeAccountConfig {
    pub owners: Vec<Address>,
    pub threshold: u64,
}

impl SafeAccountConfig {
    pub fn new(owners: Vec<Address>, threshold: u64) -> Self {
        Self { owners, threshold }
    }
}

/// Parameters for deploying a new shared wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeDeployment {
    pub account: SafeAccountConfig,
    /// Salt for the proxy factory; distinct salts give distinct addresses
    pub salt_nonce: U256,
}

/// Caller-supplied fields of a Safe transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeTransactionDataPartial {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: Option<OperationType>,
    pub nonce: Option<u64>,
}

impl SafeTransactionDataPartial {
    /// Plain value transfer with an empty payload
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            value,
            data: Bytes::new(),
            operation: None,
            nonce: None,
        }
    }

    pub fn with_nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }
}

/// Fully populated Safe transaction, the object owners sign the hash of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTransactionData {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: OperationType,
    pub safe_tx_gas: U256,
    pub base_gas: U256,
    pub gas_price: U256,
    pub gas_token: Address,
    pub refund_receiver: Address,
    pub nonce: u64,
}

impl SafeTransactionData {
    /// Fill a partial transaction with Safe defaults.
    ///
    /// Gas fields are zero and gas token / refund receiver are the zero
    /// address, so the executor pays gas and nobody is refunded. An explicit
    /// nonce on the partial wins over `default_nonce`.
    pub fn from_partial(partial: SafeTransactionDataPartial, default_nonce: u64) -> Self {
        Self {
            to: partial.to,
            value: partial.value,
            data: partial.data,
            operation: partial.operation.unwrap_or_default(),
            safe_tx_gas: U256::ZERO,
            base_gas: U256::ZERO,
            gas_price: U256::ZERO,
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            nonce: partial.nonce.unwrap_or(default_nonce),
        }
    }
}
