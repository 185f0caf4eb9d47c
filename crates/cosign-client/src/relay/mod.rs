//! Transaction relay port.
//!
//! The relay is an off-chain store of proposed Safe transactions and the
//! owner confirmations collected for them. Owners that never share a process
//! find each other's proposals here.

mod http;
pub mod serde_helpers;

pub use http::HttpRelay;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use cosign_errors::Result;
use cosign_types::{OperationType, SafeTransactionData, TransactionStatus};
use serde::{Deserialize, Serialize};

use serde_helpers::{checksummed, null_as_default, u256_decimal, u64_lenient};

/// Port to the off-chain transaction relay
#[async_trait]
pub trait RelayService: Send + Sync {
    /// Register a signed proposal
    async fn propose_transaction(&self, request: &ProposeTransactionRequest) -> Result<()>;

    /// Not yet executed transactions of `safe`, in the order the relay returns them
    async fn get_pending_transactions(&self, safe: Address) -> Result<Vec<RelayedTransaction>>;

    /// One transaction by its Safe transaction hash
    async fn get_transaction(&self, safe_tx_hash: B256) -> Result<RelayedTransaction>;

    /// Add an owner signature to a proposed transaction
    async fn confirm_transaction(&self, safe_tx_hash: B256, signature: &Bytes) -> Result<()>;

    /// Nonce, threshold and owners as the relay has indexed them
    async fn get_safe_info(&self, safe: Address) -> Result<SafeInfo>;

    /// Nonce the next proposal for `safe` must use
    async fn next_nonce(&self, safe: Address) -> Result<u64> {
        let info = self.get_safe_info(safe).await?;
        let pending = self.get_pending_transactions(safe).await?;
        Ok(next_nonce_after(info.nonce, &pending))
    }
}

/// First nonce above both the on-chain nonce and every queued proposal
pub fn next_nonce_after(safe_nonce: u64, pending: &[RelayedTransaction]) -> u64 {
    pending
        .iter()
        .map(|tx| tx.nonce.saturating_add(1))
        .fold(safe_nonce, u64::max)
}

/// A signed proposal as submitted by its first owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposeTransactionRequest {
    pub safe_address: Address,
    pub safe_transaction_data: SafeTransactionData,
    pub safe_tx_hash: B256,
    pub sender_address: Address,
    pub sender_signature: Bytes,
    pub origin: Option<String>,
}

/// An owner signature the relay holds for a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub owner: Address,
    #[serde(default)]
    pub signature: Option<Bytes>,
    #[serde(default)]
    pub signature_type: Option<String>,
    #[serde(default)]
    pub submission_date: Option<String>,
}

/// A Safe transaction as stored by the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayedTransaction {
    pub safe: Address,
    pub to: Address,
    #[serde(with = "u256_decimal")]
    pub value: U256,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Bytes,
    #[serde(default)]
    pub operation: OperationType,
    #[serde(default, with = "u256_decimal")]
    pub safe_tx_gas: U256,
    #[serde(default, with = "u256_decimal")]
    pub base_gas: U256,
    #[serde(default, with = "u256_decimal")]
    pub gas_price: U256,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gas_token: Address,
    #[serde(default, deserialize_with = "null_as_default")]
    pub refund_receiver: Address,
    #[serde(with = "u64_lenient")]
    pub nonce: u64,
    pub safe_tx_hash: B256,
    #[serde(default)]
    pub proposer: Option<Address>,
    #[serde(default, with = "u64_lenient")]
    pub confirmations_required: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub confirmations: Vec<Confirmation>,
    #[serde(default)]
    pub is_executed: bool,
    #[serde(default)]
    pub is_successful: Option<bool>,
    #[serde(default)]
    pub transaction_hash: Option<B256>,
    #[serde(default)]
    pub submission_date: Option<String>,
}

impl RelayedTransaction {
    /// The signed fields, as they go into the Safe transaction hash
    pub fn transaction_data(&self) -> SafeTransactionData {
        SafeTransactionData {
            to: self.to,
            value: self.value,
            data: self.data.clone(),
            operation: self.operation,
            safe_tx_gas: self.safe_tx_gas,
            base_gas: self.base_gas,
            gas_price: self.gas_price,
            gas_token: self.gas_token,
            refund_receiver: self.refund_receiver,
            nonce: self.nonce,
        }
    }

    pub fn status(&self) -> TransactionStatus {
        TransactionStatus::from_confirmations(
            self.confirmations.len(),
            self.confirmations_required,
            self.is_executed,
        )
    }

    pub fn is_confirmed_by(&self, owner: Address) -> bool {
        self.confirmations.iter().any(|c| c.owner == owner)
    }
}

/// Safe state as indexed by the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeInfo {
    pub address: Address,
    #[serde(with = "u64_lenient")]
    pub nonce: u64,
    #[serde(with = "u64_lenient")]
    pub threshold: u64,
    pub owners: Vec<Address>,
    #[serde(default)]
    pub master_copy: Option<Address>,
    #[serde(default)]
    pub fallback_handler: Option<Address>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Page envelope of list endpoints
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<T>,
}

/// Wire body of a proposal
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProposeBody {
    #[serde(with = "checksummed")]
    pub to: Address,
    #[serde(with = "u256_decimal")]
    pub value: U256,
    pub data: Option<Bytes>,
    pub operation: OperationType,
    #[serde(with = "u256_decimal")]
    pub safe_tx_gas: U256,
    #[serde(with = "u256_decimal")]
    pub base_gas: U256,
    #[serde(with = "u256_decimal")]
    pub gas_price: U256,
    #[serde(with = "checksummed")]
    pub gas_token: Address,
    #[serde(with = "checksummed")]
    pub refund_receiver: Address,
    pub nonce: u64,
    pub contract_transaction_hash: B256,
    #[serde(with = "checksummed")]
    pub sender: Address,
    pub signature: Bytes,
    pub origin: Option<String>,
}

impl From<&ProposeTransactionRequest> for ProposeBody {
    fn from(request: &ProposeTransactionRequest) -> Self {
        let tx = &request.safe_transaction_data;
        Self {
            to: tx.to,
            value: tx.value,
            data: (!tx.data.is_empty()).then(|| tx.data.clone()),
            operation: tx.operation,
            safe_tx_gas: tx.safe_tx_gas,
            base_gas: tx.base_gas,
            gas_price: tx.gas_price,
            gas_token: tx.gas_token,
            refund_receiver: tx.refund_receiver,
            nonce: tx.nonce,
            contract_transaction_hash: request.safe_tx_hash,
            sender: request.sender_address,
            signature: request.sender_signature.clone(),
            origin: request.origin.clone(),
        }
    }
}
