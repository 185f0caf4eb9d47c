//! Wallet service port.
//!
//! [`WalletService`] deploys or binds Safe accounts and moves plain value on
//! the ledger. A [`SafeHandle`] is one Safe seen through one owner's signing
//! identity: it builds, hashes, signs, approves and executes transactions.

mod evm;

pub use evm::{http_wallet_service, EvmWalletService};

use crate::relay::RelayedTransaction;
use alloy::primitives::{address, Address, B256, U256};
use async_trait::async_trait;
use cosign_crypto::OwnerSignature;
use cosign_errors::Result;
use cosign_keyring::OwnerKey;
use cosign_types::{SafeDeployment, SafeTransactionData, SafeTransactionDataPartial};
use serde::{Deserialize, Serialize};

/// Addresses of the Safe contracts used for deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeContracts {
    pub proxy_factory: Address,
    pub singleton: Address,
    pub fallback_handler: Address,
}

impl Default for SafeContracts {
    /// Canonical Safe v1.3.0 deployment (L2 singleton)
    fn default() -> Self {
        Self {
            proxy_factory: address!("a6B71E26C5e0845f74c812102Ca7114b6a896AB2"),
            singleton: address!("3E5c63644E683549055b9Be8653de26E0B4CD36E"),
            fallback_handler: address!("f48f2B2d2a534e402487b3ee7C18c33Aec0Fe5e4"),
        }
    }
}

/// Ledger acknowledgement of a transaction sent by an owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub transaction_hash: B256,
    /// Set once the transaction is known to be mined
    pub block_number: Option<u64>,
}

/// Receipt of a mined `execTransaction`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
}

/// Factory and ledger side of the wallet service
#[async_trait]
pub trait WalletService: Send + Sync {
    /// Deploy a new Safe and bind it to `owner`.
    ///
    /// An unsatisfiable account (threshold above the owner count, duplicate
    /// owners) fails with `Error::InvalidConfiguration`.
    async fn deploy(&self, deployment: &SafeDeployment, owner: &OwnerKey)
        -> Result<Box<dyn SafeHandle>>;

    /// Bind an existing Safe to `owner`
    async fn connect(&self, safe: Address, owner: &OwnerKey) -> Result<Box<dyn SafeHandle>>;

    /// Plain value transfer; returns once the ledger accepted it
    async fn transfer(&self, from: &OwnerKey, to: Address, value: U256) -> Result<TransferReceipt>;
}

/// One Safe bound to one owner's signing identity
#[async_trait]
pub trait SafeHandle: Send + Sync {
    fn address(&self) -> Address;

    /// Owner this handle signs and sends as
    fn signer_address(&self) -> Address;

    /// Fill Safe defaults; a missing nonce is taken from the contract
    async fn create_transaction(
        &self,
        partial: SafeTransactionDataPartial,
    ) -> Result<SafeTransactionData>;

    fn transaction_hash(&self, transaction: &SafeTransactionData) -> B256;

    fn sign_transaction_hash(&self, safe_tx_hash: B256) -> Result<OwnerSignature>;

    /// Approve the hash on chain with `approveHash`
    async fn approve_transaction_hash(&self, safe_tx_hash: B256) -> Result<TransferReceipt>;

    /// Collect signatures and send `execTransaction`, waiting for the receipt
    async fn execute_transaction(&self, transaction: &RelayedTransaction)
        -> Result<ExecutionReceipt>;

    async fn balance(&self) -> Result<U256>;

    async fn threshold(&self) -> Result<u64>;

    async fn owners(&self) -> Result<Vec<Address>>;

    async fn nonce(&self) -> Result<u64>;
}
