//! Call-recording fakes of the wallet service and the relay

#![allow(dead_code)]

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use cosign_client::relay::{Confirmation, ProposeTransactionRequest, SafeInfo};
use cosign_client::{
    ExecutionReceipt, RelayService, RelayedTransaction, SafeHandle, TransferReceipt, WalletService,
};
use cosign_crypto::{safe_tx_hash, sign_safe_tx_hash, OwnerSignature};
use cosign_errors::{Error, Result};
use cosign_keyring::OwnerKey;
use cosign_types::{SafeDeployment, SafeTransactionData, SafeTransactionDataPartial};
use std::sync::{Arc, Mutex};

pub const CHAIN_ID: u64 = 11_155_111;

pub const OWNER1_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const OWNER2_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const OWNER3_KEY: &str = "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

pub fn owner(name: &str, key: &str) -> OwnerKey {
    OwnerKey::from_private_key(name, key).unwrap()
}

pub fn owners() -> (OwnerKey, OwnerKey, OwnerKey) {
    (
        owner("owner1", OWNER1_KEY),
        owner("owner2", OWNER2_KEY),
        owner("owner3", OWNER3_KEY),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletCall {
    Deploy {
        deployer: Address,
        owners: Vec<Address>,
        threshold: u64,
    },
    Connect {
        safe: Address,
        owner: Address,
    },
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    Approve {
        owner: Address,
        safe_tx_hash: B256,
    },
    Execute {
        executor: Address,
        safe_tx_hash: B256,
        confirmations: usize,
    },
}

#[derive(Debug, Default)]
struct Ledger {
    calls: Vec<WalletCall>,
    balance: U256,
    approve_error: Option<Error>,
    execute_error: Option<Error>,
    connect_errors: Vec<(Address, Error)>,
}

/// Wallet service that records every call and keeps one Safe balance
#[derive(Clone)]
pub struct MockWallets {
    safe: Address,
    ledger: Arc<Mutex<Ledger>>,
}

impl MockWallets {
    pub fn new(safe: Address) -> Self {
        Self {
            safe,
            ledger: Arc::default(),
        }
    }

    pub fn with_balance(self, balance: U256) -> Self {
        self.ledger.lock().unwrap().balance = balance;
        self
    }

    pub fn fail_approvals(&self, error: Error) {
        self.ledger.lock().unwrap().approve_error = Some(error);
    }

    /// Fail every `connect` made as `owner`
    pub fn fail_connect(&self, owner: Address, error: Error) {
        self.ledger.lock().unwrap().connect_errors.push((owner, error));
    }

    pub fn fail_execution(&self, error: Error) {
        self.ledger.lock().unwrap().execute_error = Some(error);
    }

    pub fn safe(&self) -> Address {
        self.safe
    }

    pub fn calls(&self) -> Vec<WalletCall> {
        self.ledger.lock().unwrap().calls.clone()
    }

    pub fn balance(&self) -> U256 {
        self.ledger.lock().unwrap().balance
    }

    fn record(&self, call: WalletCall) {
        self.ledger.lock().unwrap().calls.push(call);
    }

    fn handle(&self, owner: &OwnerKey) -> Box<dyn SafeHandle> {
        Box::new(MockSafe {
            address: self.safe,
            owner: owner.clone(),
            ledger: self.ledger.clone(),
        })
    }
}

#[async_trait]
impl WalletService for MockWallets {
    async fn deploy(
        &self,
        deployment: &SafeDeployment,
        owner: &OwnerKey,
    ) -> Result<Box<dyn SafeHandle>> {
        let account = &deployment.account;
        self.record(WalletCall::Deploy {
            deployer: owner.address(),
            owners: account.owners.clone(),
            threshold: account.threshold,
        });
        if account.threshold == 0 || account.threshold as usize > account.owners.len() {
            return Err(Error::invalid_configuration(format!(
                "threshold {} with {} owners",
                account.threshold,
                account.owners.len()
            )));
        }
        Ok(self.handle(owner))
    }

    async fn connect(&self, safe: Address, owner: &OwnerKey) -> Result<Box<dyn SafeHandle>> {
        let failure = {
            let mut ledger = self.ledger.lock().unwrap();
            ledger.calls.push(WalletCall::Connect {
                safe,
                owner: owner.address(),
            });
            ledger
                .connect_errors
                .iter()
                .find(|(failing, _)| *failing == owner.address())
                .map(|(_, error)| error.clone())
        };
        if let Some(error) = failure {
            return Err(error);
        }
        if safe != self.safe {
            return Err(Error::not_found(format!("no contract deployed at {safe}")));
        }
        Ok(self.handle(owner))
    }

    async fn transfer(&self, from: &OwnerKey, to: Address, value: U256) -> Result<TransferReceipt> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.calls.push(WalletCall::Transfer {
            from: from.address(),
            to,
            value,
        });
        if to == self.safe {
            ledger.balance += value;
        }
        Ok(TransferReceipt {
            transaction_hash: B256::repeat_byte(0xf0),
            block_number: None,
        })
    }
}

pub struct MockSafe {
    address: Address,
    owner: OwnerKey,
    ledger: Arc<Mutex<Ledger>>,
}

#[async_trait]
impl SafeHandle for MockSafe {
    fn address(&self) -> Address {
        self.address
    }

    fn signer_address(&self) -> Address {
        self.owner.address()
    }

    async fn create_transaction(
        &self,
        partial: SafeTransactionDataPartial,
    ) -> Result<SafeTransactionData> {
        // the contract nonce is never consulted when the caller supplies one
        Ok(SafeTransactionData::from_partial(partial, 0))
    }

    fn transaction_hash(&self, transaction: &SafeTransactionData) -> B256 {
        safe_tx_hash(transaction, self.address, CHAIN_ID)
    }

    fn sign_transaction_hash(&self, safe_tx_hash: B256) -> Result<OwnerSignature> {
        sign_safe_tx_hash(self.owner.signer(), &safe_tx_hash)
            .map_err(|e| Error::Unknown(e.to_string()))
    }

    async fn approve_transaction_hash(&self, safe_tx_hash: B256) -> Result<TransferReceipt> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.calls.push(WalletCall::Approve {
            owner: self.owner.address(),
            safe_tx_hash,
        });
        if let Some(error) = ledger.approve_error.clone() {
            return Err(error);
        }
        Ok(TransferReceipt {
            transaction_hash: B256::repeat_byte(0xa0),
            block_number: Some(2),
        })
    }

    async fn execute_transaction(
        &self,
        transaction: &RelayedTransaction,
    ) -> Result<ExecutionReceipt> {
        let mut ledger = self.ledger.lock().unwrap();
        ledger.calls.push(WalletCall::Execute {
            executor: self.owner.address(),
            safe_tx_hash: transaction.safe_tx_hash,
            confirmations: transaction.confirmations.len(),
        });
        if let Some(error) = ledger.execute_error.clone() {
            return Err(error);
        }
        if transaction.to != self.address {
            ledger.balance -= transaction.value;
        }
        Ok(ExecutionReceipt {
            transaction_hash: B256::repeat_byte(0xe0),
            block_number: Some(3),
        })
    }

    async fn balance(&self) -> Result<U256> {
        Ok(self.ledger.lock().unwrap().balance)
    }

    async fn threshold(&self) -> Result<u64> {
        Ok(2)
    }

    async fn owners(&self) -> Result<Vec<Address>> {
        Ok(vec![self.owner.address()])
    }

    async fn nonce(&self) -> Result<u64> {
        Ok(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayCall {
    Propose(ProposeTransactionRequest),
    GetPending(Address),
    GetTransaction(B256),
    Confirm { safe_tx_hash: B256, signature: Bytes },
    GetSafeInfo(Address),
}

#[derive(Debug, Default)]
struct Store {
    calls: Vec<RelayCall>,
    safe_nonce: u64,
    transactions: Vec<RelayedTransaction>,
    hide_proposals: bool,
    confirm_error: Option<Error>,
}

/// In-memory relay; proposals become pending transactions
#[derive(Clone, Default)]
pub struct MockRelay {
    store: Arc<Mutex<Store>>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_safe_nonce(self, nonce: u64) -> Self {
        self.store.lock().unwrap().safe_nonce = nonce;
        self
    }

    /// Pre-existing pending transaction listed before anything proposed later
    pub fn with_pending(self, transaction: RelayedTransaction) -> Self {
        self.store.lock().unwrap().transactions.push(transaction);
        self
    }

    /// Accept proposals but leave them out of the pending list
    pub fn hide_proposals(&self) {
        self.store.lock().unwrap().hide_proposals = true;
    }

    pub fn fail_confirmations(&self, error: Error) {
        self.store.lock().unwrap().confirm_error = Some(error);
    }

    pub fn calls(&self) -> Vec<RelayCall> {
        self.store.lock().unwrap().calls.clone()
    }

    pub fn proposals(&self) -> Vec<ProposeTransactionRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RelayCall::Propose(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn confirmed_hashes(&self) -> Vec<B256> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RelayCall::Confirm { safe_tx_hash, .. } => Some(safe_tx_hash),
                _ => None,
            })
            .collect()
    }

    pub fn fetched_hashes(&self) -> Vec<B256> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RelayCall::GetTransaction(hash) => Some(hash),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RelayService for MockRelay {
    async fn propose_transaction(&self, request: &ProposeTransactionRequest) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(RelayCall::Propose(request.clone()));

        let mut transaction = relayed(
            request.safe_address,
            &request.safe_transaction_data,
            request.safe_tx_hash,
        );
        transaction.proposer = Some(request.sender_address);
        transaction.confirmations.push(Confirmation {
            owner: request.sender_address,
            signature: Some(request.sender_signature.clone()),
            signature_type: Some("EOA".to_string()),
            submission_date: None,
        });
        store.transactions.push(transaction);
        Ok(())
    }

    async fn get_pending_transactions(&self, safe: Address) -> Result<Vec<RelayedTransaction>> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(RelayCall::GetPending(safe));
        let hide = store.hide_proposals;
        Ok(store
            .transactions
            .iter()
            .filter(|tx| tx.safe == safe && !tx.is_executed)
            .filter(|tx| !hide || tx.proposer.is_none())
            .cloned()
            .collect())
    }

    async fn get_transaction(&self, safe_tx_hash: B256) -> Result<RelayedTransaction> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(RelayCall::GetTransaction(safe_tx_hash));
        store
            .transactions
            .iter()
            .find(|tx| tx.safe_tx_hash == safe_tx_hash)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("{safe_tx_hash}")))
    }

    async fn confirm_transaction(&self, safe_tx_hash: B256, signature: &Bytes) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(RelayCall::Confirm {
            safe_tx_hash,
            signature: signature.clone(),
        });
        if let Some(error) = store.confirm_error.clone() {
            return Err(error);
        }

        let transaction = store
            .transactions
            .iter_mut()
            .find(|tx| tx.safe_tx_hash == safe_tx_hash)
            .ok_or_else(|| Error::not_found(format!("{safe_tx_hash}")))?;
        let owner = cosign_crypto::recover_owner(&safe_tx_hash, signature)
            .map_err(|e| Error::Rejected {
                status: 400,
                message: e.to_string(),
            })?;
        transaction.confirmations.push(Confirmation {
            owner,
            signature: Some(signature.clone()),
            signature_type: Some("EOA".to_string()),
            submission_date: None,
        });
        Ok(())
    }

    async fn get_safe_info(&self, safe: Address) -> Result<SafeInfo> {
        let mut store = self.store.lock().unwrap();
        store.calls.push(RelayCall::GetSafeInfo(safe));
        Ok(SafeInfo {
            address: safe,
            nonce: store.safe_nonce,
            threshold: 2,
            owners: Vec::new(),
            master_copy: None,
            fallback_handler: None,
            version: Some("1.3.0".to_string()),
        })
    }
}

/// Pending relay entry for `transaction` without confirmations
pub fn relayed(safe: Address, transaction: &SafeTransactionData, hash: B256) -> RelayedTransaction {
    RelayedTransaction {
        safe,
        to: transaction.to,
        value: transaction.value,
        data: transaction.data.clone(),
        operation: transaction.operation,
        safe_tx_gas: transaction.safe_tx_gas,
        base_gas: transaction.base_gas,
        gas_price: transaction.gas_price,
        gas_token: transaction.gas_token,
        refund_receiver: transaction.refund_receiver,
        nonce: transaction.nonce,
        safe_tx_hash: hash,
        proposer: None,
        confirmations_required: 2,
        confirmations: Vec::new(),
        is_executed: false,
        is_successful: None,
        transaction_hash: None,
        submission_date: None,
    }
}
