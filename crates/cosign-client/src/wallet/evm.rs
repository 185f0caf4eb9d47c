use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use cosign_crypto::{pack_signatures, safe_tx_hash, sign_safe_tx_hash, OwnerSignature};
use cosign_errors::{Error, Result};
use cosign_keyring::OwnerKey;
use cosign_log::{debug, info, warn};
use cosign_types::{SafeDeployment, SafeTransactionData, SafeTransactionDataPartial};
use std::collections::HashSet;
use std::fmt::Display;
use url::Url;

use super::{ExecutionReceipt, SafeContracts, SafeHandle, TransferReceipt, WalletService};
use crate::relay::{Confirmation, RelayedTransaction};

sol! {
    #[sol(rpc)]
    contract GnosisSafe {
        function setup(
            address[] calldata _owners,
            uint256 _threshold,
            address to,
            bytes calldata data,
            address fallbackHandler,
            address paymentToken,
            uint256 payment,
            address paymentReceiver
        ) external;

        function execTransaction(
            address to,
            uint256 value,
            bytes calldata data,
            uint8 operation,
            uint256 safeTxGas,
            uint256 baseGas,
            uint256 gasPrice,
            address gasToken,
            address refundReceiver,
            bytes memory signatures
        ) public payable returns (bool success);

        function approveHash(bytes32 hashToApprove) external;

        function approvedHashes(address owner, bytes32 hash) external view returns (uint256);

        function getOwners() public view returns (address[] memory);

        function getThreshold() public view returns (uint256);

        function nonce() public view returns (uint256);
    }

    #[sol(rpc)]
    contract GnosisSafeProxyFactory {
        function createProxyWithNonce(
            address _singleton,
            bytes memory initializer,
            uint256 saltNonce
        ) public returns (address proxy);
    }
}

fn ledger_error(e: impl Display) -> Error {
    let message = e.to_string();
    if message.to_ascii_lowercase().contains("insufficient funds") {
        Error::InsufficientFunds(message)
    } else {
        Error::Transport(message)
    }
}

/// Build a wallet service on an HTTP JSON-RPC endpoint.
///
/// Every key in `keys` is registered with the provider's wallet, so any of
/// them can later deploy, fund, approve or execute.
pub fn http_wallet_service(
    rpc_url: Url,
    chain_id: u64,
    contracts: SafeContracts,
    keys: &[OwnerKey],
) -> Result<EvmWalletService<impl Provider<Http<Client>, Ethereum> + Clone + 'static>> {
    let (first, rest) = keys
        .split_first()
        .ok_or_else(|| Error::invalid_configuration("no owner keys configured"))?;

    let mut wallet = EthereumWallet::new(first.signer().clone());
    for key in rest {
        wallet.register_signer(key.signer().clone());
    }

    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(wallet)
        .on_http(rpc_url);

    Ok(EvmWalletService::new(
        provider,
        chain_id,
        contracts,
        keys.iter().map(OwnerKey::address),
    ))
}

/// Wallet service backed by Safe contracts on an EVM chain
pub struct EvmWalletService<P> {
    provider: P,
    chain_id: u64,
    contracts: SafeContracts,
    signers: HashSet<Address>,
}

impl<P> EvmWalletService<P>
where
    P: Provider<Http<Client>, Ethereum> + Clone + 'static,
{
    pub fn new(
        provider: P,
        chain_id: u64,
        contracts: SafeContracts,
        signers: impl IntoIterator<Item = Address>,
    ) -> Self {
        Self {
            provider,
            chain_id,
            contracts,
            signers: signers.into_iter().collect(),
        }
    }

    /// Fail early when the RPC endpoint serves a different chain
    pub async fn check_chain_id(&self) -> Result<()> {
        let remote = self.provider.get_chain_id().await.map_err(ledger_error)?;
        if remote != self.chain_id {
            return Err(Error::invalid_configuration(format!(
                "rpc endpoint serves chain {remote}, configured chain is {}",
                self.chain_id
            )));
        }
        Ok(())
    }

    fn ensure_signer(&self, owner: &OwnerKey) -> Result<()> {
        if self.signers.contains(&owner.address()) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "no signer registered for {} ({})",
                owner.name(),
                owner.address()
            )))
        }
    }

    fn bind(&self, safe: Address, owner: &OwnerKey) -> EvmSafe<P> {
        EvmSafe {
            address: safe,
            owner: owner.clone(),
            chain_id: self.chain_id,
            provider: self.provider.clone(),
        }
    }
}

#[async_trait]
impl<P> WalletService for EvmWalletService<P>
where
    P: Provider<Http<Client>, Ethereum> + Clone + 'static,
{
    #[tracing::instrument(skip_all, fields(owner = %owner.address(), threshold = deployment.account.threshold))]
    async fn deploy(
        &self,
        deployment: &SafeDeployment,
        owner: &OwnerKey,
    ) -> Result<Box<dyn SafeHandle>> {
        self.ensure_signer(owner)?;

        let initializer = GnosisSafe::setupCall {
            _owners: deployment.account.owners.clone(),
            _threshold: U256::from(deployment.account.threshold),
            to: Address::ZERO,
            data: Bytes::new(),
            fallbackHandler: self.contracts.fallback_handler,
            paymentToken: Address::ZERO,
            payment: U256::ZERO,
            paymentReceiver: Address::ZERO,
        }
        .abi_encode();

        let factory =
            GnosisSafeProxyFactory::new(self.contracts.proxy_factory, self.provider.clone());
        let create = factory
            .createProxyWithNonce(
                self.contracts.singleton,
                initializer.into(),
                deployment.salt_nonce,
            )
            .from(owner.address());

        // The proxy address is deterministic, so a static call predicts it and
        // surfaces setup reverts such as a threshold above the owner count.
        let safe = create
            .call()
            .await
            .map_err(|e| Error::invalid_configuration(format!("safe setup rejected:: {e}")))?
            .proxy;

        let receipt = create
            .send()
            .await
            .map_err(ledger_error)?
            .get_receipt()
            .await
            .map_err(ledger_error)?;
        if !receipt.status() {
            return Err(Error::Reverted(format!(
                "createProxyWithNonce {}",
                receipt.transaction_hash()
            )));
        }

        info!(%safe, tx = %receipt.transaction_hash(), "safe deployed");
        Ok(Box::new(self.bind(safe, owner)))
    }

    async fn connect(&self, safe: Address, owner: &OwnerKey) -> Result<Box<dyn SafeHandle>> {
        self.ensure_signer(owner)?;
        let code = self.provider.get_code_at(safe).await.map_err(ledger_error)?;
        if code.is_empty() {
            return Err(Error::not_found(format!("no contract deployed at {safe}")));
        }
        Ok(Box::new(self.bind(safe, owner)))
    }

    #[tracing::instrument(skip_all, fields(from = %from.address(), %to, %value))]
    async fn transfer(&self, from: &OwnerKey, to: Address, value: U256) -> Result<TransferReceipt> {
        self.ensure_signer(from)?;
        let request = TransactionRequest::default()
            .with_from(from.address())
            .with_to(to)
            .with_value(value);
        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(ledger_error)?;

        Ok(TransferReceipt {
            transaction_hash: *pending.tx_hash(),
            block_number: None,
        })
    }
}

/// A Safe bound to one owner on an EVM provider
struct EvmSafe<P> {
    address: Address,
    owner: OwnerKey,
    chain_id: u64,
    provider: P,
}

impl<P> EvmSafe<P>
where
    P: Provider<Http<Client>, Ethereum> + Clone + 'static,
{
    /// Signatures proving approval of `hash` from the relay, the contract's
    /// approved hashes and the executor itself
    async fn collect_signatures(
        &self,
        hash: B256,
        transaction: &RelayedTransaction,
    ) -> Result<Vec<OwnerSignature>> {
        let safe = GnosisSafe::new(self.address, self.provider.clone());
        let executor = self.owner.address();
        let owners = self.owners().await?;

        let mut approved_on_chain = HashSet::new();
        for &owner in owners.iter().filter(|&&owner| owner != executor) {
            let approved = safe
                .approvedHashes(owner, hash)
                .call()
                .await
                .map_err(ledger_error)?
                ._0;
            if !approved.is_zero() {
                approved_on_chain.insert(owner);
            }
        }

        Ok(merge_signatures(
            &transaction.confirmations,
            &owners,
            &approved_on_chain,
            executor,
        ))
    }
}

/// One signature per approving owner: relay confirmations first, then
/// pre-validated entries for owners approved on chain and for the executor
/// when it is an owner
fn merge_signatures(
    confirmations: &[Confirmation],
    owners: &[Address],
    approved_on_chain: &HashSet<Address>,
    executor: Address,
) -> Vec<OwnerSignature> {
    let mut signatures = Vec::new();
    let mut signed = HashSet::new();

    for confirmation in confirmations {
        let Some(data) = &confirmation.signature else {
            continue;
        };
        match OwnerSignature::new(confirmation.owner, data.clone()) {
            Ok(signature) if signed.insert(confirmation.owner) => signatures.push(signature),
            Ok(_) => {}
            Err(e) => warn!(owner = %confirmation.owner, error = %e, "skipping relay confirmation"),
        }
    }

    for &owner in owners {
        if signed.contains(&owner) {
            continue;
        }
        if owner == executor || approved_on_chain.contains(&owner) {
            signed.insert(owner);
            signatures.push(OwnerSignature::pre_validated(owner));
        }
    }

    signatures
}

#[async_trait]
impl<P> SafeHandle for EvmSafe<P>
where
    P: Provider<Http<Client>, Ethereum> + Clone + 'static,
{
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
        let nonce = match partial.nonce {
            Some(nonce) => nonce,
            None => self.nonce().await?,
        };
        Ok(SafeTransactionData::from_partial(partial, nonce))
    }

    fn transaction_hash(&self, transaction: &SafeTransactionData) -> B256 {
        safe_tx_hash(transaction, self.address, self.chain_id)
    }

    fn sign_transaction_hash(&self, safe_tx_hash: B256) -> Result<OwnerSignature> {
        sign_safe_tx_hash(self.owner.signer(), &safe_tx_hash)
            .map_err(|e| Error::Unknown(e.to_string()))
    }

    #[tracing::instrument(skip(self), fields(safe = %self.address, owner = %self.owner.address()))]
    async fn approve_transaction_hash(&self, safe_tx_hash: B256) -> Result<TransferReceipt> {
        let safe = GnosisSafe::new(self.address, self.provider.clone());
        let receipt = safe
            .approveHash(safe_tx_hash)
            .from(self.owner.address())
            .send()
            .await
            .map_err(ledger_error)?
            .get_receipt()
            .await
            .map_err(ledger_error)?;
        if !receipt.status() {
            return Err(Error::Reverted(format!(
                "approveHash {}",
                receipt.transaction_hash()
            )));
        }
        Ok(TransferReceipt {
            transaction_hash: receipt.transaction_hash(),
            block_number: receipt.block_number(),
        })
    }

    #[tracing::instrument(skip_all, fields(safe = %self.address, safe_tx_hash = %transaction.safe_tx_hash))]
    async fn execute_transaction(
        &self,
        transaction: &RelayedTransaction,
    ) -> Result<ExecutionReceipt> {
        let data = transaction.transaction_data();
        let hash = self.transaction_hash(&data);
        if hash != transaction.safe_tx_hash {
            warn!(local = %hash, "relay hash differs from local hash");
        }

        let signatures = self.collect_signatures(hash, transaction).await?;
        let threshold = self.threshold().await?;
        debug!(collected = signatures.len(), threshold, "signatures collected");
        let packed = pack_signatures(signatures).map_err(|e| Error::Unknown(e.to_string()))?;

        let safe = GnosisSafe::new(self.address, self.provider.clone());
        let exec = safe
            .execTransaction(
                data.to,
                data.value,
                data.data,
                u8::from(data.operation),
                data.safe_tx_gas,
                data.base_gas,
                data.gas_price,
                data.gas_token,
                data.refund_receiver,
                packed,
            )
            .from(self.owner.address());

        // Surface GS0xx revert reasons before paying for a failing transaction
        exec.call()
            .await
            .map_err(|e| Error::Reverted(e.to_string()))?;

        let receipt = exec
            .send()
            .await
            .map_err(ledger_error)?
            .get_receipt()
            .await
            .map_err(ledger_error)?;
        if !receipt.status() {
            return Err(Error::Reverted(format!(
                "execTransaction {}",
                receipt.transaction_hash()
            )));
        }

        Ok(ExecutionReceipt {
            transaction_hash: receipt.transaction_hash(),
            block_number: receipt.block_number(),
        })
    }

    async fn balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.address)
            .await
            .map_err(ledger_error)
    }

    async fn threshold(&self) -> Result<u64> {
        let safe = GnosisSafe::new(self.address, self.provider.clone());
        let threshold = safe.getThreshold().call().await.map_err(ledger_error)?._0;
        Ok(threshold.saturating_to())
    }

    async fn owners(&self) -> Result<Vec<Address>> {
        let safe = GnosisSafe::new(self.address, self.provider.clone());
        Ok(safe.getOwners().call().await.map_err(ledger_error)?._0)
    }

    async fn nonce(&self) -> Result<u64> {
        let safe = GnosisSafe::new(self.address, self.provider.clone());
        let nonce = safe.nonce().call().await.map_err(ledger_error)?._0;
        Ok(nonce.saturating_to())
    }
}
