//! Threshold-transaction coordinator.
//!
//! Sequences one Safe transaction through deployment or binding, funding,
//! proposal, discovery, confirmation by a second owner and execution. Every
//! step awaits one collaborator at a time. The only state shared between
//! steps is the [`Session`] returned by [`Coordinator::initialize`], which the
//! caller owns and passes back in.

use alloy::primitives::{Address, B256, U256};
use cosign_crypto::OwnerSignature;
use cosign_keyring::OwnerKey;
use cosign_log::{error, info, warn};
use cosign_types::{
    format_ether, parse_ether, SafeDeployment, SafeTransactionData, SafeTransactionDataPartial,
    UnitsError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::relay::{ProposeTransactionRequest, RelayService, RelayedTransaction};
use crate::wallet::{ExecutionReceipt, SafeHandle, TransferReceipt, WalletService};
use crate::{ClientError, Result};

/// Origin tag attached to proposals
pub const PROPOSAL_ORIGIN: &str = "cosign";

/// How the wallet context is obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletSetup {
    /// Deploy a new Safe with these owners and threshold
    Deploy(SafeDeployment),
    /// Bind to a Safe that already exists
    Existing(Address),
}

/// Wallet context bound to the initiating owner, threaded through every step
pub struct Session {
    handle: Box<dyn SafeHandle>,
    deployed: bool,
}

impl Session {
    pub fn new(handle: Box<dyn SafeHandle>, deployed: bool) -> Self {
        Self { handle, deployed }
    }

    pub fn address(&self) -> Address {
        self.handle.address()
    }

    pub fn handle(&self) -> &dyn SafeHandle {
        self.handle.as_ref()
    }

    /// Whether the Safe was deployed in this session
    pub fn was_deployed(&self) -> bool {
        self.deployed
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address())
            .field("signer", &self.handle.signer_address())
            .field("deployed", &self.deployed)
            .finish()
    }
}

/// A single value transfer out of the Safe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferRequest {
    /// Recipient; `None` sends to the Safe itself
    pub destination: Option<Address>,
    /// Amount in wei
    pub value: U256,
}

impl TransferRequest {
    pub fn new(destination: Option<Address>, value: U256) -> Self {
        Self { destination, value }
    }

    /// Amount given in ether, e.g. `"0.005"`
    pub fn from_ether(
        destination: Option<Address>,
        amount: &str,
    ) -> std::result::Result<Self, UnitsError> {
        Ok(Self::new(destination, parse_ether(amount)?))
    }
}

/// A transaction signed by its proposer and registered with the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub safe: Address,
    pub transaction: SafeTransactionData,
    pub safe_tx_hash: B256,
    pub signature: OwnerSignature,
}

/// How the second owner records approval
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalMode {
    /// Off-chain signature submitted to the relay
    #[default]
    Relay,
    /// `approveHash` sent to the Safe contract
    OnChain,
}

impl FromStr for ApprovalMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relay" => Ok(ApprovalMode::Relay),
            "on-chain" | "onchain" | "on_chain" => Ok(ApprovalMode::OnChain),
            other => Err(format!("unknown approval mode:: {other}")),
        }
    }
}

impl fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalMode::Relay => f.write_str("relay"),
            ApprovalMode::OnChain => f.write_str("on-chain"),
        }
    }
}

/// What happens after the confirmation step failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmationPolicy {
    /// Stop before execution
    #[default]
    Abort,
    /// Attempt execution anyway
    Proceed,
}

impl FromStr for ConfirmationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "abort" => Ok(ConfirmationPolicy::Abort),
            "proceed" => Ok(ConfirmationPolicy::Proceed),
            other => Err(format!("unknown confirmation policy:: {other}")),
        }
    }
}

impl fmt::Display for ConfirmationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfirmationPolicy::Abort => f.write_str("abort"),
            ConfirmationPolicy::Proceed => f.write_str("proceed"),
        }
    }
}

/// Result of the confirmation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed {
        safe_tx_hash: B256,
        owner: Address,
        /// Present for on-chain approvals
        receipt: Option<TransferReceipt>,
    },
    Failed {
        safe_tx_hash: B256,
        owner: Address,
        error: cosign_errors::Error,
    },
}

impl ConfirmOutcome {
    pub fn safe_tx_hash(&self) -> B256 {
        match self {
            ConfirmOutcome::Confirmed { safe_tx_hash, .. }
            | ConfirmOutcome::Failed { safe_tx_hash, .. } => *safe_tx_hash,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, ConfirmOutcome::Confirmed { .. })
    }
}

/// An executed transaction with the Safe balance around it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub safe_tx_hash: B256,
    pub receipt: ExecutionReceipt,
    pub balance_before: U256,
    pub balance_after: U256,
}

/// Everything `run` needs besides the signers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPlan {
    pub setup: WalletSetup,
    /// Sent to the Safe after a deployment; ignored for existing Safes
    pub funding: Option<U256>,
    pub transfer: TransferRequest,
    pub approval: ApprovalMode,
    pub on_confirm_failure: ConfirmationPolicy,
}

/// Signer identities per workflow role
#[derive(Debug, Clone)]
pub struct Signers {
    pub proposer: OwnerKey,
    pub confirmer: OwnerKey,
    pub executor: OwnerKey,
    pub funder: OwnerKey,
}

/// What `run` did, step by step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    pub safe: Address,
    pub deployed: bool,
    pub funding: Option<TransferReceipt>,
    pub proposal: Proposal,
    pub confirmation: ConfirmOutcome,
    pub execution: Execution,
}

/// Drives one transaction through the wallet service and the relay
pub struct Coordinator<'a> {
    wallets: &'a dyn WalletService,
    relay: &'a dyn RelayService,
}

impl<'a> Coordinator<'a> {
    pub fn new(wallets: &'a dyn WalletService, relay: &'a dyn RelayService) -> Self {
        Self { wallets, relay }
    }

    /// Deploy a new Safe or bind an existing one, as `owner`
    #[tracing::instrument(skip_all, fields(owner = %owner.address()))]
    pub async fn initialize(&self, setup: &WalletSetup, owner: &OwnerKey) -> Result<Session> {
        match setup {
            WalletSetup::Deploy(deployment) => {
                info!(
                    owners = deployment.account.owners.len(),
                    threshold = deployment.account.threshold,
                    "deploying safe"
                );
                let handle = self.wallets.deploy(deployment, owner).await?;
                info!(safe = %handle.address(), "safe deployed");
                Ok(Session::new(handle, true))
            }
            WalletSetup::Existing(address) => {
                info!(safe = %address, "binding existing safe");
                let handle = self.wallets.connect(*address, owner).await?;
                Ok(Session::new(handle, false))
            }
        }
    }

    /// Send `value` from `funder` to the Safe
    #[tracing::instrument(skip_all, fields(safe = %session.address(), funder = %funder.address()))]
    pub async fn fund(
        &self,
        session: &Session,
        funder: &OwnerKey,
        value: U256,
    ) -> Result<TransferReceipt> {
        let receipt = self
            .wallets
            .transfer(funder, session.address(), value)
            .await?;
        info!(
            amount = %format_ether(value),
            tx = %receipt.transaction_hash,
            "safe funded"
        );
        Ok(receipt)
    }

    /// Build, hash and sign a transfer as the session owner and hand it to the relay
    #[tracing::instrument(skip_all, fields(safe = %session.address(), proposer = %session.handle().signer_address()))]
    pub async fn propose(&self, session: &Session, request: &TransferRequest) -> Result<Proposal> {
        let safe = session.address();
        let handle = session.handle();

        let nonce = self.relay.next_nonce(safe).await?;
        let destination = request.destination.unwrap_or(safe);
        let partial =
            SafeTransactionDataPartial::transfer(destination, request.value).with_nonce(nonce);

        let transaction = handle.create_transaction(partial).await?;
        let safe_tx_hash = handle.transaction_hash(&transaction);
        let signature = handle.sign_transaction_hash(safe_tx_hash)?;

        self.relay
            .propose_transaction(&ProposeTransactionRequest {
                safe_address: safe,
                safe_transaction_data: transaction.clone(),
                safe_tx_hash,
                sender_address: handle.signer_address(),
                sender_signature: signature.data.clone(),
                origin: Some(PROPOSAL_ORIGIN.to_string()),
            })
            .await?;

        info!(%safe_tx_hash, nonce, to = %destination, value = %format_ether(request.value), "transaction proposed");
        Ok(Proposal {
            safe,
            transaction,
            safe_tx_hash,
            signature,
        })
    }

    /// Find the just-made proposal among the relay's pending transactions
    #[tracing::instrument(skip_all, fields(safe = %session.address(), safe_tx_hash = %proposal.safe_tx_hash))]
    pub async fn discover_pending(
        &self,
        session: &Session,
        proposal: &Proposal,
    ) -> Result<RelayedTransaction> {
        let pending = self.relay.get_pending_transactions(session.address()).await?;
        let count = pending.len();

        let found = pending
            .into_iter()
            .find(|tx| tx.safe_tx_hash == proposal.safe_tx_hash)
            .ok_or_else(|| {
                cosign_errors::Error::not_found(format!(
                    "{} not among {count} pending transactions",
                    proposal.safe_tx_hash
                ))
            })?;

        info!(pending = count, status = %found.status(), "pending transaction found");
        Ok(found)
    }

    /// Approve `safe_tx_hash` as `owner`.
    ///
    /// Binding the owner and signing fail the step as errors. A refusal of
    /// the approval itself, by the relay or by the Safe, is reported as
    /// [`ConfirmOutcome::Failed`] so the caller decides whether execution
    /// still happens.
    #[tracing::instrument(skip_all, fields(safe = %session.address(), owner = %owner.address(), %safe_tx_hash, %mode))]
    pub async fn confirm(
        &self,
        session: &Session,
        owner: &OwnerKey,
        safe_tx_hash: B256,
        mode: ApprovalMode,
    ) -> Result<ConfirmOutcome> {
        let handle = self.wallets.connect(session.address(), owner).await?;

        let approval = match mode {
            ApprovalMode::Relay => {
                let signature = handle.sign_transaction_hash(safe_tx_hash)?;
                self.relay
                    .confirm_transaction(safe_tx_hash, &signature.data)
                    .await
                    .map(|_| None)
            }
            ApprovalMode::OnChain => handle.approve_transaction_hash(safe_tx_hash).await.map(Some),
        };

        Ok(match approval {
            Ok(receipt) => {
                info!("transaction confirmed");
                ConfirmOutcome::Confirmed {
                    safe_tx_hash,
                    owner: owner.address(),
                    receipt,
                }
            }
            Err(e) => {
                error!(error = %e, "error confirming transaction");
                ConfirmOutcome::Failed {
                    safe_tx_hash,
                    owner: owner.address(),
                    error: e,
                }
            }
        })
    }

    /// Fetch `safe_tx_hash` from the relay and execute it as `executor`.
    ///
    /// The balance is logged before and after; it is not checked.
    #[tracing::instrument(skip_all, fields(safe = %session.address(), executor = %executor.address(), %safe_tx_hash))]
    pub async fn execute(
        &self,
        session: &Session,
        executor: &OwnerKey,
        safe_tx_hash: B256,
    ) -> Result<Execution> {
        let balance_before = session.handle().balance().await?;
        info!(balance = %format_ether(balance_before), "[Before Transaction] Safe Balance");

        let transaction = self.relay.get_transaction(safe_tx_hash).await?;
        if transaction.is_executed {
            warn!("relay reports the transaction as already executed");
        }
        info!(
            status = %transaction.status(),
            confirmations = transaction.confirmations.len(),
            required = transaction.confirmations_required,
            "executing transaction"
        );

        let handle = self.wallets.connect(session.address(), executor).await?;
        let receipt = handle.execute_transaction(&transaction).await?;
        info!(tx = %receipt.transaction_hash, "transaction executed");

        let balance_after = session.handle().balance().await?;
        info!(balance = %format_ether(balance_after), "[After Transaction] Safe Balance");

        Ok(Execution {
            safe_tx_hash,
            receipt,
            balance_before,
            balance_after,
        })
    }

    /// Run every step in order.
    ///
    /// A failed confirmation ends the run with
    /// [`ClientError::ConfirmationFailed`] under [`ConfirmationPolicy::Abort`].
    #[tracing::instrument(skip_all)]
    pub async fn run(&self, plan: &WorkflowPlan, signers: &Signers) -> Result<WorkflowReport> {
        let session = self.initialize(&plan.setup, &signers.proposer).await?;

        let funding = match (session.was_deployed(), plan.funding) {
            (true, Some(value)) => Some(self.fund(&session, &signers.funder, value).await?),
            _ => None,
        };

        let proposal = self.propose(&session, &plan.transfer).await?;
        let pending = self.discover_pending(&session, &proposal).await?;

        let confirmation = self
            .confirm(
                &session,
                &signers.confirmer,
                pending.safe_tx_hash,
                plan.approval,
            )
            .await?;

        let execution = match &confirmation {
            ConfirmOutcome::Failed { error, .. }
                if plan.on_confirm_failure == ConfirmationPolicy::Abort =>
            {
                return Err(ClientError::ConfirmationFailed {
                    safe_tx_hash: confirmation.safe_tx_hash(),
                    source: error.clone(),
                });
            }
            ConfirmOutcome::Failed { .. } => {
                warn!("confirmation failed, executing anyway");
                self.execute(&session, &signers.executor, confirmation.safe_tx_hash())
                    .await?
            }
            ConfirmOutcome::Confirmed { .. } => {
                self.execute(&session, &signers.executor, confirmation.safe_tx_hash())
                    .await?
            }
        };

        Ok(WorkflowReport {
            safe: session.address(),
            deployed: session.was_deployed(),
            funding,
            proposal,
            confirmation,
            execution,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_request_from_ether() {
        let request = TransferRequest::from_ether(None, "0.005").unwrap();
        assert_eq!(request.value, U256::from(5_000_000_000_000_000u64));
        assert!(TransferRequest::from_ether(None, "abc").is_err());
    }

    #[test]
    fn test_mode_and_policy_parsing() {
        assert_eq!("relay".parse::<ApprovalMode>().unwrap(), ApprovalMode::Relay);
        assert_eq!("on-chain".parse::<ApprovalMode>().unwrap(), ApprovalMode::OnChain);
        assert!("carrier-pigeon".parse::<ApprovalMode>().is_err());
        assert_eq!(ApprovalMode::OnChain.to_string(), "on-chain");

        assert_eq!(
            "Proceed".parse::<ConfirmationPolicy>().unwrap(),
            ConfirmationPolicy::Proceed
        );
        assert_eq!(ConfirmationPolicy::default(), ConfirmationPolicy::Abort);
    }

    #[test]
    fn test_confirm_outcome_accessors() {
        let hash = B256::repeat_byte(7);
        let failed = ConfirmOutcome::Failed {
            safe_tx_hash: hash,
            owner: Address::ZERO,
            error: cosign_errors::Error::Unauthorized("not an owner".into()),
        };
        assert_eq!(failed.safe_tx_hash(), hash);
        assert!(!failed.is_confirmed());
    }
}
