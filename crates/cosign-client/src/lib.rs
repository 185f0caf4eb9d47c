//! Client library for coordinating threshold-signed Safe transactions.
//!
//! The [`coordinator`] drives one transaction from proposal to execution
//! against two ports: a [`wallet::WalletService`] that talks to the chain and
//! a [`relay::RelayService`] that stores proposals and confirmations so
//! independent owners can find them. [`cli`] wires both to real endpoints.

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod keys;
pub mod links;
pub mod relay;
pub mod wallet;

pub use config::{ClientConfig, ConfigError};
pub use coordinator::{
    ApprovalMode, ConfirmOutcome, ConfirmationPolicy, Coordinator, Execution, Proposal, Session,
    Signers, TransferRequest, WalletSetup, WorkflowPlan, WorkflowReport,
};
pub use links::ExplorerLinks;
pub use relay::{HttpRelay, RelayService, RelayedTransaction, SafeInfo};
pub use wallet::{EvmWalletService, ExecutionReceipt, SafeContracts, SafeHandle, TransferReceipt, WalletService};

use alloy::primitives::B256;
use cosign_crypto::SignatureError;
use cosign_keyring::KeyringError;
use cosign_types::UnitsError;
use thiserror::Error;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failure reported by the wallet service, the relay or the ledger
    #[error(transparent)]
    Service(#[from] cosign_errors::Error),

    /// Configuration file error
    #[error("config error:: {0}")]
    Config(#[from] ConfigError),

    /// Signer identity could not be resolved
    #[error("keyring error:: {0}")]
    Keyring(#[from] KeyringError),

    /// Signature error
    #[error("signature error:: {0}")]
    Signature(#[from] SignatureError),

    /// Ether amount could not be parsed
    #[error("invalid amount:: {0}")]
    Amount(#[from] UnitsError),

    /// URL parsing error
    #[error("invalid url:: {0}")]
    Url(#[from] url::ParseError),

    /// The second owner's approval failed and the workflow was told to stop
    #[error("confirmation of {safe_tx_hash} failed:: {source}")]
    ConfirmationFailed {
        safe_tx_hash: B256,
        #[source]
        source: cosign_errors::Error,
    },

    /// Logging could not be installed
    #[error("logging setup failed:: {0}")]
    Logging(String),
}

impl ClientError {
    /// The port-level error, if this failure came from a collaborator
    pub fn service_error(&self) -> Option<&cosign_errors::Error> {
        match self {
            ClientError::Service(e) => Some(e),
            ClientError::ConfirmationFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
