//! Error types shared by the cosign wallet and relay ports.
//!
//! Every collaborator the coordinator talks to (the Safe wallet service, the
//! transaction relay, the ledger underneath) reports failures through the
//! [`Error`] type defined here, so the workflow can decide which failures are
//! configuration problems, which are approval problems and which simply abort.

use thiserror::Error;

/// Core error type for cosign operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing keys, malformed thresholds, bad endpoints
    #[error("invalid configuration:: {0}")]
    InvalidConfiguration(String),

    /// Not found error
    #[error("not found:: {0}")]
    NotFound(String),

    /// Signer is not an owner of the wallet, or not allowed to act
    #[error("unauthorized:: {0}")]
    Unauthorized(String),

    /// A collaborator answered but refused the request
    #[error("rejected ({status}):: {message}")]
    Rejected { status: u16, message: String },

    /// Network or RPC transport failure
    #[error("transport error:: {0}")]
    Transport(String),

    /// On-chain execution reverted
    #[error("execution reverted:: {0}")]
    Reverted(String),

    /// Insufficient funds error
    #[error("insufficient funds:: {0}")]
    InsufficientFunds(String),

    /// Unknown error
    #[error("unknown error:: {0}")]
    Unknown(String),
}

impl Error {
    /// Numeric code for this error, see [`codes`]
    pub fn code(&self) -> u32 {
        match self {
            Error::InvalidConfiguration(_) => codes::INVALID_CONFIGURATION,
            Error::NotFound(_) => codes::NOT_FOUND,
            Error::Unauthorized(_) => codes::UNAUTHORIZED,
            Error::Rejected { .. } => codes::REJECTED,
            Error::Transport(_) => codes::TRANSPORT,
            Error::Reverted(_) => codes::REVERTED,
            Error::InsufficientFunds(_) => codes::INSUFFICIENT_FUNDS,
            Error::Unknown(_) => codes::INTERNAL,
        }
    }

    /// Whether the error stems from local or wallet configuration
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::InvalidConfiguration(_))
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Error::InvalidConfiguration(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn transport(msg: impl std::fmt::Display) -> Self {
        Error::Transport(msg.to_string())
    }
}

/// Result type alias for cosign operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error codes
pub mod codes {
    /// Success
    pub const OK: u32 = 0;
    /// Internal error
    pub const INTERNAL: u32 = 1;
    /// Invalid configuration
    pub const INVALID_CONFIGURATION: u32 = 3;
    /// Not found
    pub const NOT_FOUND: u32 = 5;
    /// Unauthorized
    pub const UNAUTHORIZED: u32 = 7;
    /// Rejected by a collaborator
    pub const REJECTED: u32 = 9;
    /// Insufficient funds
    pub const INSUFFICIENT_FUNDS: u32 = 10;
    /// Transport failure
    pub const TRANSPORT: u32 = 14;
    /// Execution reverted
    pub const REVERTED: u32 = 15;
}
