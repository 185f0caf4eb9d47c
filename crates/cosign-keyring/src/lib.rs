//! Owner signing identities for cosign
//!
//! A signer identity is a private key plus the address derived from it. It is
//! only used to sign Safe transaction hashes and to send plain transactions
//! (funding transfers, `approveHash`, `execTransaction`).

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod backends;

pub use backends::{env_var_for, EnvKeyring, MemoryKeyring};

#[derive(Error, Debug)]
pub enum KeyringError {
    #[error("key not found:: {0}")]
    KeyNotFound(String),

    #[error("key already exists:: {0}")]
    KeyExists(String),

    #[error("invalid private key for {name}:: {reason}")]
    InvalidKey { name: String, reason: String },

    #[error("backend error:: {0}")]
    BackendError(String),
}

/// Public information about a stored key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyInfo {
    pub name: String,
    pub address: Address,
}

/// A named owner identity able to sign
#[derive(Clone)]
pub struct OwnerKey {
    name: String,
    signer: PrivateKeySigner,
}

impl OwnerKey {
    pub fn new(name: impl Into<String>, signer: PrivateKeySigner) -> Self {
        Self {
            name: name.into(),
            signer,
        }
    }

    /// Parse a hex private key, with or without `0x`
    pub fn from_private_key(name: &str, private_key_hex: &str) -> Result<Self, KeyringError> {
        let trimmed = private_key_hex.trim();
        let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let signer = hex.parse::<PrivateKeySigner>().map_err(|e| KeyringError::InvalidKey {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(name, signer))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }

    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            name: self.name.clone(),
            address: self.address(),
        }
    }
}

impl fmt::Debug for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerKey")
            .field("name", &self.name)
            .field("address", &self.address())
            .finish()
    }
}

/// Trait for keyring implementations
#[async_trait]
pub trait Keyring: Send + Sync {
    /// Resolve a key by name; fails if the backing secret is absent
    async fn get_key(&self, name: &str) -> Result<OwnerKey, KeyringError>;

    /// List all keys that currently resolve
    async fn list_keys(&self) -> Result<Vec<KeyInfo>, KeyringError>;

    /// Import a key from a private key hex string
    async fn import_private_key(
        &mut self,
        name: &str,
        private_key_hex: &str,
    ) -> Result<KeyInfo, KeyringError>;
}
