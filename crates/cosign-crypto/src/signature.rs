//! Owner signatures over Safe transaction hashes

use alloy::primitives::{Address, Bytes, PrimitiveSignature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of one packed owner signature (`r ‖ s ‖ v`)
pub const SIGNATURE_LENGTH: usize = 65;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("invalid signature length: expected 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("unsupported signature type v={0}")]
    UnsupportedType(u8),

    #[error("duplicate signature for owner {0}")]
    DuplicateOwner(Address),
}

/// One owner's contribution to a Safe transaction.
///
/// `data` always holds 65 bytes. For ECDSA signatures over the raw hash `v`
/// is 27 or 28, for `eth_sign` signatures 31 or 32, and a pre-validated
/// signature (on-chain `approveHash`, or the executing owner itself) carries
/// the owner in `r`, zero in `s` and `v = 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSignature {
    pub owner: Address,
    pub data: Bytes,
}

impl OwnerSignature {
    pub fn new(owner: Address, data: Bytes) -> Result<Self, SignatureError> {
        if data.len() != SIGNATURE_LENGTH {
            return Err(SignatureError::InvalidLength(data.len()));
        }
        Ok(Self { owner, data })
    }

    /// Signature accepted by the Safe when `owner` approved the hash on chain
    /// or is the account sending `execTransaction`
    pub fn pre_validated(owner: Address) -> Self {
        let mut data = [0u8; SIGNATURE_LENGTH];
        data[12..32].copy_from_slice(owner.as_slice());
        data[64] = 1;
        Self {
            owner,
            data: Bytes::copy_from_slice(&data),
        }
    }

    pub fn is_pre_validated(&self) -> bool {
        self.data.get(64) == Some(&1)
    }
}

/// Sign a Safe transaction hash with an owner's key
pub fn sign_safe_tx_hash(
    signer: &PrivateKeySigner,
    hash: &B256,
) -> Result<OwnerSignature, SignatureError> {
    let signature = signer
        .sign_hash_sync(hash)
        .map_err(|e| SignatureError::SigningFailed(e.to_string()))?;

    Ok(OwnerSignature {
        owner: signer.address(),
        data: Bytes::copy_from_slice(&signature.as_bytes()),
    })
}

/// Recover the owner that produced `signature` for `hash`
pub fn recover_owner(hash: &B256, signature: &[u8]) -> Result<Address, SignatureError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(SignatureError::InvalidLength(signature.len()));
    }

    match signature[64] {
        1 => Ok(Address::from_slice(&signature[12..32])),
        27 | 28 => parse(signature)?
            .recover_address_from_prehash(hash)
            .map_err(|e| SignatureError::InvalidSignature(e.to_string())),
        v @ (31 | 32) => {
            let mut adjusted = [0u8; SIGNATURE_LENGTH];
            adjusted.copy_from_slice(signature);
            adjusted[64] = v - 4;
            parse(&adjusted)?
                .recover_address_from_msg(hash.as_slice())
                .map_err(|e| SignatureError::InvalidSignature(e.to_string()))
        }
        other => Err(SignatureError::UnsupportedType(other)),
    }
}

fn parse(bytes: &[u8]) -> Result<PrimitiveSignature, SignatureError> {
    PrimitiveSignature::try_from(bytes).map_err(|e| SignatureError::InvalidSignature(e.to_string()))
}
