//! Cryptographic primitives for cosign
//!
//! This crate computes the EIP-712 digest owners sign for a Safe transaction,
//! produces and checks owner signatures, and packs them into the byte layout
//! the Safe contract expects at execution time.

pub mod hash;
pub mod multisig;
pub mod signature;

pub use hash::{domain_separator, safe_tx_hash, SafeTx, DOMAIN_SEPARATOR_TYPEHASH, SAFE_TX_TYPEHASH};
pub use multisig::pack_signatures;
pub use signature::{recover_owner, sign_safe_tx_hash, OwnerSignature, SignatureError};
