//! Packing owner signatures for `execTransaction`

use crate::signature::{OwnerSignature, SignatureError, SIGNATURE_LENGTH};
use alloy::primitives::Bytes;

/// Concatenate owner signatures in ascending owner order.
///
/// The Safe contract walks the packed signatures and requires each recovered
/// owner to be strictly greater than the previous one, so a duplicate owner
/// is rejected here rather than on chain.
pub fn pack_signatures(mut signatures: Vec<OwnerSignature>) -> Result<Bytes, SignatureError> {
    signatures.sort_by(|a, b| a.owner.cmp(&b.owner));

    for window in signatures.windows(2) {
        if window[0].owner == window[1].owner {
            return Err(SignatureError::DuplicateOwner(window[0].owner));
        }
    }

    let mut packed = Vec::with_capacity(signatures.len() * SIGNATURE_LENGTH);
    for signature in &signatures {
        if signature.data.len() != SIGNATURE_LENGTH {
            return Err(SignatureError::InvalidLength(signature.data.len()));
        }
        packed.extend_from_slice(&signature.data);
    }

    Ok(packed.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::sign_safe_tx_hash;
    use alloy::primitives::{address, b256, B256};
    use alloy::signers::local::PrivateKeySigner;

    const HASH: B256 = b256!("2222222222222222222222222222222222222222222222222222222222222222");

    fn signer(key: &str) -> PrivateKeySigner {
        key.parse().unwrap()
    }

    #[test]
    fn test_packs_in_ascending_owner_order() {
        // 0xf39f.. sorts after 0x7099..
        let high = sign_safe_tx_hash(
            &signer("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"),
            &HASH,
        )
        .unwrap();
        let low = sign_safe_tx_hash(
            &signer("59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"),
            &HASH,
        )
        .unwrap();

        let packed = pack_signatures(vec![high.clone(), low.clone()]).unwrap();

        assert_eq!(packed.len(), 2 * SIGNATURE_LENGTH);
        assert_eq!(&packed[..SIGNATURE_LENGTH], low.data.as_ref());
        assert_eq!(&packed[SIGNATURE_LENGTH..], high.data.as_ref());
    }

    #[test]
    fn test_mixes_pre_validated_signatures() {
        let executor = address!("3c44cdddb6a900fa2b585dd299e03d12fa4293bc");
        let confirmer = sign_safe_tx_hash(
            &signer("59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"),
            &HASH,
        )
        .unwrap();

        let packed =
            pack_signatures(vec![OwnerSignature::pre_validated(executor), confirmer]).unwrap();

        assert_eq!(packed.len(), 2 * SIGNATURE_LENGTH);
        // 0x3c44.. sorts first
        assert_eq!(packed[SIGNATURE_LENGTH - 1], 1);
    }

    #[test]
    fn test_rejects_duplicate_owner() {
        let owner = address!("70997970c51812dc3a010c7d01b50e0d17dc79c8");
        let err = pack_signatures(vec![
            OwnerSignature::pre_validated(owner),
            OwnerSignature::pre_validated(owner),
        ])
        .unwrap_err();
        assert_eq!(err, SignatureError::DuplicateOwner(owner));
    }

    #[test]
    fn test_empty_set_packs_to_nothing() {
        assert!(pack_signatures(Vec::new()).unwrap().is_empty());
    }
}
