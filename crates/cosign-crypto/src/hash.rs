//! EIP-712 hashing of Safe transactions
//!
//! Safe contracts from v1.3.0 on use a domain made of `chainId` and
//! `verifyingContract` only, and a `SafeTx` struct whose field order matches
//! `execTransaction`.

use alloy::primitives::{b256, Address, B256, U256};
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct};
use cosign_types::SafeTransactionData;

sol! {
    #[derive(Debug)]
    struct SafeTx {
        address to;
        uint256 value;
        bytes data;
        uint8 operation;
        uint256 safeTxGas;
        uint256 baseGas;
        uint256 gasPrice;
        address gasToken;
        address refundReceiver;
        uint256 nonce;
    }
}

/// `keccak256("EIP712Domain(uint256 chainId,address verifyingContract)")`
pub const DOMAIN_SEPARATOR_TYPEHASH: B256 =
    b256!("47e79534a245952e8b16893a336b85a3d9ea9fa8c573f3d803afb92a79469218");

/// `keccak256("SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)")`
pub const SAFE_TX_TYPEHASH: B256 =
    b256!("bb8310d486368db6bd6f849402fdd73ad53d316b5a4b2644ad6efe0f941286d8");

fn domain(safe: Address, chain_id: u64) -> Eip712Domain {
    Eip712Domain::new(None, None, Some(U256::from(chain_id)), Some(safe), None)
}

/// Domain separator of the Safe at `safe` on `chain_id`
pub fn domain_separator(safe: Address, chain_id: u64) -> B256 {
    domain(safe, chain_id).separator()
}

impl From<&SafeTransactionData> for SafeTx {
    fn from(tx: &SafeTransactionData) -> Self {
        SafeTx {
            to: tx.to,
            value: tx.value,
            data: tx.data.clone(),
            operation: tx.operation.into(),
            safeTxGas: tx.safe_tx_gas,
            baseGas: tx.base_gas,
            gasPrice: tx.gas_price,
            gasToken: tx.gas_token,
            refundReceiver: tx.refund_receiver,
            nonce: U256::from(tx.nonce),
        }
    }
}

/// Transaction hash owners sign, identical to `Safe.getTransactionHash`
pub fn safe_tx_hash(tx: &SafeTransactionData, safe: Address, chain_id: u64) -> B256 {
    SafeTx::from(tx).eip712_signing_hash(&domain(safe, chain_id))
}
