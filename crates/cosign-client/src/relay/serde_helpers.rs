//! Lenient (de)serializers for transaction service JSON.
//!
//! The service is inconsistent about numbers: `value` and `gasPrice` arrive
//! as decimal strings, `nonce` and `safeTxGas` as numbers or strings
//! depending on the deployment. Amounts always go out as decimal strings.

use alloy::primitives::{Address, U256};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serializer};
use std::fmt;

struct NumberOrString;

impl<'de> Visitor<'de> for NumberOrString {
    type Value = U256;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an unsigned integer or a decimal/hex string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<U256, E> {
        u64::try_from(v)
            .map(U256::from)
            .map_err(|_| E::custom(format!("negative amount {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
        let v = v.trim();
        let parsed = match v.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16),
            None => U256::from_str_radix(v, 10),
        };
        parsed.map_err(|e| E::custom(format!("invalid number {v:?}:: {e}")))
    }

    fn visit_unit<E: de::Error>(self) -> Result<U256, E> {
        Ok(U256::ZERO)
    }
}

/// `U256` written as a decimal string, read from a number or a string
pub mod u256_decimal {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        deserializer.deserialize_any(NumberOrString)
    }
}

/// `u64` written as a number, read from a number or a string
pub mod u64_lenient {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let wide = deserializer.deserialize_any(NumberOrString)?;
        u64::try_from(wide).map_err(|_| de::Error::custom(format!("{wide} does not fit in u64")))
    }
}

/// Addresses the service only accepts in EIP-55 checksum form
pub mod checksummed {
    use super::*;

    pub fn serialize<S: Serializer>(address: &Address, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&address.to_checksum(None))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Address, D::Error> {
        Address::deserialize(deserializer)
    }
}

/// Treat an explicit `null` like a missing field
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize)]
    struct Amounts {
        #[serde(with = "u256_decimal")]
        value: U256,
        #[serde(with = "u64_lenient")]
        nonce: u64,
        #[serde(default, deserialize_with = "null_as_default")]
        tags: Vec<String>,
    }

    #[test]
    fn test_reads_numbers_and_strings() {
        let from_strings: Amounts =
            serde_json::from_str(r#"{"value":"5000000000000000","nonce":"7","tags":null}"#)
                .unwrap();
        assert_eq!(from_strings.value, U256::from(5_000_000_000_000_000u64));
        assert_eq!(from_strings.nonce, 7);
        assert!(from_strings.tags.is_empty());

        let from_numbers: Amounts =
            serde_json::from_str(r#"{"value":10000000000000000,"nonce":7}"#).unwrap();
        assert_eq!(from_numbers.value, U256::from(10_000_000_000_000_000u64));
        assert_eq!(from_numbers.nonce, 7);

        let from_hex: Amounts = serde_json::from_str(r#"{"value":"0x10","nonce":0}"#).unwrap();
        assert_eq!(from_hex.value, U256::from(16u64));
    }

    #[test]
    fn test_writes_decimal_strings() {
        let json = serde_json::to_value(Amounts {
            value: U256::from(10_000_000_000_000_000u64),
            nonce: 3,
            tags: vec![],
        })
        .unwrap();
        assert_eq!(json["value"], "10000000000000000");
        assert_eq!(json["nonce"], 3);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(serde_json::from_str::<Amounts>(r#"{"value":"ten","nonce":1}"#).is_err());
        assert!(serde_json::from_str::<Amounts>(r#"{"value":1,"nonce":-1}"#).is_err());
    }
}
