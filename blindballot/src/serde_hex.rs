use crate::BigUint;
use ed25519_dalek::PublicKey;
use serde::{de, Deserialize, Deserializer, Serializer};

/// Encode bytes as `0x`-prefixed lowercase hex
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "0x00".to_owned();
    }
    format!("0x{}", hex::encode(bytes))
}

/// Decode hex with or without a `0x` prefix. Odd-length input is left-padded with a zero.
pub fn from_prefixed_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() % 2 == 1 {
        hex::decode(format!("0{}", s))
    } else {
        hex::decode(s)
    }
}

/// Encode a big integer as `0x`-prefixed, even-length lowercase hex
pub fn biguint_to_hex(n: &BigUint) -> String {
    to_prefixed_hex(&n.to_bytes_be())
}

/// Decode a big integer from hex, with or without a `0x` prefix
pub fn biguint_from_hex(s: &str) -> Result<BigUint, hex::FromHexError> {
    Ok(BigUint::from_bytes_be(&from_prefixed_hex(s)?))
}

// a single-purpose type for use in `#[serde(with)]`
pub enum BigUintHex {}

impl BigUintHex {
    pub fn serialize<S: Serializer>(n: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&biguint_to_hex(n))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        biguint_from_hex(&s).map_err(de::Error::custom)
    }
}

// a single-purpose type for use in `#[serde(with)]`
pub enum BytesHex {}

impl BytesHex {
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        from_prefixed_hex(&s).map_err(de::Error::custom)
    }
}

// a single-purpose type for use in `#[serde(with)]`
pub enum EdPublicKeyHex {}

impl EdPublicKeyHex {
    pub fn serialize<S: Serializer>(public_key: &PublicKey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&to_prefixed_hex(public_key.as_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PublicKey, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = from_prefixed_hex(&s).map_err(de::Error::custom)?;
        PublicKey::from_bytes(&bytes).map_err(de::Error::custom)
    }
}
