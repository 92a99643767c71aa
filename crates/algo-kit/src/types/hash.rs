//! Protocol hashing and transaction identifiers.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512_256};

use crate::error::ParseHashError;

/// Domain separation tag for transaction ids.
pub const TX_TAG: &[u8] = b"TX";
/// Domain separation tag for transaction group ids.
pub const TX_GROUP_TAG: &[u8] = b"TG";
/// Domain separation tag for logic signature programs.
pub const PROGRAM_TAG: &[u8] = b"Program";
/// Domain separation tag for data signed by a program.
pub const PROGRAM_DATA_TAG: &[u8] = b"ProgData";
/// Domain separation tag for multisig account addresses.
pub const MULTISIG_ADDR_TAG: &[u8] = b"MultisigAddr";

/// SHA-512/256, the protocol's standard hash.
pub fn sha512_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha512_256::digest(data));
    out
}

/// SHA-512/256 over `tag ‖ data`.
pub fn tagged_hash(tag: &[u8], data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    hasher.update(tag);
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// A 32-byte transaction identifier.
///
/// The text form is 52 characters of unpadded base32.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct TxId([u8; 32]);

impl TxId {
    /// Create from raw 32 bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw 32 bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for TxId {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE32_NOPAD
            .decode(s.as_bytes())
            .map_err(|e| ParseHashError::InvalidBase32(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseHashError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl From<[u8; 32]> for TxId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for TxId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE32_NOPAD.encode(&self.0))
    }
}

impl Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self)
    }
}

impl Serialize for TxId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_prefix_is_hash_of_return() {
        assert_eq!(&sha512_256(b"return")[..4], &[21, 31, 124, 117]);
    }

    #[test]
    fn test_tagged_hash_matches_concatenation() {
        let mut joined = TX_TAG.to_vec();
        joined.extend_from_slice(b"payload");
        assert_eq!(tagged_hash(TX_TAG, b"payload"), sha512_256(&joined));
    }

    #[test]
    fn test_txid_display_parse_roundtrip() {
        let id = TxId::from_bytes(sha512_256(b"some transaction"));
        let s = id.to_string();
        assert_eq!(s.len(), 52);
        let parsed: TxId = s.parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_txid_rejects_wrong_length() {
        let short = BASE32_NOPAD.encode(&[1u8; 16]);
        assert_eq!(
            short.parse::<TxId>(),
            Err(ParseHashError::InvalidLength(16))
        );
        assert!(matches!(
            "not base32!".parse::<TxId>(),
            Err(ParseHashError::InvalidBase32(_))
        ));
    }
}
