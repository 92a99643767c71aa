//! Account addresses.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::hash::sha512_256;
use crate::error::ParseAddressError;

const CHECKSUM_LEN: usize = 4;
const ADDRESS_TEXT_LEN: usize = 58;

/// A 32-byte account address (an ed25519 public key or a program/multisig hash).
///
/// The text form is base32 (no padding) of the key followed by the last four
/// bytes of its SHA-512/256 digest.
///
/// ```rust
/// use algo_kit::Address;
///
/// let addr: Address = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ".parse().unwrap();
/// assert!(addr.is_zero());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0; 32]);

    /// Create from raw 32 bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw 32 bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let digest = sha512_256(&self.0);
        let mut out = [0u8; CHECKSUM_LEN];
        out.copy_from_slice(&digest[32 - CHECKSUM_LEN..]);
        out
    }
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ADDRESS_TEXT_LEN {
            return Err(ParseAddressError::InvalidLength(s.len()));
        }
        let bytes = BASE32_NOPAD
            .decode(s.as_bytes())
            .map_err(|e| ParseAddressError::InvalidBase32(e.to_string()))?;

        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[..32]);
        let address = Self(key);
        if bytes[32..] != address.checksum() {
            return Err(ParseAddressError::InvalidChecksum);
        }
        Ok(address)
    }
}

impl TryFrom<&str> for Address {
    type Error = ParseAddressError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::with_capacity(32 + CHECKSUM_LEN);
        buf.extend_from_slice(&self.0);
        buf.extend_from_slice(&self.checksum());
        f.write_str(&BASE32_NOPAD.encode(&buf))
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
