//! Ed25519 keys and signatures.

use std::fmt::{self, Debug, Display};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use super::Address;
use crate::error::ParseKeyError;

/// An ed25519 secret key (32-byte seed).
#[derive(Clone)]
pub struct SecretKey {
    signing_key: SigningKey,
}

impl SecretKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create a secret key from a raw 32-byte seed.
    pub fn from_bytes(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Create a secret key from a seed slice.
    ///
    /// Accepts either the 32-byte seed or the 64-byte `seed ‖ public key`
    /// layout used by most wallets.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ParseKeyError> {
        let seed: [u8; 32] = match bytes.len() {
            32 | 64 => bytes[..32].try_into().map_err(|_| ParseKeyError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?,
            actual => return Err(ParseKeyError::InvalidLength { expected: 32, actual }),
        };
        let key = Self::from_bytes(seed);
        if bytes.len() == 64 && bytes[32..] != key.address().as_bytes()[..] {
            return Err(ParseKeyError::InvalidEncoding(
                "public key half does not match the seed".to_string(),
            ));
        }
        Ok(key)
    }

    /// Decode a base64 secret key (32- or 64-byte layout).
    pub fn from_base64(s: &str) -> Result<Self, ParseKeyError> {
        let bytes = STANDARD
            .decode(s)
            .map_err(|e| ParseKeyError::InvalidEncoding(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// The 32-byte seed.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The address controlled by this key (its public key).
    pub fn address(&self) -> Address {
        Address::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("address", &self.address())
            .finish()
    }
}

/// A 64-byte ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Create from raw 64 bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw signature bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Verify this signature against a message and the signer's address.
    pub fn verify(&self, message: &[u8], signer: &Address) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&self.0);
        verifying_key.verify_strict(message, &signature).is_ok()
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = ParseKeyError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 64] = bytes.try_into().map_err(|_| ParseKeyError::InvalidLength {
            expected: 64,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&STANDARD.encode(self.0))
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let key = SecretKey::generate();
        let sig = key.sign(b"hello");
        assert!(sig.verify(b"hello", &key.address()));
        assert!(!sig.verify(b"goodbye", &key.address()));
    }

    #[test]
    fn test_from_bytes_is_deterministic() {
        let a = SecretKey::from_bytes([7u8; 32]);
        let b = SecretKey::from_bytes([7u8; 32]);
        assert_eq!(a.address(), b.address());
        assert_eq!(a.sign(b"m"), b.sign(b"m"));
        assert_eq!(a.to_bytes(), [7u8; 32]);
    }

    #[test]
    fn test_from_slice_64_byte_layout() {
        let key = SecretKey::from_bytes([9u8; 32]);
        let mut full = key.to_bytes().to_vec();
        full.extend_from_slice(key.address().as_bytes());
        let parsed = SecretKey::from_slice(&full).unwrap();
        assert_eq!(parsed.address(), key.address());

        full[40] ^= 1;
        assert!(SecretKey::from_slice(&full).is_err());
    }

    #[test]
    fn test_from_slice_bad_length() {
        assert_eq!(
            SecretKey::from_slice(&[0u8; 31]).unwrap_err(),
            ParseKeyError::InvalidLength {
                expected: 32,
                actual: 31
            }
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = SecretKey::from_bytes([1u8; 32]);
        let debug = format!("{:?}", key);
        assert!(debug.contains("address"));
        assert!(!debug.contains("signing_key"));
    }

    #[test]
    fn test_signature_try_from() {
        assert!(Signature::try_from(&[0u8; 64][..]).is_ok());
        assert!(Signature::try_from(&[0u8; 63][..]).is_err());
    }
}
