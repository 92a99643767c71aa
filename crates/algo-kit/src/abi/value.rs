//! ABI values.

use num_bigint::BigUint;

use crate::types::Address;

/// A value conforming to some [`AbiType`](super::AbiType).
///
/// Integers of every width (and the raw scaled integer of a `ufixed`) are
/// `Uint`. Static arrays, dynamic arrays and tuples are all `Array`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiValue {
    Uint(BigUint),
    Bool(bool),
    Byte(u8),
    Address(Address),
    String(String),
    Array(Vec<AbiValue>),
}

impl AbiValue {
    /// A `byte[]` or `byte[N]` value.
    pub fn bytes(bytes: impl AsRef<[u8]>) -> Self {
        AbiValue::Array(bytes.as_ref().iter().copied().map(AbiValue::Byte).collect())
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            AbiValue::Uint(_) => "integer",
            AbiValue::Bool(_) => "bool",
            AbiValue::Byte(_) => "byte",
            AbiValue::Address(_) => "address",
            AbiValue::String(_) => "string",
            AbiValue::Array(_) => "array",
        }
    }

    /// The integer, if it is one and fits in 64 bits.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            AbiValue::Uint(n) => u64::try_from(n).ok(),
            _ => None,
        }
    }

    pub fn as_biguint(&self) -> Option<&BigUint> {
        match self {
            AbiValue::Uint(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            AbiValue::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AbiValue]> {
        match self {
            AbiValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The bytes of a byte array.
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        self.as_array()?
            .iter()
            .map(|v| match v {
                AbiValue::Byte(b) => Some(*b),
                _ => None,
            })
            .collect()
    }
}

impl From<u64> for AbiValue {
    fn from(n: u64) -> Self {
        AbiValue::Uint(BigUint::from(n))
    }
}

impl From<u32> for AbiValue {
    fn from(n: u32) -> Self {
        AbiValue::Uint(BigUint::from(n))
    }
}

impl From<u128> for AbiValue {
    fn from(n: u128) -> Self {
        AbiValue::Uint(BigUint::from(n))
    }
}

impl From<BigUint> for AbiValue {
    fn from(n: BigUint) -> Self {
        AbiValue::Uint(n)
    }
}

impl From<bool> for AbiValue {
    fn from(b: bool) -> Self {
        AbiValue::Bool(b)
    }
}

impl From<&str> for AbiValue {
    fn from(s: &str) -> Self {
        AbiValue::String(s.to_string())
    }
}

impl From<String> for AbiValue {
    fn from(s: String) -> Self {
        AbiValue::String(s)
    }
}

impl From<Address> for AbiValue {
    fn from(a: Address) -> Self {
        AbiValue::Address(a)
    }
}

impl From<Vec<AbiValue>> for AbiValue {
    fn from(items: Vec<AbiValue>) -> Self {
        AbiValue::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(AbiValue::from(7u64).as_u64(), Some(7));
        assert_eq!(AbiValue::from(u128::MAX).as_u64(), None);
        assert_eq!(AbiValue::from("x").as_str(), Some("x"));
        assert_eq!(AbiValue::bytes(b"ab").to_bytes(), Some(b"ab".to_vec()));
        assert_eq!(
            AbiValue::Array(vec![AbiValue::from(1u64)]).to_bytes(),
            None
        );
    }
}
