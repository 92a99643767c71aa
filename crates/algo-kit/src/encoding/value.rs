//! Schema-neutral encoding data.

use std::collections::BTreeMap;

use crate::error::EncodingError;
use crate::types::Address;

/// Logical encoding data exchanged between entities and their schemas.
///
/// Entities convert themselves to and from a `Value`; a [`Schema`](super::Schema)
/// projects a `Value` to msgpack or JSON and back.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent optional value.
    #[default]
    Null,
    Bool(bool),
    Uint(u64),
    String(String),
    Bytes(Vec<u8>),
    Address(Address),
    Array(Vec<Value>),
    /// A named-field or string-keyed map.
    Map(Fields),
    /// An integer-keyed map.
    UintMap(BTreeMap<u64, Value>),
    /// Raw msgpack passed through untouched.
    Untyped(rmpv::Value),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Uint(_) => "uint64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Address(_) => "address",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::UintMap(_) => "uint64 map",
            Value::Untyped(_) => "untyped",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn into_u64(self) -> Result<u64, EncodingError> {
        match self {
            Value::Uint(n) => Ok(n),
            other => Err(EncodingError::unexpected("uint64", other.kind())),
        }
    }

    pub fn into_bool(self) -> Result<bool, EncodingError> {
        match self {
            Value::Bool(b) => Ok(b),
            other => Err(EncodingError::unexpected("bool", other.kind())),
        }
    }

    pub fn into_string(self) -> Result<String, EncodingError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(EncodingError::unexpected("string", other.kind())),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, EncodingError> {
        match self {
            Value::Bytes(b) => Ok(b),
            other => Err(EncodingError::unexpected("bytes", other.kind())),
        }
    }

    /// Bytes of an exact length.
    pub fn into_fixed<const N: usize>(self) -> Result<[u8; N], EncodingError> {
        let bytes = self.into_bytes()?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| EncodingError::InvalidLength {
                expected: N,
                actual: bytes.len(),
            })
    }

    pub fn into_address(self) -> Result<Address, EncodingError> {
        match self {
            Value::Address(a) => Ok(a),
            other => Err(EncodingError::unexpected("address", other.kind())),
        }
    }

    pub fn into_array(self) -> Result<Vec<Value>, EncodingError> {
        match self {
            Value::Array(items) => Ok(items),
            other => Err(EncodingError::unexpected("array", other.kind())),
        }
    }

    pub fn into_fields(self) -> Result<Fields, EncodingError> {
        match self {
            Value::Map(fields) => Ok(fields),
            other => Err(EncodingError::unexpected("map", other.kind())),
        }
    }

    pub fn into_uint_map(self) -> Result<BTreeMap<u64, Value>, EncodingError> {
        match self {
            Value::UintMap(map) => Ok(map),
            other => Err(EncodingError::unexpected("uint64 map", other.kind())),
        }
    }

    /// `Null` maps to `None`, anything else to `Some`.
    pub fn into_option(self) -> Option<Value> {
        match self {
            Value::Null => None,
            other => Some(other),
        }
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Uint(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Value {
    fn from(b: [u8; N]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Address> for Value {
    fn from(a: Address) -> Self {
        Value::Address(a)
    }
}

impl From<Fields> for Value {
    fn from(f: Fields) -> Self {
        Value::Map(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// Fields
// ============================================================================

/// Field storage for named-map entities, keyed by wire key.
///
/// Built fluently when encoding; drained with the `take_*` accessors when
/// decoding. Decoded maps always carry every schema key, with defaults
/// restored for omitted ones.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, builder style.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge another entity's fields in (used for embedded records).
    pub fn merge(mut self, other: Fields) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Remove a field, failing if it is absent.
    pub fn take(&mut self, key: &str) -> Result<Value, EncodingError> {
        self.0
            .remove(key)
            .ok_or_else(|| EncodingError::MissingKey(key.to_string()))
    }

    pub fn take_u64(&mut self, key: &str) -> Result<u64, EncodingError> {
        self.take(key)?.into_u64()
    }

    pub fn take_bool(&mut self, key: &str) -> Result<bool, EncodingError> {
        self.take(key)?.into_bool()
    }

    pub fn take_string(&mut self, key: &str) -> Result<String, EncodingError> {
        self.take(key)?.into_string()
    }

    pub fn take_bytes(&mut self, key: &str) -> Result<Vec<u8>, EncodingError> {
        self.take(key)?.into_bytes()
    }

    pub fn take_fixed<const N: usize>(&mut self, key: &str) -> Result<[u8; N], EncodingError> {
        self.take(key)?.into_fixed()
    }

    pub fn take_address(&mut self, key: &str) -> Result<Address, EncodingError> {
        self.take(key)?.into_address()
    }

    pub fn take_array(&mut self, key: &str) -> Result<Vec<Value>, EncodingError> {
        self.take(key)?.into_array()
    }

    pub fn take_fields(&mut self, key: &str) -> Result<Fields, EncodingError> {
        self.take(key)?.into_fields()
    }

    /// Take an optional field: `Null` becomes `None`.
    pub fn take_optional(&mut self, key: &str) -> Result<Option<Value>, EncodingError> {
        Ok(self.take(key)?.into_option())
    }

    /// Take an address that is omitted when zero.
    pub fn take_nonzero_address(&mut self, key: &str) -> Result<Option<Address>, EncodingError> {
        let address = self.take_address(key)?;
        Ok((!address.is_zero()).then_some(address))
    }

    /// Take fixed-length bytes that are omitted when all zero.
    pub fn take_nonzero_fixed<const N: usize>(
        &mut self,
        key: &str,
    ) -> Result<Option<[u8; N]>, EncodingError> {
        let bytes: [u8; N] = self.take_fixed(key)?;
        Ok(bytes.iter().any(|b| *b != 0).then_some(bytes))
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
