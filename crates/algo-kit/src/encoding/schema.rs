//! Declarative schemas and their binary/JSON projections.

use std::collections::{BTreeMap, HashSet};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rmpv::Value as Msgpack;
use serde_json::Value as Json;

use super::msgpack::{json_to_msgpack, msgpack_to_json};
use super::value::{Fields, Value};
use crate::error::EncodingError;
use crate::types::Address;

/// A lazily resolved schema, used for references between entities and for
/// recursive types. The getter memoizes its result.
pub type SchemaRef = fn() -> &'static Schema;

/// Describes how one semantic type is defaulted, projected and restored.
#[derive(Debug, Clone)]
pub enum Schema {
    Uint64,
    Boolean,
    String,
    ByteArray,
    /// Byte string of an exact length; defaults to that many zero bytes.
    FixedBytes(usize),
    Address,
    Array(Box<Schema>),
    NamedMap(NamedMapSchema),
    Uint64Map(Box<Schema>),
    StringMap(Box<Schema>),
    /// `Null` when absent. Both `Null` and the inner default count as default.
    Optional(Box<Schema>),
    Untyped,
    Ref(SchemaRef),
}

impl Schema {
    pub fn array(inner: Schema) -> Self {
        Schema::Array(Box::new(inner))
    }

    pub fn optional(inner: Schema) -> Self {
        Schema::Optional(Box::new(inner))
    }

    pub fn uint64_map(inner: Schema) -> Self {
        Schema::Uint64Map(Box::new(inner))
    }

    pub fn string_map(inner: Schema) -> Self {
        Schema::StringMap(Box::new(inner))
    }

    pub fn named_map(entries: Vec<MapEntry>) -> Self {
        Schema::NamedMap(NamedMapSchema::new(entries))
    }

    /// Follow `Ref` links to a concrete schema.
    pub fn resolve(&self) -> &Schema {
        match self {
            Schema::Ref(getter) => getter().resolve(),
            other => other,
        }
    }

    pub fn default_value(&self) -> Value {
        match self.resolve() {
            Schema::Uint64 => Value::Uint(0),
            Schema::Boolean => Value::Bool(false),
            Schema::String => Value::String(String::new()),
            Schema::ByteArray => Value::Bytes(Vec::new()),
            Schema::FixedBytes(len) => Value::Bytes(vec![0; *len]),
            Schema::Address => Value::Address(Address::ZERO),
            Schema::Array(_) => Value::Array(Vec::new()),
            Schema::NamedMap(map) => Value::Map(map.default_fields()),
            Schema::Uint64Map(_) => Value::UintMap(BTreeMap::new()),
            Schema::StringMap(_) => Value::Map(Fields::new()),
            Schema::Optional(_) => Value::Null,
            Schema::Untyped => Value::Untyped(Msgpack::Nil),
            Schema::Ref(_) => unreachable!("resolved above"),
        }
    }

    pub fn is_default(&self, value: &Value) -> bool {
        match (self.resolve(), value) {
            (Schema::Uint64, Value::Uint(n)) => *n == 0,
            (Schema::Boolean, Value::Bool(b)) => !*b,
            (Schema::String, Value::String(s)) => s.is_empty(),
            (Schema::ByteArray, Value::Bytes(b)) => b.is_empty(),
            (Schema::FixedBytes(_), Value::Bytes(b)) => b.iter().all(|x| *x == 0),
            (Schema::Address, Value::Address(a)) => a.is_zero(),
            (Schema::Array(_), Value::Array(items)) => items.is_empty(),
            (Schema::NamedMap(map), Value::Map(fields)) => map.is_default(fields),
            (Schema::Uint64Map(_), Value::UintMap(m)) => m.is_empty(),
            (Schema::StringMap(_), Value::Map(m)) => m.is_empty(),
            (Schema::Optional(_), Value::Null) => true,
            (Schema::Optional(inner), v) => inner.is_default(v),
            (Schema::Untyped, Value::Untyped(v)) => v.is_nil(),
            (Schema::Untyped, Value::Null) => true,
            _ => false,
        }
    }

    // ------------------------------------------------------------------------
    // Binary projection
    // ------------------------------------------------------------------------

    /// Project a value into its msgpack form.
    pub fn to_msgpack(&self, value: &Value) -> Result<Msgpack, EncodingError> {
        match (self.resolve(), value) {
            (Schema::Uint64, Value::Uint(n)) => Ok(Msgpack::from(*n)),
            (Schema::Boolean, Value::Bool(b)) => Ok(Msgpack::Boolean(*b)),
            (Schema::String, Value::String(s)) => Ok(Msgpack::from(s.as_str())),
            (Schema::ByteArray, Value::Bytes(b)) => Ok(Msgpack::Binary(b.clone())),
            (Schema::FixedBytes(len), Value::Bytes(b)) => {
                check_len(*len, b.len())?;
                Ok(Msgpack::Binary(b.clone()))
            }
            (Schema::Address, Value::Address(a)) => Ok(Msgpack::Binary(a.as_bytes().to_vec())),
            (Schema::Array(inner), Value::Array(items)) => Ok(Msgpack::Array(
                items
                    .iter()
                    .map(|item| inner.to_msgpack(item))
                    .collect::<Result<_, _>>()?,
            )),
            (Schema::NamedMap(map), Value::Map(fields)) => map.to_msgpack(fields),
            (Schema::Uint64Map(inner), Value::UintMap(m)) => Ok(Msgpack::Map(
                m.iter()
                    .map(|(k, v)| Ok((Msgpack::from(*k), inner.to_msgpack(v)?)))
                    .collect::<Result<_, EncodingError>>()?,
            )),
            (Schema::StringMap(inner), Value::Map(m)) => Ok(Msgpack::Map(
                m.iter()
                    .map(|(k, v)| Ok((Msgpack::from(k.as_str()), inner.to_msgpack(v)?)))
                    .collect::<Result<_, EncodingError>>()?,
            )),
            (Schema::Optional(_), Value::Null) => Ok(Msgpack::Nil),
            (Schema::Optional(inner), v) => inner.to_msgpack(v),
            (Schema::Untyped, Value::Untyped(v)) => Ok(v.clone()),
            (Schema::Untyped, Value::Null) => Ok(Msgpack::Nil),
            (schema, v) => Err(EncodingError::unexpected(schema.expected(), v.kind())),
        }
    }

    /// Restore a value from its msgpack form.
    pub fn from_msgpack(&self, raw: Msgpack) -> Result<Value, EncodingError> {
        match (self.resolve(), raw) {
            (Schema::Uint64, Msgpack::Integer(i)) => i
                .as_u64()
                .map(Value::Uint)
                .ok_or_else(|| EncodingError::unexpected("uint64", i)),
            (Schema::Boolean, Msgpack::Boolean(b)) => Ok(Value::Bool(b)),
            (Schema::String, Msgpack::String(s)) => s
                .into_str()
                .map(Value::String)
                .ok_or_else(|| EncodingError::invalid("string is not valid UTF-8")),
            (Schema::ByteArray, Msgpack::Binary(b)) => Ok(Value::Bytes(b)),
            (Schema::FixedBytes(len), Msgpack::Binary(b)) => {
                check_len(*len, b.len())?;
                Ok(Value::Bytes(b))
            }
            (Schema::Address, Msgpack::Binary(b)) => {
                let key: [u8; 32] = b.as_slice().try_into().map_err(|_| {
                    EncodingError::InvalidLength {
                        expected: 32,
                        actual: b.len(),
                    }
                })?;
                Ok(Value::Address(Address::from_bytes(key)))
            }
            (Schema::Array(inner), Msgpack::Array(items)) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(|item| inner.from_msgpack(item))
                    .collect::<Result<_, _>>()?,
            )),
            (Schema::NamedMap(map), Msgpack::Map(pairs)) => map.from_msgpack(pairs),
            (Schema::Uint64Map(inner), Msgpack::Map(pairs)) => {
                let mut out = BTreeMap::new();
                for (k, v) in pairs {
                    let key = match k {
                        Msgpack::Integer(i) => i
                            .as_u64()
                            .ok_or_else(|| EncodingError::unexpected("uint64 key", i))?,
                        other => return Err(EncodingError::unexpected("uint64 key", other)),
                    };
                    out.insert(key, inner.from_msgpack(v)?);
                }
                Ok(Value::UintMap(out))
            }
            (Schema::StringMap(inner), Msgpack::Map(pairs)) => {
                let mut out = Fields::new();
                for (k, v) in pairs {
                    out.insert(string_key(k)?, inner.from_msgpack(v)?);
                }
                Ok(Value::Map(out))
            }
            (Schema::Optional(_), Msgpack::Nil) => Ok(Value::Null),
            (Schema::Optional(inner), raw) => inner.from_msgpack(raw),
            (Schema::Untyped, raw) => Ok(Value::Untyped(raw)),
            (schema, raw) => Err(EncodingError::unexpected(schema.expected(), raw)),
        }
    }

    // ------------------------------------------------------------------------
    // JSON projection
    // ------------------------------------------------------------------------

    /// Project a value into its human-readable JSON form.
    pub fn to_json(&self, value: &Value) -> Result<Json, EncodingError> {
        match (self.resolve(), value) {
            (Schema::Uint64, Value::Uint(n)) => Ok(Json::from(*n)),
            (Schema::Boolean, Value::Bool(b)) => Ok(Json::Bool(*b)),
            (Schema::String, Value::String(s)) => Ok(Json::String(s.clone())),
            (Schema::ByteArray, Value::Bytes(b)) => Ok(Json::String(STANDARD.encode(b))),
            (Schema::FixedBytes(len), Value::Bytes(b)) => {
                check_len(*len, b.len())?;
                Ok(Json::String(STANDARD.encode(b)))
            }
            (Schema::Address, Value::Address(a)) => Ok(Json::String(a.to_string())),
            (Schema::Array(inner), Value::Array(items)) => Ok(Json::Array(
                items
                    .iter()
                    .map(|item| inner.to_json(item))
                    .collect::<Result<_, _>>()?,
            )),
            (Schema::NamedMap(map), Value::Map(fields)) => map.to_json(fields),
            (Schema::Uint64Map(inner), Value::UintMap(m)) => Ok(Json::Object(
                m.iter()
                    .map(|(k, v)| Ok((k.to_string(), inner.to_json(v)?)))
                    .collect::<Result<_, EncodingError>>()?,
            )),
            (Schema::StringMap(inner), Value::Map(m)) => Ok(Json::Object(
                m.iter()
                    .map(|(k, v)| Ok((k.clone(), inner.to_json(v)?)))
                    .collect::<Result<_, EncodingError>>()?,
            )),
            (Schema::Optional(_), Value::Null) => Ok(Json::Null),
            (Schema::Optional(inner), v) => inner.to_json(v),
            (Schema::Untyped, Value::Untyped(v)) => Ok(msgpack_to_json(v)),
            (Schema::Untyped, Value::Null) => Ok(Json::Null),
            (schema, v) => Err(EncodingError::unexpected(schema.expected(), v.kind())),
        }
    }

    /// Restore a value from its JSON form.
    pub fn from_json(&self, json: Json) -> Result<Value, EncodingError> {
        match (self.resolve(), json) {
            (Schema::Uint64, Json::Number(n)) => n
                .as_u64()
                .map(Value::Uint)
                .ok_or_else(|| EncodingError::unexpected("uint64", n)),
            (Schema::Boolean, Json::Bool(b)) => Ok(Value::Bool(b)),
            (Schema::String, Json::String(s)) => Ok(Value::String(s)),
            (Schema::ByteArray, Json::String(s)) => Ok(Value::Bytes(decode_base64(&s)?)),
            (Schema::FixedBytes(len), Json::String(s)) => {
                let bytes = decode_base64(&s)?;
                check_len(*len, bytes.len())?;
                Ok(Value::Bytes(bytes))
            }
            (Schema::Address, Json::String(s)) => Ok(Value::Address(s.parse()?)),
            (Schema::Array(inner), Json::Array(items)) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(|item| inner.from_json(item))
                    .collect::<Result<_, _>>()?,
            )),
            (Schema::NamedMap(map), Json::Object(obj)) => map.from_json(obj),
            (Schema::Uint64Map(inner), Json::Object(obj)) => {
                let mut out = BTreeMap::new();
                for (k, v) in obj {
                    let key = k
                        .parse::<u64>()
                        .map_err(|_| EncodingError::unexpected("uint64 key", &k))?;
                    out.insert(key, inner.from_json(v)?);
                }
                Ok(Value::UintMap(out))
            }
            (Schema::StringMap(inner), Json::Object(obj)) => {
                let mut out = Fields::new();
                for (k, v) in obj {
                    let value = inner.from_json(v)?;
                    out.insert(k, value);
                }
                Ok(Value::Map(out))
            }
            (Schema::Optional(_), Json::Null) => Ok(Value::Null),
            (Schema::Optional(inner), json) => inner.from_json(json),
            (Schema::Untyped, json) => Ok(Value::Untyped(json_to_msgpack(&json))),
            (schema, json) => Err(EncodingError::unexpected(schema.expected(), json)),
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            Schema::Uint64 => "uint64",
            Schema::Boolean => "bool",
            Schema::String => "string",
            Schema::ByteArray => "bytes",
            Schema::FixedBytes(_) => "fixed-length bytes",
            Schema::Address => "address",
            Schema::Array(_) => "array",
            Schema::NamedMap(_) => "map",
            Schema::Uint64Map(_) => "uint64 map",
            Schema::StringMap(_) => "string map",
            Schema::Optional(_) => "optional",
            Schema::Untyped => "any",
            Schema::Ref(_) => "reference",
        }
    }
}

// ============================================================================
// Named maps
// ============================================================================

/// One field of a [`NamedMapSchema`].
#[derive(Debug, Clone)]
pub struct MapEntry {
    pub key: &'static str,
    pub schema: Schema,
    /// Skip the field on the wire when it holds its default value.
    pub omit_empty: bool,
    /// Splice the (named map) schema's fields into the parent without a key.
    pub embedded: bool,
}

impl MapEntry {
    /// An omit-empty field; the common case for protocol entities.
    pub fn field(key: &'static str, schema: Schema) -> Self {
        Self {
            key,
            schema,
            omit_empty: true,
            embedded: false,
        }
    }

    /// A field that is always written and must be present when decoding.
    pub fn required(key: &'static str, schema: Schema) -> Self {
        Self {
            key,
            schema,
            omit_empty: false,
            embedded: false,
        }
    }

    /// Inline another named map's fields.
    pub fn embedded(schema: Schema) -> Self {
        Self {
            key: "",
            schema,
            omit_empty: true,
            embedded: true,
        }
    }
}

/// A map with a fixed, ordered list of named fields.
#[derive(Debug, Clone)]
pub struct NamedMapSchema {
    entries: Vec<MapEntry>,
}

impl NamedMapSchema {
    pub fn new(entries: Vec<MapEntry>) -> Self {
        Self { entries }
    }

    /// The declared entries, with embedded maps flattened in place.
    pub fn entries(&self) -> Vec<&MapEntry> {
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            if entry.embedded {
                if let Schema::NamedMap(inner) = entry.schema.resolve() {
                    out.extend(inner.entries());
                }
            } else {
                out.push(entry);
            }
        }
        out
    }

    /// Check the embedding rules and key uniqueness.
    pub fn validate(&self) -> Result<(), EncodingError> {
        for entry in &self.entries {
            if entry.embedded {
                if !entry.key.is_empty() {
                    return Err(EncodingError::invalid(format!(
                        "embedded entry must have an empty key, got '{}'",
                        entry.key
                    )));
                }
                let Schema::NamedMap(inner) = entry.schema.resolve() else {
                    return Err(EncodingError::invalid(
                        "embedded entry must be a named map schema",
                    ));
                };
                inner.validate()?;
            } else if entry.key.is_empty() {
                return Err(EncodingError::invalid("non-embedded entry has an empty key"));
            }
        }

        let mut seen = HashSet::new();
        for entry in self.entries() {
            if !seen.insert(entry.key) {
                return Err(EncodingError::invalid(format!(
                    "duplicate key '{}'",
                    entry.key
                )));
            }
        }
        Ok(())
    }

    pub fn default_fields(&self) -> Fields {
        self.entries()
            .into_iter()
            .map(|e| (e.key.to_string(), e.schema.default_value()))
            .collect()
    }

    pub fn is_default(&self, fields: &Fields) -> bool {
        self.entries().into_iter().all(|e| match fields.get(e.key) {
            Some(v) => e.schema.is_default(v),
            None => true,
        })
    }

    fn field_or_default(entry: &MapEntry, fields: &Fields) -> Value {
        fields
            .get(entry.key)
            .cloned()
            .unwrap_or_else(|| entry.schema.default_value())
    }

    fn to_msgpack(&self, fields: &Fields) -> Result<Msgpack, EncodingError> {
        let mut pairs = Vec::new();
        for entry in self.entries() {
            let value = Self::field_or_default(entry, fields);
            if entry.omit_empty && entry.schema.is_default(&value) {
                continue;
            }
            pairs.push((Msgpack::from(entry.key), entry.schema.to_msgpack(&value)?));
        }
        Ok(Msgpack::Map(pairs))
    }

    fn from_msgpack(&self, pairs: Vec<(Msgpack, Msgpack)>) -> Result<Value, EncodingError> {
        let mut raw = BTreeMap::new();
        for (k, v) in pairs {
            raw.insert(string_key(k)?, v);
        }
        let mut out = Fields::new();
        for entry in self.entries() {
            let value = match raw.remove(entry.key) {
                Some(v) => entry.schema.from_msgpack(v)?,
                None if entry.omit_empty => entry.schema.default_value(),
                None => return Err(EncodingError::MissingKey(entry.key.to_string())),
            };
            out.insert(entry.key, value);
        }
        Ok(Value::Map(out))
    }

    fn to_json(&self, fields: &Fields) -> Result<Json, EncodingError> {
        let mut obj = serde_json::Map::new();
        for entry in self.entries() {
            let value = Self::field_or_default(entry, fields);
            if entry.omit_empty && entry.schema.is_default(&value) {
                continue;
            }
            obj.insert(entry.key.to_string(), entry.schema.to_json(&value)?);
        }
        Ok(Json::Object(obj))
    }

    fn from_json(&self, mut obj: serde_json::Map<String, Json>) -> Result<Value, EncodingError> {
        let mut out = Fields::new();
        for entry in self.entries() {
            let value = match obj.remove(entry.key) {
                Some(v) => entry.schema.from_json(v)?,
                None if entry.omit_empty => entry.schema.default_value(),
                None => return Err(EncodingError::MissingKey(entry.key.to_string())),
            };
            out.insert(entry.key, value);
        }
        Ok(Value::Map(out))
    }
}

fn string_key(key: Msgpack) -> Result<String, EncodingError> {
    match key {
        Msgpack::String(s) => s
            .into_str()
            .ok_or_else(|| EncodingError::invalid("map key is not valid UTF-8")),
        other => Err(EncodingError::unexpected("string key", other)),
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), EncodingError> {
    if expected != actual {
        return Err(EncodingError::InvalidLength { expected, actual });
    }
    Ok(())
}

fn decode_base64(s: &str) -> Result<Vec<u8>, EncodingError> {
    STANDARD
        .decode(s)
        .map_err(|e| EncodingError::Base64(e.to_string()))
}
