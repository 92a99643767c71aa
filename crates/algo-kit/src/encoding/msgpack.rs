//! Canonical msgpack framing on top of `rmpv`.
//!
//! Canonical form: map keys sorted (bytewise for strings, numerically for
//! integers), integers in their smallest representation, `bin` for byte
//! strings and `str` for text.

use std::cmp::Ordering;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rmpv::Value as Msgpack;

use crate::error::EncodingError;

/// Serialize a prepared msgpack value in canonical form.
pub fn write_canonical(value: Msgpack) -> Result<Vec<u8>, EncodingError> {
    let value = canonicalize(value);
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &value)
        .map_err(|e| EncodingError::Msgpack(e.to_string()))?;
    Ok(buf)
}

/// Read exactly one msgpack value, rejecting trailing bytes.
pub fn read_value(bytes: &[u8]) -> Result<Msgpack, EncodingError> {
    let mut rd = bytes;
    let value =
        rmpv::decode::read_value(&mut rd).map_err(|e| EncodingError::Msgpack(e.to_string()))?;
    if !rd.is_empty() {
        return Err(EncodingError::TrailingBytes(rd.len()));
    }
    Ok(value)
}

/// Read a concatenation of msgpack values (e.g. a signed transaction group).
pub fn read_values(bytes: &[u8]) -> Result<Vec<Msgpack>, EncodingError> {
    let mut rd = bytes;
    let mut values = Vec::new();
    while !rd.is_empty() {
        values.push(
            rmpv::decode::read_value(&mut rd)
                .map_err(|e| EncodingError::Msgpack(e.to_string()))?,
        );
    }
    Ok(values)
}

fn canonicalize(value: Msgpack) -> Msgpack {
    match value {
        Msgpack::Map(pairs) => {
            let mut pairs: Vec<(Msgpack, Msgpack)> = pairs
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            pairs.sort_by(|(a, _), (b, _)| compare_keys(a, b));
            Msgpack::Map(pairs)
        }
        Msgpack::Array(items) => Msgpack::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

fn compare_keys(a: &Msgpack, b: &Msgpack) -> Ordering {
    match (a, b) {
        (Msgpack::String(x), Msgpack::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Msgpack::Integer(x), Msgpack::Integer(y)) => match (x.as_u64(), y.as_u64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => x.as_i64().cmp(&y.as_i64()),
        },
        _ => Ordering::Equal,
    }
}

// ============================================================================
// Untyped JSON bridge
// ============================================================================

/// Render raw msgpack as JSON. Binary data becomes base64 text.
pub fn msgpack_to_json(value: &Msgpack) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Msgpack::Nil => Json::Null,
        Msgpack::Boolean(b) => Json::Bool(*b),
        Msgpack::Integer(i) => match (i.as_u64(), i.as_i64()) {
            (Some(n), _) => Json::from(n),
            (None, Some(n)) => Json::from(n),
            _ => Json::Null,
        },
        Msgpack::F32(f) => serde_json::Number::from_f64(f64::from(*f)).map_or(Json::Null, Json::Number),
        Msgpack::F64(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Msgpack::String(s) => Json::String(String::from_utf8_lossy(s.as_bytes()).into_owned()),
        Msgpack::Binary(b) => Json::String(STANDARD.encode(b)),
        Msgpack::Array(items) => Json::Array(items.iter().map(msgpack_to_json).collect()),
        Msgpack::Map(pairs) => Json::Object(
            pairs
                .iter()
                .map(|(k, v)| (key_to_string(k), msgpack_to_json(v)))
                .collect(),
        ),
        Msgpack::Ext(_, data) => Json::String(STANDARD.encode(data)),
    }
}

/// Convert JSON into raw msgpack.
pub fn json_to_msgpack(value: &serde_json::Value) -> Msgpack {
    use serde_json::Value as Json;

    match value {
        Json::Null => Msgpack::Nil,
        Json::Bool(b) => Msgpack::Boolean(*b),
        Json::Number(n) => {
            if let Some(u) = n.as_u64() {
                Msgpack::from(u)
            } else if let Some(i) = n.as_i64() {
                Msgpack::from(i)
            } else {
                Msgpack::F64(n.as_f64().unwrap_or_default())
            }
        }
        Json::String(s) => Msgpack::from(s.as_str()),
        Json::Array(items) => Msgpack::Array(items.iter().map(json_to_msgpack).collect()),
        Json::Object(map) => Msgpack::Map(
            map.iter()
                .map(|(k, v)| (Msgpack::from(k.as_str()), json_to_msgpack(v)))
                .collect(),
        ),
    }
}

fn key_to_string(key: &Msgpack) -> String {
    match key {
        Msgpack::String(s) => String::from_utf8_lossy(s.as_bytes()).into_owned(),
        Msgpack::Integer(i) => i.to_string(),
        other => other.to_string(),
    }
}
