//! Schema-driven canonical encoding.
//!
//! Every protocol entity declares a [`Schema`] and converts itself to and
//! from a schema-neutral [`Value`]. The schema then takes care of defaults,
//! omit-empty rules and both wire projections:
//!
//! - **msgpack**: canonical binary form used for hashing, signing and
//!   submission. Keys are sorted and empty fields are omitted.
//! - **JSON**: human-readable form with base64 byte strings and text
//!   addresses.
//!
//! ```rust
//! use algo_kit::encoding::{decode_msgpack, encode_msgpack};
//! use algo_kit::{Address, SuggestedParams, Transaction};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sender: Address = "SGNKBMWAOCJQGSOIGQLRQMNUJ5NU4I56PXH6OJJJQNQPZ5G5G3IOVLI5VM".parse()?;
//! let params = SuggestedParams::new("testnet-v1.0", [1; 32], 1, 1001).flat_fee(1000);
//! let txn = Transaction::builder(sender, &params).payment(sender, 0, None).build()?;
//!
//! let bytes = encode_msgpack(&txn)?;
//! let back: Transaction = decode_msgpack(&bytes)?;
//! assert_eq!(back, txn);
//! # Ok(())
//! # }
//! ```

pub mod msgpack;
mod schema;
mod value;

pub use schema::{MapEntry, NamedMapSchema, Schema, SchemaRef};
pub use value::{Fields, Value};

use crate::error::EncodingError;

/// A type with a declared wire schema.
pub trait Encodable: Sized {
    /// The schema describing this type on the wire.
    fn encoding_schema() -> &'static Schema;

    /// Convert into schema-neutral encoding data.
    fn to_encoding_data(&self) -> Result<Value, EncodingError>;

    /// Rebuild from decoded encoding data. Defaults for omitted fields have
    /// already been restored by the schema.
    fn from_encoding_data(data: Value) -> Result<Self, EncodingError>;
}

/// Canonical msgpack bytes for a value.
pub fn encode_msgpack<T: Encodable>(value: &T) -> Result<Vec<u8>, EncodingError> {
    let raw = T::encoding_schema().to_msgpack(&value.to_encoding_data()?)?;
    msgpack::write_canonical(raw)
}

/// Decode canonical msgpack bytes. Trailing bytes are an error.
pub fn decode_msgpack<T: Encodable>(bytes: &[u8]) -> Result<T, EncodingError> {
    let raw = msgpack::read_value(bytes)?;
    T::from_encoding_data(T::encoding_schema().from_msgpack(raw)?)
}

/// JSON projection of a value.
pub fn encode_json<T: Encodable>(value: &T) -> Result<serde_json::Value, EncodingError> {
    T::encoding_schema().to_json(&value.to_encoding_data()?)
}

/// JSON projection rendered as text.
pub fn encode_json_string<T: Encodable>(value: &T) -> Result<String, EncodingError> {
    Ok(serde_json::to_string(&encode_json(value)?)?)
}

/// Rebuild a value from its JSON projection.
pub fn decode_json<T: Encodable>(json: serde_json::Value) -> Result<T, EncodingError> {
    T::from_encoding_data(T::encoding_schema().from_json(json)?)
}

/// Rebuild a value from JSON text.
pub fn decode_json_str<T: Encodable>(text: &str) -> Result<T, EncodingError> {
    decode_json(serde_json::from_str(text)?)
}
