//! ARC-4 application binary interface.
//!
//! - [`AbiType`]: type descriptors, parsed from their text form, with the
//!   encode/decode layout rules (big-endian scalars, packed bools, head/tail
//!   tuples with 2-byte offsets).
//! - [`AbiValue`]: values of those types.
//! - [`Method`], [`Contract`], [`Interface`]: method descriptors and their
//!   JSON descriptions.
//!
//! ```
//! use algo_kit::abi::{AbiType, AbiValue};
//!
//! let t: AbiType = "(string,string)".parse().unwrap();
//! let value = AbiValue::Array(vec!["hello".into(), "world".into()]);
//! let bytes = t.encode(&value).unwrap();
//! assert_eq!(t.decode(&bytes).unwrap(), value);
//! ```

mod abi_type;
mod contract;
mod method;
mod value;

pub use abi_type::AbiType;
pub use contract::{Contract, ContractNetworkInfo, Interface};
pub use method::{Method, MethodArg, MethodArgType, ReferenceType, TransactionArgType};
pub use value::AbiValue;

/// Most application arguments a call can carry, selector included.
pub const MAX_APP_ARGS: usize = 16;

/// First 4 bytes of SHA-512/256("return"); a log line with this prefix
/// carries the method's return value.
pub const RETURN_PREFIX: [u8; 4] = [0x15, 0x1f, 0x7c, 0x75];

/// Regroup encoded arguments so they fit beside the selector: when there are
/// more than `MAX_APP_ARGS - 1`, the 15th and later are packed into a single
/// trailing tuple.
pub(crate) fn pack_trailing_args(
    mut types: Vec<AbiType>,
    mut values: Vec<AbiValue>,
) -> (Vec<AbiType>, Vec<AbiValue>) {
    if types.len() < MAX_APP_ARGS {
        return (types, values);
    }
    let packed_types = types.split_off(MAX_APP_ARGS - 2);
    let packed_values = values.split_off(MAX_APP_ARGS - 2);
    types.push(AbiType::Tuple(packed_types));
    values.push(AbiValue::Array(packed_values));
    (types, values)
}

/// The encoded return value: the bytes after [`RETURN_PREFIX`] in the last
/// log line that starts with it.
pub fn find_return_value(logs: &[Vec<u8>]) -> Option<&[u8]> {
    logs.iter()
        .rev()
        .find(|log| log.starts_with(&RETURN_PREFIX))
        .map(|log| &log[RETURN_PREFIX.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sha512_256;

    #[test]
    fn test_return_prefix() {
        assert_eq!(sha512_256(b"return")[..4], RETURN_PREFIX);
    }

    #[test]
    fn test_find_return_value_scans_from_end() {
        let logs = vec![
            [&RETURN_PREFIX[..], &[1]].concat(),
            b"event".to_vec(),
            [&RETURN_PREFIX[..], &[2, 3]].concat(),
            b"trailing".to_vec(),
        ];
        assert_eq!(find_return_value(&logs), Some(&[2u8, 3][..]));
        assert_eq!(find_return_value(&[b"none".to_vec()]), None);
    }

    #[test]
    fn test_pack_sixteen_args() {
        let types = vec![AbiType::Uint(64); 16];
        let values: Vec<AbiValue> = (0u64..16).map(AbiValue::from).collect();
        let (types, values) = pack_trailing_args(types, values);
        assert_eq!(types.len(), 15);
        assert_eq!(values.len(), 15);
        assert_eq!(types[14].to_string(), "(uint64,uint64)");
        assert_eq!(
            values[14],
            AbiValue::Array(vec![AbiValue::from(14u64), AbiValue::from(15u64)])
        );
    }

    #[test]
    fn test_fifteen_args_unpacked() {
        let (types, _) =
            pack_trailing_args(vec![AbiType::Bool; 15], vec![AbiValue::Bool(true); 15]);
        assert_eq!(types.len(), 15);
        assert!(types.iter().all(|t| *t == AbiType::Bool));
    }
}
