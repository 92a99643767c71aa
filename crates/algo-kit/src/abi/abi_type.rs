//! ABI type descriptors and their binary layout.

use std::fmt::{self, Display};
use std::str::FromStr;

use num_bigint::BigUint;

use super::value::AbiValue;
use crate::error::AbiError;
use crate::types::Address;

/// Largest count a 2-byte length or offset prefix can carry.
const MAX_LEN: usize = u16::MAX as usize;
const ADDRESS_LEN: usize = 32;
const LENGTH_PREFIX: usize = 2;

/// An ARC-4 ABI type.
///
/// Types parse from and display as their canonical text form:
///
/// ```
/// use algo_kit::abi::AbiType;
///
/// let t: AbiType = "(uint64,bool[3],string)".parse().unwrap();
/// assert!(t.is_dynamic());
/// assert_eq!(t.to_string(), "(uint64,bool[3],string)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// `uintN` with `N` in 8..=512, a multiple of 8.
    Uint(u16),
    /// `ufixedNxM`: an `N`-bit integer scaled by `10^-M`, `M` in 1..=160.
    Ufixed { bits: u16, precision: u8 },
    Bool,
    Byte,
    Address,
    String,
    StaticArray(Box<AbiType>, usize),
    DynamicArray(Box<AbiType>),
    Tuple(Vec<AbiType>),
}

impl AbiType {
    pub fn uint(bits: u16) -> Result<Self, AbiError> {
        check_bits(bits)?;
        Ok(AbiType::Uint(bits))
    }

    pub fn ufixed(bits: u16, precision: u8) -> Result<Self, AbiError> {
        check_bits(bits)?;
        if !(1..=160).contains(&precision) {
            return Err(AbiError::InvalidType(format!(
                "unsupported ufixed precision: {precision}"
            )));
        }
        Ok(AbiType::Ufixed { bits, precision })
    }

    /// `byte[]`.
    pub fn bytes() -> Self {
        AbiType::DynamicArray(Box::new(AbiType::Byte))
    }

    /// Whether the encoded length depends on the value.
    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiType::String | AbiType::DynamicArray(_) => true,
            AbiType::StaticArray(child, _) => child.is_dynamic(),
            AbiType::Tuple(children) => children.iter().any(AbiType::is_dynamic),
            _ => false,
        }
    }

    /// Encoded length of a static type.
    pub fn byte_len(&self) -> Result<usize, AbiError> {
        match self {
            AbiType::Uint(bits) | AbiType::Ufixed { bits, .. } => {
                check_bits(*bits)?;
                Ok(usize::from(*bits) / 8)
            }
            AbiType::Bool | AbiType::Byte => Ok(1),
            AbiType::Address => Ok(ADDRESS_LEN),
            AbiType::StaticArray(child, len) if **child == AbiType::Bool => Ok(len.div_ceil(8)),
            AbiType::StaticArray(child, len) => Ok(child.byte_len()? * len),
            AbiType::Tuple(children) => {
                let mut size = 0;
                let mut i = 0;
                while i < children.len() {
                    if children[i] == AbiType::Bool {
                        i += bool_run(children, i);
                        size += 1;
                    } else {
                        size += children[i].byte_len()?;
                        i += 1;
                    }
                }
                Ok(size)
            }
            AbiType::String | AbiType::DynamicArray(_) => Err(AbiError::InvalidType(format!(
                "{self} is dynamic and has no fixed length"
            ))),
        }
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Encode `value` as this type.
    pub fn encode(&self, value: &AbiValue) -> Result<Vec<u8>, AbiError> {
        match (self, value) {
            (AbiType::Uint(bits) | AbiType::Ufixed { bits, .. }, AbiValue::Uint(n)) => {
                encode_uint(self, *bits, n)
            }
            (AbiType::Bool, AbiValue::Bool(b)) => Ok(vec![if *b { 0x80 } else { 0x00 }]),
            (AbiType::Byte, AbiValue::Byte(b)) => Ok(vec![*b]),
            (AbiType::Address, AbiValue::Address(a)) => Ok(a.as_bytes().to_vec()),
            (AbiType::String, AbiValue::String(s)) => {
                let mut out = length_prefix(self, s.len())?;
                out.extend_from_slice(s.as_bytes());
                Ok(out)
            }
            (AbiType::StaticArray(child, len), AbiValue::Array(items)) => {
                if items.len() != *len {
                    return Err(AbiError::mismatch(
                        self,
                        format!("expected {len} elements, got {}", items.len()),
                    ));
                }
                encode_tuple(&vec![(**child).clone(); *len], items)
            }
            (AbiType::DynamicArray(child), AbiValue::Array(items)) => {
                let mut out = length_prefix(self, items.len())?;
                out.extend(encode_tuple(&vec![(**child).clone(); items.len()], items)?);
                Ok(out)
            }
            (AbiType::Tuple(children), AbiValue::Array(items)) => {
                if items.len() != children.len() {
                    return Err(AbiError::mismatch(
                        self,
                        format!("expected {} elements, got {}", children.len(), items.len()),
                    ));
                }
                encode_tuple(children, items)
            }
            (t, v) => Err(AbiError::mismatch(t, format!("cannot encode {}", v.kind()))),
        }
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    /// Decode `bytes` as this type. The whole input must be consumed.
    pub fn decode(&self, bytes: &[u8]) -> Result<AbiValue, AbiError> {
        match self {
            AbiType::Uint(_) | AbiType::Ufixed { .. } => {
                expect_len(self, bytes, self.byte_len()?)?;
                Ok(AbiValue::Uint(BigUint::from_bytes_be(bytes)))
            }
            AbiType::Bool => {
                expect_len(self, bytes, 1)?;
                match bytes[0] {
                    0x00 => Ok(AbiValue::Bool(false)),
                    0x80 => Ok(AbiValue::Bool(true)),
                    other => Err(AbiError::decode(format!("invalid bool byte {other:#04x}"))),
                }
            }
            AbiType::Byte => {
                expect_len(self, bytes, 1)?;
                Ok(AbiValue::Byte(bytes[0]))
            }
            AbiType::Address => {
                expect_len(self, bytes, ADDRESS_LEN)?;
                let mut key = [0u8; ADDRESS_LEN];
                key.copy_from_slice(bytes);
                Ok(AbiValue::Address(Address::from_bytes(key)))
            }
            AbiType::String => {
                let (len, body) = split_length(self, bytes)?;
                expect_len(self, body, len)?;
                String::from_utf8(body.to_vec())
                    .map(AbiValue::String)
                    .map_err(|_| AbiError::decode("string is not valid UTF-8"))
            }
            AbiType::StaticArray(child, len) => Ok(AbiValue::Array(decode_tuple(
                &vec![(**child).clone(); *len],
                bytes,
            )?)),
            AbiType::DynamicArray(child) => {
                let (len, body) = split_length(self, bytes)?;
                if !child.is_dynamic() && **child != AbiType::Bool {
                    let needed = child.byte_len()?.saturating_mul(len);
                    if needed > body.len() {
                        return Err(AbiError::decode(format!(
                            "{self} declares {len} elements but only {} bytes follow",
                            body.len()
                        )));
                    }
                }
                Ok(AbiValue::Array(decode_tuple(
                    &vec![(**child).clone(); len],
                    body,
                )?))
            }
            AbiType::Tuple(children) => Ok(AbiValue::Array(decode_tuple(children, bytes)?)),
        }
    }
}

fn check_bits(bits: u16) -> Result<(), AbiError> {
    if bits < 8 || bits > 512 || bits % 8 != 0 {
        return Err(AbiError::InvalidType(format!(
            "unsupported integer bit size: {bits}"
        )));
    }
    Ok(())
}

fn encode_uint(t: &AbiType, bits: u16, n: &BigUint) -> Result<Vec<u8>, AbiError> {
    check_bits(bits)?;
    if n.bits() > u64::from(bits) {
        return Err(AbiError::OutOfRange {
            abi_type: t.to_string(),
        });
    }
    let len = usize::from(bits) / 8;
    let raw = n.to_bytes_be();
    let mut out = vec![0u8; len];
    out[len - raw.len()..].copy_from_slice(&raw);
    Ok(out)
}

fn length_prefix(t: &AbiType, len: usize) -> Result<Vec<u8>, AbiError> {
    let len = u16::try_from(len).map_err(|_| AbiError::OutOfRange {
        abi_type: t.to_string(),
    })?;
    Ok(len.to_be_bytes().to_vec())
}

fn split_length<'a>(t: &AbiType, bytes: &'a [u8]) -> Result<(usize, &'a [u8]), AbiError> {
    if bytes.len() < LENGTH_PREFIX {
        return Err(AbiError::decode(format!("{t}: missing length prefix")));
    }
    let len = u16::from_be_bytes([bytes[0], bytes[1]]);
    Ok((usize::from(len), &bytes[LENGTH_PREFIX..]))
}

fn expect_len(t: &AbiType, bytes: &[u8], len: usize) -> Result<(), AbiError> {
    if bytes.len() != len {
        return Err(AbiError::decode(format!(
            "{t} needs {len} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(())
}

/// Number of consecutive `bool` types starting at `start`, at most 8.
fn bool_run(types: &[AbiType], start: usize) -> usize {
    types[start..]
        .iter()
        .take(8)
        .take_while(|t| **t == AbiType::Bool)
        .count()
}

/// Heads of static elements in order, with 2-byte offsets standing in for
/// dynamic elements, followed by the dynamic elements' encodings.
fn encode_tuple(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
    let mut heads: Vec<Vec<u8>> = Vec::with_capacity(types.len());
    let mut tails: Vec<Option<Vec<u8>>> = Vec::with_capacity(types.len());

    let mut i = 0;
    while i < types.len() {
        let t = &types[i];
        if t.is_dynamic() {
            heads.push(vec![0, 0]);
            tails.push(Some(t.encode(&values[i])?));
            i += 1;
        } else if *t == AbiType::Bool {
            let run = bool_run(types, i);
            let mut packed = 0u8;
            for (bit, value) in values[i..i + run].iter().enumerate() {
                match value {
                    AbiValue::Bool(true) => packed |= 0x80 >> bit,
                    AbiValue::Bool(false) => {}
                    other => {
                        return Err(AbiError::mismatch(
                            t,
                            format!("cannot encode {}", other.kind()),
                        ));
                    }
                }
            }
            heads.push(vec![packed]);
            tails.push(None);
            i += run;
        } else {
            heads.push(t.encode(&values[i])?);
            tails.push(None);
            i += 1;
        }
    }

    let mut offset: usize = heads.iter().map(Vec::len).sum();
    for (head, tail) in heads.iter_mut().zip(&tails) {
        if let Some(tail) = tail {
            let at = u16::try_from(offset)
                .map_err(|_| AbiError::decode("tuple exceeds the 2-byte offset range"))?;
            *head = at.to_be_bytes().to_vec();
            offset += tail.len();
        }
    }
    let mut out = Vec::with_capacity(offset);
    for head in heads {
        out.extend(head);
    }
    for tail in tails.into_iter().flatten() {
        out.extend(tail);
    }
    Ok(out)
}

fn decode_tuple(types: &[AbiType], bytes: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
    let mut values: Vec<Option<AbiValue>> = Vec::with_capacity(types.len());
    let mut dynamic: Vec<(usize, usize)> = Vec::new();
    let mut pos = 0;

    let mut i = 0;
    while i < types.len() {
        let t = &types[i];
        if t.is_dynamic() {
            let raw = slice_at(bytes, pos, LENGTH_PREFIX)?;
            let offset = usize::from(u16::from_be_bytes([raw[0], raw[1]]));
            dynamic.push((values.len(), offset));
            values.push(None);
            pos += LENGTH_PREFIX;
            i += 1;
        } else if *t == AbiType::Bool {
            let run = bool_run(types, i);
            let byte = slice_at(bytes, pos, 1)?[0];
            if byte & ((0xffu16 >> run) as u8) != 0 {
                return Err(AbiError::decode(format!(
                    "packed bool byte {byte:#04x} sets bits beyond {run} values"
                )));
            }
            for bit in 0..run {
                values.push(Some(AbiValue::Bool(byte & (0x80 >> bit) != 0)));
            }
            pos += 1;
            i += run;
        } else {
            let len = t.byte_len()?;
            values.push(Some(t.decode(slice_at(bytes, pos, len)?)?));
            pos += len;
            i += 1;
        }
    }

    if dynamic.is_empty() {
        if pos != bytes.len() {
            return Err(AbiError::decode(format!(
                "{} trailing bytes after tuple",
                bytes.len() - pos
            )));
        }
    } else {
        if dynamic[0].1 != pos {
            return Err(AbiError::decode(format!(
                "first dynamic element starts at {}, expected {pos}",
                dynamic[0].1
            )));
        }
        for (k, &(index, start)) in dynamic.iter().enumerate() {
            let end = dynamic.get(k + 1).map_or(bytes.len(), |next| next.1);
            if start > end || end > bytes.len() {
                return Err(AbiError::decode(format!(
                    "dynamic element {index} spans {start}..{end} of {} bytes",
                    bytes.len()
                )));
            }
            values[index] = Some(types[index].decode(&bytes[start..end])?);
        }
    }

    values
        .into_iter()
        .map(|v| v.ok_or_else(|| AbiError::decode("tuple element was not decoded")))
        .collect()
}

fn slice_at(bytes: &[u8], pos: usize, len: usize) -> Result<&[u8], AbiError> {
    bytes.get(pos..pos + len).ok_or_else(|| {
        AbiError::decode(format!(
            "need {len} bytes at offset {pos}, input has {}",
            bytes.len()
        ))
    })
}

// ============================================================================
// Text form
// ============================================================================

impl Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiType::Uint(bits) => write!(f, "uint{bits}"),
            AbiType::Ufixed { bits, precision } => write!(f, "ufixed{bits}x{precision}"),
            AbiType::Bool => f.write_str("bool"),
            AbiType::Byte => f.write_str("byte"),
            AbiType::Address => f.write_str("address"),
            AbiType::String => f.write_str("string"),
            AbiType::StaticArray(child, len) => write!(f, "{child}[{len}]"),
            AbiType::DynamicArray(child) => write!(f, "{child}[]"),
            AbiType::Tuple(children) => {
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl FromStr for AbiType {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AbiError::InvalidType(s.to_string());

        if let Some(child) = s.strip_suffix("[]") {
            return Ok(AbiType::DynamicArray(Box::new(child.parse()?)));
        }
        if let Some(body) = s.strip_suffix(']') {
            let open = body.rfind('[').ok_or_else(invalid)?;
            let digits = &body[open + 1..];
            if digits.is_empty()
                || digits.starts_with('0')
                || !digits.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(invalid());
            }
            let len: usize = digits.parse().map_err(|_| invalid())?;
            if len > MAX_LEN {
                return Err(AbiError::InvalidType(format!(
                    "array length {len} exceeds {MAX_LEN}"
                )));
            }
            return Ok(AbiType::StaticArray(Box::new(body[..open].parse()?), len));
        }
        if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
            let children = split_tuple(inner)?
                .into_iter()
                .map(str::parse)
                .collect::<Result<_, _>>()?;
            return Ok(AbiType::Tuple(children));
        }
        if let Some(rest) = s.strip_prefix("ufixed") {
            let (bits, precision) = rest.split_once('x').ok_or_else(invalid)?;
            return AbiType::ufixed(parse_number(bits, s)?, parse_number(precision, s)?);
        }
        if let Some(bits) = s.strip_prefix("uint") {
            return AbiType::uint(parse_number(bits, s)?);
        }
        match s {
            "bool" => Ok(AbiType::Bool),
            "byte" => Ok(AbiType::Byte),
            "address" => Ok(AbiType::Address),
            "string" => Ok(AbiType::String),
            _ => Err(invalid()),
        }
    }
}

fn parse_number<T: FromStr>(digits: &str, whole: &str) -> Result<T, AbiError> {
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(AbiError::InvalidType(whole.to_string()));
    }
    digits
        .parse()
        .map_err(|_| AbiError::InvalidType(whole.to_string()))
}

/// Split tuple contents at top-level commas.
pub(crate) fn split_tuple(s: &str) -> Result<Vec<&str>, AbiError> {
    if s.is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| AbiError::InvalidType(format!("unbalanced parentheses: {s}")))?;
            }
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(AbiError::InvalidType(format!("unbalanced parentheses: {s}")));
    }
    parts.push(&s[start..]);
    if parts.iter().any(|p| p.is_empty()) {
        return Err(AbiError::InvalidType(format!("empty tuple element: ({s})")));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> AbiType {
        s.parse().unwrap()
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    #[test]
    fn test_parse_and_display() {
        for s in [
            "uint8",
            "uint512",
            "ufixed64x10",
            "bool",
            "byte",
            "address",
            "string",
            "byte[]",
            "uint64[3]",
            "bool[]",
            "(uint64,(bool,string)[],address)",
            "()",
            "(uint8[2])[3]",
        ] {
            assert_eq!(t(s).to_string(), s);
        }
        assert_eq!(t("(uint8[2])[3]"), AbiType::StaticArray(
            Box::new(AbiType::Tuple(vec![AbiType::StaticArray(Box::new(AbiType::Uint(8)), 2)])),
            3,
        ));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for s in [
            "uint7", "uint520", "uint", "uint08", "ufixed8x0", "ufixed8x161", "ufixed8", "int64",
            "uint64[0]", "uint64[01]", "uint64[x]", "(uint64,)", "(,bool)", "(a,,b)", "((bool)",
            "bool)", "",
        ] {
            assert!(s.parse::<AbiType>().is_err(), "{s} should not parse");
        }
    }

    #[test]
    fn test_dynamic_and_byte_len() {
        assert!(!t("uint64[3]").is_dynamic());
        assert!(t("string[3]").is_dynamic());
        assert!(t("(uint8,byte[])").is_dynamic());
        assert_eq!(t("bool[10]").byte_len().unwrap(), 2);
        assert_eq!(t("(bool,bool,uint16,bool)").byte_len().unwrap(), 4);
        assert_eq!(t("(bool,bool,bool,bool,bool,bool,bool,bool,bool)").byte_len().unwrap(), 2);
        assert_eq!(t("(address,uint256[2])").byte_len().unwrap(), 96);
        assert!(t("string").byte_len().is_err());
    }

    // ========================================================================
    // Layout
    // ========================================================================

    #[test]
    fn test_uint_layout_and_range() {
        assert_eq!(t("uint16").encode(&AbiValue::from(258u64)).unwrap(), vec![1, 2]);
        assert_eq!(t("uint8").encode(&AbiValue::from(0u64)).unwrap(), vec![0]);
        assert!(matches!(
            t("uint8").encode(&AbiValue::from(256u64)),
            Err(AbiError::OutOfRange { .. })
        ));
        let big: BigUint = BigUint::from(1u8) << 511;
        let encoded = t("uint512").encode(&AbiValue::Uint(big.clone())).unwrap();
        assert_eq!(encoded.len(), 64);
        assert_eq!(encoded[0], 0x80);
        assert_eq!(t("uint512").decode(&encoded).unwrap(), AbiValue::Uint(big));
    }

    #[test]
    fn test_uint_decode_rejects_wrong_width() {
        assert!(t("uint16").decode(&[0, 0, 1]).is_err());
        assert!(t("uint16").decode(&[1]).is_err());
    }

    #[test]
    fn test_bool_packing() {
        let value = AbiValue::Array(
            [true, false, true, true, false, false, false, false, true]
                .into_iter()
                .map(AbiValue::Bool)
                .collect(),
        );
        let encoded = t("bool[9]").encode(&value).unwrap();
        assert_eq!(encoded, vec![0b1011_0000, 0b1000_0000]);
        assert_eq!(t("bool[9]").decode(&encoded).unwrap(), value);

        let dynamic = t("bool[]").encode(&value).unwrap();
        assert_eq!(dynamic, vec![0, 9, 0b1011_0000, 0b1000_0000]);
        assert_eq!(t("bool[]").decode(&dynamic).unwrap(), value);
    }

    #[test]
    fn test_full_bool_byte_round_trips() {
        let all = AbiValue::Array(vec![AbiValue::Bool(true); 8]);
        let encoded = t("bool[8]").encode(&all).unwrap();
        assert_eq!(encoded, vec![0xff]);
        assert_eq!(t("bool[8]").decode(&encoded).unwrap(), all);

        let tuple = t("(bool,bool,bool,bool,bool,bool,bool,bool,uint8)");
        let mut items = vec![AbiValue::Bool(false); 7];
        items.push(AbiValue::Bool(true));
        items.push(AbiValue::from(3u64));
        let value = AbiValue::Array(items);
        let encoded = tuple.encode(&value).unwrap();
        assert_eq!(encoded, vec![0x01, 0x03]);
        assert_eq!(tuple.decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_unchecked_width_is_rejected() {
        for ty in [AbiType::Uint(0), AbiType::Uint(12), AbiType::Ufixed { bits: 520, precision: 2 }] {
            assert!(matches!(
                ty.encode(&AbiValue::from(0u64)),
                Err(AbiError::InvalidType(_))
            ));
            assert!(ty.byte_len().is_err());
            assert!(ty.decode(&[0]).is_err());
        }
    }

    #[test]
    fn test_packed_bool_rejects_extra_bits() {
        assert!(t("bool[2]").decode(&[0b1110_0000]).is_err());
        assert!(t("bool").decode(&[0x01]).is_err());
    }

    #[test]
    fn test_tuple_heads_and_tails() {
        let ty = t("(uint16,string,bool,bool,byte[])");
        let value = AbiValue::Array(vec![
            AbiValue::from(5u64),
            AbiValue::from("hi"),
            AbiValue::Bool(false),
            AbiValue::Bool(true),
            AbiValue::bytes([0xaa]),
        ]);
        let encoded = ty.encode(&value).unwrap();
        // head: uint16 | off(string) | packed bools | off(bytes)
        let expected = vec![
            0x00, 0x05, 0x00, 0x07, 0x40, 0x00, 0x0b, // head
            0x00, 0x02, b'h', b'i', // "hi"
            0x00, 0x01, 0xaa, // [0xaa]
        ];
        assert_eq!(encoded, expected);
        assert_eq!(ty.decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_string_pair_and_uint_array() {
        let pair = t("(string,string)");
        let value = AbiValue::Array(vec![AbiValue::from("hello"), AbiValue::from("world")]);
        let encoded = pair.encode(&value).unwrap();
        assert_eq!(&encoded[..4], &[0, 4, 0, 11]);
        assert_eq!(pair.decode(&encoded).unwrap(), value);

        let list = t("uint64[]");
        let value = AbiValue::Array((1u64..=5).map(AbiValue::from).collect());
        let encoded = list.encode(&value).unwrap();
        assert_eq!(encoded.len(), 2 + 5 * 8);
        assert_eq!(list.decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_decode_rejects_overrun() {
        // claims 3 uint64 elements with only 8 bytes following
        let mut bytes = vec![0, 3];
        bytes.extend([0; 8]);
        assert!(t("uint64[]").decode(&bytes).is_err());
        // string claims 10 bytes
        assert!(t("string").decode(&[0, 10, b'a']).is_err());
        // tuple offset past the end
        assert!(t("(string)").decode(&[0, 9, 0, 0]).is_err());
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        assert!(t("(uint8,uint8)").decode(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_type_mismatch() {
        assert!(matches!(
            t("uint64").encode(&AbiValue::from("x")),
            Err(AbiError::TypeMismatch { .. })
        ));
        assert!(t("uint64[2]").encode(&AbiValue::Array(vec![AbiValue::from(1u64)])).is_err());
    }
}
