//! Method descriptors and selectors.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::abi_type::{AbiType, split_tuple};
use crate::error::AbiError;
use crate::types::{TransactionType, sha512_256};

/// A reference argument, passed as a `uint8` index into the call's foreign
/// arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    Account,
    Asset,
    Application,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Account => "account",
            ReferenceType::Asset => "asset",
            ReferenceType::Application => "application",
        }
    }
}

/// A transaction argument: the caller supplies a whole transaction that is
/// placed in the group ahead of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionArgType {
    /// `txn`: any transaction type.
    Any,
    Pay,
    Keyreg,
    Acfg,
    Axfer,
    Afrz,
    Appl,
}

impl TransactionArgType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionArgType::Any => "txn",
            TransactionArgType::Pay => "pay",
            TransactionArgType::Keyreg => "keyreg",
            TransactionArgType::Acfg => "acfg",
            TransactionArgType::Axfer => "axfer",
            TransactionArgType::Afrz => "afrz",
            TransactionArgType::Appl => "appl",
        }
    }

    /// Whether a transaction of type `txn_type` may fill this argument.
    pub fn accepts(&self, txn_type: TransactionType) -> bool {
        match self {
            TransactionArgType::Any => true,
            TransactionArgType::Pay => txn_type == TransactionType::Payment,
            TransactionArgType::Keyreg => txn_type == TransactionType::KeyRegistration,
            TransactionArgType::Acfg => txn_type == TransactionType::AssetConfig,
            TransactionArgType::Axfer => txn_type == TransactionType::AssetTransfer,
            TransactionArgType::Afrz => txn_type == TransactionType::AssetFreeze,
            TransactionArgType::Appl => txn_type == TransactionType::ApplicationCall,
        }
    }
}

/// The declared type of one method argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodArgType {
    Value(AbiType),
    Reference(ReferenceType),
    Transaction(TransactionArgType),
}

impl MethodArgType {
    pub fn is_transaction(&self) -> bool {
        matches!(self, MethodArgType::Transaction(_))
    }
}

impl Display for MethodArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodArgType::Value(t) => write!(f, "{t}"),
            MethodArgType::Reference(r) => f.write_str(r.as_str()),
            MethodArgType::Transaction(t) => f.write_str(t.as_str()),
        }
    }
}

impl FromStr for MethodArgType {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arg = match s {
            "account" => MethodArgType::Reference(ReferenceType::Account),
            "asset" => MethodArgType::Reference(ReferenceType::Asset),
            "application" => MethodArgType::Reference(ReferenceType::Application),
            "txn" => MethodArgType::Transaction(TransactionArgType::Any),
            "pay" => MethodArgType::Transaction(TransactionArgType::Pay),
            "keyreg" => MethodArgType::Transaction(TransactionArgType::Keyreg),
            "acfg" => MethodArgType::Transaction(TransactionArgType::Acfg),
            "axfer" => MethodArgType::Transaction(TransactionArgType::Axfer),
            "afrz" => MethodArgType::Transaction(TransactionArgType::Afrz),
            "appl" => MethodArgType::Transaction(TransactionArgType::Appl),
            other => MethodArgType::Value(other.parse()?),
        };
        Ok(arg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodArg {
    pub name: Option<String>,
    pub description: Option<String>,
    pub arg_type: MethodArgType,
}

/// An ARC-4 method.
///
/// ```
/// use algo_kit::abi::Method;
///
/// let method = Method::from_signature("add(uint64,uint64)uint128").unwrap();
/// assert_eq!(method.selector(), [0x8a, 0xa3, 0xb6, 0x1f]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "MethodDescription", into = "MethodDescription")]
pub struct Method {
    name: String,
    description: Option<String>,
    args: Vec<MethodArg>,
    returns: Option<AbiType>,
    returns_description: Option<String>,
    selector: [u8; 4],
}

impl Method {
    pub fn new(
        name: impl Into<String>,
        args: Vec<MethodArg>,
        returns: Option<AbiType>,
    ) -> Self {
        let mut method = Self {
            name: name.into(),
            description: None,
            args,
            returns,
            returns_description: None,
            selector: [0; 4],
        };
        method.selector = compute_selector(&method.signature());
        method
    }

    /// Parse `name(arg,...)ret`, where `ret` is a type or `void`.
    pub fn from_signature(signature: &str) -> Result<Self, AbiError> {
        let invalid = || AbiError::InvalidMethod(signature.to_string());
        let open = signature.find('(').ok_or_else(invalid)?;
        if open == 0 {
            return Err(invalid());
        }
        let close = matching_paren(signature, open).ok_or_else(invalid)?;

        let args = split_tuple(&signature[open + 1..close])?
            .into_iter()
            .map(|s| {
                Ok(MethodArg {
                    name: None,
                    description: None,
                    arg_type: s.parse()?,
                })
            })
            .collect::<Result<_, AbiError>>()?;
        let returns = parse_return(&signature[close + 1..])?;

        Ok(Self::new(&signature[..open], args, returns))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn args(&self) -> &[MethodArg] {
        &self.args
    }

    pub fn returns(&self) -> Option<&AbiType> {
        self.returns.as_ref()
    }

    /// `name(arg,...)ret` with `void` for no return value.
    pub fn signature(&self) -> String {
        let args: Vec<String> = self.args.iter().map(|a| a.arg_type.to_string()).collect();
        let returns = self
            .returns
            .as_ref()
            .map_or_else(|| "void".to_string(), ToString::to_string);
        format!("{}({}){}", self.name, args.join(","), returns)
    }

    /// First 4 bytes of SHA-512/256 of the signature.
    pub fn selector(&self) -> [u8; 4] {
        self.selector
    }

    /// Transactions a call occupies: the call plus one per transaction
    /// argument.
    pub fn txn_count(&self) -> usize {
        1 + self
            .args
            .iter()
            .filter(|a| a.arg_type.is_transaction())
            .count()
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

fn compute_selector(signature: &str) -> [u8; 4] {
    let hash = sha512_256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Byte index of the `)` closing the `(` at `open`.
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_return(s: &str) -> Result<Option<AbiType>, AbiError> {
    match s {
        "void" => Ok(None),
        other => other.parse().map(Some),
    }
}

// ============================================================================
// JSON description
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArgDescription {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReturnDescription {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
}

/// ARC-4 JSON shape of a method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MethodDescription {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    desc: Option<String>,
    args: Vec<ArgDescription>,
    returns: ReturnDescription,
}

impl TryFrom<MethodDescription> for Method {
    type Error = AbiError;

    fn try_from(raw: MethodDescription) -> Result<Self, Self::Error> {
        let args = raw
            .args
            .into_iter()
            .map(|a| {
                Ok(MethodArg {
                    arg_type: a.type_name.parse()?,
                    name: a.name,
                    description: a.desc,
                })
            })
            .collect::<Result<_, AbiError>>()?;
        let mut method = Method::new(raw.name, args, parse_return(&raw.returns.type_name)?);
        method.description = raw.desc;
        method.returns_description = raw.returns.desc;
        Ok(method)
    }
}

impl From<Method> for MethodDescription {
    fn from(method: Method) -> Self {
        let returns = ReturnDescription {
            type_name: method
                .returns
                .as_ref()
                .map_or_else(|| "void".to_string(), ToString::to_string),
            desc: method.returns_description,
        };
        MethodDescription {
            name: method.name,
            desc: method.description,
            args: method
                .args
                .into_iter()
                .map(|a| ArgDescription {
                    type_name: a.arg_type.to_string(),
                    name: a.name,
                    desc: a.description,
                })
                .collect(),
            returns,
        }
    }
}
