//! ARC-4 contract and interface descriptions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::method::Method;
use crate::error::AbiError;

/// Where a contract is deployed on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractNetworkInfo {
    #[serde(rename = "appID")]
    pub app_id: u64,
}

/// A contract: its methods plus deployments keyed by genesis hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub name: String,
    #[serde(rename = "desc", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, ContractNetworkInfo>,
    pub methods: Vec<Method>,
}

impl Contract {
    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        serde_json::from_str(json).map_err(|e| AbiError::InvalidMethod(e.to_string()))
    }

    /// The single method called `name`.
    pub fn get_method_by_name(&self, name: &str) -> Result<&Method, AbiError> {
        find_by_name(&self.methods, name)
    }

    pub fn get_method_by_signature(&self, signature: &str) -> Result<&Method, AbiError> {
        self.methods
            .iter()
            .find(|m| m.signature() == signature)
            .ok_or_else(|| AbiError::MethodNotFound(signature.to_string()))
    }

    /// Application id on the network with this genesis hash.
    pub fn app_id(&self, genesis_hash: &str) -> Option<u64> {
        self.networks.get(genesis_hash).map(|n| n.app_id)
    }
}

/// A named set of methods a contract may implement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub name: String,
    #[serde(rename = "desc", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub methods: Vec<Method>,
}

impl Interface {
    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        serde_json::from_str(json).map_err(|e| AbiError::InvalidMethod(e.to_string()))
    }

    pub fn get_method_by_name(&self, name: &str) -> Result<&Method, AbiError> {
        find_by_name(&self.methods, name)
    }
}

fn find_by_name<'a>(methods: &'a [Method], name: &str) -> Result<&'a Method, AbiError> {
    let mut matches = methods.iter().filter(|m| m.name() == name);
    match (matches.next(), matches.count()) {
        (Some(method), 0) => Ok(method),
        (None, _) => Err(AbiError::MethodNotFound(name.to_string())),
        (Some(_), rest) => Err(AbiError::AmbiguousMethod {
            name: name.to_string(),
            count: rest + 1,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: &str = r#"{
        "name": "Calculator",
        "desc": "Basic arithmetic",
        "networks": {
            "wGHE2Pwdvd7S12BL5FaOP20EGYesN73ktiC1qzkkit8=": {"appID": 1234}
        },
        "methods": [
            {"name": "add", "args": [{"type": "uint64"}, {"type": "uint64"}], "returns": {"type": "uint64"}},
            {"name": "add", "args": [{"type": "uint32"}, {"type": "uint32"}], "returns": {"type": "uint32"}},
            {"name": "reset", "args": [], "returns": {"type": "void"}}
        ]
    }"#;

    #[test]
    fn test_parse_contract() {
        let contract = Contract::from_json(CONTRACT).unwrap();
        assert_eq!(contract.name, "Calculator");
        assert_eq!(contract.description.as_deref(), Some("Basic arithmetic"));
        assert_eq!(
            contract.app_id("wGHE2Pwdvd7S12BL5FaOP20EGYesN73ktiC1qzkkit8="),
            Some(1234)
        );
        assert_eq!(contract.methods.len(), 3);
    }

    #[test]
    fn test_method_lookup() {
        let contract = Contract::from_json(CONTRACT).unwrap();
        assert_eq!(
            contract.get_method_by_name("reset").unwrap().signature(),
            "reset()void"
        );
        assert_eq!(
            contract.get_method_by_name("add").unwrap_err(),
            AbiError::AmbiguousMethod {
                name: "add".to_string(),
                count: 2
            }
        );
        assert!(matches!(
            contract.get_method_by_name("sub"),
            Err(AbiError::MethodNotFound(_))
        ));
        assert!(contract.get_method_by_signature("add(uint32,uint32)uint32").is_ok());
    }

    #[test]
    fn test_interface_round_trip() {
        let json = r#"{"name": "ARC0000", "methods": [
            {"name": "ping", "args": [{"type": "pay", "name": "fee"}], "returns": {"type": "void"}}
        ]}"#;
        let interface = Interface::from_json(json).unwrap();
        let method = interface.get_method_by_name("ping").unwrap();
        assert_eq!(method.txn_count(), 2);

        let text = serde_json::to_string(&interface).unwrap();
        assert_eq!(Interface::from_json(&text).unwrap(), interface);
    }

    #[test]
    fn test_invalid_type_in_json() {
        let json = r#"{"name": "X", "methods": [
            {"name": "f", "args": [{"type": "uint7"}], "returns": {"type": "void"}}
        ]}"#;
        assert!(Interface::from_json(json).is_err());
    }
}
