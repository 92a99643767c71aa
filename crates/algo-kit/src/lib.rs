//! Canonical encoding, ABI and atomic transaction composition for Algorand.
//!
//! **algo-kit** builds byte-exact Algorand transactions, encodes ARC-4 method
//! calls, and drives atomic groups from construction through confirmation.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use algo_kit::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), algo_kit::Error> {
//!     let client = AlgodClient::from_network(&LOCALNET);
//!     let params = client.suggested_params().await?;
//!
//!     let key = SecretKey::generate();
//!     let receiver: Address = "SGNKBMWAOCJQGSOIGQLRQMNUJ5NU4I56PXH6OJJJQNQPZ5G5G3IOVLI5VM".parse()?;
//!     let payment = Transaction::builder(key.address(), &params)
//!         .payment(receiver, 100_000, None)
//!         .build()?;
//!
//!     let mut composer = AtomicTransactionComposer::new();
//!     composer.add_transaction(TransactionWithSigner::new(
//!         payment,
//!         Arc::new(BasicAccountSigner::new(key)),
//!     ))?;
//!     let result = composer.execute(&client, 4).await?;
//!     println!("confirmed in round {}", result.confirmed_round);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`encoding`]: schema-driven canonical msgpack and JSON encoding
//! - [`types`]: addresses, keys, transactions, signatures and node records
//! - [`abi`]: ARC-4 types, values, methods and contracts
//! - [`client`]: algod transport, signers, confirmation and the composer
//!
//! # Wire Encoding
//!
//! Every protocol entity implements [`Encodable`]; its encoding omits
//! default-valued fields and sorts map keys, so equal values always produce
//! equal bytes.
//!
//! ```
//! use algo_kit::{Address, SuggestedParams, Transaction};
//!
//! let params = SuggestedParams::new("testnet-v1.0", [0; 32], 1, 1001).flat_fee(1000);
//! let txn = Transaction::builder(Address::from_bytes([1; 32]), &params)
//!     .payment(Address::from_bytes([2; 32]), 5, None)
//!     .build()
//!     .unwrap();
//!
//! let bytes = txn.to_msgpack().unwrap();
//! assert_eq!(Transaction::from_msgpack(&bytes).unwrap(), txn);
//! ```

pub mod abi;
pub mod client;
pub mod encoding;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{
    AbiError, AlgodError, ComposerError, EncodingError, Error, ParseAddressError, ParseHashError,
    ParseKeyError, SignerError, TransactionError,
};
pub use types::*;

pub use encoding::{Encodable, decode_json, decode_msgpack, encode_json, encode_msgpack};

pub use abi::{
    AbiType, AbiValue, Contract, ContractNetworkInfo, Interface, Method, MethodArg, MethodArgType,
    ReferenceType, TransactionArgType,
};

pub use client::{
    AbiResult, AlgodClient, AlgodFuture, AlgodTransport, AtomicTransactionComposer,
    BETANET, BasicAccountSigner, ComposerStatus, EmptySigner, ExecuteResult, LOCALNET,
    LogicSigAccountSigner, MAINNET, MethodArgValue, MethodCallParams, MultisigAccountSigner,
    NetworkConfig, NodeStatus, RetryConfig, SignFuture, TESTNET, TransactionSigner,
    TransactionWithSigner, wait_for_confirmation,
};
