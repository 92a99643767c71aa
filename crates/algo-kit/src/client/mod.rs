//! Node access, signing and atomic group execution.
//!
//! - [`AlgodClient`]: REST client for algod with retry logic
//! - [`AlgodTransport`]: the node operations the composer relies on
//! - [`wait_for_confirmation`]: bounded confirmation polling
//! - [`AtomicTransactionComposer`]: builds, signs and executes groups
//!
//! # Signers
//!
//! | Signer | Use Case |
//! |--------|----------|
//! | [`BasicAccountSigner`] | A single ed25519 key, including rekeyed senders |
//! | [`LogicSigAccountSigner`] | Escrow or delegated logic signatures |
//! | [`MultisigAccountSigner`] | Fills the subsignatures of the keys it holds |
//! | [`EmptySigner`] | Unsigned transactions for simulation |

mod algod;
mod composer;
mod signer;
mod wait;

#[cfg(test)]
mod mock;

pub use algod::{
    AlgodClient, AlgodFuture, AlgodTransport, BETANET, LOCALNET, MAINNET, NetworkConfig,
    NodeStatus, RetryConfig, TESTNET,
};
pub use composer::{
    AbiResult, AtomicTransactionComposer, ExecuteResult, MethodArgValue, MethodCallParams,
};
pub use signer::{
    BasicAccountSigner, EmptySigner, LogicSigAccountSigner, MultisigAccountSigner, SignFuture,
    TransactionSigner, TransactionWithSigner,
};
pub use wait::wait_for_confirmation;

/// Lifecycle of an [`AtomicTransactionComposer`]. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ComposerStatus {
    /// Transactions can still be added.
    #[default]
    Building,
    /// The group id has been assigned.
    Built,
    /// Every transaction carries a signature.
    Signed,
    /// The group was sent to the network.
    Submitted,
    /// The group was confirmed.
    Committed,
}
