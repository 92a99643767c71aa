//! Transaction signers.
//!
//! A signer receives the whole group and the indexes it is responsible for,
//! and returns one encoded signed transaction per index, in index order.
//! Seeing the whole group lets batch signers (hardware wallets, KMS) review
//! everything they are asked to authorize in one call.
//!
//! # Implementing a Custom Signer
//!
//! ```rust
//! use algo_kit::{SignFuture, SignerError, Transaction, TransactionSigner};
//!
//! /// Signs nothing; every slot goes out unsigned.
//! struct Unsigned;
//!
//! impl TransactionSigner for Unsigned {
//!     fn sign_transactions<'a>(
//!         &'a self,
//!         group: &'a [Transaction],
//!         indexes: &'a [usize],
//!     ) -> SignFuture<'a> {
//!         let result: Result<Vec<Vec<u8>>, SignerError> = indexes
//!             .iter()
//!             .map(|&i| {
//!                 let txn = group.get(i).ok_or(SignerError::IndexOutOfRange {
//!                     index: i,
//!                     len: group.len(),
//!                 })?;
//!                 Ok(algo_kit::SignedTransaction::new(txn.clone()).to_msgpack()?)
//!             })
//!             .collect();
//!         Box::pin(async move { result })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::SignerError;
use crate::types::{
    LogicSigAccount, MultisigMetadata, SecretKey, SignedTransaction, Transaction,
};

/// Boxed future returned by [`TransactionSigner::sign_transactions`].
pub type SignFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<Vec<u8>>, SignerError>> + Send + 'a>>;

/// Trait for anything that can authorize transactions in a group.
pub trait TransactionSigner: Send + Sync {
    /// Sign `group[i]` for every `i` in `indexes`.
    fn sign_transactions<'a>(
        &'a self,
        group: &'a [Transaction],
        indexes: &'a [usize],
    ) -> SignFuture<'a>;
}

impl<T: TransactionSigner + ?Sized> TransactionSigner for Arc<T> {
    fn sign_transactions<'a>(
        &'a self,
        group: &'a [Transaction],
        indexes: &'a [usize],
    ) -> SignFuture<'a> {
        (**self).sign_transactions(group, indexes)
    }
}

impl std::fmt::Debug for dyn TransactionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TransactionSigner")
    }
}

/// Apply `sign` to each selected transaction and encode the result.
fn sign_each(
    group: &[Transaction],
    indexes: &[usize],
    mut sign: impl FnMut(&Transaction) -> Result<SignedTransaction, SignerError>,
) -> Result<Vec<Vec<u8>>, SignerError> {
    indexes
        .iter()
        .map(|&index| {
            let txn = group.get(index).ok_or(SignerError::IndexOutOfRange {
                index,
                len: group.len(),
            })?;
            Ok(sign(txn)?.to_msgpack()?)
        })
        .collect()
}

// ============================================================================
// BasicAccountSigner
// ============================================================================

/// Signs with a single ed25519 key.
///
/// The key does not have to be the sender's: for a rekeyed account the
/// signer's address is recorded as the authorizing address.
#[derive(Clone)]
pub struct BasicAccountSigner {
    key: SecretKey,
}

impl BasicAccountSigner {
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }

    pub fn address(&self) -> crate::types::Address {
        self.key.address()
    }
}

impl TransactionSigner for BasicAccountSigner {
    fn sign_transactions<'a>(
        &'a self,
        group: &'a [Transaction],
        indexes: &'a [usize],
    ) -> SignFuture<'a> {
        let result = sign_each(group, indexes, |txn| Ok(txn.sign(&self.key)?));
        Box::pin(async move { result })
    }
}

impl std::fmt::Debug for BasicAccountSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAccountSigner")
            .field("address", &self.key.address())
            .finish()
    }
}

// ============================================================================
// LogicSigAccountSigner
// ============================================================================

/// Authorizes with a logic signature, escrow or delegated.
#[derive(Debug, Clone)]
pub struct LogicSigAccountSigner {
    account: LogicSigAccount,
}

impl LogicSigAccountSigner {
    pub fn new(account: LogicSigAccount) -> Self {
        Self { account }
    }
}

impl TransactionSigner for LogicSigAccountSigner {
    fn sign_transactions<'a>(
        &'a self,
        group: &'a [Transaction],
        indexes: &'a [usize],
    ) -> SignFuture<'a> {
        let result = sign_each(group, indexes, |txn| self.account.sign_transaction(txn));
        Box::pin(async move { result })
    }
}

// ============================================================================
// MultisigAccountSigner
// ============================================================================

/// Fills the subsignature slots of the keys it holds.
///
/// Each call produces a fresh multisig structure; signatures collected
/// elsewhere are not merged in.
#[derive(Clone)]
pub struct MultisigAccountSigner {
    metadata: MultisigMetadata,
    keys: Vec<SecretKey>,
}

impl MultisigAccountSigner {
    /// Every key must belong to the multisig account.
    pub fn new(metadata: MultisigMetadata, keys: Vec<SecretKey>) -> Result<Self, SignerError> {
        metadata.address()?;
        if keys
            .iter()
            .any(|key| !metadata.addrs.contains(&key.address()))
        {
            return Err(SignerError::KeyNotInMultisig);
        }
        Ok(Self { metadata, keys })
    }

    pub fn metadata(&self) -> &MultisigMetadata {
        &self.metadata
    }
}

impl TransactionSigner for MultisigAccountSigner {
    fn sign_transactions<'a>(
        &'a self,
        group: &'a [Transaction],
        indexes: &'a [usize],
    ) -> SignFuture<'a> {
        let result = self.metadata.address().and_then(|address| {
            sign_each(group, indexes, |txn| {
                let message = txn.bytes_to_sign()?;
                let mut msig = self.metadata.unsigned();
                for key in &self.keys {
                    msig.sign(key, &message)?;
                }
                let mut signed = SignedTransaction::new(txn.clone()).with_multisig(msig);
                if address != txn.sender() {
                    signed = signed.with_auth_address(address);
                }
                Ok(signed)
            })
        });
        Box::pin(async move { result })
    }
}

impl std::fmt::Debug for MultisigAccountSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultisigAccountSigner")
            .field("metadata", &self.metadata)
            .field("key_count", &self.keys.len())
            .finish()
    }
}

// ============================================================================
// EmptySigner
// ============================================================================

/// Leaves every slot unsigned. Useful for simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySigner;

impl TransactionSigner for EmptySigner {
    fn sign_transactions<'a>(
        &'a self,
        group: &'a [Transaction],
        indexes: &'a [usize],
    ) -> SignFuture<'a> {
        let result = sign_each(group, indexes, |txn| Ok(SignedTransaction::new(txn.clone())));
        Box::pin(async move { result })
    }
}

// ============================================================================
// TransactionWithSigner
// ============================================================================

/// A transaction paired with the signer that will authorize it.
#[derive(Clone)]
pub struct TransactionWithSigner {
    pub txn: Transaction,
    pub signer: Arc<dyn TransactionSigner>,
}

impl TransactionWithSigner {
    pub fn new(txn: Transaction, signer: Arc<dyn TransactionSigner>) -> Self {
        Self { txn, signer }
    }
}

impl std::fmt::Debug for TransactionWithSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionWithSigner")
            .field("txn", &self.txn)
            .finish_non_exhaustive()
    }
}
