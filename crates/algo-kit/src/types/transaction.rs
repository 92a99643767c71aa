//! Transactions.
//!
//! A [`Transaction`] is a sender, common validity data and exactly one
//! [`TransactionParams`] block. Transactions are assembled with
//! [`TransactionBuilder`], which validates every field and derives the fee
//! from [`SuggestedParams`]; afterwards the only mutation is group
//! assignment.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::hash::{TX_GROUP_TAG, TX_TAG, TxId, tagged_hash};
use super::heartbeat::HeartbeatFields;
use super::params::{
    AssetConfigFields, AssetFreezeFields, AssetTransferFields, ApplicationCallFields,
    KeyRegistrationFields, LEASE_LENGTH, PaymentFields, StateProofFields, TransactionParams,
    TransactionType,
};
use super::signed::SignedTransaction;
use super::{Address, SecretKey};
use crate::encoding::{self, Encodable, Fields, MapEntry, Schema, Value};
use crate::error::{EncodingError, TransactionError};

/// Maximum number of transactions in an atomic group.
pub const MAX_TX_GROUP_SIZE: usize = 16;

/// Bytes added to the unsigned encoding to approximate a signed one.
const SIGNATURE_SIZE_ESTIMATE: usize = 75;

/// Protocol minimum fee, in microalgos.
pub const MIN_TXN_FEE: u64 = 1000;

// ============================================================================
// Suggested parameters
// ============================================================================

/// Network-supplied fee and validity defaults for new transactions.
///
/// When `flat_fee` is false, `fee` is a per-byte rate and the final fee is
/// derived from the encoded size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedParams {
    pub fee: u64,
    pub min_fee: u64,
    pub flat_fee: bool,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
}

impl SuggestedParams {
    /// Parameters with a zero per-byte rate and the protocol minimum fee.
    pub fn new(
        genesis_id: impl Into<String>,
        genesis_hash: [u8; 32],
        first_valid: u64,
        last_valid: u64,
    ) -> Self {
        Self {
            fee: 0,
            min_fee: MIN_TXN_FEE,
            flat_fee: false,
            first_valid,
            last_valid,
            genesis_id: genesis_id.into(),
            genesis_hash,
        }
    }

    /// Use exactly this fee.
    pub fn flat_fee(mut self, fee: u64) -> Self {
        self.fee = fee;
        self.flat_fee = true;
        self
    }

    /// Derive the fee from the encoded size at this rate.
    pub fn fee_per_byte(mut self, rate: u64) -> Self {
        self.fee = rate;
        self.flat_fee = false;
        self
    }

    pub fn min_fee(mut self, min_fee: u64) -> Self {
        self.min_fee = min_fee;
        self
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// An unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    sender: Address,
    fee: u64,
    first_valid: u64,
    last_valid: u64,
    genesis_id: String,
    genesis_hash: [u8; 32],
    note: Vec<u8>,
    lease: Option<[u8; 32]>,
    rekey_to: Option<Address>,
    group: Option<[u8; 32]>,
    params: TransactionParams,
}

impl Transaction {
    /// Start building a transaction from `sender`.
    pub fn builder(sender: Address, params: &SuggestedParams) -> TransactionBuilder {
        TransactionBuilder::new(sender, params)
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    pub fn fee(&self) -> u64 {
        self.fee
    }

    pub fn first_valid(&self) -> u64 {
        self.first_valid
    }

    pub fn last_valid(&self) -> u64 {
        self.last_valid
    }

    pub fn genesis_id(&self) -> &str {
        &self.genesis_id
    }

    pub fn genesis_hash(&self) -> &[u8; 32] {
        &self.genesis_hash
    }

    pub fn note(&self) -> &[u8] {
        &self.note
    }

    pub fn lease(&self) -> Option<&[u8; 32]> {
        self.lease.as_ref()
    }

    pub fn rekey_to(&self) -> Option<Address> {
        self.rekey_to
    }

    /// The group id, once assigned.
    pub fn group(&self) -> Option<&[u8; 32]> {
        self.group.as_ref()
    }

    pub fn params(&self) -> &TransactionParams {
        &self.params
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.params.transaction_type()
    }

    /// Set the group id. An all-zero id clears it.
    pub fn assign_group(&mut self, group: [u8; 32]) {
        self.group = group.iter().any(|b| *b != 0).then_some(group);
    }

    pub fn clear_group(&mut self) {
        self.group = None;
    }

    /// Canonical msgpack encoding.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, EncodingError> {
        encoding::encode_msgpack(self)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, EncodingError> {
        encoding::decode_msgpack(bytes)
    }

    /// The bytes a signature commits to: `"TX" ‖ msgpack`.
    pub fn bytes_to_sign(&self) -> Result<Vec<u8>, EncodingError> {
        let mut out = TX_TAG.to_vec();
        out.extend(self.to_msgpack()?);
        Ok(out)
    }

    /// Raw 32-byte transaction id.
    pub fn raw_id(&self) -> Result<[u8; 32], EncodingError> {
        Ok(tagged_hash(TX_TAG, &self.to_msgpack()?))
    }

    pub fn id(&self) -> Result<TxId, EncodingError> {
        self.raw_id().map(TxId::from_bytes)
    }

    /// Approximate size of the signed transaction.
    pub fn estimate_size(&self) -> Result<usize, EncodingError> {
        Ok(self.to_msgpack()?.len() + SIGNATURE_SIZE_ESTIMATE)
    }

    /// Sign with a single key. If the key is not the sender's (a rekeyed
    /// account), the signer address is recorded as `sgnr`.
    pub fn sign(&self, key: &SecretKey) -> Result<SignedTransaction, EncodingError> {
        let signature = key.sign(&self.bytes_to_sign()?);
        let signer = key.address();
        let mut signed = SignedTransaction::new(self.clone()).with_signature(signature);
        if signer != self.sender {
            signed = signed.with_auth_address(signer);
        }
        Ok(signed)
    }

    /// Apply the fee rule: a flat fee is used as is; otherwise the fee is
    /// the rate times the estimated signed size, raised to `min_fee` unless
    /// it came out as zero.
    fn apply_fee(&mut self, suggested: &SuggestedParams) -> Result<(), TransactionError> {
        if suggested.flat_fee {
            self.fee = suggested.fee;
            return Ok(());
        }

        self.fee = suggested.fee;
        let size = self.estimate_size()?;
        let fee = u64::try_from(size)
            .ok()
            .and_then(|size| suggested.fee.checked_mul(size))
            .ok_or(TransactionError::FeeOverflow {
                fee_per_byte: suggested.fee,
                size,
            })?;
        self.fee = if fee != 0 && fee < suggested.min_fee {
            suggested.min_fee
        } else {
            fee
        };
        trace!(size, fee = self.fee, "Computed transaction fee");
        Ok(())
    }
}

impl Encodable for Transaction {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            let mut entries = vec![
                MapEntry::field("fee", Schema::Uint64),
                MapEntry::field("fv", Schema::Uint64),
                MapEntry::field("gen", Schema::String),
                MapEntry::field("gh", Schema::FixedBytes(32)),
                MapEntry::field("grp", Schema::FixedBytes(32)),
                MapEntry::field("lv", Schema::Uint64),
                MapEntry::field("lx", Schema::FixedBytes(LEASE_LENGTH)),
                MapEntry::field("note", Schema::ByteArray),
                MapEntry::field("rekey", Schema::Address),
                MapEntry::field("snd", Schema::Address),
                MapEntry::field("type", Schema::String),
            ];
            entries.extend(TransactionParams::embedded_schemas());
            Schema::named_map(entries)
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        let common = Fields::new()
            .with("fee", self.fee)
            .with("fv", self.first_valid)
            .with("gen", self.genesis_id.as_str())
            .with("gh", self.genesis_hash)
            .with("grp", self.group.unwrap_or([0; 32]))
            .with("lv", self.last_valid)
            .with("lx", self.lease.unwrap_or([0; 32]))
            .with("note", self.note.clone())
            .with("rekey", self.rekey_to.unwrap_or_default())
            .with("snd", self.sender)
            .with("type", self.transaction_type().as_str());
        Ok(common.merge(self.params.to_fields()?).into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        let type_tag = f.take_string("type")?;
        let txn_type = TransactionType::parse(&type_tag)
            .ok_or_else(|| EncodingError::invalid(format!("unknown transaction type '{type_tag}'")))?;

        Ok(Self {
            fee: f.take_u64("fee")?,
            first_valid: f.take_u64("fv")?,
            genesis_id: f.take_string("gen")?,
            genesis_hash: f.take_fixed("gh")?,
            group: f.take_nonzero_fixed("grp")?,
            last_valid: f.take_u64("lv")?,
            lease: f.take_nonzero_fixed("lx")?,
            note: f.take_bytes("note")?,
            rekey_to: f.take_nonzero_address("rekey")?,
            sender: f.take_address("snd")?,
            params: TransactionParams::from_fields(txn_type, &mut f)?,
        })
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Transaction`]. Exactly one type-specific method must be
/// called before [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    sender: Address,
    suggested: SuggestedParams,
    note: Vec<u8>,
    lease: Option<Vec<u8>>,
    rekey_to: Option<Address>,
    params: Option<TransactionParams>,
    conflicting_params: bool,
}

impl TransactionBuilder {
    fn new(sender: Address, suggested: &SuggestedParams) -> Self {
        Self {
            sender,
            suggested: suggested.clone(),
            note: Vec::new(),
            lease: None,
            rekey_to: None,
            params: None,
            conflicting_params: false,
        }
    }

    /// Arbitrary data attached to the transaction.
    pub fn note(mut self, note: impl Into<Vec<u8>>) -> Self {
        self.note = note.into();
        self
    }

    /// 32-byte lease for mutual exclusion within the validity window.
    pub fn lease(mut self, lease: impl Into<Vec<u8>>) -> Self {
        self.lease = Some(lease.into());
        self
    }

    /// Rekey the sender to another authorizing address.
    pub fn rekey_to(mut self, address: Address) -> Self {
        self.rekey_to = Some(address);
        self
    }

    /// Override the validity window.
    pub fn validity(mut self, first_valid: u64, last_valid: u64) -> Self {
        self.suggested.first_valid = first_valid;
        self.suggested.last_valid = last_valid;
        self
    }

    /// Use exactly this fee regardless of the suggested parameters.
    pub fn flat_fee(mut self, fee: u64) -> Self {
        self.suggested = self.suggested.flat_fee(fee);
        self
    }

    /// Set the type-specific parameters directly.
    pub fn params(mut self, params: TransactionParams) -> Self {
        if self.params.is_some() {
            self.conflicting_params = true;
        }
        self.params = Some(params);
        self
    }

    pub fn payment(
        self,
        receiver: Address,
        amount: u64,
        close_remainder_to: Option<Address>,
    ) -> Self {
        self.params(TransactionParams::Payment(PaymentFields {
            receiver,
            amount,
            close_remainder_to,
        }))
    }

    pub fn key_registration(self, fields: KeyRegistrationFields) -> Self {
        self.params(TransactionParams::KeyRegistration(fields))
    }

    pub fn asset_config(self, fields: AssetConfigFields) -> Self {
        self.params(TransactionParams::AssetConfig(fields))
    }

    pub fn asset_transfer(self, fields: AssetTransferFields) -> Self {
        self.params(TransactionParams::AssetTransfer(fields))
    }

    pub fn asset_freeze(self, asset_id: u64, freeze_target: Address, frozen: bool) -> Self {
        self.params(TransactionParams::AssetFreeze(AssetFreezeFields {
            asset_id,
            freeze_target,
            frozen,
        }))
    }

    pub fn application_call(self, fields: ApplicationCallFields) -> Self {
        self.params(TransactionParams::ApplicationCall(fields))
    }

    pub fn state_proof(self, fields: StateProofFields) -> Self {
        self.params(TransactionParams::StateProof(fields))
    }

    pub fn heartbeat(self, fields: HeartbeatFields) -> Self {
        self.params(TransactionParams::Heartbeat(fields))
    }

    /// Validate, normalize and compute the fee.
    pub fn build(self) -> Result<Transaction, TransactionError> {
        if self.conflicting_params {
            return Err(TransactionError::MultipleTypeFields);
        }
        let params = self
            .params
            .ok_or(TransactionError::MissingTypeFields)?
            .normalize()?;

        if self.rekey_to.is_some_and(|a| a.is_zero()) {
            return Err(TransactionError::ZeroAddress("rekey_to"));
        }

        let lease = match self.lease {
            None => None,
            Some(bytes) => {
                let lease: [u8; LEASE_LENGTH] =
                    bytes
                        .as_slice()
                        .try_into()
                        .map_err(|_| TransactionError::InvalidLength {
                            field: "lease",
                            expected: LEASE_LENGTH,
                            actual: bytes.len(),
                        })?;
                lease.iter().any(|b| *b != 0).then_some(lease)
            }
        };

        let mut txn = Transaction {
            sender: self.sender,
            fee: 0,
            first_valid: self.suggested.first_valid,
            last_valid: self.suggested.last_valid,
            genesis_id: self.suggested.genesis_id.clone(),
            genesis_hash: self.suggested.genesis_hash,
            note: self.note,
            lease,
            rekey_to: self.rekey_to,
            group: None,
            params,
        };
        txn.apply_fee(&self.suggested)?;
        Ok(txn)
    }
}

// ============================================================================
// Groups
// ============================================================================

fn group_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::named_map(vec![MapEntry::required(
            "txlist",
            Schema::array(Schema::FixedBytes(32)),
        )])
    })
}

/// Group id over the transactions' own ids, in order.
pub fn compute_group_id(transactions: &[Transaction]) -> Result<[u8; 32], TransactionError> {
    if transactions.is_empty() {
        return Err(TransactionError::EmptyGroup);
    }
    if transactions.len() > MAX_TX_GROUP_SIZE {
        return Err(TransactionError::GroupTooLarge {
            size: transactions.len(),
            max: MAX_TX_GROUP_SIZE,
        });
    }

    let ids = transactions
        .iter()
        .map(|t| t.raw_id().map(Value::from))
        .collect::<Result<Vec<_>, _>>()?;
    let data = Value::Map(Fields::new().with("txlist", ids));
    let bytes = encoding::msgpack::write_canonical(group_schema().to_msgpack(&data)?)?;
    Ok(tagged_hash(TX_GROUP_TAG, &bytes))
}

/// Compute the group id and assign it to every transaction.
pub fn assign_group_id(transactions: &mut [Transaction]) -> Result<[u8; 32], TransactionError> {
    let group = compute_group_id(transactions)?;
    for txn in transactions.iter_mut() {
        txn.assign_group(group);
    }
    Ok(group)
}
