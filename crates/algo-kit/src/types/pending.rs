//! Pending transaction information returned by algod.
//!
//! Responses are decoded from the node's JSON projection. Inner
//! transactions nest the same record, so the schema refers to itself.

use std::sync::OnceLock;

use super::{Address, SignedTransaction};
use crate::encoding::{self, Encodable, Fields, MapEntry, Schema, Value};
use crate::error::EncodingError;

/// A change to one state value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EvalDelta {
    /// 1 = set bytes, 2 = set uint, 3 = delete.
    pub action: u64,
    pub bytes: Vec<u8>,
    pub uint: u64,
}

fn eval_delta_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::named_map(vec![
            MapEntry::required("action", Schema::Uint64),
            MapEntry::field("bytes", Schema::ByteArray),
            MapEntry::field("uint", Schema::Uint64),
        ])
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EvalDeltaKeyValue {
    pub key: Vec<u8>,
    pub value: EvalDelta,
}

fn key_value_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::named_map(vec![
            MapEntry::required("key", Schema::ByteArray),
            MapEntry::required("value", Schema::Ref(eval_delta_schema)),
        ])
    })
}

impl EvalDeltaKeyValue {
    fn to_value(&self) -> Value {
        Fields::new()
            .with("key", self.key.clone())
            .with(
                "value",
                Fields::new()
                    .with("action", self.value.action)
                    .with("bytes", self.value.bytes.clone())
                    .with("uint", self.value.uint),
            )
            .into()
    }

    fn from_value(value: Value) -> Result<Self, EncodingError> {
        let mut f = value.into_fields()?;
        let mut delta = f.take_fields("value")?;
        Ok(Self {
            key: f.take_bytes("key")?,
            value: EvalDelta {
                action: delta.take_u64("action")?,
                bytes: delta.take_bytes("bytes")?,
                uint: delta.take_u64("uint")?,
            },
        })
    }
}

/// Local state changes for one account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountStateDelta {
    pub address: Address,
    pub delta: Vec<EvalDeltaKeyValue>,
}

fn account_delta_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::named_map(vec![
            MapEntry::required("address", Schema::Address),
            MapEntry::required("delta", Schema::array(Schema::Ref(key_value_schema))),
        ])
    })
}

impl AccountStateDelta {
    fn to_value(&self) -> Value {
        Fields::new()
            .with("address", self.address)
            .with("delta", deltas_to_value(&self.delta))
            .into()
    }

    fn from_value(value: Value) -> Result<Self, EncodingError> {
        let mut f = value.into_fields()?;
        Ok(Self {
            address: f.take_address("address")?,
            delta: deltas_from_value(f.take("delta")?)?,
        })
    }
}

fn deltas_to_value(deltas: &[EvalDeltaKeyValue]) -> Vec<Value> {
    deltas.iter().map(EvalDeltaKeyValue::to_value).collect()
}

fn deltas_from_value(value: Value) -> Result<Vec<EvalDeltaKeyValue>, EncodingError> {
    value
        .into_array()?
        .into_iter()
        .map(EvalDeltaKeyValue::from_value)
        .collect()
}

/// The node's view of a submitted transaction.
///
/// `pool_error` is empty unless the node evicted the transaction; a
/// `confirmed_round` means it is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransactionResponse {
    pub pool_error: String,
    pub txn: SignedTransaction,
    pub confirmed_round: Option<u64>,
    pub application_index: Option<u64>,
    pub asset_index: Option<u64>,
    pub asset_closing_amount: Option<u64>,
    pub closing_amount: Option<u64>,
    pub close_rewards: Option<u64>,
    pub receiver_rewards: Option<u64>,
    pub sender_rewards: Option<u64>,
    pub global_state_delta: Vec<EvalDeltaKeyValue>,
    pub local_state_delta: Vec<AccountStateDelta>,
    pub logs: Vec<Vec<u8>>,
    pub inner_txns: Vec<PendingTransactionResponse>,
}

impl PendingTransactionResponse {
    /// Decode the JSON body of `GET /v2/transactions/pending/{txid}`.
    pub fn from_json(json: serde_json::Value) -> Result<Self, EncodingError> {
        encoding::decode_json(json)
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed_round.is_some_and(|r| r > 0)
    }
}

const OPTIONAL_COUNTERS: [&str; 8] = [
    "application-index",
    "asset-closing-amount",
    "asset-index",
    "close-rewards",
    "closing-amount",
    "confirmed-round",
    "receiver-rewards",
    "sender-rewards",
];

impl Encodable for PendingTransactionResponse {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            let mut entries = vec![
                MapEntry::required("pool-error", Schema::String),
                MapEntry::required("txn", Schema::Ref(SignedTransaction::encoding_schema)),
                MapEntry::field("global-state-delta", Schema::array(Schema::Ref(key_value_schema))),
                MapEntry::field(
                    "inner-txns",
                    Schema::array(Schema::Ref(PendingTransactionResponse::encoding_schema)),
                ),
                MapEntry::field(
                    "local-state-delta",
                    Schema::array(Schema::Ref(account_delta_schema)),
                ),
                MapEntry::field("logs", Schema::array(Schema::ByteArray)),
            ];
            entries.extend(
                OPTIONAL_COUNTERS
                    .iter()
                    .map(|&key| MapEntry::field(key, Schema::optional(Schema::Uint64))),
            );
            Schema::named_map(entries)
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        let inner = self
            .inner_txns
            .iter()
            .map(Encodable::to_encoding_data)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Fields::new()
            .with("pool-error", self.pool_error.as_str())
            .with("txn", self.txn.to_encoding_data()?)
            .with("global-state-delta", deltas_to_value(&self.global_state_delta))
            .with("inner-txns", inner)
            .with(
                "local-state-delta",
                self.local_state_delta
                    .iter()
                    .map(AccountStateDelta::to_value)
                    .collect::<Vec<_>>(),
            )
            .with(
                "logs",
                self.logs
                    .iter()
                    .map(|l| Value::Bytes(l.clone()))
                    .collect::<Vec<_>>(),
            )
            .with("application-index", self.application_index)
            .with("asset-closing-amount", self.asset_closing_amount)
            .with("asset-index", self.asset_index)
            .with("close-rewards", self.close_rewards)
            .with("closing-amount", self.closing_amount)
            .with("confirmed-round", self.confirmed_round)
            .with("receiver-rewards", self.receiver_rewards)
            .with("sender-rewards", self.sender_rewards)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        let mut round = |key: &str| -> Result<Option<u64>, EncodingError> {
            f.take_optional(key)?.map(Value::into_u64).transpose()
        };
        let application_index = round("application-index")?;
        let asset_closing_amount = round("asset-closing-amount")?;
        let asset_index = round("asset-index")?;
        let close_rewards = round("close-rewards")?;
        let closing_amount = round("closing-amount")?;
        let confirmed_round = round("confirmed-round")?;
        let receiver_rewards = round("receiver-rewards")?;
        let sender_rewards = round("sender-rewards")?;

        Ok(Self {
            pool_error: f.take_string("pool-error")?,
            txn: SignedTransaction::from_encoding_data(f.take("txn")?)?,
            confirmed_round,
            application_index,
            asset_index,
            asset_closing_amount,
            closing_amount,
            close_rewards,
            receiver_rewards,
            sender_rewards,
            global_state_delta: deltas_from_value(f.take("global-state-delta")?)?,
            local_state_delta: f
                .take_array("local-state-delta")?
                .into_iter()
                .map(AccountStateDelta::from_value)
                .collect::<Result<_, _>>()?,
            logs: f
                .take_array("logs")?
                .into_iter()
                .map(Value::into_bytes)
                .collect::<Result<_, _>>()?,
            inner_txns: f
                .take_array("inner-txns")?
                .into_iter()
                .map(PendingTransactionResponse::from_encoding_data)
                .collect::<Result<_, _>>()?,
        })
    }
}
