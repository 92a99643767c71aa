//! Type-specific transaction fields.
//!
//! Each record owns a named-map schema that the transaction schema embeds,
//! so a transaction is one flat map on the wire.

use std::sync::OnceLock;

use super::heartbeat::HeartbeatFields;
use super::resource::{
    self, BoxReference, ResourceReference, access_entry_schema, box_reference_schema,
};
use super::state_proof::{StateProof, StateProofMessage};
use super::Address;
use crate::encoding::{Encodable, Fields, MapEntry, Schema, Value};
use crate::error::{EncodingError, TransactionError};

pub(crate) const LEASE_LENGTH: usize = 32;
const METADATA_HASH_LENGTH: usize = 32;

/// Transaction type tag, as written under the `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    Payment,
    KeyRegistration,
    AssetConfig,
    AssetTransfer,
    AssetFreeze,
    ApplicationCall,
    StateProof,
    Heartbeat,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payment => "pay",
            TransactionType::KeyRegistration => "keyreg",
            TransactionType::AssetConfig => "acfg",
            TransactionType::AssetTransfer => "axfer",
            TransactionType::AssetFreeze => "afrz",
            TransactionType::ApplicationCall => "appl",
            TransactionType::StateProof => "stpf",
            TransactionType::Heartbeat => "hb",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pay" => TransactionType::Payment,
            "keyreg" => TransactionType::KeyRegistration,
            "acfg" => TransactionType::AssetConfig,
            "axfer" => TransactionType::AssetTransfer,
            "afrz" => TransactionType::AssetFreeze,
            "appl" => TransactionType::ApplicationCall,
            "stpf" => TransactionType::StateProof,
            "hb" => TransactionType::Heartbeat,
            _ => return None,
        })
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The type-specific part of a transaction. Exactly one is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionParams {
    Payment(PaymentFields),
    KeyRegistration(KeyRegistrationFields),
    AssetConfig(AssetConfigFields),
    AssetTransfer(AssetTransferFields),
    AssetFreeze(AssetFreezeFields),
    ApplicationCall(ApplicationCallFields),
    StateProof(StateProofFields),
    Heartbeat(HeartbeatFields),
}

impl TransactionParams {
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            TransactionParams::Payment(_) => TransactionType::Payment,
            TransactionParams::KeyRegistration(_) => TransactionType::KeyRegistration,
            TransactionParams::AssetConfig(_) => TransactionType::AssetConfig,
            TransactionParams::AssetTransfer(_) => TransactionType::AssetTransfer,
            TransactionParams::AssetFreeze(_) => TransactionType::AssetFreeze,
            TransactionParams::ApplicationCall(_) => TransactionType::ApplicationCall,
            TransactionParams::StateProof(_) => TransactionType::StateProof,
            TransactionParams::Heartbeat(_) => TransactionType::Heartbeat,
        }
    }

    /// Validate and bring into the form decoding would produce.
    pub(crate) fn normalize(self) -> Result<Self, TransactionError> {
        Ok(match self {
            TransactionParams::Payment(p) => {
                check_optional_address(p.close_remainder_to, "close_remainder_to")?;
                TransactionParams::Payment(p)
            }
            TransactionParams::KeyRegistration(k) => {
                TransactionParams::KeyRegistration(k.normalize()?)
            }
            TransactionParams::AssetConfig(a) => TransactionParams::AssetConfig(a.normalize()?),
            TransactionParams::AssetTransfer(a) => {
                check_optional_address(a.close_remainder_to, "close_remainder_to")?;
                check_optional_address(a.asset_sender, "asset_sender")?;
                TransactionParams::AssetTransfer(a)
            }
            TransactionParams::ApplicationCall(a) => {
                TransactionParams::ApplicationCall(a.normalize()?)
            }
            other => other,
        })
    }

    /// Every type's schema, for embedding into the transaction schema.
    pub(crate) fn embedded_schemas() -> Vec<MapEntry> {
        vec![
            MapEntry::embedded(Schema::Ref(PaymentFields::schema)),
            MapEntry::embedded(Schema::Ref(KeyRegistrationFields::schema)),
            MapEntry::embedded(Schema::Ref(AssetConfigFields::schema)),
            MapEntry::embedded(Schema::Ref(AssetTransferFields::schema)),
            MapEntry::embedded(Schema::Ref(AssetFreezeFields::schema)),
            MapEntry::embedded(Schema::Ref(ApplicationCallFields::schema)),
            MapEntry::embedded(Schema::Ref(StateProofFields::schema)),
            MapEntry::embedded(Schema::Ref(heartbeat_embedding)),
        ]
    }

    pub(crate) fn to_fields(&self) -> Result<Fields, EncodingError> {
        match self {
            TransactionParams::Payment(p) => Ok(p.to_fields()),
            TransactionParams::KeyRegistration(k) => Ok(k.to_fields()),
            TransactionParams::AssetConfig(a) => Ok(a.to_fields()),
            TransactionParams::AssetTransfer(a) => Ok(a.to_fields()),
            TransactionParams::AssetFreeze(a) => Ok(a.to_fields()),
            TransactionParams::ApplicationCall(a) => a.to_fields(),
            TransactionParams::StateProof(s) => s.to_fields(),
            TransactionParams::Heartbeat(h) => Ok(Fields::new().with("hb", h.to_encoding_data()?)),
        }
    }

    pub(crate) fn from_fields(
        txn_type: TransactionType,
        f: &mut Fields,
    ) -> Result<Self, EncodingError> {
        Ok(match txn_type {
            TransactionType::Payment => TransactionParams::Payment(PaymentFields::from_fields(f)?),
            TransactionType::KeyRegistration => {
                TransactionParams::KeyRegistration(KeyRegistrationFields::from_fields(f)?)
            }
            TransactionType::AssetConfig => {
                TransactionParams::AssetConfig(AssetConfigFields::from_fields(f)?)
            }
            TransactionType::AssetTransfer => {
                TransactionParams::AssetTransfer(AssetTransferFields::from_fields(f)?)
            }
            TransactionType::AssetFreeze => {
                TransactionParams::AssetFreeze(AssetFreezeFields::from_fields(f)?)
            }
            TransactionType::ApplicationCall => {
                TransactionParams::ApplicationCall(ApplicationCallFields::from_fields(f)?)
            }
            TransactionType::StateProof => {
                TransactionParams::StateProof(StateProofFields::from_fields(f)?)
            }
            TransactionType::Heartbeat => {
                TransactionParams::Heartbeat(HeartbeatFields::from_encoding_data(f.take("hb")?)?)
            }
        })
    }
}

fn heartbeat_embedding() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::named_map(vec![MapEntry::field(
            "hb",
            Schema::Ref(HeartbeatFields::encoding_schema),
        )])
    })
}

fn check_optional_address(
    address: Option<Address>,
    field: &'static str,
) -> Result<(), TransactionError> {
    match address {
        Some(a) if a.is_zero() => Err(TransactionError::ZeroAddress(field)),
        _ => Ok(()),
    }
}

fn addresses_value(addresses: &[Address]) -> Value {
    Value::Array(addresses.iter().map(|a| Value::Address(*a)).collect())
}

fn uints_value(values: &[u64]) -> Value {
    Value::Array(values.iter().map(|v| Value::Uint(*v)).collect())
}

fn take_uints(f: &mut Fields, key: &str) -> Result<Vec<u64>, EncodingError> {
    f.take_array(key)?.into_iter().map(Value::into_u64).collect()
}

// ============================================================================
// Payment
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaymentFields {
    pub receiver: Address,
    pub amount: u64,
    /// Close the sender's account and send the remainder here.
    pub close_remainder_to: Option<Address>,
}

impl PaymentFields {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("amt", Schema::Uint64),
                MapEntry::field("close", Schema::Address),
                MapEntry::field("rcv", Schema::Address),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("amt", self.amount)
            .with("close", self.close_remainder_to.unwrap_or_default())
            .with("rcv", self.receiver)
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        Ok(Self {
            amount: f.take_u64("amt")?,
            close_remainder_to: f.take_nonzero_address("close")?,
            receiver: f.take_address("rcv")?,
        })
    }
}

// ============================================================================
// Key registration
// ============================================================================

/// Participation key registration. Leave every key unset to go offline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyRegistrationFields {
    pub vote_key: Option<[u8; 32]>,
    pub selection_key: Option<[u8; 32]>,
    pub state_proof_key: Option<[u8; 64]>,
    pub vote_first: Option<u64>,
    pub vote_last: Option<u64>,
    pub vote_key_dilution: Option<u64>,
    /// Permanently mark the account as non-participating.
    pub non_participation: bool,
}

impl KeyRegistrationFields {
    fn normalize(self) -> Result<Self, TransactionError> {
        let any_participation = self.vote_key.is_some()
            || self.selection_key.is_some()
            || self.state_proof_key.is_some()
            || self.vote_first.is_some()
            || self.vote_last.is_some()
            || self.vote_key_dilution.is_some();

        if self.non_participation && any_participation {
            return Err(TransactionError::InvalidKeyRegistration(
                "nonParticipation is true but participation params are present".to_string(),
            ));
        }
        // state proof key is exempt for backwards compatibility
        let all_participation = self.vote_key.is_some()
            && self.selection_key.is_some()
            && self.vote_first.is_some()
            && self.vote_last.is_some()
            && self.vote_key_dilution.is_some();
        if !self.non_participation && any_participation && !all_participation {
            return Err(TransactionError::InvalidKeyRegistration(
                "online key registration missing at least one of the following fields: \
                 voteKey, selectionKey, voteFirst, voteLast, voteKeyDilution"
                    .to_string(),
            ));
        }

        // zero values are indistinguishable from absent ones on the wire
        Ok(Self {
            vote_key: self.vote_key.filter(|k| k.iter().any(|b| *b != 0)),
            selection_key: self.selection_key.filter(|k| k.iter().any(|b| *b != 0)),
            state_proof_key: self.state_proof_key.filter(|k| k.iter().any(|b| *b != 0)),
            vote_first: self.vote_first.filter(|v| *v != 0),
            vote_last: self.vote_last.filter(|v| *v != 0),
            vote_key_dilution: self.vote_key_dilution.filter(|v| *v != 0),
            non_participation: self.non_participation,
        })
    }

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("nonpart", Schema::Boolean),
                MapEntry::field("selkey", Schema::FixedBytes(32)),
                MapEntry::field("sprfkey", Schema::FixedBytes(64)),
                MapEntry::field("votefst", Schema::Uint64),
                MapEntry::field("votekd", Schema::Uint64),
                MapEntry::field("votekey", Schema::FixedBytes(32)),
                MapEntry::field("votelst", Schema::Uint64),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("nonpart", self.non_participation)
            .with("selkey", self.selection_key.unwrap_or([0; 32]))
            .with("sprfkey", self.state_proof_key.unwrap_or([0; 64]))
            .with("votefst", self.vote_first.unwrap_or_default())
            .with("votekd", self.vote_key_dilution.unwrap_or_default())
            .with("votekey", self.vote_key.unwrap_or([0; 32]))
            .with("votelst", self.vote_last.unwrap_or_default())
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        let nonzero = |v: u64| (v != 0).then_some(v);
        Ok(Self {
            non_participation: f.take_bool("nonpart")?,
            selection_key: f.take_nonzero_fixed("selkey")?,
            state_proof_key: f.take_nonzero_fixed("sprfkey")?,
            vote_first: nonzero(f.take_u64("votefst")?),
            vote_key_dilution: nonzero(f.take_u64("votekd")?),
            vote_key: f.take_nonzero_fixed("votekey")?,
            vote_last: nonzero(f.take_u64("votelst")?),
        })
    }
}

// ============================================================================
// Assets
// ============================================================================

/// Asset parameters for creation or reconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetParams {
    pub total: u64,
    pub decimals: u32,
    pub default_frozen: bool,
    pub unit_name: String,
    pub asset_name: String,
    pub url: String,
    /// 32-byte commitment to off-chain metadata.
    pub metadata_hash: Option<Vec<u8>>,
    pub manager: Option<Address>,
    pub reserve: Option<Address>,
    pub freeze: Option<Address>,
    pub clawback: Option<Address>,
}

impl AssetParams {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("am", Schema::FixedBytes(METADATA_HASH_LENGTH)),
                MapEntry::field("an", Schema::String),
                MapEntry::field("au", Schema::String),
                MapEntry::field("c", Schema::Address),
                MapEntry::field("dc", Schema::Uint64),
                MapEntry::field("df", Schema::Boolean),
                MapEntry::field("f", Schema::Address),
                MapEntry::field("m", Schema::Address),
                MapEntry::field("r", Schema::Address),
                MapEntry::field("t", Schema::Uint64),
                MapEntry::field("un", Schema::String),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with(
                "am",
                self.metadata_hash
                    .clone()
                    .unwrap_or_else(|| vec![0; METADATA_HASH_LENGTH]),
            )
            .with("an", self.asset_name.as_str())
            .with("au", self.url.as_str())
            .with("c", self.clawback.unwrap_or_default())
            .with("dc", u64::from(self.decimals))
            .with("df", self.default_frozen)
            .with("f", self.freeze.unwrap_or_default())
            .with("m", self.manager.unwrap_or_default())
            .with("r", self.reserve.unwrap_or_default())
            .with("t", self.total)
            .with("un", self.unit_name.as_str())
    }

    fn from_fields(mut f: Fields) -> Result<Self, EncodingError> {
        let decimals = f.take_u64("dc")?;
        Ok(Self {
            metadata_hash: f
                .take_nonzero_fixed::<METADATA_HASH_LENGTH>("am")?
                .map(|h| h.to_vec()),
            asset_name: f.take_string("an")?,
            url: f.take_string("au")?,
            clawback: f.take_nonzero_address("c")?,
            decimals: u32::try_from(decimals)
                .map_err(|_| EncodingError::invalid(format!("decimals {decimals} out of range")))?,
            default_frozen: f.take_bool("df")?,
            freeze: f.take_nonzero_address("f")?,
            manager: f.take_nonzero_address("m")?,
            reserve: f.take_nonzero_address("r")?,
            total: f.take_u64("t")?,
            unit_name: f.take_string("un")?,
        })
    }
}

/// Create (`asset_id` 0), reconfigure, or destroy (no params) an asset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetConfigFields {
    pub asset_id: u64,
    pub params: AssetParams,
}

impl AssetConfigFields {
    fn normalize(mut self) -> Result<Self, TransactionError> {
        let p = &mut self.params;
        check_optional_address(p.manager, "manager")?;
        check_optional_address(p.reserve, "reserve")?;
        check_optional_address(p.freeze, "freeze")?;
        check_optional_address(p.clawback, "clawback")?;
        if let Some(hash) = &p.metadata_hash {
            if hash.len() != METADATA_HASH_LENGTH {
                return Err(TransactionError::InvalidLength {
                    field: "metadata_hash",
                    expected: METADATA_HASH_LENGTH,
                    actual: hash.len(),
                });
            }
            if hash.iter().all(|b| *b == 0) {
                p.metadata_hash = None;
            }
        }
        Ok(self)
    }

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("apar", Schema::Ref(AssetParams::schema)),
                MapEntry::field("caid", Schema::Uint64),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("apar", self.params.to_fields())
            .with("caid", self.asset_id)
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        Ok(Self {
            params: AssetParams::from_fields(f.take_fields("apar")?)?,
            asset_id: f.take_u64("caid")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetTransferFields {
    pub asset_id: u64,
    pub amount: u64,
    pub receiver: Address,
    pub close_remainder_to: Option<Address>,
    /// Clawback source; only the asset's clawback account may set it.
    pub asset_sender: Option<Address>,
}

impl AssetTransferFields {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("aamt", Schema::Uint64),
                MapEntry::field("aclose", Schema::Address),
                MapEntry::field("arcv", Schema::Address),
                MapEntry::field("asnd", Schema::Address),
                MapEntry::field("xaid", Schema::Uint64),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("aamt", self.amount)
            .with("aclose", self.close_remainder_to.unwrap_or_default())
            .with("arcv", self.receiver)
            .with("asnd", self.asset_sender.unwrap_or_default())
            .with("xaid", self.asset_id)
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        Ok(Self {
            amount: f.take_u64("aamt")?,
            close_remainder_to: f.take_nonzero_address("aclose")?,
            receiver: f.take_address("arcv")?,
            asset_sender: f.take_nonzero_address("asnd")?,
            asset_id: f.take_u64("xaid")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetFreezeFields {
    pub asset_id: u64,
    pub freeze_target: Address,
    pub frozen: bool,
}

impl AssetFreezeFields {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("afrz", Schema::Boolean),
                MapEntry::field("fadd", Schema::Address),
                MapEntry::field("faid", Schema::Uint64),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("afrz", self.frozen)
            .with("fadd", self.freeze_target)
            .with("faid", self.asset_id)
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        Ok(Self {
            frozen: f.take_bool("afrz")?,
            freeze_target: f.take_address("fadd")?,
            asset_id: f.take_u64("faid")?,
        })
    }
}

// ============================================================================
// Application call
// ============================================================================

/// What happens to the caller's relationship with the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OnApplicationComplete {
    #[default]
    NoOp = 0,
    OptIn = 1,
    CloseOut = 2,
    ClearState = 3,
    UpdateApplication = 4,
    DeleteApplication = 5,
}

impl TryFrom<u64> for OnApplicationComplete {
    type Error = EncodingError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::NoOp,
            1 => Self::OptIn,
            2 => Self::CloseOut,
            3 => Self::ClearState,
            4 => Self::UpdateApplication,
            5 => Self::DeleteApplication,
            other => {
                return Err(EncodingError::invalid(format!(
                    "invalid onCompletion value: {other}"
                )));
            }
        })
    }
}

/// Storage limits for an application's global or local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateSchema {
    pub num_uints: u64,
    pub num_byte_slices: u64,
}

impl StateSchema {
    pub fn new(num_uints: u64, num_byte_slices: u64) -> Self {
        Self {
            num_uints,
            num_byte_slices,
        }
    }

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("nbs", Schema::Uint64),
                MapEntry::field("nui", Schema::Uint64),
            ])
        })
    }

    fn to_fields(self) -> Fields {
        Fields::new()
            .with("nbs", self.num_byte_slices)
            .with("nui", self.num_uints)
    }

    fn from_fields(mut f: Fields) -> Result<Self, EncodingError> {
        Ok(Self {
            num_byte_slices: f.take_u64("nbs")?,
            num_uints: f.take_u64("nui")?,
        })
    }
}

/// Application call fields.
///
/// Resources are supplied either through the legacy foreign arrays
/// (`accounts`, `foreign_apps`, `foreign_assets`, `boxes`) or through the
/// `access` list, never both.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationCallFields {
    /// 0 creates a new application.
    pub app_id: u64,
    pub on_complete: OnApplicationComplete,
    pub approval_program: Vec<u8>,
    pub clear_program: Vec<u8>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
    pub extra_pages: u64,
    pub args: Vec<Vec<u8>>,
    pub accounts: Vec<Address>,
    pub foreign_apps: Vec<u64>,
    pub foreign_assets: Vec<u64>,
    pub boxes: Vec<BoxReference>,
    pub access: Vec<ResourceReference>,
}

impl ApplicationCallFields {
    pub fn new(app_id: u64, on_complete: OnApplicationComplete) -> Self {
        Self {
            app_id,
            on_complete,
            ..Default::default()
        }
    }

    fn uses_foreign_arrays(&self) -> bool {
        !self.accounts.is_empty()
            || !self.foreign_apps.is_empty()
            || !self.foreign_assets.is_empty()
            || !self.boxes.is_empty()
    }

    fn normalize(mut self) -> Result<Self, TransactionError> {
        if !self.access.is_empty() && self.uses_foreign_arrays() {
            return Err(TransactionError::ConflictingResourceReferences);
        }

        for b in &mut self.boxes {
            let index = resource::box_reference_index(b, &self.foreign_apps, self.app_id)?;
            b.app_id = resource::box_reference_app(index, &self.foreign_apps)?;
        }

        if !self.access.is_empty() {
            let entries = resource::resource_references_to_access_list(self.app_id, &self.access)?;
            self.access = resource::access_list_to_resource_references(&entries)?;
        }
        Ok(self)
    }

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("al", Schema::array(Schema::Ref(access_entry_schema))),
                MapEntry::field("apaa", Schema::array(Schema::ByteArray)),
                MapEntry::field("apan", Schema::Uint64),
                MapEntry::field("apap", Schema::ByteArray),
                MapEntry::field("apas", Schema::array(Schema::Uint64)),
                MapEntry::field("apat", Schema::array(Schema::Address)),
                MapEntry::field("apbx", Schema::array(Schema::Ref(box_reference_schema))),
                MapEntry::field("apep", Schema::Uint64),
                MapEntry::field("apfa", Schema::array(Schema::Uint64)),
                MapEntry::field("apgs", Schema::Ref(StateSchema::schema)),
                MapEntry::field("apid", Schema::Uint64),
                MapEntry::field("apls", Schema::Ref(StateSchema::schema)),
                MapEntry::field("apsu", Schema::ByteArray),
            ])
        })
    }

    fn to_fields(&self) -> Result<Fields, EncodingError> {
        let access = resource::resource_references_to_access_list(self.app_id, &self.access)
            .map_err(|e| EncodingError::invalid(e.to_string()))?;
        let boxes = self
            .boxes
            .iter()
            .map(|b| {
                let index = resource::box_reference_index(b, &self.foreign_apps, self.app_id)
                    .map_err(|e| EncodingError::invalid(e.to_string()))?;
                Ok(Fields::new().with("i", index).with("n", b.name.clone()).into())
            })
            .collect::<Result<Vec<Value>, EncodingError>>()?;

        Ok(Fields::new()
            .with(
                "al",
                access
                    .iter()
                    .map(|e| e.to_encoding_data())
                    .collect::<Vec<_>>(),
            )
            .with(
                "apaa",
                self.args
                    .iter()
                    .map(|a| Value::Bytes(a.clone()))
                    .collect::<Vec<_>>(),
            )
            .with("apan", self.on_complete as u64)
            .with("apap", self.approval_program.clone())
            .with("apas", uints_value(&self.foreign_assets))
            .with("apat", addresses_value(&self.accounts))
            .with("apbx", boxes)
            .with("apep", self.extra_pages)
            .with("apfa", uints_value(&self.foreign_apps))
            .with("apgs", self.global_schema.to_fields())
            .with("apid", self.app_id)
            .with("apls", self.local_schema.to_fields())
            .with("apsu", self.clear_program.clone()))
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        let foreign_apps = take_uints(f, "apfa")?;
        let boxes = f
            .take_array("apbx")?
            .into_iter()
            .map(|v| {
                let mut b = v.into_fields()?;
                Ok(BoxReference {
                    app_id: resource::box_reference_app(b.take_u64("i")?, &foreign_apps)?,
                    name: b.take_bytes("n")?,
                })
            })
            .collect::<Result<_, EncodingError>>()?;
        let entries = f
            .take_array("al")?
            .into_iter()
            .map(resource::AccessEntry::from_encoding_data)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            access: resource::access_list_to_resource_references(&entries)?,
            args: f
                .take_array("apaa")?
                .into_iter()
                .map(Value::into_bytes)
                .collect::<Result<_, _>>()?,
            on_complete: OnApplicationComplete::try_from(f.take_u64("apan")?)?,
            approval_program: f.take_bytes("apap")?,
            foreign_assets: take_uints(f, "apas")?,
            accounts: f
                .take_array("apat")?
                .into_iter()
                .map(Value::into_address)
                .collect::<Result<_, _>>()?,
            boxes,
            extra_pages: f.take_u64("apep")?,
            foreign_apps,
            global_schema: StateSchema::from_fields(f.take_fields("apgs")?)?,
            app_id: f.take_u64("apid")?,
            local_schema: StateSchema::from_fields(f.take_fields("apls")?)?,
            clear_program: f.take_bytes("apsu")?,
        })
    }
}

// ============================================================================
// State proof
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateProofFields {
    pub state_proof_type: u64,
    pub state_proof: StateProof,
    pub message: StateProofMessage,
}

impl StateProofFields {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("sp", Schema::Ref(StateProof::encoding_schema)),
                MapEntry::field("spmsg", Schema::Ref(StateProofMessage::encoding_schema)),
                MapEntry::field("sptype", Schema::Uint64),
            ])
        })
    }

    fn to_fields(&self) -> Result<Fields, EncodingError> {
        Ok(Fields::new()
            .with("sp", self.state_proof.to_encoding_data()?)
            .with("spmsg", self.message.to_encoding_data()?)
            .with("sptype", self.state_proof_type))
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        Ok(Self {
            state_proof: StateProof::from_encoding_data(f.take("sp")?)?,
            message: StateProofMessage::from_encoding_data(f.take("spmsg")?)?,
            state_proof_type: f.take_u64("sptype")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags() {
        for t in [
            TransactionType::Payment,
            TransactionType::KeyRegistration,
            TransactionType::AssetConfig,
            TransactionType::AssetTransfer,
            TransactionType::AssetFreeze,
            TransactionType::ApplicationCall,
            TransactionType::StateProof,
            TransactionType::Heartbeat,
        ] {
            assert_eq!(TransactionType::parse(t.as_str()), Some(t));
        }
        assert_eq!(TransactionType::parse("nope"), None);
    }

    #[test]
    fn test_keyreg_nonparticipation_conflict() {
        let k = KeyRegistrationFields {
            non_participation: true,
            vote_first: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            k.normalize(),
            Err(TransactionError::InvalidKeyRegistration(_))
        ));
    }

    #[test]
    fn test_keyreg_online_requires_all_fields() {
        let partial = KeyRegistrationFields {
            vote_key: Some([1; 32]),
            selection_key: Some([2; 32]),
            ..Default::default()
        };
        assert!(partial.normalize().is_err());

        let complete = KeyRegistrationFields {
            vote_key: Some([1; 32]),
            selection_key: Some([2; 32]),
            vote_first: Some(10),
            vote_last: Some(1000),
            vote_key_dilution: Some(100),
            ..Default::default()
        };
        assert_eq!(complete.clone().normalize().unwrap(), complete);

        // offline registration has no fields at all
        assert!(KeyRegistrationFields::default().normalize().is_ok());
    }

    #[test]
    fn test_asset_config_checks() {
        let zero_manager = AssetConfigFields {
            params: AssetParams {
                manager: Some(Address::ZERO),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            zero_manager.normalize().unwrap_err(),
            TransactionError::ZeroAddress("manager")
        );

        let short_hash = AssetConfigFields {
            params: AssetParams {
                metadata_hash: Some(vec![1; 31]),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            short_hash.normalize(),
            Err(TransactionError::InvalidLength {
                field: "metadata_hash",
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn test_app_call_conflicting_references() {
        let call = ApplicationCallFields {
            app_id: 5,
            foreign_apps: vec![6],
            access: vec![ResourceReference::App(7)],
            ..Default::default()
        };
        assert_eq!(
            call.normalize().unwrap_err(),
            TransactionError::ConflictingResourceReferences
        );
    }

    #[test]
    fn test_app_call_box_normalization() {
        let call = ApplicationCallFields {
            app_id: 5,
            foreign_apps: vec![9],
            boxes: vec![BoxReference::new(5, "own"), BoxReference::new(9, "other")],
            ..Default::default()
        };
        let call = call.normalize().unwrap();
        assert_eq!(call.boxes[0].app_id, 0);
        assert_eq!(call.boxes[1].app_id, 9);

        let bad = ApplicationCallFields {
            app_id: 5,
            boxes: vec![BoxReference::new(9, "other")],
            ..Default::default()
        };
        assert_eq!(
            bad.normalize().unwrap_err(),
            TransactionError::BoxReferenceNotInForeignApps(9)
        );
    }

    #[test]
    fn test_embedded_schemas_have_unique_keys() {
        let map = crate::encoding::NamedMapSchema::new(TransactionParams::embedded_schemas());
        map.validate().unwrap();
        assert!(map.entries().iter().any(|e| e.key == "hb"));
    }
}
