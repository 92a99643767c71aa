//! Block headers.
//!
//! The header is assembled from independent records (transaction
//! commitments, reward state, upgrade state and vote, participation
//! updates) whose fields are spliced into one flat map.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::Address;
use crate::encoding::{Encodable, Fields, MapEntry, Schema, Value};
use crate::error::EncodingError;

/// Implements `Encodable` for a record that is normally embedded, in terms
/// of its `schema`, `to_fields` and `from_fields`.
macro_rules! embedded_record {
    ($ty:ty) => {
        impl Encodable for $ty {
            fn encoding_schema() -> &'static Schema {
                Self::schema()
            }

            fn to_encoding_data(&self) -> Result<Value, EncodingError> {
                Ok(self.to_fields().into())
            }

            fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
                Self::from_fields(&mut data.into_fields()?)
            }
        }
    };
}

// ============================================================================
// Header parts
// ============================================================================

/// Per-state-proof-type tracking data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateProofTrackingData {
    pub voters_commitment: Vec<u8>,
    pub online_total_weight: u64,
    pub next_round: u64,
}

impl StateProofTrackingData {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("v", Schema::ByteArray),
                MapEntry::field("t", Schema::Uint64),
                MapEntry::field("n", Schema::Uint64),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("v", self.voters_commitment.clone())
            .with("t", self.online_total_weight)
            .with("n", self.next_round)
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        Ok(Self {
            voters_commitment: f.take_bytes("v")?,
            online_total_weight: f.take_u64("t")?,
            next_round: f.take_u64("n")?,
        })
    }
}

embedded_record!(StateProofTrackingData);

/// Roots of the block's transaction tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxnCommitments {
    /// SHA-512/256 commitment.
    pub native_sha512_256: [u8; 32],
    pub sha256: [u8; 32],
}

impl TxnCommitments {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("txn", Schema::FixedBytes(32)),
                MapEntry::field("txn256", Schema::FixedBytes(32)),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("txn", self.native_sha512_256)
            .with("txn256", self.sha256)
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        Ok(Self {
            native_sha512_256: f.take_fixed("txn")?,
            sha256: f.take_fixed("txn256")?,
        })
    }
}

embedded_record!(TxnCommitments);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RewardState {
    pub fee_sink: Address,
    pub rewards_pool: Address,
    pub rewards_level: u64,
    pub rewards_rate: u64,
    pub rewards_residue: u64,
    pub rewards_recalculation_round: u64,
}

impl RewardState {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("fees", Schema::Address),
                MapEntry::field("rwd", Schema::Address),
                MapEntry::field("earn", Schema::Uint64),
                MapEntry::field("rate", Schema::Uint64),
                MapEntry::field("frac", Schema::Uint64),
                MapEntry::field("rwcalr", Schema::Uint64),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("fees", self.fee_sink)
            .with("rwd", self.rewards_pool)
            .with("earn", self.rewards_level)
            .with("rate", self.rewards_rate)
            .with("frac", self.rewards_residue)
            .with("rwcalr", self.rewards_recalculation_round)
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        Ok(Self {
            fee_sink: f.take_address("fees")?,
            rewards_pool: f.take_address("rwd")?,
            rewards_level: f.take_u64("earn")?,
            rewards_rate: f.take_u64("rate")?,
            rewards_residue: f.take_u64("frac")?,
            rewards_recalculation_round: f.take_u64("rwcalr")?,
        })
    }
}

embedded_record!(RewardState);

/// Protocol version in force and any pending switch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpgradeState {
    pub current_protocol: String,
    pub next_protocol: String,
    pub next_protocol_approvals: u64,
    pub next_protocol_vote_before: u64,
    pub next_protocol_switch_on: u64,
}

impl UpgradeState {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("proto", Schema::String),
                MapEntry::field("nextproto", Schema::String),
                MapEntry::field("nextyes", Schema::Uint64),
                MapEntry::field("nextbefore", Schema::Uint64),
                MapEntry::field("nextswitch", Schema::Uint64),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("proto", self.current_protocol.as_str())
            .with("nextproto", self.next_protocol.as_str())
            .with("nextyes", self.next_protocol_approvals)
            .with("nextbefore", self.next_protocol_vote_before)
            .with("nextswitch", self.next_protocol_switch_on)
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        Ok(Self {
            current_protocol: f.take_string("proto")?,
            next_protocol: f.take_string("nextproto")?,
            next_protocol_approvals: f.take_u64("nextyes")?,
            next_protocol_vote_before: f.take_u64("nextbefore")?,
            next_protocol_switch_on: f.take_u64("nextswitch")?,
        })
    }
}

embedded_record!(UpgradeState);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpgradeVote {
    pub upgrade_propose: String,
    pub upgrade_delay: u64,
    pub upgrade_approve: bool,
}

impl UpgradeVote {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("upgradeprop", Schema::String),
                MapEntry::field("upgradedelay", Schema::Uint64),
                MapEntry::field("upgradeyes", Schema::Boolean),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        Fields::new()
            .with("upgradeprop", self.upgrade_propose.as_str())
            .with("upgradedelay", self.upgrade_delay)
            .with("upgradeyes", self.upgrade_approve)
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        Ok(Self {
            upgrade_propose: f.take_string("upgradeprop")?,
            upgrade_delay: f.take_u64("upgradedelay")?,
            upgrade_approve: f.take_bool("upgradeyes")?,
        })
    }
}

embedded_record!(UpgradeVote);

/// Accounts whose participation keys expired or that were marked absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParticipationUpdates {
    pub expired_participation_accounts: Vec<Address>,
    pub absent_participation_accounts: Vec<Address>,
}

impl ParticipationUpdates {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("partupdrmv", Schema::array(Schema::Address)),
                MapEntry::field("partupdabs", Schema::array(Schema::Address)),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        let list = |addrs: &[Address]| -> Vec<Value> {
            addrs.iter().map(|a| Value::Address(*a)).collect()
        };
        Fields::new()
            .with("partupdrmv", list(&self.expired_participation_accounts))
            .with("partupdabs", list(&self.absent_participation_accounts))
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        let mut list = |key: &str| -> Result<Vec<Address>, EncodingError> {
            f.take_array(key)?
                .into_iter()
                .map(Value::into_address)
                .collect()
        };
        Ok(Self {
            expired_participation_accounts: list("partupdrmv")?,
            absent_participation_accounts: list("partupdabs")?,
        })
    }
}

embedded_record!(ParticipationUpdates);

// ============================================================================
// Header and block
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub round: u64,
    /// Hash of the previous block.
    pub branch: Vec<u8>,
    pub seed: Vec<u8>,
    pub txn_commitments: TxnCommitments,
    /// Seconds since the epoch.
    pub timestamp: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    pub proposer: Address,
    pub fees_collected: u64,
    pub bonus: u64,
    pub proposer_payout: u64,
    pub reward_state: RewardState,
    pub upgrade_state: UpgradeState,
    pub upgrade_vote: UpgradeVote,
    pub txn_counter: u64,
    pub state_proof_tracking: BTreeMap<u64, StateProofTrackingData>,
    pub participation_updates: ParticipationUpdates,
}

impl BlockHeader {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("rnd", Schema::Uint64),
                MapEntry::field("prev", Schema::ByteArray),
                MapEntry::field("seed", Schema::ByteArray),
                MapEntry::embedded(Schema::Ref(TxnCommitments::schema)),
                MapEntry::field("ts", Schema::Uint64),
                MapEntry::field("gen", Schema::String),
                MapEntry::field("gh", Schema::FixedBytes(32)),
                MapEntry::field("prp", Schema::Address),
                MapEntry::field("fc", Schema::Uint64),
                MapEntry::field("bi", Schema::Uint64),
                MapEntry::field("pp", Schema::Uint64),
                MapEntry::embedded(Schema::Ref(RewardState::schema)),
                MapEntry::embedded(Schema::Ref(UpgradeState::schema)),
                MapEntry::embedded(Schema::Ref(UpgradeVote::schema)),
                MapEntry::field("tc", Schema::Uint64),
                MapEntry::field(
                    "spt",
                    Schema::uint64_map(Schema::Ref(StateProofTrackingData::schema)),
                ),
                MapEntry::embedded(Schema::Ref(ParticipationUpdates::schema)),
            ])
        })
    }

    fn to_fields(&self) -> Fields {
        let tracking = self
            .state_proof_tracking
            .iter()
            .map(|(k, v)| (*k, v.to_fields().into()))
            .collect();
        Fields::new()
            .with("rnd", self.round)
            .with("prev", self.branch.clone())
            .with("seed", self.seed.clone())
            .with("ts", self.timestamp)
            .with("gen", self.genesis_id.as_str())
            .with("gh", self.genesis_hash)
            .with("prp", self.proposer)
            .with("fc", self.fees_collected)
            .with("bi", self.bonus)
            .with("pp", self.proposer_payout)
            .with("tc", self.txn_counter)
            .with("spt", Value::UintMap(tracking))
            .merge(self.txn_commitments.to_fields())
            .merge(self.reward_state.to_fields())
            .merge(self.upgrade_state.to_fields())
            .merge(self.upgrade_vote.to_fields())
            .merge(self.participation_updates.to_fields())
    }

    fn from_fields(f: &mut Fields) -> Result<Self, EncodingError> {
        let state_proof_tracking = f
            .take("spt")?
            .into_uint_map()?
            .into_iter()
            .map(|(k, v)| Ok((k, StateProofTrackingData::from_fields(&mut v.into_fields()?)?)))
            .collect::<Result<_, EncodingError>>()?;
        Ok(Self {
            round: f.take_u64("rnd")?,
            branch: f.take_bytes("prev")?,
            seed: f.take_bytes("seed")?,
            txn_commitments: TxnCommitments::from_fields(f)?,
            timestamp: f.take_u64("ts")?,
            genesis_id: f.take_string("gen")?,
            genesis_hash: f.take_fixed("gh")?,
            proposer: f.take_address("prp")?,
            fees_collected: f.take_u64("fc")?,
            bonus: f.take_u64("bi")?,
            proposer_payout: f.take_u64("pp")?,
            reward_state: RewardState::from_fields(f)?,
            upgrade_state: UpgradeState::from_fields(f)?,
            upgrade_vote: UpgradeVote::from_fields(f)?,
            txn_counter: f.take_u64("tc")?,
            state_proof_tracking,
            participation_updates: ParticipationUpdates::from_fields(f)?,
        })
    }
}

embedded_record!(BlockHeader);

/// A block: its header plus the raw payset.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub header: BlockHeader,
    /// Signed transactions with apply data, kept undecoded.
    pub payset: rmpv::Value,
}

impl Encodable for Block {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::embedded(Schema::Ref(BlockHeader::schema)),
                MapEntry::field("txns", Schema::Untyped),
            ])
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        Ok(self
            .header
            .to_fields()
            .with("txns", Value::Untyped(self.payset.clone()))
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        let payset = match f.take("txns")? {
            Value::Untyped(raw) => raw,
            Value::Null => rmpv::Value::Nil,
            other => return Err(EncodingError::unexpected("untyped", other.kind())),
        };
        Ok(Self {
            header: BlockHeader::from_fields(&mut f)?,
            payset,
        })
    }
}
