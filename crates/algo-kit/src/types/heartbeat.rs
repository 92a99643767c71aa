//! Heartbeat transaction payload.

use std::sync::OnceLock;

use super::Address;
use crate::encoding::{Encodable, Fields, MapEntry, Schema, Value};
use crate::error::EncodingError;

/// Signatures proving the heartbeat account holds its participation keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatProof {
    pub sig: [u8; 64],
    pub pk: [u8; 32],
    pub pk2: [u8; 32],
    pub pk1_sig: [u8; 64],
    pub pk2_sig: [u8; 64],
}

impl Default for HeartbeatProof {
    fn default() -> Self {
        Self {
            sig: [0; 64],
            pk: [0; 32],
            pk2: [0; 32],
            pk1_sig: [0; 64],
            pk2_sig: [0; 64],
        }
    }
}

impl Encodable for HeartbeatProof {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("s", Schema::FixedBytes(64)),
                MapEntry::field("p", Schema::FixedBytes(32)),
                MapEntry::field("p2", Schema::FixedBytes(32)),
                MapEntry::field("p1s", Schema::FixedBytes(64)),
                MapEntry::field("p2s", Schema::FixedBytes(64)),
            ])
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        Ok(Fields::new()
            .with("s", self.sig)
            .with("p", self.pk)
            .with("p2", self.pk2)
            .with("p1s", self.pk1_sig)
            .with("p2s", self.pk2_sig)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            sig: f.take_fixed("s")?,
            pk: f.take_fixed("p")?,
            pk2: f.take_fixed("p2")?,
            pk1_sig: f.take_fixed("p1s")?,
            pk2_sig: f.take_fixed("p2s")?,
        })
    }
}

/// Fields of a `hb` transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeartbeatFields {
    /// The account this heartbeat is for.
    pub address: Address,
    pub proof: HeartbeatProof,
    /// Block seed of the round the heartbeat responds to.
    pub seed: Vec<u8>,
    pub vote_id: [u8; 32],
    pub key_dilution: u64,
}

impl Encodable for HeartbeatFields {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("a", Schema::Address),
                MapEntry::field("prf", Schema::Ref(HeartbeatProof::encoding_schema)),
                MapEntry::field("sd", Schema::ByteArray),
                MapEntry::field("vid", Schema::FixedBytes(32)),
                MapEntry::field("kd", Schema::Uint64),
            ])
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        Ok(Fields::new()
            .with("a", self.address)
            .with("prf", self.proof.to_encoding_data()?)
            .with("sd", self.seed.clone())
            .with("vid", self.vote_id)
            .with("kd", self.key_dilution)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            address: f.take_address("a")?,
            proof: HeartbeatProof::from_encoding_data(f.take("prf")?)?,
            seed: f.take_bytes("sd")?,
            vote_id: f.take_fixed("vid")?,
            key_dilution: f.take_u64("kd")?,
        })
    }
}
