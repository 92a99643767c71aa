//! State proof transaction payloads.
//!
//! These records are only ever produced by the network; the client needs
//! them to decode and re-encode `stpf` transactions faithfully.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::encoding::{Encodable, Fields, MapEntry, Schema, Value};
use crate::error::EncodingError;

const FALCON_PUBLIC_KEY_LEN: usize = 0x701;

fn named_map_schema(
    cell: &'static OnceLock<Schema>,
    entries: impl FnOnce() -> Vec<MapEntry>,
) -> &'static Schema {
    cell.get_or_init(|| Schema::named_map(entries()))
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HashFactory {
    pub hash_type: u64,
}

impl Encodable for HashFactory {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        named_map_schema(&SCHEMA, || vec![MapEntry::field("t", Schema::Uint64)])
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        Ok(Fields::new().with("t", self.hash_type).into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            hash_type: f.take_u64("t")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MerkleArrayProof {
    pub path: Vec<Vec<u8>>,
    pub hash_factory: HashFactory,
    pub tree_depth: u64,
}

impl Encodable for MerkleArrayProof {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        named_map_schema(&SCHEMA, || {
            vec![
                MapEntry::field("pth", Schema::array(Schema::ByteArray)),
                MapEntry::field("hsh", Schema::Ref(HashFactory::encoding_schema)),
                MapEntry::field("td", Schema::Uint64),
            ]
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        let path: Vec<Value> = self.path.iter().cloned().map(Value::from).collect();
        Ok(Fields::new()
            .with("pth", path)
            .with("hsh", self.hash_factory.to_encoding_data()?)
            .with("td", self.tree_depth)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            path: f
                .take_array("pth")?
                .into_iter()
                .map(Value::into_bytes)
                .collect::<Result<_, _>>()?,
            hash_factory: HashFactory::from_encoding_data(f.take("hsh")?)?,
            tree_depth: f.take_u64("td")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleSignatureVerifier {
    pub commitment: [u8; 64],
    pub key_lifetime: u64,
}

impl Default for MerkleSignatureVerifier {
    fn default() -> Self {
        Self {
            commitment: [0; 64],
            key_lifetime: 0,
        }
    }
}

impl Encodable for MerkleSignatureVerifier {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        named_map_schema(&SCHEMA, || {
            vec![
                MapEntry::field("cmt", Schema::FixedBytes(64)),
                MapEntry::field("lf", Schema::Uint64),
            ]
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        Ok(Fields::new()
            .with("cmt", self.commitment)
            .with("lf", self.key_lifetime)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            commitment: f.take_fixed("cmt")?,
            key_lifetime: f.take_u64("lf")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Participant {
    pub verifier: MerkleSignatureVerifier,
    pub weight: u64,
}

impl Encodable for Participant {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        named_map_schema(&SCHEMA, || {
            vec![
                MapEntry::field("p", Schema::Ref(MerkleSignatureVerifier::encoding_schema)),
                MapEntry::field("w", Schema::Uint64),
            ]
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        Ok(Fields::new()
            .with("p", self.verifier.to_encoding_data()?)
            .with("w", self.weight)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            verifier: MerkleSignatureVerifier::from_encoding_data(f.take("p")?)?,
            weight: f.take_u64("w")?,
        })
    }
}

/// A Falcon public key (0x701 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FalconVerifier {
    pub public_key: Vec<u8>,
}

impl Default for FalconVerifier {
    fn default() -> Self {
        Self {
            public_key: vec![0; FALCON_PUBLIC_KEY_LEN],
        }
    }
}

impl Encodable for FalconVerifier {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        named_map_schema(&SCHEMA, || {
            vec![MapEntry::field("k", Schema::FixedBytes(FALCON_PUBLIC_KEY_LEN))]
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        Ok(Fields::new().with("k", self.public_key.clone()).into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            public_key: f.take_bytes("k")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FalconSignatureStruct {
    pub signature: Vec<u8>,
    pub vector_commitment_index: u64,
    pub proof: MerkleArrayProof,
    pub verifying_key: FalconVerifier,
}

impl Encodable for FalconSignatureStruct {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        named_map_schema(&SCHEMA, || {
            vec![
                MapEntry::field("sig", Schema::ByteArray),
                MapEntry::field("idx", Schema::Uint64),
                MapEntry::field("prf", Schema::Ref(MerkleArrayProof::encoding_schema)),
                MapEntry::field("vkey", Schema::Ref(FalconVerifier::encoding_schema)),
            ]
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        Ok(Fields::new()
            .with("sig", self.signature.clone())
            .with("idx", self.vector_commitment_index)
            .with("prf", self.proof.to_encoding_data()?)
            .with("vkey", self.verifying_key.to_encoding_data()?)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            signature: f.take_bytes("sig")?,
            vector_commitment_index: f.take_u64("idx")?,
            proof: MerkleArrayProof::from_encoding_data(f.take("prf")?)?,
            verifying_key: FalconVerifier::from_encoding_data(f.take("vkey")?)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SigslotCommit {
    pub sig: FalconSignatureStruct,
    pub lower_sig_weight: u64,
}

impl Encodable for SigslotCommit {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        named_map_schema(&SCHEMA, || {
            vec![
                MapEntry::field("s", Schema::Ref(FalconSignatureStruct::encoding_schema)),
                MapEntry::field("l", Schema::Uint64),
            ]
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        Ok(Fields::new()
            .with("s", self.sig.to_encoding_data()?)
            .with("l", self.lower_sig_weight)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            sig: FalconSignatureStruct::from_encoding_data(f.take("s")?)?,
            lower_sig_weight: f.take_u64("l")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reveal {
    pub sigslot: SigslotCommit,
    pub participant: Participant,
}

impl Encodable for Reveal {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        named_map_schema(&SCHEMA, || {
            vec![
                MapEntry::field("s", Schema::Ref(SigslotCommit::encoding_schema)),
                MapEntry::field("p", Schema::Ref(Participant::encoding_schema)),
            ]
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        Ok(Fields::new()
            .with("s", self.sigslot.to_encoding_data()?)
            .with("p", self.participant.to_encoding_data()?)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            sigslot: SigslotCommit::from_encoding_data(f.take("s")?)?,
            participant: Participant::from_encoding_data(f.take("p")?)?,
        })
    }
}

/// A compact certificate that a weighted set of participants signed a
/// [`StateProofMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateProof {
    pub sig_commit: Vec<u8>,
    pub signed_weight: u64,
    pub sig_proofs: MerkleArrayProof,
    pub part_proofs: MerkleArrayProof,
    pub merkle_signature_salt_version: u64,
    /// Reveals keyed by participant position.
    pub reveals: BTreeMap<u64, Reveal>,
    pub positions_to_reveal: Vec<u64>,
}

impl Encodable for StateProof {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        named_map_schema(&SCHEMA, || {
            vec![
                MapEntry::field("c", Schema::ByteArray),
                MapEntry::field("w", Schema::Uint64),
                MapEntry::field("S", Schema::Ref(MerkleArrayProof::encoding_schema)),
                MapEntry::field("P", Schema::Ref(MerkleArrayProof::encoding_schema)),
                MapEntry::field("v", Schema::Uint64),
                MapEntry::field("r", Schema::uint64_map(Schema::Ref(Reveal::encoding_schema))),
                MapEntry::field("pr", Schema::array(Schema::Uint64)),
            ]
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        let reveals = self
            .reveals
            .iter()
            .map(|(k, r)| Ok((*k, r.to_encoding_data()?)))
            .collect::<Result<BTreeMap<_, _>, EncodingError>>()?;
        let positions: Vec<Value> = self.positions_to_reveal.iter().map(|p| Value::Uint(*p)).collect();
        Ok(Fields::new()
            .with("c", self.sig_commit.clone())
            .with("w", self.signed_weight)
            .with("S", self.sig_proofs.to_encoding_data()?)
            .with("P", self.part_proofs.to_encoding_data()?)
            .with("v", self.merkle_signature_salt_version)
            .with("r", Value::UintMap(reveals))
            .with("pr", positions)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            sig_commit: f.take_bytes("c")?,
            signed_weight: f.take_u64("w")?,
            sig_proofs: MerkleArrayProof::from_encoding_data(f.take("S")?)?,
            part_proofs: MerkleArrayProof::from_encoding_data(f.take("P")?)?,
            merkle_signature_salt_version: f.take_u64("v")?,
            reveals: f
                .take("r")?
                .into_uint_map()?
                .into_iter()
                .map(|(k, v)| Ok((k, Reveal::from_encoding_data(v)?)))
                .collect::<Result<_, EncodingError>>()?,
            positions_to_reveal: f
                .take_array("pr")?
                .into_iter()
                .map(Value::into_u64)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// The statement a state proof attests to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateProofMessage {
    pub block_headers_commitment: Vec<u8>,
    pub voters_commitment: Vec<u8>,
    pub ln_proven_weight: u64,
    pub first_attested_round: u64,
    pub last_attested_round: u64,
}

impl Encodable for StateProofMessage {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        named_map_schema(&SCHEMA, || {
            vec![
                MapEntry::field("b", Schema::ByteArray),
                MapEntry::field("v", Schema::ByteArray),
                MapEntry::field("P", Schema::Uint64),
                MapEntry::field("f", Schema::Uint64),
                MapEntry::field("l", Schema::Uint64),
            ]
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        Ok(Fields::new()
            .with("b", self.block_headers_commitment.clone())
            .with("v", self.voters_commitment.clone())
            .with("P", self.ln_proven_weight)
            .with("f", self.first_attested_round)
            .with("l", self.last_attested_round)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        Ok(Self {
            block_headers_commitment: f.take_bytes("b")?,
            voters_commitment: f.take_bytes("v")?,
            ln_proven_weight: f.take_u64("P")?,
            first_attested_round: f.take_u64("f")?,
            last_attested_round: f.take_u64("l")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{decode_json, decode_msgpack, encode_json, encode_msgpack};

    fn sample() -> StateProof {
        let mut reveals = BTreeMap::new();
        reveals.insert(
            3,
            Reveal {
                sigslot: SigslotCommit {
                    sig: FalconSignatureStruct {
                        signature: vec![9; 10],
                        vector_commitment_index: 2,
                        ..Default::default()
                    },
                    lower_sig_weight: 40,
                },
                participant: Participant {
                    verifier: MerkleSignatureVerifier {
                        commitment: [5; 64],
                        key_lifetime: 256,
                    },
                    weight: 1_000_000,
                },
            },
        );
        StateProof {
            sig_commit: vec![1, 2, 3],
            signed_weight: 77,
            sig_proofs: MerkleArrayProof {
                path: vec![vec![1; 32], vec![2; 32]],
                hash_factory: HashFactory { hash_type: 1 },
                tree_depth: 2,
            },
            reveals,
            positions_to_reveal: vec![3, 3],
            ..Default::default()
        }
    }

    #[test]
    fn test_binary_round_trip() {
        let proof = sample();
        let bytes = encode_msgpack(&proof).unwrap();
        assert_eq!(decode_msgpack::<StateProof>(&bytes).unwrap(), proof);
    }

    #[test]
    fn test_json_uses_numeric_reveal_keys() {
        let json = encode_json(&sample()).unwrap();
        assert!(json["r"].get("3").is_some());
        // default falcon key and empty part proofs are omitted
        assert!(json["r"]["3"]["s"]["s"].get("vkey").is_none());
        assert!(json.get("P").is_none());
        assert_eq!(decode_json::<StateProof>(json).unwrap(), sample());
    }

    #[test]
    fn test_falcon_key_length_enforced() {
        let verifier = FalconVerifier {
            public_key: vec![1; 10],
        };
        assert!(encode_msgpack(&verifier).is_err());
    }

    #[test]
    fn test_message_round_trip() {
        let msg = StateProofMessage {
            block_headers_commitment: vec![4; 32],
            voters_commitment: vec![],
            ln_proven_weight: 12,
            first_attested_round: 257,
            last_attested_round: 512,
        };
        let bytes = encode_msgpack(&msg).unwrap();
        assert_eq!(decode_msgpack::<StateProofMessage>(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_schemas_valid() {
        for schema in [
            HashFactory::encoding_schema(),
            MerkleArrayProof::encoding_schema(),
            MerkleSignatureVerifier::encoding_schema(),
            Participant::encoding_schema(),
            FalconVerifier::encoding_schema(),
            FalconSignatureStruct::encoding_schema(),
            SigslotCommit::encoding_schema(),
            Reveal::encoding_schema(),
            StateProof::encoding_schema(),
            StateProofMessage::encoding_schema(),
        ] {
            let Schema::NamedMap(map) = schema else {
                panic!("expected named map");
            };
            map.validate().unwrap();
        }
    }
}
