//! Multisignature accounts.

use std::sync::OnceLock;

use super::hash::{MULTISIG_ADDR_TAG, tagged_hash};
use super::{Address, SecretKey, Signature};
use crate::encoding::{Encodable, Fields, MapEntry, Schema, Value};
use crate::error::{EncodingError, SignerError};

/// The public description of a multisig account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigMetadata {
    pub version: u8,
    pub threshold: u8,
    pub addrs: Vec<Address>,
}

impl MultisigMetadata {
    pub fn new(version: u8, threshold: u8, addrs: Vec<Address>) -> Self {
        Self {
            version,
            threshold,
            addrs,
        }
    }

    /// `SHA-512/256("MultisigAddr" ‖ version ‖ threshold ‖ keys...)`
    pub fn address(&self) -> Result<Address, SignerError> {
        if self.version == 0 {
            return Err(SignerError::InvalidMultisig(
                "version must be at least 1".to_string(),
            ));
        }
        if self.threshold == 0 || usize::from(self.threshold) > self.addrs.len() {
            return Err(SignerError::InvalidMultisig(format!(
                "threshold {} is invalid for {} addresses",
                self.threshold,
                self.addrs.len()
            )));
        }

        let mut preimage = Vec::with_capacity(2 + 32 * self.addrs.len());
        preimage.push(self.version);
        preimage.push(self.threshold);
        for addr in &self.addrs {
            preimage.extend_from_slice(addr.as_bytes());
        }
        Ok(Address::from_bytes(tagged_hash(MULTISIG_ADDR_TAG, &preimage)))
    }

    /// A multisig structure with every subsignature slot empty.
    pub fn unsigned(&self) -> MultisigSignature {
        MultisigSignature {
            version: u64::from(self.version),
            threshold: u64::from(self.threshold),
            subsignatures: self
                .addrs
                .iter()
                .map(|a| MultisigSubsignature {
                    public_key: *a,
                    signature: None,
                })
                .collect(),
        }
    }
}

/// One participant's slot in a multisig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigSubsignature {
    pub public_key: Address,
    pub signature: Option<Signature>,
}

/// A (possibly partial) multisignature, as carried by signed transactions
/// and logic signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigSignature {
    pub version: u64,
    pub threshold: u64,
    pub subsignatures: Vec<MultisigSubsignature>,
}

impl MultisigSignature {
    /// The metadata this multisig was built from.
    pub fn metadata(&self) -> Result<MultisigMetadata, SignerError> {
        let narrow = |n: u64, what: &str| {
            u8::try_from(n)
                .map_err(|_| SignerError::InvalidMultisig(format!("{what} {n} out of range")))
        };
        Ok(MultisigMetadata {
            version: narrow(self.version, "version")?,
            threshold: narrow(self.threshold, "threshold")?,
            addrs: self.subsignatures.iter().map(|s| s.public_key).collect(),
        })
    }

    pub fn address(&self) -> Result<Address, SignerError> {
        self.metadata()?.address()
    }

    /// Sign `message` into every slot held by `key`.
    pub fn sign(&mut self, key: &SecretKey, message: &[u8]) -> Result<(), SignerError> {
        let address = key.address();
        let mut found = false;
        for slot in &mut self.subsignatures {
            if slot.public_key == address {
                slot.signature = Some(key.sign(message));
                found = true;
            }
        }
        if !found {
            return Err(SignerError::KeyNotInMultisig);
        }
        Ok(())
    }

    /// Check that at least `threshold` slots carry valid signatures over
    /// `message` and that the structure hashes to `address`.
    pub fn verify(&self, message: &[u8], address: &Address) -> bool {
        if (self.subsignatures.len() as u64) < self.threshold {
            return false;
        }
        match self.address() {
            Ok(a) if a == *address => {}
            _ => return false,
        }
        let valid = self
            .subsignatures
            .iter()
            .filter(|s| {
                s.signature
                    .is_some_and(|sig| sig.verify(message, &s.public_key))
            })
            .count() as u64;
        valid >= self.threshold
    }
}

fn subsignature_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::named_map(vec![
            MapEntry::field("pk", Schema::Address),
            MapEntry::field("s", Schema::optional(Schema::FixedBytes(64))),
        ])
    })
}

impl Encodable for MultisigSignature {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("subsig", Schema::array(Schema::Ref(subsignature_schema))),
                MapEntry::field("thr", Schema::Uint64),
                MapEntry::field("v", Schema::Uint64),
            ])
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        let subsigs: Vec<Value> = self
            .subsignatures
            .iter()
            .map(|s| {
                Fields::new()
                    .with("pk", s.public_key)
                    .with("s", s.signature.map(|sig| *sig.as_bytes()))
                    .into()
            })
            .collect();
        Ok(Fields::new()
            .with("subsig", subsigs)
            .with("thr", self.threshold)
            .with("v", self.version)
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        let subsignatures = f
            .take_array("subsig")?
            .into_iter()
            .map(|v| {
                let mut s = v.into_fields()?;
                let signature = s
                    .take_optional("s")?
                    .map(|sig| sig.into_fixed::<64>().map(Signature::from_bytes))
                    .transpose()?;
                Ok(MultisigSubsignature {
                    public_key: s.take_address("pk")?,
                    signature,
                })
            })
            .collect::<Result<_, EncodingError>>()?;
        Ok(Self {
            subsignatures,
            threshold: f.take_u64("thr")?,
            version: f.take_u64("v")?,
        })
    }
}
