//! Logic signatures: programs that authorize transactions.
//!
//! A logic signature either controls its own escrow address (the program
//! hash) or is delegated: a key or multisig signs the program, letting it
//! authorize transactions from that account.

use std::sync::OnceLock;

use super::hash::{PROGRAM_DATA_TAG, PROGRAM_TAG, tagged_hash};
use super::multisig::{MultisigMetadata, MultisigSignature};
use super::signed::{Authorization, SignedTransaction};
use super::{Address, SecretKey, Signature, Transaction};
use crate::encoding::{Encodable, Fields, MapEntry, Schema, Value};
use crate::error::{EncodingError, SignerError};

/// The wire form of a logic signature.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogicSig {
    pub program: Vec<u8>,
    pub args: Vec<Vec<u8>>,
    pub sig: Option<Signature>,
    pub msig: Option<MultisigSignature>,
    pub lmsig: Option<MultisigSignature>,
}

impl LogicSig {
    pub fn new(program: Vec<u8>, args: Vec<Vec<u8>>) -> Result<Self, SignerError> {
        if program.is_empty() {
            return Err(SignerError::InvalidProgram("empty program".to_string()));
        }
        Ok(Self {
            program,
            args,
            ..Default::default()
        })
    }

    /// `"Program" ‖ program`, the bytes a delegating signature covers.
    pub fn bytes_to_sign(&self) -> Vec<u8> {
        let mut out = PROGRAM_TAG.to_vec();
        out.extend_from_slice(&self.program);
        out
    }

    /// The escrow address controlled by this program.
    pub fn program_address(&self) -> Address {
        Address::from_bytes(tagged_hash(PROGRAM_TAG, &self.program))
    }

    pub fn is_delegated(&self) -> bool {
        self.sig.is_some() || self.msig.is_some() || self.lmsig.is_some()
    }

    /// Whether this logic signature authorizes transactions from `address`.
    pub fn verify(&self, address: &Address) -> bool {
        let message = self.bytes_to_sign();
        match (&self.sig, &self.msig, &self.lmsig) {
            (None, None, None) => self.program_address() == *address,
            (Some(sig), None, None) => sig.verify(&message, address),
            (None, Some(msig), None) => msig.verify(&message, address),
            _ => false,
        }
    }
}

impl Encodable for LogicSig {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("arg", Schema::array(Schema::ByteArray)),
                MapEntry::field("l", Schema::ByteArray),
                MapEntry::field(
                    "lmsig",
                    Schema::optional(Schema::Ref(MultisigSignature::encoding_schema)),
                ),
                MapEntry::field(
                    "msig",
                    Schema::optional(Schema::Ref(MultisigSignature::encoding_schema)),
                ),
                MapEntry::field("sig", Schema::optional(Schema::FixedBytes(64))),
            ])
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        let multisig = |m: &Option<MultisigSignature>| -> Result<Value, EncodingError> {
            m.as_ref()
                .map(|m| m.to_encoding_data())
                .transpose()
                .map(Value::from)
        };
        Ok(Fields::new()
            .with(
                "arg",
                self.args
                    .iter()
                    .map(|a| Value::Bytes(a.clone()))
                    .collect::<Vec<_>>(),
            )
            .with("l", self.program.clone())
            .with("lmsig", multisig(&self.lmsig)?)
            .with("msig", multisig(&self.msig)?)
            .with("sig", self.sig.map(|s| *s.as_bytes()))
            .into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        let multisig = |v: Option<Value>| v.map(MultisigSignature::from_encoding_data).transpose();
        Ok(Self {
            args: f
                .take_array("arg")?
                .into_iter()
                .map(Value::into_bytes)
                .collect::<Result<_, _>>()?,
            program: f.take_bytes("l")?,
            lmsig: multisig(f.take_optional("lmsig")?)?,
            msig: multisig(f.take_optional("msig")?)?,
            sig: f
                .take_optional("sig")?
                .map(|v| v.into_fixed::<64>().map(Signature::from_bytes))
                .transpose()?,
        })
    }
}

/// A logic signature together with the account it signs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicSigAccount {
    lsig: LogicSig,
    /// The delegating key's address for single-key delegation.
    signer: Option<Address>,
}

impl LogicSigAccount {
    /// An escrow account controlled by `program`.
    pub fn new(program: Vec<u8>, args: Vec<Vec<u8>>) -> Result<Self, SignerError> {
        Ok(Self {
            lsig: LogicSig::new(program, args)?,
            signer: None,
        })
    }

    pub fn logic_sig(&self) -> &LogicSig {
        &self.lsig
    }

    pub fn is_delegated(&self) -> bool {
        self.lsig.is_delegated()
    }

    /// Delegate the program for `key`'s account.
    pub fn sign(&mut self, key: &SecretKey) {
        self.lsig.sig = Some(key.sign(&self.lsig.bytes_to_sign()));
        self.lsig.msig = None;
        self.signer = Some(key.address());
    }

    /// Add `key`'s signature to a multisig delegation, starting one if
    /// needed.
    pub fn sign_multisig(
        &mut self,
        metadata: &MultisigMetadata,
        key: &SecretKey,
    ) -> Result<(), SignerError> {
        let message = self.lsig.bytes_to_sign();
        let mut msig = match self.lsig.msig.take() {
            Some(existing) if existing.metadata()? == *metadata => existing,
            _ => metadata.unsigned(),
        };
        msig.sign(key, &message)?;
        self.lsig.msig = Some(msig);
        self.lsig.sig = None;
        self.signer = None;
        Ok(())
    }

    /// The account this logic signature authorizes.
    pub fn address(&self) -> Result<Address, SignerError> {
        if let Some(signer) = self.signer.filter(|_| self.lsig.sig.is_some()) {
            return Ok(signer);
        }
        match &self.lsig.msig {
            Some(msig) => msig.address(),
            None => Ok(self.lsig.program_address()),
        }
    }

    /// Attach this logic signature to `txn`.
    ///
    /// A delegated signature must verify against the sender. An escrow
    /// program whose address differs from the sender is recorded as the
    /// authorizing address.
    pub fn sign_transaction(&self, txn: &Transaction) -> Result<SignedTransaction, SignerError> {
        let mut signed =
            SignedTransaction::new(txn.clone()).with_authorization(Authorization::LogicSig(
                self.lsig.clone(),
            ));
        if self.lsig.is_delegated() {
            if !self.lsig.verify(&txn.sender()) {
                return Err(SignerError::LogicSigNotDelegated(txn.sender().to_string()));
            }
        } else {
            let program_address = self.lsig.program_address();
            if program_address != txn.sender() {
                signed = signed.with_auth_address(program_address);
            }
        }
        Ok(signed)
    }
}

/// Sign data for the `ed25519verify` opcode of the program at
/// `program_address`.
pub fn teal_sign(key: &SecretKey, data: &[u8], program_address: &Address) -> Signature {
    let mut message = PROGRAM_DATA_TAG.to_vec();
    message.extend_from_slice(program_address.as_bytes());
    message.extend_from_slice(data);
    key.sign(&message)
}
