//! Signed transactions.

use std::sync::OnceLock;

use super::logicsig::LogicSig;
use super::multisig::MultisigSignature;
use super::{Address, Signature, Transaction, TxId};
use crate::encoding::{self, Encodable, Fields, MapEntry, Schema, Value};
use crate::error::EncodingError;

/// The proof that authorizes a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Signature(Signature),
    Multisig(MultisigSignature),
    LogicSig(LogicSig),
}

/// A transaction with at most one authorization proof.
///
/// A transaction without a proof is valid for simulation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    txn: Transaction,
    authorization: Option<Authorization>,
    auth_address: Option<Address>,
}

impl SignedTransaction {
    /// Wrap an unsigned transaction.
    pub fn new(txn: Transaction) -> Self {
        Self {
            txn,
            authorization: None,
            auth_address: None,
        }
    }

    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = Some(authorization);
        self
    }

    pub fn with_signature(self, signature: Signature) -> Self {
        self.with_authorization(Authorization::Signature(signature))
    }

    pub fn with_multisig(self, msig: MultisigSignature) -> Self {
        self.with_authorization(Authorization::Multisig(msig))
    }

    pub fn with_logic_sig(self, lsig: LogicSig) -> Self {
        self.with_authorization(Authorization::LogicSig(lsig))
    }

    /// Record the authorizing address of a rekeyed sender.
    pub fn with_auth_address(mut self, address: Address) -> Self {
        self.auth_address = Some(address);
        self
    }

    pub fn txn(&self) -> &Transaction {
        &self.txn
    }

    pub fn into_txn(self) -> Transaction {
        self.txn
    }

    pub fn authorization(&self) -> Option<&Authorization> {
        self.authorization.as_ref()
    }

    pub fn signature(&self) -> Option<&Signature> {
        match &self.authorization {
            Some(Authorization::Signature(sig)) => Some(sig),
            _ => None,
        }
    }

    pub fn multisig(&self) -> Option<&MultisigSignature> {
        match &self.authorization {
            Some(Authorization::Multisig(msig)) => Some(msig),
            _ => None,
        }
    }

    pub fn logic_sig(&self) -> Option<&LogicSig> {
        match &self.authorization {
            Some(Authorization::LogicSig(lsig)) => Some(lsig),
            _ => None,
        }
    }

    /// The `sgnr` field: set when the signer is not the sender.
    pub fn auth_address(&self) -> Option<Address> {
        self.auth_address
    }

    /// Id of the inner transaction.
    pub fn id(&self) -> Result<TxId, EncodingError> {
        self.txn.id()
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, EncodingError> {
        encoding::encode_msgpack(self)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, EncodingError> {
        encoding::decode_msgpack(bytes)
    }
}

impl Encodable for SignedTransaction {
    fn encoding_schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::named_map(vec![
                MapEntry::field("lsig", Schema::optional(Schema::Ref(LogicSig::encoding_schema))),
                MapEntry::field(
                    "msig",
                    Schema::optional(Schema::Ref(MultisigSignature::encoding_schema)),
                ),
                MapEntry::field("sgnr", Schema::optional(Schema::Address)),
                MapEntry::field("sig", Schema::optional(Schema::FixedBytes(64))),
                MapEntry::field("txn", Schema::Ref(Transaction::encoding_schema)),
            ])
        })
    }

    fn to_encoding_data(&self) -> Result<Value, EncodingError> {
        let mut fields = Fields::new()
            .with("sgnr", self.auth_address)
            .with("txn", self.txn.to_encoding_data()?);
        match &self.authorization {
            Some(Authorization::Signature(sig)) => fields.insert("sig", *sig.as_bytes()),
            Some(Authorization::Multisig(msig)) => {
                fields.insert("msig", msig.to_encoding_data()?)
            }
            Some(Authorization::LogicSig(lsig)) => {
                fields.insert("lsig", lsig.to_encoding_data()?)
            }
            None => {}
        }
        Ok(fields.into())
    }

    fn from_encoding_data(data: Value) -> Result<Self, EncodingError> {
        let mut f = data.into_fields()?;
        let mut proofs = Vec::new();
        if let Some(sig) = f.take_optional("sig")? {
            proofs.push(Authorization::Signature(Signature::from_bytes(
                sig.into_fixed()?,
            )));
        }
        if let Some(msig) = f.take_optional("msig")? {
            proofs.push(Authorization::Multisig(
                MultisigSignature::from_encoding_data(msig)?,
            ));
        }
        if let Some(lsig) = f.take_optional("lsig")? {
            proofs.push(Authorization::LogicSig(LogicSig::from_encoding_data(lsig)?));
        }
        if proofs.len() > 1 {
            return Err(EncodingError::invalid(format!(
                "signed transaction must not have more than 1 signature, got {}",
                proofs.len()
            )));
        }

        Ok(Self {
            txn: Transaction::from_encoding_data(f.take("txn")?)?,
            authorization: proofs.pop(),
            auth_address: f
                .take_optional("sgnr")?
                .map(Value::into_address)
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    use super::*;
    use crate::types::{SecretKey, SuggestedParams, TransactionType};

    const KNOWN_SEED_SIGNED: &str = "gqNzaWfEQFJEaS388K9MQl2Y2d3HVfur/fRkAePInPsRioZ1bEgrp6mQtALIDtFvGMI85d/DM/dzBgvab5h3T7wCpmzBuAajdHhuiaNhbXTNA0+jZmVlzQPoomZ2M6NnZW6sdGVzdG5ldC12MS4womdoxCBIY7UYpLPITsgQ8i1PEIHLD3HwWaesIN7GL39w5Qk6IqJsdj2jcmN2xCCRmqCywHCTA0nINBcYMbRPW04jvn3P5yUpg2D89N020KNzbmTEIAOhB7/zzhC+HXDdGOdLwJln5NYwm6UNXx3chmQSVTG4pHR5cGWjcGF5";

    const HEARTBEAT_SIGNED: &str = "gqRsc2lngaFsxAYLMSAyAxKjdHhuhqJmdmqiZ2jEIP9SQzAGyec/v8omzEOW3/GIM+a7bvPaU5D/ohX7qjFtomhihaFhxCBsU6oqjVx2U65owbsX9/6N7/YCmul+O3liZ0fO2L75/KJrZGSjcHJmhaFwxCAM1TyIrIbgm+yPLT9so6VDI3rKl33t4c4RSGJv6G12eaNwMXPEQBETln14zJzQ1Mb/SNjmDNl0fyQ4DPBQZML8iTEbhqBj+YDAgpNSEduWj7OuVkCSQMq4N/Er/+2HfKUHu//spgOicDLEIB9c5n7WgG+5aOdjfBmuxH3z4TYiQzDVYKjBLhv4IkNfo3Ayc8RAeKpQ+o/GJyGCH0I4f9luN0i7BPXlMlaJAuXLX5Ng8DTN0vtZtztjqYfkwp1cVOYPu+Fce3aIdJHVoUDaJaMIDqFzxEBQN41y5zAZhYHQWf2wWF6CGboqQk6MxDcQ76zXHvVtzrAPUWXZDt4IB8Ha1z+54Hc6LmEoG090pk0IYs+jLN8HonNkxCCPVPjiD5O7V0c3P/SVsHmED7slwllta7c92WiKwnvgoqN2aWTEIHBy8sOi/V0YKXJw8VtW40MbqhtUyO9HC9m/haf84xiGomx2dKNzbmTEIDAp2wPDnojyy8tTgb3sMH++26D5+l7nHZmyRvzFfLsOpHR5cGWiaGI=";

    fn known_seed_key() -> SecretKey {
        let mut seed = [0u8; 32];
        for (i, b) in seed.iter_mut().enumerate() {
            *b = i as u8;
        }
        SecretKey::from_bytes(seed)
    }

    fn known_seed_payment() -> Transaction {
        let gh: [u8; 32] = STANDARD
            .decode("SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=")
            .unwrap()
            .try_into()
            .unwrap();
        let params = SuggestedParams::new("testnet-v1.0", gh, 51, 61).flat_fee(1000);
        Transaction::builder(known_seed_key().address(), &params)
            .payment(
                "SGNKBMWAOCJQGSOIGQLRQMNUJ5NU4I56PXH6OJJJQNQPZ5G5G3IOVLI5VM"
                    .parse()
                    .unwrap(),
                847,
                None,
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_known_seed_signature() {
        let signed = known_seed_payment().sign(&known_seed_key()).unwrap();
        assert_eq!(
            signed.signature().unwrap().to_string(),
            "UkRpLfzwr0xCXZjZ3cdV+6v99GQB48ic+xGKhnVsSCunqZC0AsgO0W8Ywjzl38Mz93MGC9pvmHdPvAKmbMG4Bg=="
        );
        let bytes = STANDARD.decode(KNOWN_SEED_SIGNED).unwrap();
        assert_eq!(signed.to_msgpack().unwrap(), bytes);
        assert_eq!(SignedTransaction::from_msgpack(&bytes).unwrap(), signed);
        assert_eq!(signed.auth_address(), None);
    }

    #[test]
    fn test_heartbeat_logic_sig_vector() {
        let bytes = STANDARD.decode(HEARTBEAT_SIGNED).unwrap();
        let signed = SignedTransaction::from_msgpack(&bytes).unwrap();
        assert_eq!(signed.txn().transaction_type(), TransactionType::Heartbeat);
        assert_eq!(signed.txn().first_valid(), 106);
        assert_eq!(signed.txn().last_valid(), 116);
        assert_eq!(signed.txn().fee(), 0);

        let lsig = signed.logic_sig().unwrap();
        assert_eq!(lsig.program, vec![0x0b, 0x31, 0x20, 0x32, 0x03, 0x12]);
        assert!(lsig.args.is_empty());

        let crate::types::TransactionParams::Heartbeat(hb) = signed.txn().params() else {
            panic!("expected heartbeat fields");
        };
        assert_eq!(hb.key_dilution, 100);
        assert_eq!(hb.seed.len(), 32);

        assert_eq!(signed.to_msgpack().unwrap(), bytes);
    }

    #[test]
    fn test_rekeyed_signer_recorded() {
        let other = SecretKey::from_bytes([42; 32]);
        let signed = known_seed_payment().sign(&other).unwrap();
        assert_eq!(signed.auth_address(), Some(other.address()));
        let back = SignedTransaction::from_msgpack(&signed.to_msgpack().unwrap()).unwrap();
        assert_eq!(back, signed);
    }

    #[test]
    fn test_unsigned_wrapper() {
        let signed = SignedTransaction::new(known_seed_payment());
        let back = SignedTransaction::from_msgpack(&signed.to_msgpack().unwrap()).unwrap();
        assert!(back.authorization().is_none());
        assert_eq!(back.txn().transaction_type(), TransactionType::Payment);
    }

    #[test]
    fn test_multiple_proofs_rejected() {
        let signed = known_seed_payment().sign(&known_seed_key()).unwrap();
        let lsig = LogicSig::new(vec![1, 32, 1, 1, 34], vec![]).unwrap();
        let mut fields = signed.to_encoding_data().unwrap().into_fields().unwrap();
        fields.insert("lsig", lsig.to_encoding_data().unwrap());
        let bytes = encoding::msgpack::write_canonical(
            SignedTransaction::encoding_schema()
                .to_msgpack(&Value::Map(fields))
                .unwrap(),
        )
        .unwrap();
        assert!(SignedTransaction::from_msgpack(&bytes).is_err());
    }
}
