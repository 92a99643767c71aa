//! Protocol types.
//!
//! Addresses, keys and hashes, the transaction entity and its parameter
//! records, authorization proofs, and the records algod returns.

mod address;
mod block;
pub mod hash;
mod heartbeat;
mod key;
mod logicsig;
mod multisig;
mod params;
mod pending;
mod resource;
mod signed;
mod state_proof;
mod transaction;

pub use address::Address;
pub use block::{
    Block, BlockHeader, ParticipationUpdates, RewardState, StateProofTrackingData,
    TxnCommitments, UpgradeState, UpgradeVote,
};
pub use hash::{TxId, sha512_256};
pub use heartbeat::{HeartbeatFields, HeartbeatProof};
pub use key::{SecretKey, Signature};
pub use logicsig::{LogicSig, LogicSigAccount, teal_sign};
pub use multisig::{MultisigMetadata, MultisigSignature, MultisigSubsignature};
pub use params::{
    ApplicationCallFields, AssetConfigFields, AssetFreezeFields, AssetParams,
    AssetTransferFields, KeyRegistrationFields, OnApplicationComplete, PaymentFields,
    StateProofFields, StateSchema, TransactionParams, TransactionType,
};
pub use pending::{AccountStateDelta, EvalDelta, EvalDeltaKeyValue, PendingTransactionResponse};
pub use resource::{
    AccessEntry, BoxReference, HoldingReference, LocalsReference, ResourceReference,
    access_list_to_resource_references, box_reference_index, foreign_arrays_to_resource_references,
    resource_references_to_access_list, validate_resource_references,
};
pub use signed::{Authorization, SignedTransaction};
pub use state_proof::{
    FalconSignatureStruct, FalconVerifier, HashFactory, MerkleArrayProof,
    MerkleSignatureVerifier, Participant, Reveal, SigslotCommit, StateProof, StateProofMessage,
};
pub use transaction::{
    MAX_TX_GROUP_SIZE, MIN_TXN_FEE, SuggestedParams, Transaction, TransactionBuilder,
    assign_group_id, compute_group_id,
};
