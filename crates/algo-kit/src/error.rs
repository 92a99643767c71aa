//! Error types for algo-kit.
//!
//! # Error Hierarchy
//!
//! - [`Error`](enum@Error): Main error type, returned by most operations
//!   - [`ParseAddressError`]: Invalid address text
//!   - [`ParseHashError`]: Invalid transaction id text
//!   - [`ParseKeyError`]: Invalid secret key material
//!   - [`EncodingError`]: Canonical encoding / decoding failures
//!   - [`AbiError`]: ABI type parsing, encoding and method lookup
//!   - [`TransactionError`]: Construction-time transaction validation
//!   - [`SignerError`]: Signing operation failures
//!   - [`AlgodError`]: Node transport failures
//!   - [`ComposerError`]: Atomic transaction composer failures
//!
//! # Checking Retryable Errors
//!
//! ```rust
//! use algo_kit::AlgodError;
//!
//! fn should_retry(err: &AlgodError) -> bool {
//!     err.is_retryable()
//! }
//! ```

use thiserror::Error;

use crate::client::ComposerStatus;

/// Error parsing an address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAddressError {
    #[error("Invalid base32 encoding: {0}")]
    InvalidBase32(String),

    #[error("Invalid address length: expected 58 characters, got {0}")]
    InvalidLength(usize),

    #[error("Address checksum mismatch")]
    InvalidChecksum,
}

/// Error parsing a transaction id or digest.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseHashError {
    #[error("Invalid base32 encoding: {0}")]
    InvalidBase32(String),

    #[error("Invalid hash length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Error parsing key material.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseKeyError {
    #[error("Invalid key encoding: {0}")]
    InvalidEncoding(String),

    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

// ============================================================================
// Encoding Errors
// ============================================================================

/// Canonical encoding errors.
///
/// Decoding never coerces: a wire value whose shape does not match the
/// schema is reported, not patched up.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Msgpack error: {0}")]
    Msgpack(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: String,
    },

    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Missing key: {0}")]
    MissingKey(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("{0} trailing bytes after encoded value")]
    TrailingBytes(usize),

    #[error("Invalid base64: {0}")]
    Base64(String),

    #[error(transparent)]
    Address(#[from] ParseAddressError),
}

impl EncodingError {
    /// Create an unexpected-type error.
    pub fn unexpected(expected: &'static str, found: impl std::fmt::Debug) -> Self {
        EncodingError::UnexpectedType {
            expected,
            found: format!("{:?}", found),
        }
    }

    /// Create an invalid-value error.
    pub fn invalid(message: impl Into<String>) -> Self {
        EncodingError::InvalidValue(message.into())
    }
}

// ============================================================================
// ABI Errors
// ============================================================================

/// ABI type, value and method errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("Invalid ABI type: '{0}'")]
    InvalidType(String),

    #[error("Value does not match ABI type {abi_type}: {message}")]
    TypeMismatch { abi_type: String, message: String },

    #[error("Value out of range for {abi_type}")]
    OutOfRange { abi_type: String },

    #[error("ABI decode error: {0}")]
    Decode(String),

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("No method named '{0}'")]
    MethodNotFound(String),

    #[error("Found {count} methods named '{name}'")]
    AmbiguousMethod { name: String, count: usize },
}

impl AbiError {
    /// Create a type mismatch error.
    pub fn mismatch(abi_type: impl ToString, message: impl Into<String>) -> Self {
        AbiError::TypeMismatch {
            abi_type: abi_type.to_string(),
            message: message.into(),
        }
    }

    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        AbiError::Decode(message.into())
    }
}

// ============================================================================
// Transaction Errors
// ============================================================================

/// Transaction validation errors, raised at construction time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("No transaction type fields were set")]
    MissingTypeFields,

    #[error("More than one set of transaction type fields was provided")]
    MultipleTypeFields,

    #[error("The zero address cannot be used for {0}; leave the field unset instead")]
    ZeroAddress(&'static str),

    #[error("Invalid {field} length: expected {expected} bytes, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid key registration: {0}")]
    InvalidKeyRegistration(String),

    #[error("Invalid application call: {0}")]
    InvalidApplicationCall(String),

    #[error("Cannot use both an access list and foreign reference arrays")]
    ConflictingResourceReferences,

    #[error("Box ref with appId {0} not in foreign-apps")]
    BoxReferenceNotInForeignApps(u64),

    #[error("Cannot build a group with 0 transactions")]
    EmptyGroup,

    #[error("{size} transactions grouped together but max group size is {max}")]
    GroupTooLarge { size: usize, max: usize },

    #[error("Fee overflow: {fee_per_byte} per byte for {size} bytes")]
    FeeOverflow { fee_per_byte: u64, size: usize },

    #[error(transparent)]
    Encoding(#[from] EncodingErrorMessage),
}

/// Cloneable rendering of an [`EncodingError`] for validation contexts.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct EncodingErrorMessage(pub String);

impl From<EncodingError> for TransactionError {
    fn from(err: EncodingError) -> Self {
        TransactionError::Encoding(EncodingErrorMessage(err.to_string()))
    }
}

// ============================================================================
// Signer Errors
// ============================================================================

/// Error during signing operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Signer returned {actual} signed transactions for {expected} indexes")]
    SignatureCountMismatch { expected: usize, actual: usize },

    #[error("Transaction index {index} out of range for a group of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Key is not a member of the multisig account")]
    KeyNotInMultisig,

    #[error("Invalid multisig parameters: {0}")]
    InvalidMultisig(String),

    #[error("Invalid program: {0}")]
    InvalidProgram(String),

    #[error("Logic signature does not authorize sender {0}")]
    LogicSigNotDelegated(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),
}

impl From<EncodingError> for SignerError {
    fn from(err: EncodingError) -> Self {
        SignerError::Encoding(err.to_string())
    }
}

// ============================================================================
// Algod Errors
// ============================================================================

/// Node transport errors.
#[derive(Debug, Error)]
pub enum AlgodError {
    // ─── Network/Transport ───
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
        retryable: bool,
    },

    #[error("Timeout after {0} retries")]
    Timeout(u32),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // ─── API ───
    #[error("Algod API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    // ─── Confirmation ───
    #[error("Transaction {tx_id} rejected by the pool: {message}")]
    PoolError { tx_id: String, message: String },

    #[error("Transaction {tx_id} not confirmed after {rounds} rounds")]
    NotConfirmed { tx_id: String, rounds: u64 },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl AlgodError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            AlgodError::Http(e) => e.is_timeout() || e.is_connect(),
            AlgodError::Timeout(_) => true,
            AlgodError::Network { retryable, .. } => *retryable,
            AlgodError::Api { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>, status_code: Option<u16>, retryable: bool) -> Self {
        AlgodError::Network {
            message: message.into(),
            status_code,
            retryable,
        }
    }

    /// Returns true if the node reported the resource as missing (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        matches!(self, AlgodError::Api { status: 404, .. })
    }
}

/// HTTP statuses worth retrying.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    // 408 Request Timeout, 429 Too Many Requests, 5xx Server Errors
    status == 408 || status == 429 || (500..600).contains(&status)
}

// ============================================================================
// Composer Errors
// ============================================================================

/// Atomic transaction composer errors.
#[derive(Debug, Error)]
pub enum ComposerError {
    #[error("Cannot {operation} when composer status is {status:?}")]
    InvalidStatus {
        operation: &'static str,
        status: ComposerStatus,
    },

    #[error("Adding {adding} transaction(s) exceeds the maximum atomic group size of {max}")]
    GroupTooLarge { adding: usize, max: usize },

    #[error("Cannot add a transaction with nonzero group ID")]
    NonZeroGroup,

    #[error("Incorrect number of method arguments. Expected {expected}, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("Invalid argument at index {index}: {message}")]
    InvalidArgument { index: usize, message: String },

    #[error("Missing signatures for transactions at indexes {0:?}")]
    MissingSignatures(Vec<usize>),

    #[error("Cannot decode signed transaction at index {index}: {source}")]
    DecodeSignedTransaction {
        index: usize,
        #[source]
        source: EncodingError,
    },

    #[error("Transaction group cannot be resubmitted")]
    AlreadySubmitted,

    #[error("Transaction group has already been executed successfully")]
    AlreadyExecuted,

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("Signing failed: {0}")]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Algod(#[from] AlgodError),
}

// ============================================================================
// Main Error Type
// ============================================================================

/// Main error type for algo-kit operations.
#[derive(Debug, Error)]
pub enum Error {
    // ─── Parsing ───
    #[error(transparent)]
    ParseAddress(#[from] ParseAddressError),

    #[error(transparent)]
    ParseHash(#[from] ParseHashError),

    #[error(transparent)]
    ParseKey(#[from] ParseKeyError),

    // ─── Encoding ───
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Abi(#[from] AbiError),

    // ─── Transaction ───
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    // ─── Signing ───
    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    // ─── Node ───
    #[error(transparent)]
    Algod(#[from] AlgodError),

    // ─── Composer ───
    #[error(transparent)]
    Composer(#[from] ComposerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Display tests
    // ========================================================================

    #[test]
    fn test_parse_address_error_display() {
        assert_eq!(
            ParseAddressError::InvalidLength(12).to_string(),
            "Invalid address length: expected 58 characters, got 12"
        );
        assert_eq!(
            ParseAddressError::InvalidChecksum.to_string(),
            "Address checksum mismatch"
        );
    }

    #[test]
    fn test_transaction_error_display() {
        assert_eq!(
            TransactionError::BoxReferenceNotInForeignApps(42).to_string(),
            "Box ref with appId 42 not in foreign-apps"
        );
        assert_eq!(
            TransactionError::ZeroAddress("rekey_to").to_string(),
            "The zero address cannot be used for rekey_to; leave the field unset instead"
        );
    }

    #[test]
    fn test_composer_error_display() {
        let err = ComposerError::InvalidStatus {
            operation: "add transactions",
            status: ComposerStatus::Built,
        };
        assert_eq!(
            err.to_string(),
            "Cannot add transactions when composer status is Built"
        );
        assert_eq!(
            ComposerError::GroupTooLarge { adding: 1, max: 16 }.to_string(),
            "Adding 1 transaction(s) exceeds the maximum atomic group size of 16"
        );
    }

    // ========================================================================
    // Retry classification
    // ========================================================================

    #[test]
    fn test_algod_error_is_retryable() {
        assert!(AlgodError::Timeout(3).is_retryable());
        assert!(AlgodError::network("reset", None, true).is_retryable());
        assert!(!AlgodError::network("bad request", Some(400), false).is_retryable());
        assert!(
            AlgodError::Api {
                status: 503,
                message: "unavailable".into()
            }
            .is_retryable()
        );
        assert!(
            !AlgodError::Api {
                status: 404,
                message: "not found".into()
            }
            .is_retryable()
        );
        assert!(
            !AlgodError::PoolError {
                tx_id: "X".into(),
                message: "overspend".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(408));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(599));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(404));
    }

    #[test]
    fn test_not_found() {
        let err = AlgodError::Api {
            status: 404,
            message: "txn not found".into(),
        };
        assert!(err.is_not_found());
        assert!(!AlgodError::Timeout(1).is_not_found());
    }

    #[test]
    fn test_error_conversions() {
        let err: Error = ParseAddressError::InvalidChecksum.into();
        assert!(matches!(err, Error::ParseAddress(_)));

        let err: TransactionError = EncodingError::MissingKey("snd".into()).into();
        assert_eq!(err.to_string(), "Missing key: snd");
    }
}
