//! # Error Handling
//!
//! A single typed error spanning every component of the wallet core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Identity Errors (200-299)                                         │
//! │  │   ├── NoCurrentId      - No active identity selected                │
//! │  │   ├── NameTaken        - Identity or alias name already in use       │
//! │  │   ├── NoSuchId         - Referenced identity name does not exist     │
//! │  │   └── CannotRecoverId  - Vault could not be decrypted with this seed │
//! │  │                                                                      │
//! │  ├── Crypto Errors (300-399)                                           │
//! │  │   ├── DecryptionFailed    - AEAD open failed (MAC mismatch)          │
//! │  │   ├── TamperedCiphertext  - plaintext hash did not match envelope    │
//! │  │   ├── SigningFailed       - ECDSA signing failed                     │
//! │  │   ├── InvalidKey          - malformed JWK or key material            │
//! │  │   └── KeyExchangeFailed   - ECDH failed                              │
//! │  │                                                                      │
//! │  ├── Validation Errors (400-499)                                       │
//! │  │   ├── InvalidInput   - null/empty anchor, null signable object       │
//! │  │   └── InvalidVC      - credential failed structural validation       │
//! │  │                                                                      │
//! │  ├── Storage Errors (500-599)                                          │
//! │  │   ├── StorageReadError, StorageWriteError, StorageCorrupted          │
//! │  │                                                                      │
//! │  └── Registry Errors (600-699)                                         │
//! │      └── RegistryUnavailable - transport failure or 5xx from gatekeeper │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type alias for wallet core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for every operation in the wallet core.
///
/// Variant messages are the exact user-visible strings a CLI front end is
/// expected to print; do not reword them without checking callers that match
/// on `Display` output.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Identity Errors (200-299)
    // ========================================================================
    /// No identity is currently selected.
    #[error("No current ID")]
    NoCurrentId,

    /// An identity with this name already exists.
    #[error("Already have an ID named {0}")]
    NameTaken(String),

    /// An alias collides with an existing identity name or alias.
    #[error("Name already in use")]
    NameAlreadyInUse,

    /// No identity with this name exists.
    #[error("No ID named {0}")]
    NoSuchId(String),

    /// A wallet/identity vault could not be decrypted with the current seed.
    #[error("Cannot recover ID")]
    CannotRecoverId,

    /// A wallet backup could not be decrypted with the current mnemonic.
    #[error("Cannot recover wallet")]
    CannotRecoverWallet,

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================
    /// AEAD decryption failed (authentication tag mismatch).
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Decryption succeeded but the plaintext hash did not match the envelope.
    #[error("Tampered ciphertext")]
    TamperedCiphertext,

    /// ECDSA signing failed.
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Malformed key material (bad JWK, wrong length, invalid curve point).
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// ECDH key agreement failed.
    #[error("Key exchange failed: {0}")]
    KeyExchangeFailed(String),

    /// HD derivation failed.
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// The supplied recovery phrase is not a valid BIP-39 mnemonic.
    #[error("Invalid recovery phrase: {0}")]
    InvalidRecoveryPhrase(String),

    /// DID string failed to parse or its content hash did not verify.
    #[error("Invalid DID format: {0}")]
    InvalidDid(String),

    // ========================================================================
    // Validation Errors (400-499)
    // ========================================================================
    /// A required input was null, empty, or otherwise malformed.
    #[error("Invalid input")]
    InvalidInput,

    /// A verifiable credential failed structural validation.
    #[error("Invalid VC")]
    InvalidVC,

    // ========================================================================
    // Storage Errors (500-599)
    // ========================================================================
    /// Failed to read the wallet file.
    #[error("Failed to read wallet: {0}")]
    StorageReadError(String),

    /// Failed to write the wallet file.
    #[error("Failed to write wallet: {0}")]
    StorageWriteError(String),

    /// The wallet file was present but could not be parsed.
    #[error("Wallet data corrupted: {0}")]
    StorageCorrupted(String),

    // ========================================================================
    // Registry Errors (600-699)
    // ========================================================================
    /// The gatekeeper registry is unreachable or returned a server error.
    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// The registry rejected an operation (signature/prev-hash conflict).
    #[error("Registry rejected operation: {0}")]
    RegistryRejected(String),

    // ========================================================================
    // Internal (900-999)
    // ========================================================================
    /// Serialization to/from JSON failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Something that should be unreachable in normal operation happened.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// A stable numeric code, grouped by domain, for cross-boundary reporting.
    pub fn code(&self) -> i32 {
        match self {
            Error::NoCurrentId => 200,
            Error::NameTaken(_) => 201,
            Error::NameAlreadyInUse => 208,
            Error::NoSuchId(_) => 202,
            Error::CannotRecoverId => 203,
            Error::CannotRecoverWallet => 204,

            Error::DecryptionFailed(_) => 300,
            Error::TamperedCiphertext => 301,
            Error::SigningFailed(_) => 302,
            Error::InvalidKey(_) => 303,
            Error::KeyExchangeFailed(_) => 304,
            Error::KeyDerivationFailed(_) => 305,
            Error::InvalidRecoveryPhrase(_) => 306,
            Error::InvalidDid(_) => 307,

            Error::InvalidInput => 400,
            Error::InvalidVC => 401,

            Error::StorageReadError(_) => 500,
            Error::StorageWriteError(_) => 501,
            Error::StorageCorrupted(_) => 502,

            Error::RegistryUnavailable(_) => 600,
            Error::RegistryRejected(_) => 601,

            Error::SerializationError(_) => 900,
            Error::Internal(_) => 901,
        }
    }

    /// Whether retrying the same call might succeed (transport-level faults).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::RegistryUnavailable(_))
    }

    /// Whether the caller needs to take a different action rather than retry.
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            Error::NoCurrentId
                | Error::NameTaken(_)
                | Error::NameAlreadyInUse
                | Error::NoSuchId(_)
                | Error::CannotRecoverId
                | Error::InvalidRecoveryPhrase(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageReadError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::RegistryUnavailable(err.to_string())
    }
}
