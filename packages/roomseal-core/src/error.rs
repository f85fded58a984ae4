//! # Error Handling
//!
//! Error types for Roomseal Core.
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
//! │  ├── Key Errors                                                        │
//! │  │   ├── KeyNotFound           - Keypair or key version not stored     │
//! │  │   ├── NoRoomKey             - Room key not received yet             │
//! │  │   ├── KeypairExists         - Registration over an existing key    │
//! │  │   └── InvalidKey            - Key bytes of the wrong shape          │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── AuthenticationFailed  - Tag mismatch (tamper / wrong key)     │
//! │  │   ├── EncryptionFailed      - AEAD refused to encrypt               │
//! │  │   ├── PasswordHashing       - Argon2 failure                        │
//! │  │   ├── MalformedPayload      - Wire blob cannot be parsed            │
//! │  │   └── RngUnavailable        - OS RNG failed (fatal)                 │
//! │  │                                                                      │
//! │  ├── Storage Errors                                                    │
//! │  │   └── StorageFailure        - Secret store I/O or corruption        │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── InvalidInput          - Caller-supplied value rejected        │
//! │      ├── SerializationError    - Record encoding failed                │
//! │      └── Internal              - Task join failures and the like       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation
//!
//! Every failure is returned as a typed result. Nothing in this crate logs
//! plaintext, key material, or passwords, and no decryption is ever retried
//! with a different key. Callers render [`Error::is_undecryptable`] errors as
//! an "undecryptable message" placeholder.

use thiserror::Error;

/// Result type alias for Roomseal Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of an authenticated decryption.
///
/// Returned by the cipher layer. Carries no detail; a wrong key and a
/// tampered ciphertext are indistinguishable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptError {
    /// The authentication tag did not verify
    #[error("Authentication failed: ciphertext was tampered with or the key is wrong")]
    AuthenticationFailed,
}

/// Main error type for Roomseal Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key Errors (200-299)
    // ========================================================================
    /// A required key (the keypair, or one room key version) is not stored
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// No key is stored for the room yet
    #[error("No room key for room '{0}'. The key has not been received yet.")]
    NoRoomKey(String),

    /// Registration attempted while a keypair already exists
    #[error("A keypair already exists on this device. Erase the account first.")]
    KeypairExists,

    /// Invalid key format or length
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // ========================================================================
    // Crypto Errors (300-399)
    // ========================================================================
    /// Ciphertext failed authentication-tag verification
    #[error("Authentication failed: message cannot be read with this key")]
    AuthenticationFailed,

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Password hashing failed
    #[error("Password hashing failed: {0}")]
    PasswordHashing(String),

    /// A wire blob could not be parsed
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The platform RNG is unavailable
    #[error("Secure random number generator unavailable")]
    RngUnavailable,

    // ========================================================================
    // Storage Errors (400-499)
    // ========================================================================
    /// Secret store I/O error or corrupted record
    #[error("Secret store failure: {0}")]
    StorageFailure(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================
    /// Caller-supplied value rejected
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Numeric error code for callers that cross a language boundary
    ///
    /// - 200-299: Keys
    /// - 300-399: Crypto
    /// - 400-499: Storage
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Keys (200-299)
            Error::KeyNotFound(_) => 200,
            Error::NoRoomKey(_) => 201,
            Error::KeypairExists => 202,
            Error::InvalidKey(_) => 203,

            // Crypto (300-399)
            Error::AuthenticationFailed => 300,
            Error::EncryptionFailed(_) => 301,
            Error::PasswordHashing(_) => 302,
            Error::MalformedPayload(_) => 303,
            Error::RngUnavailable => 304,

            // Storage (400-499)
            Error::StorageFailure(_) => 400,

            // Internal (900-999)
            Error::InvalidInput(_) => 900,
            Error::SerializationError(_) => 901,
            Error::Internal(_) => 902,
        }
    }

    /// Check if this error is recoverable
    ///
    /// A missing key can be generated or requested; a storage failure can be
    /// retried by the caller. An unavailable RNG never recovers.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::KeyNotFound(_) | Error::NoRoomKey(_) | Error::StorageFailure(_)
        )
    }

    /// Whether the caller should show an "undecryptable message" placeholder
    pub fn is_undecryptable(&self) -> bool {
        matches!(
            self,
            Error::AuthenticationFailed
                | Error::NoRoomKey(_)
                | Error::KeyNotFound(_)
                | Error::MalformedPayload(_)
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<DecryptError> for Error {
    fn from(err: DecryptError) -> Self {
        match err {
            DecryptError::AuthenticationFailed => Error::AuthenticationFailed,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::StorageFailure(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::MalformedPayload(format!("Invalid base64: {}", err))
    }
}

// ============================================================================
// TESTS
// ============================================================================
