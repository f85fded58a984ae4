//! # Message Cipher
//!
//! Authenticated symmetric encryption of message and file payloads under a
//! room key. Text and binary payloads are the same opaque bytes here; any
//! higher-level encoding belongs to the caller.

use std::fmt;

use super::aead::{self, NONCE_SIZE};
use super::room_key::RoomKey;
use crate::error::{DecryptError, Result};

/// Ciphertext of one message: `{ nonce, ciphertext }`
///
/// Produced fresh by every [`encrypt`] call. On the wire it is the single
/// opaque string `base64(nonce || ciphertext)`.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// The 24-byte nonce
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Ciphertext including the authentication tag
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// `nonce || ciphertext`
    pub fn to_bytes(&self) -> Vec<u8> {
        aead::join(&self.nonce, &self.ciphertext)
    }

    /// Parse `nonce || ciphertext`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (nonce, ciphertext) = aead::split(bytes)?;
        Ok(Self { nonce, ciphertext })
    }

    /// `base64(nonce || ciphertext)`
    pub fn to_wire(&self) -> String {
        aead::to_wire(&self.nonce, &self.ciphertext)
    }

    /// Parse the wire string
    pub fn from_wire(encoded: &str) -> Result<Self> {
        let (nonce, ciphertext) = aead::from_wire(encoded)?;
        Ok(Self { nonce, ciphertext })
    }
}

impl fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedPayload")
            .field("nonce", &hex::encode(self.nonce))
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

/// Encrypt `plaintext` under `key`
pub fn encrypt(plaintext: &[u8], key: &RoomKey) -> Result<EncryptedPayload> {
    let (nonce, ciphertext) = aead::seal(key.key_material(), plaintext, &[])?;
    Ok(EncryptedPayload { nonce, ciphertext })
}

/// Decrypt `payload` with exactly `key`
///
/// Any tampering or a wrong key yields
/// [`DecryptError::AuthenticationFailed`], never partial plaintext.
pub fn decrypt(
    payload: &EncryptedPayload,
    key: &RoomKey,
) -> std::result::Result<Vec<u8>, DecryptError> {
    aead::open(key.key_material(), &payload.nonce, &payload.ciphertext, &[])
}

// ============================================================================
// TESTS
// ============================================================================
