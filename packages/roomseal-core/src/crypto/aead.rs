//! # Authenticated Encryption
//!
//! XChaCha20-Poly1305 primitives shared by the message cipher, the
//! key-exchange cipher and the sealed secret store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  seal(key, plaintext, aad)                                              │
//! │    nonce      = 24 random bytes (fresh per call)                        │
//! │    ciphertext = XChaCha20-Poly1305(key, nonce, plaintext, aad)          │
//! │                 (plaintext length + 16-byte tag)                        │
//! │                                                                         │
//! │  open(key, nonce, ciphertext, aad)                                      │
//! │    tag verified before any plaintext is released                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! 192-bit nonces make random nonce selection safe for any realistic number
//! of messages under one key.

use base64::{engine::general_purpose::STANDARD, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};

use super::random;
use crate::error::{DecryptError, Error, Result};

/// Size of the XChaCha20-Poly1305 nonce in bytes (192 bits)
pub const NONCE_SIZE: usize = 24;

/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Size of a symmetric key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Encrypt under a fresh random nonce
pub(crate) fn seal(
    key: &[u8; KEY_SIZE],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<([u8; NONCE_SIZE], Vec<u8>)> {
    let nonce: [u8; NONCE_SIZE] = random::bytes()?;
    let cipher = XChaCha20Poly1305::new(key.into());

    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| Error::EncryptionFailed(format!("AEAD encryption failed: {}", e)))?;

    Ok((nonce, ciphertext))
}

/// Decrypt and verify
pub(crate) fn open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
    aad: &[u8],
) -> std::result::Result<Vec<u8>, DecryptError> {
    let cipher = XChaCha20Poly1305::new(key.into());

    cipher
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| DecryptError::AuthenticationFailed)
}

// ============================================================================
// WIRE FORMAT: base64(nonce || ciphertext)
// ============================================================================

/// Concatenate `nonce || ciphertext`
pub(crate) fn join(nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(nonce);
    out.extend_from_slice(ciphertext);
    out
}

/// Split `nonce || ciphertext`, rejecting blobs that cannot hold a tag
pub(crate) fn split(bytes: &[u8]) -> Result<([u8; NONCE_SIZE], Vec<u8>)> {
    if bytes.len() < NONCE_SIZE + TAG_SIZE {
        return Err(Error::MalformedPayload(format!(
            "Blob of {} bytes is shorter than nonce + tag ({} bytes)",
            bytes.len(),
            NONCE_SIZE + TAG_SIZE
        )));
    }
    let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
    let mut nonce_arr = [0u8; NONCE_SIZE];
    nonce_arr.copy_from_slice(nonce);
    Ok((nonce_arr, ciphertext.to_vec()))
}

/// `base64(nonce || ciphertext)`
pub(crate) fn to_wire(nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> String {
    STANDARD.encode(join(nonce, ciphertext))
}

/// Inverse of [`to_wire`]
pub(crate) fn from_wire(encoded: &str) -> Result<([u8; NONCE_SIZE], Vec<u8>)> {
    let bytes = STANDARD.decode(encoded.trim())?;
    split(&bytes)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_basic() {
        let key = [42u8; KEY_SIZE];
        let (nonce, ciphertext) = seal(&key, b"Hello, World!", b"context").unwrap();

        assert_eq!(ciphertext.len(), 13 + TAG_SIZE);
        let plaintext = open(&key, &nonce, &ciphertext, b"context").unwrap();
        assert_eq!(plaintext, b"Hello, World!");
    }

    #[test]
    fn test_seal_open_empty() {
        let key = [42u8; KEY_SIZE];
        let (nonce, ciphertext) = seal(&key, b"", b"").unwrap();

        assert_eq!(ciphertext.len(), TAG_SIZE);
        assert!(open(&key, &nonce, &ciphertext, b"").unwrap().is_empty());
    }

    #[test]
    fn test_wrong_aad_fails() {
        let key = [42u8; KEY_SIZE];
        let (nonce, ciphertext) = seal(&key, b"data", b"context").unwrap();

        assert_eq!(
            open(&key, &nonce, &ciphertext, b"other"),
            Err(DecryptError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_wire_split_rejects_short_blobs() {
        assert!(matches!(
            split(&[0u8; NONCE_SIZE + TAG_SIZE - 1]),
            Err(Error::MalformedPayload(_))
        ));
        assert!(split(&[0u8; NONCE_SIZE + TAG_SIZE]).is_ok());
        assert!(matches!(
            from_wire("%%% not base64"),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_wire_layout_is_nonce_then_ciphertext() {
        let nonce = [7u8; NONCE_SIZE];
        let ciphertext = vec![1u8; TAG_SIZE + 3];
        let joined = join(&nonce, &ciphertext);

        assert_eq!(&joined[..NONCE_SIZE], &nonce);
        assert_eq!(&joined[NONCE_SIZE..], &ciphertext[..]);

        let (n, c) = from_wire(&to_wire(&nonce, &ciphertext)).unwrap();
        assert_eq!(n, nonce);
        assert_eq!(c, ciphertext);
    }
}
