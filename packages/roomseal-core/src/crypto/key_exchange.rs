//! # Key Exchange Cipher
//!
//! Authenticated public-key encryption used only to carry room keys from
//! one member to another. Message content never goes through here.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  seal(payload, recipient_public, sender_keypair)                        │
//! │                                                                         │
//! │  1. X25519:  sender_secret × recipient_public → shared secret           │
//! │  2. HKDF-SHA256(shared, "roomseal-key-exchange-v1") → box key           │
//! │  3. XChaCha20-Poly1305(box key, random nonce, payload,                  │
//! │                        aad = sender_public || recipient_public)         │
//! │                                                                         │
//! │  open(envelope, sender_public, recipient_keypair)                       │
//! │                                                                         │
//! │  Same derivation from the recipient's side; the AAD pins both public   │
//! │  keys, so a wrong sender or recipient fails authentication.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use zeroize::Zeroizing;

use super::aead::{self, NONCE_SIZE};
use super::kdf::derive_exchange_key;
use super::keys::{PublicKey, UserKeypair};
use crate::error::{DecryptError, Result};

/// A sealed key-exchange message: `{ nonce, ciphertext }`
///
/// Transient and single-delivery. Wire form is `base64(nonce || ciphertext)`.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyExchangeEnvelope {
    nonce: [u8; NONCE_SIZE],
    ciphertext: Vec<u8>,
}

impl KeyExchangeEnvelope {
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

impl fmt::Debug for KeyExchangeEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyExchangeEnvelope")
            .field("nonce", &hex::encode(self.nonce))
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

fn binding(sender: &PublicKey, recipient: &PublicKey) -> [u8; 64] {
    let mut aad = [0u8; 64];
    aad[..32].copy_from_slice(sender.as_bytes());
    aad[32..].copy_from_slice(recipient.as_bytes());
    aad
}

/// Seal `payload` from `sender` to `recipient_public`
pub fn seal(
    payload: &[u8],
    recipient_public: &PublicKey,
    sender: &UserKeypair,
) -> Result<KeyExchangeEnvelope> {
    let shared = sender.diffie_hellman(recipient_public);
    let key = derive_exchange_key(&shared)?;
    let aad = binding(&sender.public_key(), recipient_public);

    let (nonce, ciphertext) = aead::seal(&key, payload, &aad)?;
    Ok(KeyExchangeEnvelope { nonce, ciphertext })
}

/// Open an envelope sent by `sender_public` to `recipient`
pub fn open(
    envelope: &KeyExchangeEnvelope,
    sender_public: &PublicKey,
    recipient: &UserKeypair,
) -> std::result::Result<Zeroizing<Vec<u8>>, DecryptError> {
    let shared = recipient.diffie_hellman(sender_public);
    // A low-order sender key cannot have produced a valid envelope.
    let key = derive_exchange_key(&shared).map_err(|_| DecryptError::AuthenticationFailed)?;
    let aad = binding(sender_public, &recipient.public_key());

    aead::open(&key, &envelope.nonce, &envelope.ciphertext, &aad).map(Zeroizing::new)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_seal_open_round_trip() {
        let alice = UserKeypair::generate().unwrap();
        let bob = UserKeypair::generate().unwrap();

        let envelope = seal(b"room key material", &bob.public_key(), &alice).unwrap();
        let opened = open(&envelope, &alice.public_key(), &bob).unwrap();

        assert_eq!(&opened[..], b"room key material");
    }

    #[test]
    fn test_wrong_recipient_fails() {
        let alice = UserKeypair::generate().unwrap();
        let bob = UserKeypair::generate().unwrap();
        let eve = UserKeypair::generate().unwrap();

        let envelope = seal(b"secret", &bob.public_key(), &alice).unwrap();

        assert_eq!(
            open(&envelope, &alice.public_key(), &eve).unwrap_err(),
            DecryptError::AuthenticationFailed
        );
    }

    #[test]
    fn test_wrong_claimed_sender_fails() {
        let alice = UserKeypair::generate().unwrap();
        let bob = UserKeypair::generate().unwrap();
        let mallory = UserKeypair::generate().unwrap();

        let envelope = seal(b"secret", &bob.public_key(), &alice).unwrap();

        assert!(open(&envelope, &mallory.public_key(), &bob).is_err());
    }

    #[test]
    fn test_tampered_envelope_fails() {
        let alice = UserKeypair::generate().unwrap();
        let bob = UserKeypair::generate().unwrap();

        let envelope = seal(b"secret", &bob.public_key(), &alice).unwrap();
        let mut bytes = envelope.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = KeyExchangeEnvelope::from_bytes(&bytes).unwrap();

        assert!(open(&tampered, &alice.public_key(), &bob).is_err());

        let mut bytes = envelope.to_bytes();
        bytes[0] ^= 0x80;
        let tampered = KeyExchangeEnvelope::from_bytes(&bytes).unwrap();
        assert!(open(&tampered, &alice.public_key(), &bob).is_err());
    }

    #[test]
    fn test_low_order_recipient_rejected() {
        let alice = UserKeypair::generate().unwrap();
        let identity_point = PublicKey::from_bytes([0u8; 32]);

        assert!(matches!(
            seal(b"secret", &identity_point, &alice),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_envelope_wire_round_trip() {
        let alice = UserKeypair::generate().unwrap();
        let bob = UserKeypair::generate().unwrap();

        let envelope = seal(b"grant", &bob.public_key(), &alice).unwrap();
        let restored = KeyExchangeEnvelope::from_wire(&envelope.to_wire()).unwrap();

        assert_eq!(restored, envelope);
        assert_eq!(
            &open(&restored, &alice.public_key(), &bob).unwrap()[..],
            b"grant"
        );
    }
}
