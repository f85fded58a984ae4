//! # User Keypairs
//!
//! Each user owns one long-term X25519 keypair. It is used only to
//! transport room keys between members, never to encrypt message content.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UserKeypair (X25519)                                                   │
//! │  ─────────────────────                                                  │
//! │                                                                         │
//! │  • Private key: 32 bytes. Stays on the owning device; only the local   │
//! │    secret store sees it. Zeroized on drop.                              │
//! │  • Public key: 32 bytes. Shared with the account-creation flow and     │
//! │    with other room members.                                             │
//! │                                                                         │
//! │  Created once at registration (or first login if missing), never       │
//! │  mutated, destroyed only by an explicit account wipe.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroizing, ZeroizeOnDrop};

use super::random;
use crate::error::{Error, Result};

/// Size of X25519 keys in bytes
pub const KEY_SIZE: usize = 32;

/// A user's long-term X25519 keypair
#[derive(ZeroizeOnDrop)]
pub struct UserKeypair {
    #[zeroize(skip)] // x25519_dalek::StaticSecret zeroizes itself
    secret: StaticSecret,
    #[zeroize(skip)]
    public: PublicKey,
}

impl UserKeypair {
    /// Generate a fresh keypair from the OS CSPRNG
    pub fn generate() -> Result<Self> {
        let seed = Zeroizing::new(random::bytes::<KEY_SIZE>()?);
        Ok(Self::from_secret_bytes(&seed))
    }

    /// Rebuild a keypair from stored private key bytes
    pub(crate) fn from_secret_bytes(bytes: &[u8; KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(*bytes);
        let public = PublicKey(X25519PublicKey::from(&secret).to_bytes());
        Self { secret, public }
    }

    /// The shareable public half
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Private key bytes, for the local secret store only
    pub(crate) fn secret_bytes(&self) -> Zeroizing<[u8; KEY_SIZE]> {
        Zeroizing::new(self.secret.to_bytes())
    }

    /// X25519 Diffie-Hellman with a peer's public key
    ///
    /// Both sides compute the same value:
    /// `alice_secret × bob_public == bob_secret × alice_public`.
    pub(crate) fn diffie_hellman(&self, their_public: &PublicKey) -> Zeroizing<[u8; KEY_SIZE]> {
        let their_public = X25519PublicKey::from(their_public.0);
        Zeroizing::new(self.secret.diffie_hellman(&their_public).to_bytes())
    }
}

impl fmt::Debug for UserKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserKeypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// A user's X25519 public key
///
/// Contains only public information and can be serialized, transmitted,
/// and stored freely.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "hex_bytes")] [u8; KEY_SIZE]);

impl PublicKey {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            Error::InvalidKey(format!(
                "Public key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encode as hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from hex
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes =
            hex::decode(hex_str).map_err(|e| Error::InvalidKey(format!("Invalid hex: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Encode as base64
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Decode from base64
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::InvalidKey(format!("Invalid base64: {}", e)))?;
        Self::from_slice(&bytes)
    }

    /// Short fingerprint for logs and key verification UIs
    ///
    /// First 8 bytes of SHA-256 over the key, hex encoded.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        hex::encode(&digest[..8])
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.fingerprint())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Serde helper for serializing byte arrays as hex
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes.try_into().map_err(|_| serde::de::Error::custom("Invalid length"))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp1 = UserKeypair::generate().unwrap();
        let kp2 = UserKeypair::generate().unwrap();

        assert_ne!(kp1.public_key(), kp2.public_key());
    }

    #[test]
    fn test_rebuild_from_secret_bytes() {
        let kp = UserKeypair::generate().unwrap();
        let rebuilt = UserKeypair::from_secret_bytes(&kp.secret_bytes());

        assert_eq!(kp.public_key(), rebuilt.public_key());
    }

    #[test]
    fn test_diffie_hellman() {
        let alice = UserKeypair::generate().unwrap();
        let bob = UserKeypair::generate().unwrap();

        let alice_shared = alice.diffie_hellman(&bob.public_key());
        let bob_shared = bob.diffie_hellman(&alice.public_key());

        assert_eq!(*alice_shared, *bob_shared);
    }

    #[test]
    fn test_public_key_encodings() {
        let public = UserKeypair::generate().unwrap().public_key();

        assert_eq!(PublicKey::from_hex(&public.to_hex()).unwrap(), public);
        assert_eq!(PublicKey::from_base64(&public.to_base64()).unwrap(), public);

        let json = serde_json::to_string(&public).unwrap();
        assert_eq!(json, format!("\"{}\"", public.to_hex()));
        let restored: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(public, restored);
    }

    #[test]
    fn test_public_key_rejects_wrong_length() {
        assert!(matches!(
            PublicKey::from_slice(&[1u8; 31]),
            Err(Error::InvalidKey(_))
        ));
        assert!(PublicKey::from_hex("abcd").is_err());
    }

    #[test]
    fn test_debug_never_shows_secret() {
        let kp = UserKeypair::generate().unwrap();
        let debug = format!("{:?}", kp);
        assert!(!debug.contains(&hex::encode(*kp.secret_bytes())));
        assert!(debug.contains(&kp.public_key().fingerprint()));
    }
}
