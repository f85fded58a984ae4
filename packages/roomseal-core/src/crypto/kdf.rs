//! # Key Derivation
//!
//! HKDF-SHA256 over the raw X25519 output. The DH result is never used as
//! a cipher key directly.
//!
//! ```text
//! shared = X25519(our_secret, their_public)
//! key    = HKDF-SHA256(ikm = shared, salt = none,
//!                      info = "roomseal-key-exchange-v1") → 32 bytes
//! ```

use hkdf::Hkdf;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::aead::KEY_SIZE;
use crate::error::{Error, Result};

/// Domain separation label for key-exchange keys
const KEY_EXCHANGE_INFO: &[u8] = b"roomseal-key-exchange-v1";

/// Domain separation label for the at-rest key of a sealed secret store
const STORE_KEY_INFO: &[u8] = b"roomseal-secret-store-v1";

/// Derive the symmetric key-exchange key from an X25519 shared secret
///
/// An all-zero shared secret means the peer supplied a low-order point;
/// it is rejected rather than turned into a predictable key.
pub(crate) fn derive_exchange_key(shared_secret: &[u8; 32]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    if bool::from(shared_secret[..].ct_eq(&[0u8; 32][..])) {
        return Err(Error::InvalidKey(
            "Key exchange produced an all-zero shared secret".into(),
        ));
    }
    expand(shared_secret, None, KEY_EXCHANGE_INFO)
}

/// Derive the at-rest encryption key for a sealed secret store
///
/// `device_secret` is supplied by the platform (keychain, keystore). The
/// optional salt lets one device secret protect several stores.
pub fn derive_store_key(
    device_secret: &[u8],
    salt: Option<&[u8]>,
) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    if device_secret.len() < 16 {
        return Err(Error::InvalidKey(
            "Device secret must be at least 16 bytes".into(),
        ));
    }
    expand(device_secret, salt, STORE_KEY_INFO)
}

fn expand(ikm: &[u8], salt: Option<&[u8]>, info: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let hkdf = Hkdf::<Sha256>::new(salt, ikm);
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    hkdf.expand(info, &mut key[..])
        .map_err(|_| Error::Internal("HKDF expansion failed".into()))?;
    Ok(key)
}
