//! # Password Hashing
//!
//! Memory-hard password hashing for account authentication.
//!
//! ```text
//! hash(password)
//!   salt  = 16 random bytes
//!   hash  = Argon2id(password, salt, m = 64 MiB, t = 3, p = 1) → 32 bytes
//!   record = salt || hash                                       (48 bytes)
//!
//! verify(password, record)
//!   Argon2id(password, record.salt, same parameters) == record.hash
//!   (constant-time comparison)
//! ```
//!
//! The work factors are fixed. They target a few hundred milliseconds per
//! call on commodity mobile hardware, and there is no public way to lower
//! them, so a misconfigured caller cannot downgrade stored records.

use std::fmt;

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD, Engine};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::random;
use crate::error::{Error, Result};

/// Salt size in bytes
pub const SALT_SIZE: usize = 16;

/// Derived hash size in bytes
pub const HASH_SIZE: usize = 32;

/// Serialized record size (`salt || hash`)
pub const RECORD_SIZE: usize = SALT_SIZE + HASH_SIZE;

/// Argon2id memory cost in KiB (64 MiB)
const MEMORY_COST_KIB: u32 = 64 * 1024;

/// Argon2id passes over memory
const TIME_COST: u32 = 3;

/// Argon2id lanes
const PARALLELISM: u32 = 1;

/// A one-way password record: `salt || hash`
///
/// Never contains the password. `Debug` output is redacted.
#[derive(Clone)]
pub struct PasswordRecord {
    salt: [u8; SALT_SIZE],
    hash: [u8; HASH_SIZE],
}

impl PasswordRecord {
    /// The random salt
    pub fn salt(&self) -> &[u8; SALT_SIZE] {
        &self.salt
    }

    /// Serialize as a single 48-byte blob
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[..SALT_SIZE].copy_from_slice(&self.salt);
        out[SALT_SIZE..].copy_from_slice(&self.hash);
        out
    }

    /// Parse a 48-byte blob
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(Error::MalformedPayload(format!(
                "Password record must be {} bytes, got {}",
                RECORD_SIZE,
                bytes.len()
            )));
        }
        let mut salt = [0u8; SALT_SIZE];
        let mut hash = [0u8; HASH_SIZE];
        salt.copy_from_slice(&bytes[..SALT_SIZE]);
        hash.copy_from_slice(&bytes[SALT_SIZE..]);
        Ok(Self { salt, hash })
    }

    /// Encode as base64 for the account-creation flow
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Decode from base64
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD.decode(encoded.trim())?;
        Self::from_bytes(&bytes)
    }
}

impl PartialEq for PasswordRecord {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes()[..].ct_eq(&other.to_bytes()[..]).into()
    }
}

impl Eq for PasswordRecord {}

impl fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordRecord")
            .field("salt", &hex::encode(self.salt))
            .field("hash", &"<redacted>")
            .finish()
    }
}

/// Argon2id password hasher with fixed work factors
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    memory_kib: u32,
    passes: u32,
    lanes: u32,
}

impl PasswordHasher {
    /// Hasher with the production work factors
    pub fn new() -> Self {
        Self {
            memory_kib: MEMORY_COST_KIB,
            passes: TIME_COST,
            lanes: PARALLELISM,
        }
    }

    /// Cheap parameters for unit tests only
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            memory_kib: 1024,
            passes: 2,
            lanes: 1,
        }
    }

    fn argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.passes, self.lanes, Some(HASH_SIZE))
            .map_err(|e| Error::PasswordHashing(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn derive(&self, password: &str, salt: &[u8; SALT_SIZE]) -> Result<Zeroizing<[u8; HASH_SIZE]>> {
        let mut out = Zeroizing::new([0u8; HASH_SIZE]);
        self.argon2()?
            .hash_password_into(password.as_bytes(), salt, &mut out[..])
            .map_err(|e| Error::PasswordHashing(e.to_string()))?;
        Ok(out)
    }

    /// Hash a password under a fresh random salt
    pub fn hash(&self, password: &str) -> Result<PasswordRecord> {
        let salt: [u8; SALT_SIZE] = random::bytes()?;
        let hash = self.derive(password, &salt)?;
        Ok(PasswordRecord { salt, hash: *hash })
    }

    /// Verify a password against a stored record
    ///
    /// Returns `false` on mismatch and on any internal hashing failure; it
    /// never errors.
    pub fn verify(&self, password: &str, record: &PasswordRecord) -> bool {
        match self.derive(password, &record.salt) {
            Ok(candidate) => candidate[..].ct_eq(&record.hash[..]).into(),
            Err(e) => {
                tracing::warn!("Password verification could not derive a hash: {}", e);
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::for_tests();
        let record = hasher.hash("correct-horse").unwrap();

        assert!(hasher.verify("correct-horse", &record));
        assert!(!hasher.verify("wrong", &record));
        assert!(!hasher.verify("", &record));
    }

    #[test]
    fn test_fresh_salt_per_hash() {
        let hasher = PasswordHasher::for_tests();
        let a = hasher.hash("pw").unwrap();
        let b = hasher.hash("pw").unwrap();

        assert_ne!(a, b);
        assert_ne!(a.salt(), b.salt());
        assert!(hasher.verify("pw", &a));
        assert!(hasher.verify("pw", &b));
    }

    #[test]
    fn test_record_blob_layout() {
        let hasher = PasswordHasher::for_tests();
        let record = hasher.hash("pw").unwrap();
        let bytes = record.to_bytes();

        assert_eq!(bytes.len(), RECORD_SIZE);
        assert_eq!(&bytes[..SALT_SIZE], record.salt());

        let restored = PasswordRecord::from_bytes(&bytes).unwrap();
        assert!(hasher.verify("pw", &restored));

        let from_b64 = PasswordRecord::from_base64(&record.to_base64()).unwrap();
        assert_eq!(from_b64, record);
    }

    #[test]
    fn test_record_rejects_wrong_length() {
        assert!(matches!(
            PasswordRecord::from_bytes(&[0u8; 47]),
            Err(Error::MalformedPayload(_))
        ));
        assert!(PasswordRecord::from_base64("not base64!").is_err());
    }

    #[test]
    fn test_debug_redacts_hash() {
        let record = PasswordHasher::for_tests().hash("pw").unwrap();
        let debug = format!("{:?}", record);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains(&hex::encode(record.hash)));
    }

    #[test]
    fn test_production_parameters_are_memory_hard() {
        let hasher = PasswordHasher::new();
        assert!(hasher.memory_kib >= 64 * 1024);
        assert!(hasher.passes >= 2);
    }
}
