//! # Secret Store
//!
//! Key-value persistence for keypairs and room keys.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SecretStore Trait                                                      │
//! │  ──────────────────                                                     │
//! │  • put(key, value)     - Store bytes under a stable string key          │
//! │  • get(key)            - Fetch bytes (None if absent)                   │
//! │  • delete(key)         - Remove; reports whether anything was there     │
//! │  • contains(key)       - Presence check                                 │
//! │                                                                         │
//! │  Implementations:                                                       │
//! │                                                                         │
//! │  ┌───────────────┐  ┌───────────────┐  ┌───────────────────────────┐   │
//! │  │    Memory     │  │     File      │  │  Sealed<S>                │   │
//! │  │               │  │               │  │                           │   │
//! │  │ - Tests and   │  │ - One file    │  │ - Wraps any store         │   │
//! │  │   ephemeral   │  │   per entry   │  │ - XChaCha20-Poly1305 at   │   │
//! │  │   sessions    │  │ - 0600 perms  │  │   rest, entry name as AAD │   │
//! │  │               │  │ - Atomic      │  │                           │   │
//! │  │               │  │   rename      │  │                           │   │
//! │  └───────────────┘  └───────────────┘  └───────────────────────────┘   │
//! │                                                                         │
//! │  Platform keychains plug in by implementing the trait.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use zeroize::Zeroizing;

use crate::crypto::{aead_open, aead_seal, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::{Error, Result};

/// Local secret store consumed by the key managers
///
/// Values must survive restarts (for persistent implementations) and must
/// not be readable by other applications.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Fetch the value under `key`
    async fn get(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>>;

    /// Remove `key`; returns whether a value was present
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Check if `key` is present
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

// ============================================================================
// MEMORY
// ============================================================================

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemorySecretStore {
    memory: RwLock<HashMap<String, Zeroizing<Vec<u8>>>>,
}

impl MemorySecretStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.memory.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.memory.read().is_empty()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut storage = self.memory.write();
        storage.insert(key.to_string(), Zeroizing::new(value.to_vec()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        let storage = self.memory.read();
        Ok(storage.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut storage = self.memory.write();
        Ok(storage.remove(key).is_some())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        let storage = self.memory.read();
        Ok(storage.contains_key(key))
    }
}

// ============================================================================
// FILE
// ============================================================================

/// File-backed store: one file per entry under a private directory
///
/// File names are the SHA-256 of the entry key, so arbitrary room ids map
/// to fixed-length, filesystem-safe names. Writes go to a temporary file
/// that is synced and then renamed over the target.
pub struct FileSecretStore {
    root: PathBuf,
}

impl FileSecretStore {
    /// Open (creating if needed) a store rooted at `root`
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            Error::StorageFailure(format!("Cannot create {}: {}", root.display(), e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&root, std::fs::Permissions::from_mode(0o700)).await?;
        }

        tracing::debug!("Opened file secret store at {}", root.display());
        Ok(Self { root })
    }

    /// Directory holding the entries
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(format!("{}.secret", hex::encode(digest)))
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let target = self.path_for(key);
        let tmp = target.with_extension(format!("tmp-{}", uuid::Uuid::new_v4().simple()));

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let write = async {
            let mut file = options.open(&tmp).await?;
            file.write_all(value).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp, &target).await
        };

        if let Err(e) = write.await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Error::StorageFailure(format!("Write failed: {}", e)));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(Zeroizing::new(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::StorageFailure(format!("Read failed: {}", e))),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::StorageFailure(format!("Delete failed: {}", e))),
        }
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.path_for(key)).await?)
    }
}

// ============================================================================
// SEALED
// ============================================================================

/// Encrypts every value at rest before handing it to an inner store
///
/// The entry name is bound as associated data, so a value copied under a
/// different name fails to decrypt.
pub struct SealedSecretStore<S> {
    inner: S,
    key: Zeroizing<[u8; KEY_SIZE]>,
}

impl<S: SecretStore> SealedSecretStore<S> {
    /// Wrap `inner`, encrypting with `key`
    ///
    /// Derive `key` with [`crate::crypto::derive_store_key`] from a
    /// platform-held device secret.
    pub fn new(inner: S, key: [u8; KEY_SIZE]) -> Self {
        Self {
            inner,
            key: Zeroizing::new(key),
        }
    }

    /// The wrapped store
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: SecretStore> SecretStore for SealedSecretStore<S> {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let (nonce, ciphertext) = aead_seal(&self.key, value, key.as_bytes())?;
        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        self.inner.put(key, &sealed).await
    }

    async fn get(&self, key: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        let data = match self.inner.get(key).await? {
            Some(d) => d,
            None => return Ok(None),
        };

        if data.len() < NONCE_SIZE + TAG_SIZE {
            return Err(Error::StorageFailure("Stored data too short".into()));
        }
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&data[..NONCE_SIZE]);

        let plaintext = aead_open(&self.key, &nonce, &data[NONCE_SIZE..], key.as_bytes())
            .map_err(|_| {
                Error::StorageFailure(format!("Entry '{}' is corrupted or was tampered with", key))
            })?;
        Ok(Some(Zeroizing::new(plaintext)))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        self.inner.contains(key).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
