//! # Crypto Facade
//!
//! The single entry point the chat, room and admin flows call.
//!
//! ## Room Membership States
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   ┌─────────┐  receive_room_key / create_room   ┌──────────────┐       │
//! │   │  NoKey  │ ─────────────────────────────────►│  HasKey(v)   │       │
//! │   └────┬────┘                                   └──────┬───────┘       │
//! │        │                                               │ rotate        │
//! │        │                                               ▼               │
//! │        │                                        ┌──────────────┐       │
//! │        │                                        │ HasKey(v+1)  │       │
//! │        │                                        │ v retained   │       │
//! │        │                                        └──────┬───────┘       │
//! │        │          leave_room / erase                   │               │
//! │        └──────────────────────┬────────────────────────┘               │
//! │                               ▼                                         │
//! │                      keys discarded (terminal)                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Sender                                             Recipient
//! ──────                                             ─────────
//! encrypt_outgoing(room, plaintext)
//!   ├── latest RoomKey (NoRoomKey if absent)
//!   └── XChaCha20-Poly1305, fresh nonce
//!            │
//!            ▼  base64(nonce || ciphertext)  ──────►  decrypt_incoming(room, payload)
//!                                                      ├── latest RoomKey
//!                                                      └── verify tag, decrypt
//! ```
//!
//! Decryption targets exactly one key: the current one, or the version the
//! caller stored next to the message. A failure is reported, never retried
//! with other keys.

use std::sync::Arc;

use tokio::sync::Mutex;
use zeroize::Zeroizing;

use crate::cache::RoomKeyCache;
use crate::config::CryptoConfig;
use crate::crypto::{
    key_exchange, message, EncryptedPayload, KeyExchangeEnvelope, PasswordHasher,
    PasswordRecord, PublicKey, RoomKey, UserKeypair,
};
use crate::error::{Error, Result};
use crate::storage::{
    FileSecretStore, KeypairManager, MemorySecretStore, RoomKeyStore, SecretStore,
};

/// Local key state of one room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomKeyState {
    /// No key received yet; messages cannot be decrypted
    NoKey,
    /// Holding the given (latest) key version
    HasKey(u32),
}

/// Orchestrates key management and encryption for one local user
pub struct CryptoFacade {
    config: CryptoConfig,
    hasher: PasswordHasher,
    keypairs: KeypairManager,
    room_keys: RoomKeyStore,
    cache: Option<RoomKeyCache>,
    /// Loaded keypair; the mutex also serializes creation
    identity: Mutex<Option<Arc<UserKeypair>>>,
}

impl CryptoFacade {
    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    /// Create a facade from configuration
    ///
    /// Uses a [`FileSecretStore`] at `config.storage_path` when set, and an
    /// in-memory store otherwise.
    pub async fn open(config: CryptoConfig) -> Result<Self> {
        let store: Arc<dyn SecretStore> = match &config.storage_path {
            Some(path) => Arc::new(FileSecretStore::open(path).await?),
            None => {
                tracing::warn!("No storage path configured; keys will not survive restarts");
                Arc::new(MemorySecretStore::new())
            }
        };
        Ok(Self::with_store(config, store))
    }

    /// Create a facade over an explicit secret store
    pub fn with_store(config: CryptoConfig, store: Arc<dyn SecretStore>) -> Self {
        Self::with_parts(config, store, PasswordHasher::new())
    }

    fn with_parts(
        config: CryptoConfig,
        store: Arc<dyn SecretStore>,
        hasher: PasswordHasher,
    ) -> Self {
        tracing::info!(
            "Initializing crypto facade v{} (room key cache {})",
            env!("CARGO_PKG_VERSION"),
            if config.cache_room_keys { "on" } else { "off" }
        );
        let cache = config.cache_room_keys.then(RoomKeyCache::new);
        Self {
            hasher,
            keypairs: KeypairManager::new(store.clone()),
            room_keys: RoomKeyStore::new(store),
            cache,
            identity: Mutex::new(None),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }

    // ========================================================================
    // ACCOUNT
    // ========================================================================

    /// Create the local user's keypair and password record
    ///
    /// The keypair is persisted locally. Only its public half and the
    /// password record are meant for the account-creation flow. Fails with
    /// [`Error::KeypairExists`] if this device already holds a keypair.
    pub async fn register_user(
        &self,
        password: &str,
    ) -> Result<(Arc<UserKeypair>, PasswordRecord)> {
        let mut identity = self.identity.lock().await;
        if identity.is_some() || self.keypairs.exists().await? {
            return Err(Error::KeypairExists);
        }

        // Hash first so a hashing failure leaves nothing persisted
        let record = self.hash_password(password).await?;

        let keypair = Arc::new(self.keypairs.generate()?);
        self.keypairs.persist(&keypair).await?;
        *identity = Some(keypair.clone());

        tracing::info!("Registered user {}", keypair.public_key().fingerprint());
        Ok((keypair, record))
    }

    /// Load the local keypair, creating it on first login if missing
    pub async fn ensure_keypair(&self) -> Result<PublicKey> {
        let mut identity = self.identity.lock().await;
        if let Some(keypair) = identity.as_ref() {
            return Ok(keypair.public_key());
        }

        let keypair = match self.keypairs.load().await {
            Ok(keypair) => keypair,
            Err(Error::KeyNotFound(_)) => {
                tracing::info!("No keypair on this device; generating one");
                let keypair = self.keypairs.generate()?;
                self.keypairs.persist(&keypair).await?;
                keypair
            }
            Err(e) => return Err(e),
        };

        let public = keypair.public_key();
        *identity = Some(Arc::new(keypair));
        Ok(public)
    }

    /// The local user's public key
    ///
    /// Fails with [`Error::KeyNotFound`] before registration.
    pub async fn public_key(&self) -> Result<PublicKey> {
        Ok(self.keypair().await?.public_key())
    }

    /// Hash a password into a fresh record (off the async executor)
    pub async fn hash_password(&self, password: &str) -> Result<PasswordRecord> {
        let hasher = self.hasher.clone();
        let password = Zeroizing::new(password.to_string());
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| Error::Internal(format!("Password hashing task failed: {}", e)))?
    }

    /// Check a login password against a stored record
    pub async fn verify_password(&self, password: &str, record: &PasswordRecord) -> Result<bool> {
        let hasher = self.hasher.clone();
        let password = Zeroizing::new(password.to_string());
        let record = record.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &record))
            .await
            .map_err(|e| Error::Internal(format!("Password verification task failed: {}", e)))
    }

    /// Wipe the local keypair and every stored or cached room key
    pub async fn erase_account(&self) -> Result<()> {
        let mut identity = self.identity.lock().await;
        let rooms = self.room_keys.delete_all().await?;
        self.keypairs.erase().await?;
        *identity = None;
        if let Some(cache) = &self.cache {
            cache.clear();
        }
        tracing::info!("Erased local account keys and {} room(s)", rooms);
        Ok(())
    }

    // ========================================================================
    // ROOMS
    // ========================================================================

    /// Create a room with a fresh random id and its first key
    pub async fn create_room(&self) -> Result<RoomKey> {
        self.create_room_with_id(&uuid::Uuid::new_v4().to_string())
            .await
    }

    /// Create the first key for a caller-named room
    ///
    /// Fails with [`Error::InvalidInput`] if the room already has a key.
    pub async fn create_room_with_id(&self, room_id: &str) -> Result<RoomKey> {
        let key = self.room_keys.create(room_id).await?;
        self.remember(&key);

        tracing::info!("Created room {}", room_id);
        Ok(key)
    }

    /// Seal the current key of `room_id` for another member
    pub async fn share_room_key(
        &self,
        room_id: &str,
        recipient: &PublicKey,
    ) -> Result<KeyExchangeEnvelope> {
        let key = self
            .current_key(room_id)
            .await?
            .ok_or_else(|| Error::NoRoomKey(room_id.to_string()))?;
        let keypair = self.keypair().await?;

        let grant = key.to_grant_bytes()?;
        let envelope = key_exchange::seal(&grant, recipient, &keypair)?;

        tracing::debug!(
            "Shared room {} key v{} with {}",
            room_id,
            key.version(),
            recipient.fingerprint()
        );
        Ok(envelope)
    }

    /// Open a key-exchange envelope and store the room key it carries
    ///
    /// A key too far ahead of the newest version held for the room is
    /// refused with [`Error::InvalidKey`].
    pub async fn receive_room_key(
        &self,
        envelope: &KeyExchangeEnvelope,
        sender: &PublicKey,
    ) -> Result<RoomKey> {
        let keypair = self.keypair().await?;

        let grant = key_exchange::open(envelope, sender, &keypair).map_err(|e| {
            tracing::warn!("Rejected key envelope from {}", sender.fingerprint());
            Error::from(e)
        })?;
        let key = RoomKey::from_grant_bytes(&grant)?;

        self.room_keys.put_received(key.room_id(), &key).await?;
        self.remember(&key);

        tracing::info!(
            "Received room {} key v{} from {}",
            key.room_id(),
            key.version(),
            sender.fingerprint()
        );
        Ok(key)
    }

    /// Replace the key of `room_id` with a new version
    ///
    /// Older versions stay available to [`decrypt_incoming_at`](Self::decrypt_incoming_at).
    pub async fn rotate_room_key(&self, room_id: &str) -> Result<RoomKey> {
        let key = self.room_keys.rotate(room_id).await?;
        self.remember(&key);
        Ok(key)
    }

    /// Whether this device holds a key for `room_id`
    pub async fn room_state(&self, room_id: &str) -> Result<RoomKeyState> {
        Ok(match self.current_key_version(room_id).await? {
            Some(version) => RoomKeyState::HasKey(version),
            None => RoomKeyState::NoKey,
        })
    }

    /// Version new messages in `room_id` are encrypted under
    ///
    /// Store it next to each outgoing message to decrypt it after rotation.
    pub async fn current_key_version(&self, room_id: &str) -> Result<Option<u32>> {
        self.room_keys.latest_version(room_id).await
    }

    /// Discard every key of `room_id`
    pub async fn leave_room(&self, room_id: &str) -> Result<()> {
        let removed = self.room_keys.delete(room_id).await?;
        if let Some(cache) = &self.cache {
            cache.evict_room(room_id);
        }
        if removed {
            tracing::info!("Left room {}", room_id);
        }
        Ok(())
    }

    // ========================================================================
    // MESSAGES
    // ========================================================================

    /// Encrypt a message or file for `room_id`
    ///
    /// Fails with [`Error::NoRoomKey`] until the room key has been received.
    pub async fn encrypt_outgoing(
        &self,
        room_id: &str,
        plaintext: &[u8],
    ) -> Result<EncryptedPayload> {
        if plaintext.len() > self.config.max_payload_size {
            return Err(Error::InvalidInput(format!(
                "Payload of {} bytes exceeds the {} byte limit",
                plaintext.len(),
                self.config.max_payload_size
            )));
        }

        let key = self
            .current_key(room_id)
            .await?
            .ok_or_else(|| Error::NoRoomKey(room_id.to_string()))?;

        let payload = message::encrypt(plaintext, &key)?;
        tracing::debug!(
            "Encrypted {} bytes for room {} under v{}",
            plaintext.len(),
            room_id,
            key.version()
        );
        Ok(payload)
    }

    /// Decrypt a payload with the current key of `room_id`
    pub async fn decrypt_incoming(
        &self,
        room_id: &str,
        payload: &EncryptedPayload,
    ) -> Result<Vec<u8>> {
        let key = self
            .current_key(room_id)
            .await?
            .ok_or_else(|| Error::NoRoomKey(room_id.to_string()))?;
        Self::decrypt_with(&key, payload)
    }

    /// Decrypt a payload with one specific key version of `room_id`
    pub async fn decrypt_incoming_at(
        &self,
        room_id: &str,
        version: u32,
        payload: &EncryptedPayload,
    ) -> Result<Vec<u8>> {
        let key = match self.key_at(room_id, version).await? {
            Some(key) => key,
            None if self.room_keys.latest_version(room_id).await?.is_none() => {
                return Err(Error::NoRoomKey(room_id.to_string()))
            }
            None => {
                return Err(Error::KeyNotFound(format!(
                    "Room {} has no key version {}",
                    room_id, version
                )))
            }
        };
        Self::decrypt_with(&key, payload)
    }

    fn decrypt_with(key: &RoomKey, payload: &EncryptedPayload) -> Result<Vec<u8>> {
        message::decrypt(payload, key).map_err(|e| {
            tracing::debug!(
                "Decryption failed for room {} under v{}",
                key.room_id(),
                key.version()
            );
            Error::from(e)
        })
    }

    // ========================================================================
    // KEY LOOKUP
    // ========================================================================

    async fn keypair(&self) -> Result<Arc<UserKeypair>> {
        let mut identity = self.identity.lock().await;
        if let Some(keypair) = identity.as_ref() {
            return Ok(keypair.clone());
        }
        let keypair = Arc::new(self.keypairs.load().await?);
        *identity = Some(keypair.clone());
        Ok(keypair)
    }

    async fn current_key(&self, room_id: &str) -> Result<Option<RoomKey>> {
        match self.room_keys.latest_version(room_id).await? {
            Some(version) => self.key_at(room_id, version).await,
            None => Ok(None),
        }
    }

    async fn key_at(&self, room_id: &str, version: u32) -> Result<Option<RoomKey>> {
        if let Some(key) = self.cache.as_ref().and_then(|c| c.get(room_id, version)) {
            return Ok(Some(key));
        }
        let key = self.room_keys.get_version(room_id, version).await?;
        if let Some(key) = &key {
            self.remember(key);
        }
        Ok(key)
    }

    fn remember(&self, key: &RoomKey) {
        if let Some(cache) = &self.cache {
            cache.insert(key);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
