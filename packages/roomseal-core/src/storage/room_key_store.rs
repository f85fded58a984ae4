//! # Room Key Store
//!
//! Versioned per-room symmetric keys on top of a [`SecretStore`].
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  room-key:<roomId>:1        → StoredRoomKey { version, created_at, key }│
//! │  room-key:<roomId>:2        → StoredRoomKey { ... }                     │
//! │  room-key:<roomId>:versions → every version stored for the room         │
//! │  room-index                 → every room holding at least one key       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every version ever stored stays retrievable through
//! [`RoomKeyStore::get_version`] until the room is deleted, so messages sent
//! under a superseded key can still be decrypted after rotation. The latest
//! version is the highest entry of the version set.
//!
//! ## Rotation
//!
//! ```text
//! rotate(room)
//!   ├── acquire room lock
//!   ├── read version set (max v)      ── empty → NoRoomKey
//!   ├── generate key v+1, write it
//!   ├── add v+1 to the version set
//!   └── release room lock
//! ```
//!
//! `create`, `put` and `delete` take the same lock, so two rotations of one
//! room can never both produce version `v+1`. Reads never lock. The room
//! index has its own lock, always taken after a room lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::locks::RoomLocks;
use super::secret_store::SecretStore;
use crate::crypto::{validate_room_id, RoomKey, ROOM_KEY_SIZE};
use crate::error::{Error, Result};

/// Secret-store entry listing every room with a stored key
pub const ROOM_INDEX_ENTRY: &str = "room-index";

/// How far a received key may run ahead of the newest version held
///
/// Covers rotations missed while offline; anything further is refused.
pub const MAX_VERSION_GAP: u32 = 64;

/// Persisted form of one room key version
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct StoredRoomKey {
    version: u32,
    created_at: i64,
    key_material: [u8; ROOM_KEY_SIZE],
}

fn version_entry(room_id: &str, version: u32) -> String {
    format!("room-key:{}:{}", room_id, version)
}

fn versions_entry(room_id: &str) -> String {
    format!("room-key:{}:versions", room_id)
}

/// Versioned room keys, keyed by room identifier
pub struct RoomKeyStore {
    store: Arc<dyn SecretStore>,
    locks: RoomLocks,
    index_lock: Mutex<()>,
}

impl RoomKeyStore {
    /// Keep room keys in `store`
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            locks: RoomLocks::new(),
            index_lock: Mutex::new(()),
        }
    }

    /// Generate version 1 of a key for `room_id` (not persisted)
    pub fn generate(&self, room_id: &str) -> Result<RoomKey> {
        RoomKey::generate(room_id)
    }

    /// Generate and store version 1 for a room that has no key yet
    ///
    /// Fails with [`Error::InvalidInput`] if the room already has a key.
    pub async fn create(&self, room_id: &str) -> Result<RoomKey> {
        validate_room_id(room_id)?;
        let _guard = self.locks.acquire(room_id).await;

        let versions = self.read_versions(room_id).await?;
        if !versions.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Room {} already has a key",
                room_id
            )));
        }

        let key = RoomKey::generate(room_id)?;
        self.record(&key, versions).await?;

        tracing::debug!("Stored first key for room {}", room_id);
        Ok(key)
    }

    /// Store `key` as a version of `room_id`
    ///
    /// Storing the same version twice is a no-op when the material matches
    /// and [`Error::InvalidKey`] when it differs. The latest version only
    /// ever moves forward.
    pub async fn put(&self, room_id: &str, key: &RoomKey) -> Result<()> {
        self.insert(room_id, key, None).await
    }

    /// Store a key received from another member
    ///
    /// Same as [`put`](Self::put), but a version more than
    /// [`MAX_VERSION_GAP`] past the newest one held is refused with
    /// [`Error::InvalidKey`].
    pub async fn put_received(&self, room_id: &str, key: &RoomKey) -> Result<()> {
        self.insert(room_id, key, Some(MAX_VERSION_GAP)).await
    }

    /// Fetch the latest key for `room_id`
    ///
    /// `None` means no key has been received yet.
    pub async fn get(&self, room_id: &str) -> Result<Option<RoomKey>> {
        match self.latest_version(room_id).await? {
            Some(version) => self.get_version(room_id, version).await,
            None => Ok(None),
        }
    }

    /// Fetch one specific version of the key for `room_id`
    pub async fn get_version(&self, room_id: &str, version: u32) -> Result<Option<RoomKey>> {
        self.read_version(room_id, version).await
    }

    /// Highest version stored for `room_id`
    pub async fn latest_version(&self, room_id: &str) -> Result<Option<u32>> {
        Ok(self.read_versions(room_id).await?.last().copied())
    }

    /// Every version stored for `room_id`, ascending
    pub async fn versions(&self, room_id: &str) -> Result<Vec<u32>> {
        Ok(self.read_versions(room_id).await?.into_iter().collect())
    }

    /// Every room holding at least one key
    pub async fn rooms(&self) -> Result<Vec<String>> {
        Ok(self.read_rooms().await?.into_iter().collect())
    }

    /// Remove every version of the key for `room_id`
    ///
    /// Only versions actually stored are touched. Returns whether anything
    /// was stored.
    pub async fn delete(&self, room_id: &str) -> Result<bool> {
        validate_room_id(room_id)?;
        let guard = self.locks.acquire(room_id).await;

        let versions = self.read_versions(room_id).await?;
        for version in &versions {
            self.store.delete(&version_entry(room_id, *version)).await?;
        }
        // Version set after the entries, so an interrupted delete still
        // finds what is left.
        self.store.delete(&versions_entry(room_id)).await?;
        self.index_room(room_id, false).await?;

        drop(guard);
        self.locks.prune();

        if versions.is_empty() {
            return Ok(false);
        }
        tracing::info!(
            "Deleted {} key version(s) for room {}",
            versions.len(),
            room_id
        );
        Ok(true)
    }

    /// Remove the keys of every indexed room
    ///
    /// Returns the number of rooms that held keys.
    pub async fn delete_all(&self) -> Result<usize> {
        let mut deleted = 0;
        for room_id in self.rooms().await? {
            if self.delete(&room_id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Supersede the current key of `room_id` with a fresh one
    ///
    /// The previous versions stay retrievable. Fails with
    /// [`Error::NoRoomKey`] when the room has no key to rotate.
    pub async fn rotate(&self, room_id: &str) -> Result<RoomKey> {
        validate_room_id(room_id)?;
        let _guard = self.locks.acquire(room_id).await;

        let versions = self.read_versions(room_id).await?;
        let current = *versions
            .last()
            .ok_or_else(|| Error::NoRoomKey(room_id.to_string()))?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| Error::Internal(format!("Key version overflow for room {}", room_id)))?;

        let key = RoomKey::generate_version(room_id, next)?;
        self.record(&key, versions).await?;

        tracing::info!("Rotated room {} from v{} to v{}", room_id, current, next);
        Ok(key)
    }

    // ========================================================================
    // WRITES (room lock held)
    // ========================================================================

    async fn insert(&self, room_id: &str, key: &RoomKey, max_gap: Option<u32>) -> Result<()> {
        validate_room_id(room_id)?;
        if key.room_id() != room_id {
            return Err(Error::InvalidInput(format!(
                "Room key belongs to {}, not {}",
                key.room_id(),
                room_id
            )));
        }

        let _guard = self.locks.acquire(room_id).await;

        if let Some(existing) = self.read_version(room_id, key.version()).await? {
            if existing == *key {
                tracing::debug!("Room {} already has key v{}", room_id, key.version());
                return Ok(());
            }
            return Err(Error::InvalidKey(format!(
                "Room {} already has a different key for version {}",
                room_id,
                key.version()
            )));
        }

        let versions = self.read_versions(room_id).await?;
        if let (Some(gap), Some(&latest)) = (max_gap, versions.last()) {
            if key.version() > latest.saturating_add(gap) {
                return Err(Error::InvalidKey(format!(
                    "Key v{} for room {} is too far ahead of v{}",
                    key.version(),
                    room_id,
                    latest
                )));
            }
        }

        self.record(key, versions).await?;
        tracing::debug!("Stored key v{} for room {}", key.version(), room_id);
        Ok(())
    }

    async fn record(&self, key: &RoomKey, mut versions: BTreeSet<u32>) -> Result<()> {
        let first = versions.is_empty();

        self.write_version(key).await?;
        versions.insert(key.version());
        self.write_versions(key.room_id(), &versions).await?;

        if first {
            self.index_room(key.room_id(), true).await?;
        }
        Ok(())
    }

    async fn index_room(&self, room_id: &str, present: bool) -> Result<()> {
        let _guard = self.index_lock.lock().await;
        let mut rooms = self.read_rooms().await?;

        let changed = if present {
            rooms.insert(room_id.to_string())
        } else {
            rooms.remove(room_id)
        };
        if !changed {
            return Ok(());
        }

        if rooms.is_empty() {
            self.store.delete(ROOM_INDEX_ENTRY).await?;
        } else {
            self.store
                .put(ROOM_INDEX_ENTRY, &bincode::serialize(&rooms)?)
                .await?;
        }
        Ok(())
    }

    // ========================================================================
    // ENTRY ENCODING
    // ========================================================================

    async fn read_version(&self, room_id: &str, version: u32) -> Result<Option<RoomKey>> {
        validate_room_id(room_id)?;
        let Some(bytes) = self.store.get(&version_entry(room_id, version)).await? else {
            return Ok(None);
        };

        let stored: StoredRoomKey = bincode::deserialize(&bytes).map_err(|e| {
            Error::StorageFailure(format!(
                "Corrupted key v{} for room {}: {}",
                version, room_id, e
            ))
        })?;
        if stored.version != version {
            return Err(Error::StorageFailure(format!(
                "Entry for room {} v{} holds version {}",
                room_id, version, stored.version
            )));
        }

        RoomKey::from_parts(room_id, stored.version, stored.key_material, stored.created_at)
            .map(Some)
    }

    async fn write_version(&self, key: &RoomKey) -> Result<()> {
        let stored = StoredRoomKey {
            version: key.version(),
            created_at: key.created_at(),
            key_material: *key.key_material(),
        };
        let bytes = Zeroizing::new(bincode::serialize(&stored)?);
        self.store
            .put(&version_entry(key.room_id(), key.version()), &bytes)
            .await
    }

    async fn read_versions(&self, room_id: &str) -> Result<BTreeSet<u32>> {
        validate_room_id(room_id)?;
        let Some(bytes) = self.store.get(&versions_entry(room_id)).await? else {
            return Ok(BTreeSet::new());
        };

        let versions: BTreeSet<u32> = bincode::deserialize(&bytes).map_err(|e| {
            Error::StorageFailure(format!("Corrupted version set for room {}: {}", room_id, e))
        })?;
        if versions.is_empty() || versions.contains(&0) {
            return Err(Error::StorageFailure(format!(
                "Version set for room {} is invalid",
                room_id
            )));
        }
        Ok(versions)
    }

    async fn write_versions(&self, room_id: &str, versions: &BTreeSet<u32>) -> Result<()> {
        self.store
            .put(&versions_entry(room_id), &bincode::serialize(versions)?)
            .await
    }

    async fn read_rooms(&self) -> Result<BTreeSet<String>> {
        match self.store.get(ROOM_INDEX_ENTRY).await? {
            Some(bytes) => bincode::deserialize(&bytes)
                .map_err(|e| Error::StorageFailure(format!("Corrupted room index: {}", e))),
            None => Ok(BTreeSet::new()),
        }
    }
}
