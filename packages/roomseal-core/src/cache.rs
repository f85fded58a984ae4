//! In-memory cache of room keys.
//!
//! Owned by a [`CryptoFacade`](crate::CryptoFacade), never shared through
//! a global. Keyed by `(room, version)`; which version is current always
//! comes from the room key store. Readers go through a `parking_lot::RwLock`
//! and never wait on each other.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::crypto::RoomKey;

/// Cache of room keys keyed by `(room_id, version)`
#[derive(Default)]
pub struct RoomKeyCache {
    keys: RwLock<HashMap<(String, u32), RoomKey>>,
}

impl RoomKeyCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache `key` under its room and version
    pub fn insert(&self, key: &RoomKey) {
        self.keys
            .write()
            .insert((key.room_id().to_string(), key.version()), key.clone());
    }

    /// Cached key for one specific version
    pub fn get(&self, room_id: &str, version: u32) -> Option<RoomKey> {
        self.keys
            .read()
            .get(&(room_id.to_string(), version))
            .cloned()
    }

    /// Drop every cached version of `room_id`
    pub fn evict_room(&self, room_id: &str) {
        self.keys.write().retain(|(room, _), _| room != room_id);
    }

    /// Drop everything
    pub fn clear(&self) {
        self.keys.write().clear();
    }

    /// Number of cached key versions
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}
