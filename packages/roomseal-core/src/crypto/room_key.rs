//! # Room Keys
//!
//! A room key is the 256-bit symmetric secret shared by every member of one
//! chat room. Keys are versioned: rotation produces version `v + 1` and the
//! older versions stay available for decrypting history.

use std::fmt;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::random;
use crate::error::{Error, Result};

/// Size of a room key in bytes (256 bits)
pub const ROOM_KEY_SIZE: usize = 32;

/// Longest accepted room identifier
pub const MAX_ROOM_ID_LEN: usize = 256;

/// Validate an opaque room identifier
///
/// Room ids are used verbatim inside secret-store entry names, so they must
/// be non-empty, bounded and free of control characters.
pub fn validate_room_id(room_id: &str) -> Result<()> {
    if room_id.is_empty() {
        return Err(Error::InvalidInput("Room id must not be empty".into()));
    }
    if room_id.len() > MAX_ROOM_ID_LEN {
        return Err(Error::InvalidInput(format!(
            "Room id longer than {} bytes",
            MAX_ROOM_ID_LEN
        )));
    }
    if room_id.chars().any(char::is_control) {
        return Err(Error::InvalidInput(
            "Room id must not contain control characters".into(),
        ));
    }
    Ok(())
}

/// A versioned symmetric key for one room
#[derive(Clone)]
pub struct RoomKey {
    room_id: String,
    version: u32,
    key_material: Zeroizing<[u8; ROOM_KEY_SIZE]>,
    created_at: i64,
}

impl RoomKey {
    /// Generate version 1 of a key for `room_id`
    pub fn generate(room_id: &str) -> Result<Self> {
        Self::generate_version(room_id, 1)
    }

    /// Generate fresh key material for a specific version
    pub(crate) fn generate_version(room_id: &str, version: u32) -> Result<Self> {
        validate_room_id(room_id)?;
        let key_material = Zeroizing::new(random::bytes::<ROOM_KEY_SIZE>()?);
        Ok(Self {
            room_id: room_id.to_string(),
            version,
            key_material,
            created_at: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Reassemble a key from stored or received parts
    pub(crate) fn from_parts(
        room_id: &str,
        version: u32,
        key_material: [u8; ROOM_KEY_SIZE],
        created_at: i64,
    ) -> Result<Self> {
        validate_room_id(room_id)?;
        if version == 0 {
            return Err(Error::InvalidKey("Room key versions start at 1".into()));
        }
        Ok(Self {
            room_id: room_id.to_string(),
            version,
            key_material: Zeroizing::new(key_material),
            created_at,
        })
    }

    /// The room this key belongs to
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Monotonically increasing key version, starting at 1
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Creation (or receipt) time in unix milliseconds
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub(crate) fn key_material(&self) -> &[u8; ROOM_KEY_SIZE] {
        &self.key_material
    }

    /// Encode the grant sealed inside a key-exchange envelope
    pub(crate) fn to_grant_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        let grant = RoomKeyGrant {
            room_id: self.room_id.clone(),
            version: self.version,
            key_material: *self.key_material,
        };
        Ok(Zeroizing::new(bincode::serialize(&grant)?))
    }

    /// Decode a grant opened from a key-exchange envelope
    pub(crate) fn from_grant_bytes(bytes: &[u8]) -> Result<Self> {
        let grant: RoomKeyGrant = bincode::deserialize(bytes)
            .map_err(|e| Error::MalformedPayload(format!("Invalid room key grant: {}", e)))?;
        Self::from_parts(
            &grant.room_id,
            grant.version,
            grant.key_material,
            chrono::Utc::now().timestamp_millis(),
        )
        .map_err(|e| Error::MalformedPayload(format!("Invalid room key grant: {}", e)))
    }
}

impl PartialEq for RoomKey {
    fn eq(&self, other: &Self) -> bool {
        self.room_id == other.room_id
            && self.version == other.version
            && bool::from(self.key_material[..].ct_eq(&other.key_material[..]))
    }
}

impl Eq for RoomKey {}

impl fmt::Debug for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomKey")
            .field("room_id", &self.room_id)
            .field("version", &self.version)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// What a key-exchange envelope actually carries
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct RoomKeyGrant {
    room_id: String,
    version: u32,
    key_material: [u8; ROOM_KEY_SIZE],
}
