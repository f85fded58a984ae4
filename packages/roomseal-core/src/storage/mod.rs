//! # Storage Module
//!
//! Local persistence for key material.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────────────────┐  │
//! │  │  KeypairManager      │        │  RoomKeyStore                    │  │
//! │  │  ──────────────      │        │  ────────────                    │  │
//! │  │  "keypair"           │        │  "room-key:<room>:<version>"     │  │
//! │  │   public || private  │        │  "room-key:<room>:versions"      │  │
//! │  │                      │        │  "room-index"                    │  │
//! │  │                      │        │  per-room write locks            │  │
//! │  └──────────┬───────────┘        └────────────────┬─────────────────┘  │
//! │             │                                     │                     │
//! │             └──────────────┬──────────────────────┘                     │
//! │                            ▼                                            │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SecretStore (trait)                                            │   │
//! │  │  Memory │ File (0600, atomic rename) │ Sealed<S> (AEAD at rest) │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing in this module ever sends key material off the device; the
//! secret store is the only sink.

mod keypair_manager;
mod locks;
mod room_key_store;
mod secret_store;

pub use keypair_manager::{KeypairManager, KEYPAIR_ENTRY};
pub use room_key_store::{RoomKeyStore, MAX_VERSION_GAP, ROOM_INDEX_ENTRY};
pub use secret_store::{FileSecretStore, MemorySecretStore, SealedSecretStore, SecretStore};
