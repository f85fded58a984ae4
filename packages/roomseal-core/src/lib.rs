//! # Roomseal Core
//!
//! End-to-end encryption and room key distribution for group chat clients.
//! The server and transport only ever see opaque ciphertext.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ROOMSEAL CORE MODULES                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │                    ┌──────────────────────────────┐                     │
//! │   chat / room /    │         CryptoFacade         │                     │
//! │   admin flows ───► │  register, create, share,    │                     │
//! │                    │  receive, encrypt, decrypt   │                     │
//! │                    └──────┬─────────────────┬─────┘                     │
//! │                           │                 │                           │
//! │        ┌──────────────────┘                 └───────────────┐           │
//! │        ▼                                                    ▼           │
//! │  ┌─────────────────────────────┐      ┌───────────────────────────────┐ │
//! │  │          Storage            │      │            Crypto             │ │
//! │  │                             │      │                               │ │
//! │  │ - KeypairManager            │      │ - MessageCipher (XChaCha20)   │ │
//! │  │ - RoomKeyStore (versioned)  │      │ - KeyExchangeCipher (X25519)  │ │
//! │  │ - SecretStore backends      │      │ - PasswordHasher (Argon2id)   │ │
//! │  │                             │      │ - SecureRandom (OS CSPRNG)    │ │
//! │  └─────────────────────────────┘      └───────────────────────────────┘ │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`crypto`] - Cryptographic primitives (keys, ciphers, password hashing)
//! - [`storage`] - Local secret store, keypair and room key persistence
//! - [`cache`] - In-memory room key cache owned by a facade
//! - [`config`] - Facade configuration
//! - [`facade`] - The orchestration layer the application calls
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Layer 1: Message Encryption (XChaCha20-Poly1305)                      │
//! │  ────────────────────────────────────────────────                       │
//! │  Every message and file is sealed with the room's current key and a    │
//! │  fresh random 24-byte nonce. Tampering or a wrong key is detected      │
//! │  before any plaintext is released.                                     │
//! │                                                                         │
//! │  Layer 2: Key Distribution (X25519 + HKDF + XChaCha20-Poly1305)        │
//! │  ───────────────────────────────────────────────────────────            │
//! │  Room keys travel between members sealed to the recipient's public     │
//! │  key and authenticated against the sender's.                           │
//! │                                                                         │
//! │  Layer 3: Credentials (Argon2id)                                       │
//! │  ───────────────────────────────                                        │
//! │  Passwords are stored as salted, memory-hard hashes only.              │
//! │                                                                         │
//! │  Layer 4: Local Storage                                                │
//! │  ──────────────────────                                                 │
//! │  Private keys and room keys never leave the device's secret store.     │
//! │  Wrap any store in SealedSecretStore for encryption at rest.           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use roomseal_core::{CryptoConfig, CryptoFacade};
//!
//! let facade = CryptoFacade::open(CryptoConfig::default()).await?;
//! let (keypair, record) = facade.register_user("correct-horse").await?;
//!
//! let room = facade.create_room().await?;
//! let payload = facade.encrypt_outgoing(room.room_id(), b"hello").await?;
//! let wire = payload.to_wire();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod cache;
pub mod config;
pub mod crypto;
pub mod error;
pub mod facade;
pub mod storage;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use cache::RoomKeyCache;
pub use config::CryptoConfig;
pub use crypto::{
    EncryptedPayload, KeyExchangeEnvelope, PasswordHasher, PasswordRecord, PublicKey, RoomKey,
    UserKeypair,
};
pub use error::{DecryptError, Error, Result};
pub use facade::{CryptoFacade, RoomKeyState};
pub use storage::{
    FileSecretStore, KeypairManager, MemorySecretStore, RoomKeyStore, SealedSecretStore,
    SecretStore,
};
