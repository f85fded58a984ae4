//! # Cryptography Module
//!
//! All cryptographic primitives used by Roomseal Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  User Keypair   │   │   Room Key      │   │ Password Record │       │
//! │  │  (X25519)       │   │   (256-bit,     │   │ (Argon2id,      │       │
//! │  │                 │   │    versioned)   │   │  salt || hash)  │       │
//! │  │ • Transports    │   │ • Encrypts all  │   │ • Login only    │       │
//! │  │   room keys     │   │   room messages │   │ • One-way       │       │
//! │  └────────┬────────┘   └────────┬────────┘   └─────────────────┘       │
//! │           │                     │                                       │
//! │           ▼                     ▼                                       │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │ Key Exchange    │   │ Message Cipher  │                             │
//! │  │ X25519 + HKDF + │   │ XChaCha20-      │                             │
//! │  │ XChaCha20-      │   │ Poly1305        │                             │
//! │  │ Poly1305        │   │                 │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  Every nonce, salt and key comes from the OS CSPRNG (`random`).        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | X25519 | Key exchange | Fast ECDH, constant-time dalek implementation |
//! | HKDF-SHA256 | Key derivation | Separates the DH output from cipher keys |
//! | XChaCha20-Poly1305 | AEAD | 192-bit nonces are safe to pick at random |
//! | Argon2id | Password hashing | Memory-hard, side-channel resistant |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: Private keys and room keys are zeroized on drop
//! 2. **Constant-Time Comparison**: Password hashes compared with `subtle`
//! 3. **No Nonce Reuse**: A fresh random nonce for every encryption
//! 4. **No Fallback Keys**: Decryption targets exactly one key

mod aead;
mod kdf;
pub mod key_exchange;
mod keys;
pub mod message;
mod password;
pub mod random;
mod room_key;

pub use aead::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use kdf::derive_store_key;
pub use key_exchange::KeyExchangeEnvelope;
pub use keys::{PublicKey, UserKeypair};
pub use message::EncryptedPayload;
pub use password::{PasswordHasher, PasswordRecord, HASH_SIZE, RECORD_SIZE, SALT_SIZE};
pub use room_key::{validate_room_id, RoomKey, MAX_ROOM_ID_LEN, ROOM_KEY_SIZE};

pub(crate) use aead::{open as aead_open, seal as aead_seal};
