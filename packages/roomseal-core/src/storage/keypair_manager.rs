//! # Keypair Manager
//!
//! Generates, persists and retrieves the local user's long-term keypair.
//!
//! The keypair lives under the `keypair` entry as `public || private`
//! (64 bytes). On load the public half is re-derived from the private half
//! and compared, so a corrupted record is reported instead of silently
//! producing a different identity.

use std::sync::Arc;

use tokio::sync::Mutex;
use zeroize::Zeroizing;

use super::secret_store::SecretStore;
use crate::crypto::{PublicKey, UserKeypair};
use crate::error::{Error, Result};

/// Secret-store entry holding the local keypair
pub const KEYPAIR_ENTRY: &str = "keypair";

const RECORD_LEN: usize = 64;

/// CRUD over the local keypair
pub struct KeypairManager {
    store: Arc<dyn SecretStore>,
    write_lock: Mutex<()>,
}

impl KeypairManager {
    /// Manage the keypair held in `store`
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Produce a fresh keypair (not persisted)
    pub fn generate(&self) -> Result<UserKeypair> {
        UserKeypair::generate()
    }

    /// Persist `keypair` to the local secret store
    ///
    /// The private key goes to the store and nowhere else.
    pub async fn persist(&self, keypair: &UserKeypair) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut record = Zeroizing::new(Vec::with_capacity(RECORD_LEN));
        record.extend_from_slice(keypair.public_key().as_bytes());
        record.extend_from_slice(&keypair.secret_bytes()[..]);

        self.store.put(KEYPAIR_ENTRY, &record).await?;
        tracing::info!(
            "Persisted keypair {}",
            keypair.public_key().fingerprint()
        );
        Ok(())
    }

    /// Load the persisted keypair
    ///
    /// Fails with [`Error::KeyNotFound`] if none has been persisted.
    pub async fn load(&self) -> Result<UserKeypair> {
        let record = self
            .store
            .get(KEYPAIR_ENTRY)
            .await?
            .ok_or_else(|| Error::KeyNotFound("No keypair has been persisted".into()))?;

        if record.len() != RECORD_LEN {
            return Err(Error::StorageFailure(format!(
                "Keypair record has {} bytes, expected {}",
                record.len(),
                RECORD_LEN
            )));
        }

        let stored_public = PublicKey::from_slice(&record[..32])?;
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&record[32..]);

        let keypair = UserKeypair::from_secret_bytes(&secret);
        if keypair.public_key() != stored_public {
            return Err(Error::StorageFailure(
                "Keypair record is corrupted: public key does not match private key".into(),
            ));
        }
        Ok(keypair)
    }

    /// Whether a keypair has been persisted
    pub async fn exists(&self) -> Result<bool> {
        self.store.contains(KEYPAIR_ENTRY).await
    }

    /// Remove the persisted keypair
    pub async fn erase(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.store.delete(KEYPAIR_ENTRY).await? {
            tracing::info!("Erased local keypair");
        }
        Ok(())
    }
}
