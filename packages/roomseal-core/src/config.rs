//! Facade configuration.
//!
//! ```json
//! {
//!   "storage_path": "/var/lib/app/keys",
//!   "cache_room_keys": true,
//!   "max_payload_size": 67108864
//! }
//! ```
//!
//! Every field is optional. Password work factors are not configurable.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Result;

/// Default upper bound on a single plaintext (64 MiB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

/// Configuration for a [`CryptoFacade`](crate::CryptoFacade)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Directory for the file-backed secret store (in-memory if None)
    pub storage_path: Option<PathBuf>,
    /// Keep decoded room keys in memory between calls
    pub cache_room_keys: bool,
    /// Largest plaintext accepted by `encrypt_outgoing`, in bytes
    pub max_payload_size: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            cache_room_keys: true,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl CryptoConfig {
    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Use a file-backed store rooted at `path`
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let config = CryptoConfig::default();
        assert!(config.storage_path.is_none());
        assert!(config.cache_room_keys);
        assert_eq!(config.max_payload_size, DEFAULT_MAX_PAYLOAD_SIZE);
    }

    #[test]
    fn test_from_json_partial() {
        let config = CryptoConfig::from_json(r#"{ "cache_room_keys": false }"#).unwrap();
        assert!(!config.cache_room_keys);
        assert_eq!(config.max_payload_size, DEFAULT_MAX_PAYLOAD_SIZE);

        let config = CryptoConfig::from_json(
            r#"{ "storage_path": "/tmp/keys", "max_payload_size": 1024 }"#,
        )
        .unwrap();
        assert_eq!(config.storage_path, Some(PathBuf::from("/tmp/keys")));
        assert_eq!(config.max_payload_size, 1024);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            CryptoConfig::from_json("not json"),
            Err(Error::SerializationError(_))
        ));
    }

    #[test]
    fn test_with_storage_path() {
        let config = CryptoConfig::default().with_storage_path("/tmp/x");
        assert_eq!(config.storage_path, Some(PathBuf::from("/tmp/x")));
    }
}
