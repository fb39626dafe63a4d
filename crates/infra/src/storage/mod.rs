//! Token store adapters
//!
//! The file and keychain stores persist a single [`SessionRecord`] under the
//! fixed `belay.session` key, so the token pair and the cached profile are
//! always written together.

mod file_store;
mod keychain_store;
mod memory_store;

use std::sync::Arc;

use belay_core::TokenStore;
use belay_domain::constants::SESSION_RECORD_VERSION;
use belay_domain::{Result, StorageBackend, StorageConfig, TokenPair, UserProfile};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use file_store::FileTokenStore;
pub use keychain_store::KeychainTokenStore;
pub use memory_store::MemoryTokenStore;

/// Persisted session layout shared by the file and keychain stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub version: u32,
    #[serde(default)]
    pub tokens: Option<TokenPair>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self { version: SESSION_RECORD_VERSION, tokens: None, user: None }
    }
}

impl SessionRecord {
    /// Decode a stored record; corrupt or foreign data is treated as absent.
    pub(crate) fn decode(raw: &str, source: &str) -> Option<Self> {
        match serde_json::from_str::<Self>(raw) {
            Ok(record) if record.version == SESSION_RECORD_VERSION => Some(record),
            Ok(record) => {
                warn!(source, version = record.version, "ignoring session record with unknown version");
                None
            }
            Err(err) => {
                warn!(source, error = %err, "ignoring corrupt session record");
                None
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tokens.is_none() && self.user.is_none()
    }
}

/// Build the store selected by configuration.
///
/// # Errors
/// Returns [`BelayError::Storage`](belay_domain::BelayError::Storage) if the
/// keychain entry cannot be opened.
pub fn build_token_store(config: &StorageConfig) -> Result<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match config.backend {
        StorageBackend::File => Arc::new(FileTokenStore::new(&config.path)),
        StorageBackend::Keychain => Arc::new(KeychainTokenStore::new(&config.keychain_service)?),
        StorageBackend::Memory => Arc::new(MemoryTokenStore::new()),
    };
    Ok(store)
}
