//! Session record in the platform keychain

use std::sync::Arc;

use async_trait::async_trait;
use belay_core::TokenStore;
use belay_domain::constants::SESSION_STORAGE_KEY;
use belay_domain::{BelayError, Result, TokenPair, UserProfile};
use keyring::Entry;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::SessionRecord;
use crate::errors::InfraError;

/// [`TokenStore`] that keeps the serialized record in one keychain entry
/// (`service` from configuration, account `belay.session`).
pub struct KeychainTokenStore {
    service: String,
    entry: Arc<Entry>,
    lock: Arc<Mutex<()>>,
}

impl KeychainTokenStore {
    /// # Errors
    /// Returns [`BelayError::Storage`] or [`BelayError::Config`] when the
    /// platform rejects the entry attributes.
    pub fn new(service: &str) -> Result<Self> {
        let entry = Entry::new(service, SESSION_STORAGE_KEY).map_err(InfraError::from)?;
        Ok(Self::with_entry(service, entry))
    }

    /// Wrap an existing entry (used with the keyring mock in tests).
    pub fn with_entry(service: &str, entry: Entry) -> Self {
        Self {
            service: service.to_string(),
            entry: Arc::new(entry),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn read_record(&self) -> Option<SessionRecord> {
        let entry = Arc::clone(&self.entry);
        let lock = Arc::clone(&self.lock);
        let result = tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            read_entry(&entry)
        })
        .await;

        match result {
            Ok(Ok(record)) => record,
            Ok(Err(err)) => {
                warn!(service = %self.service, error = %err, "failed to read keychain session");
                None
            }
            Err(err) => {
                warn!(error = %err, "keychain read task failed");
                None
            }
        }
    }

    async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut SessionRecord) + Send + 'static,
    {
        let entry = Arc::clone(&self.entry);
        let lock = Arc::clone(&self.lock);
        let result = tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            let mut record = read_entry(&entry).ok().flatten().unwrap_or_default();
            change(&mut record);
            if record.is_empty() {
                delete_entry(&entry)
            } else {
                let payload = serde_json::to_string(&record).map_err(InfraError::from)?;
                entry.set_password(&payload).map_err(InfraError::from)?;
                Ok(())
            }
        })
        .await
        .map_err(|e| BelayError::Internal(format!("keychain task failed: {e}")))?;

        if result.is_ok() {
            debug!(service = %self.service, "keychain session updated");
        }
        result
    }
}

fn read_entry(entry: &Entry) -> Result<Option<SessionRecord>> {
    match entry.get_password() {
        Ok(raw) => Ok(SessionRecord::decode(&raw, "keychain")),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(InfraError::from(err).into()),
    }
}

fn delete_entry(entry: &Entry) -> Result<()> {
    match entry.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(err) => Err(InfraError::from(err).into()),
    }
}

#[async_trait]
impl TokenStore for KeychainTokenStore {
    async fn load(&self) -> Option<TokenPair> {
        self.read_record().await.and_then(|record| record.tokens)
    }

    async fn save(&self, pair: &TokenPair) -> Result<()> {
        let pair = pair.clone();
        self.update(move |record| record.tokens = Some(pair)).await
    }

    async fn clear(&self) -> Result<()> {
        self.update(|record| *record = SessionRecord::default()).await
    }

    async fn load_profile(&self) -> Option<UserProfile> {
        self.read_record().await.and_then(|record| record.user)
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let profile = profile.clone();
        self.update(move |record| record.user = Some(profile)).await
    }
}
