//! Serialized write access to the token store
//!
//! Every mutation of the stored session goes through [`TokenGate`]. The
//! epoch counter changes on login and logout so that a refresh which started
//! under an older session can detect that its result is stale.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use belay_domain::{Result, TokenPair, UserProfile};
use tokio::sync::Mutex;
use tracing::debug;

use super::ports::TokenStore;

pub struct TokenGate {
    store: Arc<dyn TokenStore>,
    epoch: AtomicU64,
    writes: Mutex<()>,
}

impl TokenGate {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store, epoch: AtomicU64::new(0), writes: Mutex::new(()) }
    }

    /// Current stored pair, read straight through to the store.
    pub async fn current(&self) -> Option<TokenPair> {
        self.store.load().await
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Store the pair of a brand-new session.
    ///
    /// # Returns
    /// The epoch of the new session.
    ///
    /// # Errors
    /// Propagates the store's save error; the epoch is left unchanged.
    pub async fn install(&self, pair: &TokenPair) -> Result<u64> {
        let _guard = self.writes.lock().await;
        self.store.save(pair).await?;
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(epoch, "installed new session tokens");
        Ok(epoch)
    }

    /// Overwrite the pair of the session identified by `expected_epoch`.
    ///
    /// Returns `Ok(false)` without writing when a login or logout happened
    /// since `expected_epoch` was read.
    ///
    /// # Errors
    /// Propagates the store's save error.
    pub async fn replace(&self, expected_epoch: u64, pair: &TokenPair) -> Result<bool> {
        let _guard = self.writes.lock().await;
        let epoch = self.epoch();
        if epoch != expected_epoch {
            debug!(expected_epoch, epoch, "discarding refreshed tokens from a previous session");
            return Ok(false);
        }
        self.store.save(pair).await?;
        Ok(true)
    }

    /// Clear the stored session.
    ///
    /// With `Some(epoch)` the clear only happens if that session is still the
    /// current one. The epoch advances before the store is touched, so a
    /// failed clear still invalidates in-flight refreshes.
    ///
    /// # Errors
    /// Propagates the store's clear error.
    pub async fn revoke(&self, expected_epoch: Option<u64>) -> Result<bool> {
        let _guard = self.writes.lock().await;
        if let Some(expected) = expected_epoch {
            let epoch = self.epoch();
            if epoch != expected {
                debug!(expected, epoch, "session already replaced; skipping revoke");
                return Ok(false);
            }
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.store.clear().await?;
        Ok(true)
    }

    pub async fn cached_profile(&self) -> Option<UserProfile> {
        self.store.load_profile().await
    }

    /// Cache `profile` next to the tokens of session `expected_epoch`.
    ///
    /// # Errors
    /// Propagates the store's save error.
    pub async fn cache_profile(&self, expected_epoch: u64, profile: &UserProfile) -> Result<bool> {
        let _guard = self.writes.lock().await;
        if self.epoch() != expected_epoch {
            return Ok(false);
        }
        self.store.save_profile(profile).await?;
        Ok(true)
    }
}
