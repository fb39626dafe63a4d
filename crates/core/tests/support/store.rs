//! In-memory token store that counts its writes

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use belay_core::TokenStore;
use belay_domain::{BelayError, Result as DomainResult, TokenPair, UserProfile};
use parking_lot::Mutex;

#[derive(Default)]
pub struct MockTokenStore {
    pair: Mutex<Option<TokenPair>>,
    profile: Mutex<Option<UserProfile>>,
    saves: AtomicUsize,
    clears: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MockTokenStore {
    pub fn pair(&self) -> Option<TokenPair> {
        self.pair.lock().clone()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.lock().clone()
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn reset_counters(&self) {
        self.saves.store(0, Ordering::SeqCst);
        self.clears.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl TokenStore for MockTokenStore {
    async fn load(&self) -> Option<TokenPair> {
        self.pair.lock().clone()
    }

    async fn save(&self, pair: &TokenPair) -> DomainResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BelayError::Storage("disk full".into()));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.pair.lock() = Some(pair.clone());
        Ok(())
    }

    async fn clear(&self) -> DomainResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        *self.pair.lock() = None;
        *self.profile.lock() = None;
        Ok(())
    }

    async fn load_profile(&self) -> Option<UserProfile> {
        self.profile.lock().clone()
    }

    async fn save_profile(&self, profile: &UserProfile) -> DomainResult<()> {
        *self.profile.lock() = Some(profile.clone());
        Ok(())
    }
}
