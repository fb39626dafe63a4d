//! In-process token store

use async_trait::async_trait;
use belay_core::TokenStore;
use belay_domain::{Result, TokenPair, UserProfile};
use parking_lot::RwLock;

use super::SessionRecord;

/// Ephemeral [`TokenStore`]; the session ends with the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    record: RwLock<SessionRecord>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing pair.
    pub fn with_pair(pair: TokenPair) -> Self {
        Self { record: RwLock::new(SessionRecord { tokens: Some(pair), ..SessionRecord::default() }) }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Option<TokenPair> {
        self.record.read().tokens.clone()
    }

    async fn save(&self, pair: &TokenPair) -> Result<()> {
        self.record.write().tokens = Some(pair.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.record.write() = SessionRecord::default();
        Ok(())
    }

    async fn load_profile(&self) -> Option<UserProfile> {
        self.record.read().user.clone()
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.record.write().user = Some(profile.clone());
        Ok(())
    }
}
