//! Port interfaces for the token lifecycle
//!
//! These traits define the boundaries between the session core and the
//! infrastructure that persists tokens and moves bytes over the network.

use async_trait::async_trait;
use belay_domain::{ApiRequest, ApiResponse, Result, TokenPair, TransportError, UserProfile};

/// Durable home of the single session record.
///
/// Implementations must make `save` atomic from a reader's perspective and
/// must treat unreadable records as absent.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read the persisted pair; `None` when empty or corrupt.
    async fn load(&self) -> Option<TokenPair>;

    /// Overwrite the persisted pair.
    async fn save(&self, pair: &TokenPair) -> Result<()>;

    /// Remove the record, including any cached profile.
    async fn clear(&self) -> Result<()>;

    /// Cached profile stored alongside the tokens, if the backend keeps one.
    async fn load_profile(&self) -> Option<UserProfile> {
        None
    }

    async fn save_profile(&self, _profile: &UserProfile) -> Result<()> {
        Ok(())
    }
}

/// Sends a fully-formed request and returns whatever the server answered.
///
/// Non-2xx statuses are responses, not errors; only failures to obtain a
/// response are reported as [`TransportError`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> std::result::Result<ApiResponse, TransportError>;
}

/// Wall clock in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}
