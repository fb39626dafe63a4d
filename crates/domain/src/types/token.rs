//! Token pair issued by the backend

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::RefreshError;

/// Access/refresh credential pair with its absolute expiry.
///
/// The wire and storage form is `{ accessToken, refreshToken, expiresAt }`
/// with `expiresAt` in epoch milliseconds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl TokenPair {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: i64,
    ) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into(), expires_at }
    }

    /// Milliseconds left before expiry; negative once expired.
    pub fn millis_until_expiry(&self, now_ms: i64) -> i64 {
        self.expires_at.saturating_sub(now_ms)
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at <= now_ms
    }

    /// True when at most `threshold` remains before expiry.
    pub fn expires_within(&self, now_ms: i64, threshold: Duration) -> bool {
        let threshold_ms = i64::try_from(threshold.as_millis()).unwrap_or(i64::MAX);
        self.millis_until_expiry(now_ms) <= threshold_ms
    }

    /// Reject pairs the server issued with an expiry already in the past.
    ///
    /// # Errors
    /// Returns [`RefreshError::Transient`] when `expires_at <= now_ms`.
    pub fn ensure_fresh(self, now_ms: i64) -> Result<Self, RefreshError> {
        if self.is_expired(now_ms) {
            return Err(RefreshError::Transient(format!(
                "token endpoint issued a pair that expired {} ms ago",
                now_ms.saturating_sub(self.expires_at)
            )));
        }
        Ok(self)
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
