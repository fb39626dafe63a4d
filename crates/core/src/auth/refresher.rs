//! Token endpoint calls and their classification
//!
//! [`TokenRefresher`] is the only component that talks to the token
//! endpoints. It decides whether a failure is recoverable and, for the
//! unrecoverable ones, tears the session down before returning so that no
//! caller can reuse a dead credential.

use std::sync::Arc;
use std::time::Duration;

use belay_domain::constants::{TOKEN_EXCHANGE_PATH, TOKEN_REFRESH_PATH};
use belay_domain::{
    ApiRequest, CredentialEvent, LogoutReason, RefreshError, SocialProvider, TokenPair,
};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::context::SessionContext;
use super::gate::TokenGate;
use super::ports::{Clock, HttpTransport};

/// Why a refresh is being attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshMode {
    /// The access token is within `threshold` of expiry.
    Proactive { threshold: Duration },
    /// The server rejected `rejected_access_token` on a request.
    Forced { rejected_access_token: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a> {
    social_token: &'a str,
    provider: SocialProvider,
}

pub struct TokenRefresher {
    transport: Arc<dyn HttpTransport>,
    gate: Arc<TokenGate>,
    context: Arc<SessionContext>,
    clock: Arc<dyn Clock>,
}

impl TokenRefresher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        gate: Arc<TokenGate>,
        context: Arc<SessionContext>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { transport, gate, context, clock }
    }

    /// Exchange `current`'s refresh token for a new pair and persist it.
    ///
    /// # Errors
    /// - [`RefreshError::Rejected`] on HTTP 401/403. The store has been
    ///   cleared and the session ended by the time this returns.
    /// - [`RefreshError::Transient`] on any other failure; the store is
    ///   untouched.
    /// - [`RefreshError::Storage`] when the new pair could not be saved.
    #[instrument(skip_all)]
    pub async fn refresh(&self, current: &TokenPair) -> Result<TokenPair, RefreshError> {
        let epoch = self.gate.epoch();
        self.refresh_in_epoch(epoch, current).await
    }

    /// Body of a coalesced refresh; runs inside the single flight.
    ///
    /// Reloads the stored pair first and skips the network call when another
    /// flight has already produced a usable one.
    ///
    /// # Errors
    /// [`RefreshError::NoSession`] when nothing is stored, otherwise as
    /// [`Self::refresh`].
    pub async fn refresh_current(&self, mode: RefreshMode) -> Result<TokenPair, RefreshError> {
        let epoch = self.gate.epoch();
        let Some(current) = self.gate.current().await else {
            return Err(RefreshError::NoSession);
        };

        let now = self.clock.now_millis();
        let usable = match &mode {
            RefreshMode::Proactive { threshold } => !current.expires_within(now, *threshold),
            RefreshMode::Forced { rejected_access_token } => {
                current.access_token != *rejected_access_token && !current.is_expired(now)
            }
        };
        if usable {
            debug!(?mode, "stored tokens already rotated; skipping refresh");
            self.context.record(CredentialEvent::RefreshSucceeded);
            return Ok(current);
        }

        self.refresh_in_epoch(epoch, &current).await
    }

    /// Trade a social provider token for the app's own token pair.
    ///
    /// Does not touch the store; the caller installs the pair.
    ///
    /// # Errors
    /// Any failure; callers treat all of them as unrecoverable since there
    /// is no session to fall back to.
    #[instrument(skip(self, provider_token), fields(provider = %provider))]
    pub async fn exchange_provider_token(
        &self,
        provider_token: &str,
        provider: SocialProvider,
    ) -> Result<TokenPair, RefreshError> {
        let request = ApiRequest::post(TOKEN_EXCHANGE_PATH)
            .json(&ExchangeRequest { social_token: provider_token, provider })
            .map_err(|e| RefreshError::Transient(e.to_string()))?;

        let pair = self.call_token_endpoint(&request).await?;
        info!(expires_in_ms = pair.millis_until_expiry(self.clock.now_millis()), "provider token exchanged");
        Ok(pair)
    }

    /// Clear the store and end the session.
    ///
    /// With `Some(epoch)` nothing happens if that session was already
    /// replaced. Returns whether a live session ended.
    pub async fn invalidate_session(&self, reason: LogoutReason, epoch: Option<u64>) -> bool {
        match self.gate.revoke(epoch).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(err) => warn!(error = %err, "failed to clear token store; ending session anyway"),
        }
        self.context.end(reason)
    }

    pub fn gate(&self) -> &Arc<TokenGate> {
        &self.gate
    }

    async fn refresh_in_epoch(
        &self,
        epoch: u64,
        current: &TokenPair,
    ) -> Result<TokenPair, RefreshError> {
        let request = ApiRequest::post(TOKEN_REFRESH_PATH)
            .json(&RefreshRequest { refresh_token: &current.refresh_token })
            .map_err(|e| RefreshError::Transient(e.to_string()))?;

        match self.call_token_endpoint(&request).await {
            Ok(pair) => self.persist(epoch, current, pair).await,
            Err(RefreshError::Rejected { status }) => {
                warn!(status, "refresh token rejected; forcing logout");
                if self.gate.epoch() == epoch {
                    self.context.record(CredentialEvent::RefreshRejected);
                }
                self.invalidate_session(LogoutReason::RefreshRejected, Some(epoch)).await;
                Err(RefreshError::Rejected { status })
            }
            Err(err) => {
                let token_expired = current.is_expired(self.clock.now_millis());
                warn!(error = %err, token_expired, "token refresh failed; keeping session");
                self.context.record(CredentialEvent::RefreshFailed { token_expired });
                Err(err)
            }
        }
    }

    async fn persist(
        &self,
        epoch: u64,
        current: &TokenPair,
        pair: TokenPair,
    ) -> Result<TokenPair, RefreshError> {
        match self.gate.replace(epoch, &pair).await {
            Ok(true) => {
                self.context.record(CredentialEvent::RefreshSucceeded);
                info!(
                    expires_in_ms = pair.millis_until_expiry(self.clock.now_millis()),
                    "access token refreshed"
                );
                Ok(pair)
            }
            // Login or logout happened meanwhile; whatever is stored now wins.
            Ok(false) => self.gate.current().await.ok_or(RefreshError::NoSession),
            Err(err) => {
                let token_expired = current.is_expired(self.clock.now_millis());
                self.context.record(CredentialEvent::RefreshFailed { token_expired });
                Err(RefreshError::Storage(err.to_string()))
            }
        }
    }

    async fn call_token_endpoint(&self, request: &ApiRequest) -> Result<TokenPair, RefreshError> {
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| RefreshError::Transient(e.to_string()))?;

        match response.status {
            200..=299 => {
                let pair: TokenPair =
                    response.json().map_err(|e| RefreshError::Transient(e.to_string()))?;
                pair.ensure_fresh(self.clock.now_millis())
            }
            401 | 403 => Err(RefreshError::Rejected { status: response.status }),
            status => Err(RefreshError::Transient(format!("token endpoint returned HTTP {status}"))),
        }
    }
}
