//! Authenticated request execution
//!
//! Every authenticated call in the app goes through
//! [`AuthenticatedRequestExecutor`]. It reads the stored pair for each
//! request, refreshes proactively near expiry, attaches the bearer header
//! and performs at most one forced refresh-and-retry when the server rejects
//! the credential.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use belay_domain::constants::DEFAULT_REFRESH_THRESHOLD_SECS;
use belay_domain::{
    ApiRequest, ApiResponse, AuthError, CredentialEvent, CredentialPhase, LogoutReason,
    RefreshError, TokenPair,
};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use super::context::SessionContext;
use super::ports::{Clock, HttpTransport};
use super::refresher::{RefreshMode, TokenRefresher};
use super::single_flight::SingleFlight;

pub struct AuthenticatedRequestExecutor {
    transport: Arc<dyn HttpTransport>,
    refresher: Arc<TokenRefresher>,
    context: Arc<SessionContext>,
    clock: Arc<dyn Clock>,
    refresh_threshold: Duration,
    flight: SingleFlight<TokenPair, RefreshError>,
}

impl AuthenticatedRequestExecutor {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        refresher: Arc<TokenRefresher>,
        context: Arc<SessionContext>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            refresher,
            context,
            clock,
            refresh_threshold: Duration::from_secs(DEFAULT_REFRESH_THRESHOLD_SECS),
            flight: SingleFlight::new(|message| {
                RefreshError::Transient(format!("refresh task aborted: {message}"))
            }),
        }
    }

    /// Override the proactive refresh lookahead.
    #[must_use]
    pub fn with_refresh_threshold(mut self, threshold: Duration) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    pub fn refresh_threshold(&self) -> Duration {
        self.refresh_threshold
    }

    pub fn phase(&self) -> CredentialPhase {
        self.context.phase()
    }

    /// Access token that is safe to attach right now.
    ///
    /// # Errors
    /// - [`AuthError::AuthenticationRequired`] when no pair is stored.
    /// - [`AuthError::AuthenticationExpired`] when the refresh was rejected.
    /// - [`AuthError::TransientFailure`] when the refresh failed and the
    ///   current token is already past expiry.
    pub async fn get_valid_token(&self) -> Result<String, AuthError> {
        self.valid_pair(None).await.map(|pair| pair.access_token)
    }

    /// Refresh regardless of the threshold, after `rejected_access_token`
    /// was refused by the server.
    ///
    /// Joins a refresh that is already running instead of starting another.
    ///
    /// # Errors
    /// See [`Self::get_valid_token`].
    pub async fn force_refresh(&self, rejected_access_token: &str) -> Result<String, AuthError> {
        self.context.record(CredentialEvent::AuthRejected);
        let pair = self.forced_refresh(rejected_access_token, None).await?;
        Ok(pair.access_token)
    }

    /// Send `request` with credentials attached.
    ///
    /// On 401/403 exactly one forced refresh and one retry are performed. A
    /// second rejection ends the session.
    ///
    /// # Errors
    /// - [`AuthError::RequestFailed`] for any non-2xx answer other than a
    ///   credential rejection.
    /// - [`AuthError::AuthenticationExpired`] when the credential could not
    ///   be renewed; the session is already torn down.
    /// - [`AuthError::Cancelled`] when the request's cancellation token
    ///   fired. A refresh started on its behalf keeps running.
    #[instrument(skip(self, request), fields(method = %request.method, target = %request.target))]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        let cancel = request.cancellation().cloned();
        let cancel = cancel.as_ref();
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(AuthError::Cancelled);
        }

        let epoch = self.refresher.gate().epoch();
        let pair = self.valid_pair(cancel).await?;
        let response = self.send(&request, &pair.access_token, cancel).await?;
        if !response.is_auth_failure() {
            return finish(response);
        }

        warn!(status = response.status, "credential rejected; forcing token refresh");
        self.context.record(CredentialEvent::AuthRejected);
        let refreshed = self.forced_refresh(&pair.access_token, cancel).await?;

        let retry = self.send(&request, &refreshed.access_token, cancel).await?;
        if retry.is_auth_failure() {
            warn!(status = retry.status, "credential rejected after refresh; ending session");
            self.refresher.invalidate_session(LogoutReason::RetryRejected, Some(epoch)).await;
            return Err(AuthError::AuthenticationExpired {
                reason: format!("request rejected with HTTP {} after token refresh", retry.status),
            });
        }

        finish(retry)
    }

    /// [`Self::execute`] followed by JSON decoding of a 2xx body.
    ///
    /// # Errors
    /// As [`Self::execute`]; an undecodable body is reported as
    /// [`AuthError::RequestFailed`] with the original status and body.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, AuthError> {
        let response = self.execute(request).await?;
        response.json().map_err(|err| {
            debug!(error = %err, status = response.status, "response body did not decode");
            AuthError::RequestFailed { status: response.status, body: response.text() }
        })
    }

    async fn valid_pair(&self, cancel: Option<&CancellationToken>) -> Result<TokenPair, AuthError> {
        let pair = self.refresher.gate().current().await.ok_or(AuthError::AuthenticationRequired)?;
        let now = self.clock.now_millis();
        if !pair.expires_within(now, self.refresh_threshold) {
            return Ok(pair);
        }

        debug!(expires_in_ms = pair.millis_until_expiry(now), "access token near expiry; refreshing");
        self.context.record(CredentialEvent::ThresholdCrossed);
        let mode = RefreshMode::Proactive { threshold: self.refresh_threshold };

        match self.cancellable(cancel, self.coalesced_refresh(mode)).await? {
            Ok(refreshed) => Ok(refreshed),
            Err(RefreshError::Transient(message)) if !pair.is_expired(self.clock.now_millis()) => {
                warn!(%message, "proactive refresh failed; using current token until it expires");
                Ok(pair)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Coalesced refresh that must not hand back `rejected`.
    ///
    /// A flight joined mid-way may have been started proactively and can
    /// resolve to the rejected token; one forced flight follows in that case.
    async fn forced_refresh(
        &self,
        rejected: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<TokenPair, AuthError> {
        let mode = RefreshMode::Forced { rejected_access_token: rejected.to_string() };
        let pair = self.cancellable(cancel, self.coalesced_refresh(mode.clone())).await??;
        if pair.access_token != rejected {
            return Ok(pair);
        }

        debug!("joined refresh returned the rejected token; refreshing again");
        Ok(self.cancellable(cancel, self.coalesced_refresh(mode)).await??)
    }

    async fn coalesced_refresh(&self, mode: RefreshMode) -> Result<TokenPair, RefreshError> {
        let refresher = Arc::clone(&self.refresher);
        self.flight.run(move || async move { refresher.refresh_current(mode).await }).await
    }

    async fn send(
        &self,
        request: &ApiRequest,
        access_token: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<ApiResponse, AuthError> {
        let signed = request.authorized(access_token);
        let response = self.cancellable(cancel, self.transport.send(&signed)).await??;
        debug!(status = response.status, "received response");
        Ok(response)
    }

    async fn cancellable<F: Future>(
        &self,
        cancel: Option<&CancellationToken>,
        future: F,
    ) -> Result<F::Output, AuthError> {
        match cancel {
            None => Ok(future.await),
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(AuthError::Cancelled),
                output = future => Ok(output),
            },
        }
    }
}

fn finish(response: ApiResponse) -> Result<ApiResponse, AuthError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(AuthError::RequestFailed { status: response.status, body: response.text() })
    }
}
