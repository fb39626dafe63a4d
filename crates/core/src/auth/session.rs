//! Session controller - login, logout and startup hydration

use std::sync::Arc;

use belay_domain::constants::CURRENT_USER_PATH;
use belay_domain::{
    ApiRequest, AuthError, CredentialEvent, CredentialPhase, LoginOutcome, LogoutReason,
    SessionEvent, SessionState, SocialProvider, UserProfile,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use super::context::SessionContext;
use super::executor::AuthenticatedRequestExecutor;
use super::ports::Clock;
use super::refresher::TokenRefresher;

/// High-level session orchestrator used by the app shell.
///
/// Forced logouts triggered inside the refresher or executor go through the
/// same [`SessionContext`] this controller publishes, so observers see a
/// single stream of transitions regardless of who ended the session.
pub struct SessionController {
    refresher: Arc<TokenRefresher>,
    executor: Arc<AuthenticatedRequestExecutor>,
    context: Arc<SessionContext>,
    clock: Arc<dyn Clock>,
    last_login: Mutex<Option<LoginOutcome>>,
}

impl SessionController {
    pub fn new(
        refresher: Arc<TokenRefresher>,
        executor: Arc<AuthenticatedRequestExecutor>,
        context: Arc<SessionContext>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { refresher, executor, context, clock, last_login: Mutex::new(None) }
    }

    /// Hydrate the session from storage at startup.
    ///
    /// A stored pair marks the session authenticated even if it has expired;
    /// the next request refreshes it. The cached profile is published first
    /// and then re-fetched.
    pub async fn restore(&self) -> SessionState {
        let gate = self.refresher.gate();
        match gate.current().await {
            None => {
                info!("no stored session");
                self.context.settle_unauthenticated();
            }
            Some(pair) => {
                let token_expired = pair.is_expired(self.clock.now_millis());
                let cached = gate.cached_profile().await;
                info!(token_expired, cached_profile = cached.is_some(), "restored stored session");
                self.context.begin(cached, CredentialEvent::Restored { token_expired });

                if let Err(err) = self.refresh_profile().await {
                    warn!(error = %err, "could not refresh profile after restore");
                }
            }
        }
        self.context.state()
    }

    /// Exchange a social provider token and start a session.
    ///
    /// The outcome of the previous attempt is cleared before the exchange
    /// starts. A failed profile fetch is logged and does not undo the login.
    ///
    /// # Errors
    /// - [`AuthError::LoginFailed`] when the exchange fails for any reason.
    /// - [`AuthError::Storage`] when the new pair could not be persisted.
    #[instrument(skip(self, provider_token), fields(provider = %provider))]
    pub async fn login(
        &self,
        provider_token: &str,
        provider: SocialProvider,
    ) -> Result<SessionState, AuthError> {
        *self.last_login.lock() = None;

        let pair = match self.refresher.exchange_provider_token(provider_token, provider).await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "social login exchange failed");
                self.record_failed_login(provider, err.to_string());
                return Err(AuthError::LoginFailed(err.to_string()));
            }
        };

        if let Err(err) = self.refresher.gate().install(&pair).await {
            warn!(error = %err, "failed to persist login tokens");
            self.record_failed_login(provider, err.to_string());
            return Err(AuthError::Storage(err.to_string()));
        }

        self.context.begin(None, CredentialEvent::LoginSucceeded);
        self.context.emit(SessionEvent::LoggedIn { provider: Some(provider) });
        *self.last_login.lock() = Some(LoginOutcome::Succeeded { provider });
        info!("login succeeded");

        if let Err(err) = self.refresh_profile().await {
            warn!(error = %err, "could not fetch profile after login");
        }
        Ok(self.context.state())
    }

    /// End the session. Always succeeds; calling it twice is the same as once.
    pub async fn logout(&self) {
        *self.last_login.lock() = None;
        if !self.refresher.invalidate_session(LogoutReason::UserRequested, None).await {
            debug!("logout without an active session");
        }
    }

    /// Fetch the signed-in user's profile and publish it.
    ///
    /// # Errors
    /// Any [`AuthError`] from the authenticated request.
    pub async fn refresh_profile(&self) -> Result<UserProfile, AuthError> {
        let gate = self.refresher.gate();
        let epoch = gate.epoch();
        let profile: UserProfile =
            self.executor.execute_json(ApiRequest::get(CURRENT_USER_PATH)).await?;

        self.context.set_user(profile.clone());
        if let Err(err) = gate.cache_profile(epoch, &profile).await {
            warn!(error = %err, "failed to cache user profile");
        }
        Ok(profile)
    }

    pub fn state(&self) -> SessionState {
        self.context.state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.context.state().is_authenticated()
    }

    pub fn phase(&self) -> CredentialPhase {
        self.context.phase()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.context.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.context.events()
    }

    /// Outcome of the latest login attempt; `None` once a new attempt starts
    /// or after logout.
    pub fn last_login_outcome(&self) -> Option<LoginOutcome> {
        self.last_login.lock().clone()
    }

    pub fn executor(&self) -> &Arc<AuthenticatedRequestExecutor> {
        &self.executor
    }

    /// An existing session is left untouched by a failed attempt.
    fn record_failed_login(&self, provider: SocialProvider, message: String) {
        self.context.settle_unauthenticated();
        *self.last_login.lock() = Some(LoginOutcome::Failed { provider, message });
    }
}
