//! Application context - dependency injection container

use std::sync::Arc;

use belay_core::{
    AuthenticatedRequestExecutor, Clock, HttpTransport, ReplyService, SessionContext,
    SessionController, SystemClock, TokenGate, TokenRefresher, TokenStore,
};
use belay_domain::{Config, Result};
use belay_infra::{build_token_store, config, ReqwestTransport};
use tracing::info;

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn TokenStore>,
    pub session: Arc<SessionContext>,
    pub executor: Arc<AuthenticatedRequestExecutor>,
    pub controller: Arc<SessionController>,
}

impl AppContext {
    /// Build the context from configuration found in the environment or on disk.
    ///
    /// # Errors
    /// Configuration, transport and store construction errors.
    pub fn new() -> Result<Self> {
        let config = config::load()?;
        Self::with_config(config)
    }

    /// Build the context from an explicit configuration.
    ///
    /// # Errors
    /// Returns `BelayError::Config` for an invalid base URL and
    /// `BelayError::Storage` when the keychain entry cannot be opened.
    pub fn with_config(config: Config) -> Result<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::from_config(&config.api)?);
        let store = build_token_store(&config.storage)?;
        Ok(Self::with_parts(config, store, transport, Arc::new(SystemClock)))
    }

    /// Wire the session stack around the given adapters.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session = Arc::new(SessionContext::new());
        let gate = Arc::new(TokenGate::new(Arc::clone(&store)));
        let refresher = Arc::new(TokenRefresher::new(
            Arc::clone(&transport),
            gate,
            Arc::clone(&session),
            Arc::clone(&clock),
        ));
        let executor = Arc::new(
            AuthenticatedRequestExecutor::new(
                transport,
                Arc::clone(&refresher),
                Arc::clone(&session),
                Arc::clone(&clock),
            )
            .with_refresh_threshold(config.auth.refresh_threshold()),
        );
        let controller = Arc::new(SessionController::new(
            refresher,
            Arc::clone(&executor),
            Arc::clone(&session),
            clock,
        ));

        info!(
            base_url = %config.api.base_url,
            backend = ?config.storage.backend,
            refresh_threshold_secs = config.auth.refresh_threshold_seconds,
            "application context initialized"
        );

        Self { config, store, session, executor, controller }
    }

    /// Optimistic reply state for one post.
    pub fn replies(&self, post_id: impl Into<String>) -> ReplyService {
        ReplyService::new(Arc::clone(&self.executor), post_id)
    }
}
