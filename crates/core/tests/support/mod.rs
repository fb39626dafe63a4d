//! Shared test helpers for `belay-core` integration tests.
//!
//! In-memory mocks for the token store, the HTTP transport and the clock,
//! plus a [`Harness`] that wires the full session stack around them.

#![allow(dead_code)]

pub mod clock;
pub mod store;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use belay_core::{
    AuthenticatedRequestExecutor, SessionContext, SessionController, TokenGate, TokenRefresher,
};
use belay_domain::{CredentialEvent, TokenPair};

pub use clock::ManualClock;
pub use store::MockTokenStore;
pub use transport::{token_response, MockTransport};

/// Fixed "now" used by every test (2023-11-14T22:13:20Z).
pub const NOW: i64 = 1_700_000_000_000;
pub const MINUTE_MS: i64 = 60_000;
pub const THRESHOLD: Duration = Duration::from_secs(300);

/// Fully wired session stack over mocks.
pub struct Harness {
    pub store: Arc<MockTokenStore>,
    pub transport: Arc<MockTransport>,
    pub clock: Arc<ManualClock>,
    pub context: Arc<SessionContext>,
    pub gate: Arc<TokenGate>,
    pub refresher: Arc<TokenRefresher>,
    pub executor: Arc<AuthenticatedRequestExecutor>,
    pub controller: SessionController,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MockTokenStore::default());
        let transport = Arc::new(MockTransport::default());
        let clock = Arc::new(ManualClock::new(NOW));
        let context = Arc::new(SessionContext::new());
        let gate = Arc::new(TokenGate::new(store.clone()));
        let refresher = Arc::new(TokenRefresher::new(
            transport.clone(),
            gate.clone(),
            context.clone(),
            clock.clone(),
        ));
        let executor = Arc::new(
            AuthenticatedRequestExecutor::new(
                transport.clone(),
                refresher.clone(),
                context.clone(),
                clock.clone(),
            )
            .with_refresh_threshold(THRESHOLD),
        );
        let controller =
            SessionController::new(refresher.clone(), executor.clone(), context.clone(), clock.clone());

        Self { store, transport, clock, context, gate, refresher, executor, controller }
    }

    /// Harness with an authenticated session holding `pair`.
    pub async fn with_session(pair: TokenPair) -> Self {
        let harness = Self::new();
        harness.gate.install(&pair).await.expect("install session");
        harness.context.begin(None, CredentialEvent::LoginSucceeded);
        harness.store.reset_counters();
        harness
    }
}

/// Pair named `gen` expiring `minutes` after [`NOW`].
pub fn pair_expiring_in(gen: &str, minutes: i64) -> TokenPair {
    TokenPair::new(format!("access-{gen}"), format!("refresh-{gen}"), NOW + minutes * MINUTE_MS)
}
