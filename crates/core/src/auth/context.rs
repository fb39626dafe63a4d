//! Shared session context
//!
//! One [`SessionContext`] is created per app instance and handed by `Arc` to
//! the refresher, executor and controller. Observers read the published
//! [`SessionState`] through a `watch` channel and react to login/logout
//! through a `broadcast` stream.

use belay_domain::constants::SESSION_EVENT_CAPACITY;
use belay_domain::{
    CredentialEvent, CredentialPhase, LogoutReason, SessionEvent, SessionState, SessionStatus,
    UserProfile,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

pub struct SessionContext {
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    phase: Mutex<CredentialPhase>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::default());
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self { state, events, phase: Mutex::new(CredentialPhase::NoSession) }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> CredentialPhase {
        *self.phase.lock()
    }

    /// Feed the credential state machine and return the resulting phase.
    pub fn record(&self, event: CredentialEvent) -> CredentialPhase {
        let mut phase = self.phase.lock();
        let next = phase.on(event);
        if next != *phase {
            debug!(from = ?*phase, to = ?next, ?event, "credential phase changed");
        }
        *phase = next;
        next
    }

    /// Publish an authenticated session.
    pub fn begin(&self, user: Option<UserProfile>, event: CredentialEvent) {
        self.record(event);
        self.state.send_replace(SessionState::authenticated(user));
    }

    /// Attach a freshly fetched profile to the current authenticated session.
    pub fn set_user(&self, user: UserProfile) {
        self.state.send_if_modified(|state| {
            if state.is_authenticated() && state.user.as_ref() != Some(&user) {
                state.user = Some(user);
                true
            } else {
                false
            }
        });
    }

    /// Resolve the startup state when no stored session exists.
    pub fn settle_unauthenticated(&self) {
        self.state.send_if_modified(|state| {
            if state.status == SessionStatus::Uninitialized {
                *state = SessionState::unauthenticated();
                true
            } else {
                false
            }
        });
    }

    /// Move to `Unauthenticated`.
    ///
    /// Returns `true` when a live session actually ended; `LoggedOut` is only
    /// broadcast in that case so repeated logouts are indistinguishable from
    /// one.
    pub fn end(&self, reason: LogoutReason) -> bool {
        self.record(CredentialEvent::LoggedOut);
        let mut was_authenticated = false;
        self.state.send_if_modified(|state| {
            was_authenticated = state.is_authenticated();
            if state.status == SessionStatus::Unauthenticated {
                return false;
            }
            *state = SessionState::unauthenticated();
            true
        });

        if was_authenticated {
            info!(reason = reason.as_str(), forced = reason.is_forced(), "session ended");
            self.emit(SessionEvent::LoggedOut { reason });
        }
        was_authenticated
    }

    pub fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn end_broadcasts_once() {
        let context = SessionContext::new();
        let mut events = context.events();
        context.begin(None, CredentialEvent::LoginSucceeded);

        assert!(context.end(LogoutReason::UserRequested));
        assert!(!context.end(LogoutReason::UserRequested));

        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::LoggedOut { reason: LogoutReason::UserRequested }
        );
        assert!(events.try_recv().is_err());
        assert_eq!(context.phase(), CredentialPhase::NoSession);
    }

    #[tokio::test]
    async fn watchers_see_profile_updates() {
        let context = SessionContext::new();
        let mut state = context.subscribe();
        context.begin(None, CredentialEvent::LoginSucceeded);
        let _ = state.borrow_and_update();

        context.set_user(UserProfile {
            id: "u-1".into(),
            nickname: "dyno".into(),
            email: None,
            profile_image_url: None,
            provider: None,
        });

        assert!(state.has_changed().unwrap());
        assert_eq!(state.borrow().user.as_ref().map(|u| u.nickname.as_str()), Some("dyno"));
    }

    #[test]
    fn set_user_is_ignored_without_session() {
        let context = SessionContext::new();
        context.settle_unauthenticated();
        context.set_user(UserProfile {
            id: "u-1".into(),
            nickname: "ghost".into(),
            email: None,
            profile_image_url: None,
            provider: None,
        });

        assert_eq!(context.state(), SessionState::unauthenticated());
    }
}
