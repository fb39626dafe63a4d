//! Session status, credential phase and session events

use serde::{Deserialize, Serialize};

use super::user::{SocialProvider, UserProfile};

/// High-level authentication status shown to the app shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Startup, before the stored session has been inspected.
    #[default]
    Uninitialized,
    Authenticated,
    Unauthenticated,
}

/// Snapshot published to observers whenever the session changes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub status: SessionStatus,
    pub user: Option<UserProfile>,
}

impl SessionState {
    pub fn authenticated(user: Option<UserProfile>) -> Self {
        Self { status: SessionStatus::Authenticated, user }
    }

    pub fn unauthenticated() -> Self {
        Self { status: SessionStatus::Unauthenticated, user: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    UserRequested,
    /// The refresh endpoint answered 401/403.
    RefreshRejected,
    /// A request was rejected again after a successful forced refresh.
    RetryRejected,
}

impl LogoutReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserRequested => "user_requested",
            Self::RefreshRejected => "refresh_rejected",
            Self::RetryRejected => "retry_rejected",
        }
    }

    pub fn is_forced(self) -> bool {
        !matches!(self, Self::UserRequested)
    }
}

/// Broadcast to navigation and other observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    LoggedIn { provider: Option<SocialProvider> },
    LoggedOut { reason: LogoutReason },
}

/// Result of the most recent social login attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoginOutcome {
    Succeeded { provider: SocialProvider },
    Failed { provider: SocialProvider, message: String },
}

/// Per-session credential state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPhase {
    #[default]
    NoSession,
    Valid,
    RefreshInFlight,
    /// A refresh failed while the access token was already past expiry.
    Expired,
}

/// Inputs to [`CredentialPhase::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialEvent {
    LoginSucceeded,
    /// Restored from storage; `token_expired` selects `Valid` or `Expired`.
    Restored { token_expired: bool },
    ThresholdCrossed,
    AuthRejected,
    RefreshSucceeded,
    RefreshRejected,
    RefreshFailed { token_expired: bool },
    LoggedOut,
}

impl CredentialPhase {
    /// Pure transition function.
    ///
    /// `NoSession` only leaves through a login or a restore; events that do
    /// not apply to the current phase leave it unchanged.
    #[must_use]
    pub fn on(self, event: CredentialEvent) -> Self {
        use CredentialEvent as E;

        match (self, event) {
            (_, E::LoggedOut | E::RefreshRejected) => Self::NoSession,
            (_, E::LoginSucceeded) => Self::Valid,
            (Self::NoSession, E::Restored { token_expired }) => {
                if token_expired {
                    Self::Expired
                } else {
                    Self::Valid
                }
            }
            (Self::NoSession, _) => Self::NoSession,
            (Self::Valid | Self::Expired, E::ThresholdCrossed | E::AuthRejected) => {
                Self::RefreshInFlight
            }
            (Self::RefreshInFlight | Self::Expired, E::RefreshSucceeded) => Self::Valid,
            (Self::RefreshInFlight, E::RefreshFailed { token_expired: true }) => Self::Expired,
            (Self::RefreshInFlight, E::RefreshFailed { token_expired: false }) => Self::Valid,
            (phase, _) => phase,
        }
    }

    pub fn has_session(self) -> bool {
        !matches!(self, Self::NoSession)
    }
}
