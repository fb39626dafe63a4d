//! Error types used throughout the workspace

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for configuration, storage and adapter plumbing
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum BelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Belay operations
pub type Result<T> = std::result::Result<T, BelayError>;

/// Errors surfaced to callers of the authenticated request layer.
///
/// Every variant maps to exactly one caller reaction: redirect to login,
/// retry later, or show the server's answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No token pair is stored; the caller must log in.
    #[error("authentication required")]
    AuthenticationRequired,

    /// The session was rejected by the server and has already been torn down.
    #[error("authentication expired: {reason}")]
    AuthenticationExpired { reason: String },

    /// Network or refresh failure unrelated to credential validity.
    #[error("transient failure: {0}")]
    TransientFailure(String),

    /// Non-2xx response from an authenticated endpoint.
    #[error("request failed with HTTP {status}")]
    RequestFailed { status: u16, body: String },

    /// Exchanging the social provider token failed.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// The caller cancelled while waiting.
    #[error("request cancelled")]
    Cancelled,

    #[error("token storage failed: {0}")]
    Storage(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Coarse classification of [`AuthError`] for logging and UI routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCategory {
    /// Session missing or dead; navigate to login.
    Session,
    /// Worth retrying after a delay.
    Transient,
    /// Server answered with an error for this specific request.
    Request,
    /// Caller-side: cancellation or a bad descriptor.
    Caller,
    /// Local persistence failed.
    Storage,
}

impl AuthError {
    pub fn category(&self) -> AuthErrorCategory {
        match self {
            Self::AuthenticationRequired
            | Self::AuthenticationExpired { .. }
            | Self::LoginFailed(_) => AuthErrorCategory::Session,
            Self::TransientFailure(_) => AuthErrorCategory::Transient,
            Self::RequestFailed { .. } => AuthErrorCategory::Request,
            Self::Cancelled | Self::InvalidRequest(_) => AuthErrorCategory::Caller,
            Self::Storage(_) => AuthErrorCategory::Storage,
        }
    }

    /// Whether repeating the same call later may succeed without user action.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::TransientFailure(_) => true,
            Self::RequestFailed { status, .. } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }

    /// Whether the caller should send the user back to the login screen.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::AuthenticationRequired | Self::AuthenticationExpired { .. })
    }
}

/// Outcome of a failed refresh or login exchange.
///
/// `Clone` so that every waiter on a coalesced refresh receives the same
/// failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// The store held no pair when the refresh ran.
    #[error("no session to refresh")]
    NoSession,

    /// The server rejected the credential; the session is gone.
    #[error("token endpoint rejected the credential (HTTP {status})")]
    Rejected { status: u16 },

    /// Recoverable failure; the stored pair is untouched.
    #[error("token endpoint unavailable: {0}")]
    Transient(String),

    #[error("failed to persist refreshed tokens: {0}")]
    Storage(String),
}

impl RefreshError {
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::NoSession | Self::Rejected { .. })
    }
}

impl From<RefreshError> for AuthError {
    fn from(value: RefreshError) -> Self {
        match value {
            RefreshError::NoSession => Self::AuthenticationRequired,
            RefreshError::Rejected { status } => Self::AuthenticationExpired {
                reason: format!("refresh token rejected with HTTP {status}"),
            },
            RefreshError::Transient(message) => Self::TransientFailure(message),
            RefreshError::Storage(message) => Self::Storage(message),
        }
    }
}

/// Kind of transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Body,
    /// The descriptor could not be turned into an HTTP request.
    Request,
    Other,
}

/// Failure to obtain any HTTP response at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind:?} transport error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl From<TransportError> for AuthError {
    fn from(value: TransportError) -> Self {
        match value.kind {
            TransportErrorKind::Request => Self::InvalidRequest(value.message),
            _ => Self::TransientFailure(value.to_string()),
        }
    }
}

impl From<BelayError> for AuthError {
    fn from(value: BelayError) -> Self {
        match value {
            BelayError::Storage(message) => Self::Storage(message),
            BelayError::Network(message) => Self::TransientFailure(message),
            BelayError::InvalidInput(message) | BelayError::Serialization(message) => {
                Self::InvalidRequest(message)
            }
            other => Self::TransientFailure(other.to_string()),
        }
    }
}
