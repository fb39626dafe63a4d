//! # Belay Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for token storage, transport and time
//! - The token lifecycle: gate, refresher, single-flight, executor
//! - The session controller and its observable context
//! - Reply state reduction and optimistic mutations
//!
//! ## Architecture Principles
//! - Only depends on `belay-domain`
//! - No storage, HTTP client, or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod auth;
pub mod replies;

// Re-export specific items to avoid ambiguity
pub use auth::{
    AuthenticatedRequestExecutor, Clock, HttpTransport, RefreshMode, SessionContext,
    SessionController, SingleFlight, SystemClock, TokenGate, TokenRefresher, TokenStore,
};
pub use replies::{reduce, OptimisticMutation, ReducerStore, ReplyAction, ReplyService, ReplyState};
