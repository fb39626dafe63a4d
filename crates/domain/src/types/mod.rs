//! Domain data types

pub mod http;
pub mod reply;
pub mod session;
pub mod token;
pub mod user;

pub use http::{ApiRequest, ApiResponse, HttpMethod, RequestBody};
pub use reply::{Reply, ReplyDraft, ReplyId};
pub use session::{
    CredentialEvent, CredentialPhase, LoginOutcome, LogoutReason, SessionEvent, SessionState,
    SessionStatus,
};
pub use token::TokenPair;
pub use user::{SocialProvider, UserProfile};
