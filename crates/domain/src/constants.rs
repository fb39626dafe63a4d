//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Token lifecycle
pub const DEFAULT_REFRESH_THRESHOLD_SECS: u64 = 300;
pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const BEARER_PREFIX: &str = "Bearer ";

// Persisted session record
pub const SESSION_STORAGE_KEY: &str = "belay.session";
pub const SESSION_RECORD_VERSION: u32 = 1;
pub const DEFAULT_SESSION_FILE: &str = "belay-session.json";
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "Belay";

// Backend endpoints
pub const TOKEN_EXCHANGE_PATH: &str = "/api/v1/auth/token";
pub const TOKEN_REFRESH_PATH: &str = "/api/v1/auth/token/refresh";
pub const CURRENT_USER_PATH: &str = "/api/v1/users/me";
pub const POSTS_PATH: &str = "/api/v1/posts";
pub const REPLIES_PATH: &str = "/api/v1/replies";

// HTTP defaults
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_USER_AGENT: &str = concat!("belay/", env!("CARGO_PKG_VERSION"));

// Session event fan-out
pub const SESSION_EVENT_CAPACITY: usize = 16;
