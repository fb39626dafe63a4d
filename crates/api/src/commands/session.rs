//! Session commands
//!
//! The surface collaborators (UI screens, feature modules) use to sign in,
//! sign out and make authenticated calls. None of them implement refresh
//! logic themselves; everything goes through the executor.

use std::time::Instant;

use belay_domain::{
    ApiRequest, ApiResponse, AuthError, HttpMethod, SessionState, SocialProvider,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;
use crate::utils::logging::{log_command_execution, log_command_result};

/// Options for [`auth_fetch`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FetchOptions {
    pub method: Option<HttpMethod>,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    #[serde(skip)]
    pub cancel: Option<CancellationToken>,
}

// =============================================================================
// Command 1: login
// =============================================================================

/// Exchange a social provider token for a Belay session.
///
/// `provider` is the lowercase provider name (`kakao`, `naver`, `google`,
/// `apple`).
pub async fn login(
    ctx: &AppContext,
    provider: &str,
    provider_token: &str,
) -> Result<SessionState, AuthError> {
    let command_name = "session::login";
    let start = Instant::now();

    let result = match provider.parse::<SocialProvider>() {
        Ok(provider) => ctx.controller.login(provider_token, provider).await,
        Err(err) => Err(err.into()),
    };

    log_command_result(command_name, start, result)
}

// =============================================================================
// Command 2: logout
// =============================================================================

/// End the session. Safe to call repeatedly.
pub async fn logout(ctx: &AppContext) -> SessionState {
    let start = Instant::now();
    ctx.controller.logout().await;
    log_command_execution("session::logout", start.elapsed(), None);
    ctx.controller.state()
}

// =============================================================================
// Command 3: is_authenticated
// =============================================================================

pub fn is_authenticated(ctx: &AppContext) -> bool {
    ctx.controller.is_authenticated()
}

// =============================================================================
// Command 4: get_valid_token
// =============================================================================

/// A usable access token, refreshed first when it is close to expiry.
pub async fn get_valid_token(ctx: &AppContext) -> Result<String, AuthError> {
    let start = Instant::now();
    let result = ctx.executor.get_valid_token().await;
    log_command_result("session::get_valid_token", start, result)
}

// =============================================================================
// Command 5: auth_fetch
// =============================================================================

/// Authenticated request to `url` (path or absolute URL).
///
/// Returns the 2xx response; every failure is an [`AuthError`].
pub async fn auth_fetch(
    ctx: &AppContext,
    url: &str,
    options: FetchOptions,
) -> Result<ApiResponse, AuthError> {
    let start = Instant::now();

    let mut request = ApiRequest::new(options.method.unwrap_or(HttpMethod::Get), url);
    for (name, value) in options.headers {
        request = request.header(name, value);
    }
    for (name, value) in options.query {
        request = request.query(name, value);
    }
    if let Some(body) = options.body {
        request = request.json_value(body);
    }
    if let Some(cancel) = options.cancel {
        request = request.with_cancellation(cancel);
    }

    let result = ctx.executor.execute(request).await;
    log_command_result("session::auth_fetch", start, result)
}
