use std::time::{Duration, Instant};

use belay_domain::{AuthError, BelayError, LoggingConfig, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `BELAY_LOG` style directives come from [`LoggingConfig::filter`]; JSON
/// output is selected with [`LoggingConfig::json`].
///
/// # Errors
/// Returns `BelayError::Config` for an invalid filter or when a subscriber
/// is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| BelayError::Config(format!("Invalid log filter '{}': {e}", config.filter)))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| BelayError::Config(format!("Failed to install tracing subscriber: {e}")))
}

/// Run `f` under a scoped subscriber so startup work such as config loading
/// is logged before [`init_tracing`] installs the configured one.
///
/// Filters with `BELAY_LOG` when it parses, `info` otherwise.
pub fn with_startup_tracing<T>(f: impl FnOnce() -> T) -> T {
    let filter = EnvFilter::try_from_env("BELAY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(LoggingConfig::default().filter));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).finish();
    tracing::subscriber::with_default(subscriber, f)
}

/// Log the outcome of a command execution with structured fields.
///
/// # Parameters
/// * `command` - Logical command identifier (e.g. `"session::login"`).
/// * `elapsed` - Duration the command execution took.
/// * `error` - Failure label from [`error_label`], `None` on success.
///
/// Callers must avoid forwarding tokens or other credentials in `command`.
#[inline]
pub fn log_command_execution(command: &str, elapsed: Duration, error: Option<&'static str>) {
    let duration_ms = elapsed.as_millis() as u64;

    match error {
        None => info!(command, duration_ms, "command_execution_success"),
        Some(error) => warn!(command, duration_ms, error, "command_execution_failure"),
    }
}

/// Log a finished command started at `start` and hand its result back.
pub fn log_command_result<T>(
    command: &str,
    start: Instant,
    result: std::result::Result<T, AuthError>,
) -> std::result::Result<T, AuthError> {
    log_command_execution(command, start.elapsed(), result.as_ref().err().map(error_label));
    result
}

/// Convert an `AuthError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &AuthError) -> &'static str {
    match error {
        AuthError::AuthenticationRequired => "authentication_required",
        AuthError::AuthenticationExpired { .. } => "authentication_expired",
        AuthError::TransientFailure(_) => "transient",
        AuthError::RequestFailed { .. } => "request_failed",
        AuthError::LoginFailed(_) => "login_failed",
        AuthError::Cancelled => "cancelled",
        AuthError::Storage(_) => "storage",
        AuthError::InvalidRequest(_) => "invalid_request",
    }
}
