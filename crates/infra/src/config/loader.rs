//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `BELAY_API_BASE_URL` is not set, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//! 5. Without any config file, the built-in defaults are used
//!
//! ## Environment Variables
//! - `BELAY_API_BASE_URL`: Backend base URL (required for env loading)
//! - `BELAY_API_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `BELAY_API_MAX_ATTEMPTS`: Attempts for idempotent requests
//! - `BELAY_REFRESH_THRESHOLD_SECS`: Proactive refresh lookahead in seconds
//! - `BELAY_TOKEN_STORE`: `file`, `keychain` or `memory`
//! - `BELAY_TOKEN_STORE_PATH`: Session file path
//! - `BELAY_KEYCHAIN_SERVICE`: Keychain service name
//! - `BELAY_LOG`: `EnvFilter` directives
//! - `BELAY_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./belay.json` or `./belay.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use belay_domain::{BelayError, Config, Result, StorageBackend};

const BASE_URL_VAR: &str = "BELAY_API_BASE_URL";

/// Load configuration with automatic fallback strategy
///
/// The file and default fallbacks only apply when `BELAY_API_BASE_URL` is
/// unset. Once it is set, the environment is authoritative.
///
/// # Errors
/// Returns `BelayError::Config` if an environment value or the config file
/// found on disk is invalid.
pub fn load() -> Result<Config> {
    if std::env::var_os(BASE_URL_VAR).is_some() {
        let config = load_from_env()?;
        tracing::info!("Configuration loaded from environment variables");
        return Ok(config);
    }

    tracing::debug!("{BASE_URL_VAR} not set, trying config file");
    match probe_config_paths() {
        Some(path) => load_from_file(Some(path)),
        None => {
            tracing::info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

/// Load configuration from environment variables
///
/// `BELAY_API_BASE_URL` must be present; every other variable falls back to
/// its default when unset.
///
/// # Errors
/// Returns `BelayError::Config` if the base URL is missing or a value does
/// not parse.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.api.base_url = env_var(BASE_URL_VAR)?;
    if let Some(timeout) = env_parse::<u64>("BELAY_API_TIMEOUT_SECS", "timeout")? {
        config.api.timeout_seconds = timeout;
    }
    if let Some(attempts) = env_parse::<usize>("BELAY_API_MAX_ATTEMPTS", "max attempts")? {
        config.api.max_attempts = attempts;
    }
    if let Some(threshold) =
        env_parse::<u64>("BELAY_REFRESH_THRESHOLD_SECS", "refresh threshold")?
    {
        config.auth.refresh_threshold_seconds = threshold;
    }

    if let Ok(backend) = std::env::var("BELAY_TOKEN_STORE") {
        config.storage.backend = StorageBackend::from_str(&backend)?;
    }
    if let Ok(path) = std::env::var("BELAY_TOKEN_STORE_PATH") {
        config.storage.path = path;
    }
    if let Ok(service) = std::env::var("BELAY_KEYCHAIN_SERVICE") {
        config.storage.keychain_service = service;
    }

    if let Ok(filter) = std::env::var("BELAY_LOG") {
        config.logging.filter = filter;
    }
    config.logging.json = env_bool("BELAY_LOG_JSON", config.logging.json);

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `BelayError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BelayError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BelayError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BelayError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BelayError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BelayError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(BelayError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// Returns the first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidates_in(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidates_in(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidates_in(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("belay.json"),
        dir.join("belay.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `BelayError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| BelayError::Config(format!("Missing required environment variable: {}", key)))
}

/// Parse an optional environment variable
fn env_parse<T: FromStr>(key: &str, label: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| BelayError::Config(format!("Invalid {label}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
