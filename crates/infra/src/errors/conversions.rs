//! Conversions from external infrastructure errors into domain errors.

use belay_domain::{BelayError, TransportError, TransportErrorKind};
use keyring::Error as KeyringError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BelayError);

impl From<InfraError> for BelayError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BelayError> for InfraError {
    fn from(value: BelayError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoBelayError {
    fn into_belay(self) -> BelayError;
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → BelayError */
/* -------------------------------------------------------------------------- */

impl IntoBelayError for KeyringError {
    fn into_belay(self) -> BelayError {
        use KeyringError::*;

        let description = self.to_string();

        match self {
            NoEntry => BelayError::Storage("keychain entry not found".into()),
            BadEncoding(_) => {
                BelayError::Storage("session record in keychain is not valid UTF-8".into())
            }
            TooLong(name, limit) => BelayError::Storage(format!(
                "keychain attribute '{name}' exceeds platform limit ({limit})"
            )),
            Invalid(attr, reason) => {
                BelayError::Config(format!("keychain attribute '{attr}' is invalid: {reason}"))
            }
            Ambiguous(entries) => BelayError::Storage(format!(
                "multiple keychain entries matched request ({} results)",
                entries.len()
            )),
            PlatformFailure(err) => BelayError::Storage(format!("keychain platform error: {err}")),
            NoStorageAccess(err) => {
                BelayError::Storage(format!("unable to access secure storage: {err}"))
            }
            _ => BelayError::Storage(description),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        InfraError(value.into_belay())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error / serde_json::Error → BelayError */
/* -------------------------------------------------------------------------- */

impl IntoBelayError for std::io::Error {
    fn into_belay(self) -> BelayError {
        match self.kind() {
            std::io::ErrorKind::PermissionDenied => {
                BelayError::Storage(format!("permission denied: {self}"))
            }
            _ => BelayError::Storage(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_belay())
    }
}

impl From<tempfile::PersistError> for InfraError {
    fn from(value: tempfile::PersistError) -> Self {
        InfraError(value.error.into_belay())
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(BelayError::Serialization(value.to_string()))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BelayError / TransportError */
/* -------------------------------------------------------------------------- */

impl IntoBelayError for HttpError {
    fn into_belay(self) -> BelayError {
        if self.is_builder() {
            return BelayError::Config(format!("invalid HTTP client configuration: {self}"));
        }
        BelayError::Network(transport_error(&self).message)
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_belay())
    }
}

/// Classify a reqwest failure for the transport port.
///
/// Status codes are never errors at this layer; only failures to obtain a
/// response end up here.
pub fn transport_error(err: &HttpError) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(TransportErrorKind::Timeout, "HTTP request timed out");
    }

    #[cfg(not(target_arch = "wasm32"))]
    if err.is_connect() {
        return TransportError::new(TransportErrorKind::Connect, "HTTP connection failure");
    }

    if err.is_builder() {
        return TransportError::new(TransportErrorKind::Request, err.to_string());
    }

    if err.is_body() || err.is_decode() {
        return TransportError::new(TransportErrorKind::Body, err.to_string());
    }

    TransportError::new(TransportErrorKind::Other, err.to_string())
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
