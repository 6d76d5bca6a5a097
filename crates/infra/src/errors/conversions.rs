//! Conversions from external infrastructure errors into domain errors.

use keyring::Error as KeyringError;
use reqwest::Error as HttpError;
use thiserror::Error;
use vidsum_domain::VidSumError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(#[from] pub VidSumError);

impl From<InfraError> for VidSumError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoVidSumError {
    fn into_vidsum(self) -> VidSumError;
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → VidSumError */
/* -------------------------------------------------------------------------- */

impl IntoVidSumError for KeyringError {
    fn into_vidsum(self) -> VidSumError {
        use keyring::Error::{
            Ambiguous, BadEncoding, Invalid, NoEntry, NoStorageAccess, PlatformFailure, TooLong,
        };

        match self {
            NoEntry => VidSumError::Storage("no keychain entry".into()),
            BadEncoding(_) => VidSumError::Storage("keychain entry is not valid UTF-8".into()),
            TooLong(attribute, limit) => VidSumError::Storage(format!(
                "keychain attribute '{attribute}' exceeds {limit} characters"
            )),
            Invalid(attribute, reason) => {
                VidSumError::Storage(format!("invalid keychain attribute '{attribute}': {reason}"))
            }
            Ambiguous(entries) => VidSumError::Storage(format!(
                "multiple keychain entries matched request ({} results)",
                entries.len()
            )),
            PlatformFailure(err) => VidSumError::Storage(format!("keychain platform error: {err}")),
            NoStorageAccess(err) => {
                VidSumError::Storage(format!("unable to access secure storage: {err}"))
            }
            other => VidSumError::Storage(other.to_string()),
        }
    }
}

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        Self(value.into_vidsum())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → VidSumError */
/* -------------------------------------------------------------------------- */

impl IntoVidSumError for HttpError {
    fn into_vidsum(self) -> VidSumError {
        if self.is_timeout() {
            return VidSumError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return VidSumError::Network("HTTP connection failure".into());
        }

        if self.is_decode() {
            return VidSumError::Serialization(format!("invalid response body: {self}"));
        }

        if let Some(status) = self.status() {
            return VidSumError::api(status.as_u16());
        }

        VidSumError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_vidsum())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
