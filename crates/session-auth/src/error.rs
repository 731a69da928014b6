//! Session error types.

use credential_store::StorageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use token_exchange::ExchangeError;

/// Failure of a session operation.
///
/// Cloneable so that callers joined on one in-flight refresh all receive the
/// same result. The detail strings are for logs only; see
/// [`AuthError::user_message`] for what may be shown to a user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Connectivity, transport, timeout, or an unexpected status
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Authorization code or refresh token rejected by the provider
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// Malformed success response
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// No enrolled biometry or no hardware
    #[error("Biometric authentication unavailable")]
    BiometricUnavailable,

    /// Biometric challenge did not match
    #[error("Biometric authentication failed")]
    BiometricFailed,

    /// Secure storage read or write failure
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Another session operation is in flight
    #[error("Session busy: {0} in progress")]
    SessionBusy(String),

    /// No stored credential to operate on
    #[error("Not logged in")]
    NotLoggedIn,

    /// Operation not valid from the current state
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// Background task panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Fieldless mirror of [`AuthError`], carried by `AuthState::Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    NetworkError,
    InvalidGrant,
    DecodeError,
    BiometricUnavailable,
    BiometricFailed,
    StorageError,
    SessionBusy,
    NotLoggedIn,
    InvalidStateTransition,
    Internal,
}

const MSG_RETRY_LATER: &str = "Something went wrong. Please try again later.";
const MSG_NETWORK: &str = "Could not reach the music service. Please try again later.";
const MSG_SIGN_IN_AGAIN: &str = "Your session could not be renewed. Please sign in again.";
const MSG_BIOMETRIC: &str = "Identity could not be confirmed. Please sign in again.";
const MSG_BUSY: &str = "A sign-in is already in progress.";

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::NetworkError(_) => AuthErrorKind::NetworkError,
            AuthError::InvalidGrant(_) => AuthErrorKind::InvalidGrant,
            AuthError::DecodeError(_) => AuthErrorKind::DecodeError,
            AuthError::BiometricUnavailable => AuthErrorKind::BiometricUnavailable,
            AuthError::BiometricFailed => AuthErrorKind::BiometricFailed,
            AuthError::StorageError(_) => AuthErrorKind::StorageError,
            AuthError::SessionBusy(_) => AuthErrorKind::SessionBusy,
            AuthError::NotLoggedIn => AuthErrorKind::NotLoggedIn,
            AuthError::InvalidStateTransition(_) => AuthErrorKind::InvalidStateTransition,
            AuthError::Internal(_) => AuthErrorKind::Internal,
        }
    }

    /// Generic, retry-safe text for an alert. Never includes provider text.
    pub fn user_message(&self) -> &'static str {
        self.kind().user_message()
    }

    /// Whether a user-visible alert should be raised for this error.
    pub fn should_alert(&self) -> bool {
        self.kind().should_alert()
    }

    /// Whether a stored credential may still be good after this failure.
    pub fn is_transient(&self) -> bool {
        !matches!(self, AuthError::InvalidGrant(_))
    }
}

impl AuthErrorKind {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthErrorKind::NetworkError => MSG_NETWORK,
            AuthErrorKind::InvalidGrant => MSG_SIGN_IN_AGAIN,
            AuthErrorKind::BiometricFailed | AuthErrorKind::BiometricUnavailable => MSG_BIOMETRIC,
            AuthErrorKind::SessionBusy => MSG_BUSY,
            _ => MSG_RETRY_LATER,
        }
    }

    pub fn should_alert(&self) -> bool {
        !matches!(
            self,
            AuthErrorKind::BiometricUnavailable
                | AuthErrorKind::NotLoggedIn
                | AuthErrorKind::InvalidStateTransition
                | AuthErrorKind::Internal
        )
    }
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthErrorKind::NetworkError => "network_error",
            AuthErrorKind::InvalidGrant => "invalid_grant",
            AuthErrorKind::DecodeError => "decode_error",
            AuthErrorKind::BiometricUnavailable => "biometric_unavailable",
            AuthErrorKind::BiometricFailed => "biometric_failed",
            AuthErrorKind::StorageError => "storage_error",
            AuthErrorKind::SessionBusy => "session_busy",
            AuthErrorKind::NotLoggedIn => "not_logged_in",
            AuthErrorKind::InvalidStateTransition => "invalid_state_transition",
            AuthErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl From<ExchangeError> for AuthError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::Network(detail) => AuthError::NetworkError(detail),
            ExchangeError::InvalidGrant(detail) => AuthError::InvalidGrant(detail),
            ExchangeError::Decode(detail) => AuthError::DecodeError(detail),
            ExchangeError::Configuration(detail) => AuthError::Internal(detail),
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(e: StorageError) -> Self {
        AuthError::StorageError(e.to_string())
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
