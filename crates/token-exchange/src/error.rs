//! Error types for the token endpoint.

use thiserror::Error;

/// Failure of a token grant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// Transport failure, timeout, or an unexpected HTTP status
    #[error("Network error: {0}")]
    Network(String),

    /// The provider rejected the code or refresh token
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),

    /// A success response whose body could not be understood
    #[error("Decode error: {0}")]
    Decode(String),

    /// The client could not be constructed
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ExchangeError::Network("request timed out".to_string())
        } else if e.is_decode() {
            ExchangeError::Decode(e.to_string())
        } else {
            ExchangeError::Network(e.to_string())
        }
    }
}

/// Result type alias using ExchangeError.
pub type ExchangeResult<T> = Result<T, ExchangeError>;
