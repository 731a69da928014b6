//! Credential and preference storage for the FindMySong session.
//!
//! Secrets live in the platform's secure storage:
//! - **macOS**: Keychain Access via `security-framework`
//! - **Linux**: Secret Service (GNOME Keyring / KWallet) via `secret-service`
//!
//! The biometric opt-in flag is a plain setting kept in a JSON file.
//! [`CredentialStore`] ties both together and owns the pair-atomicity rules.

mod credentials;
mod keys;
mod memory;
mod preferences;
mod traits;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "linux")]
mod linux;

pub use credentials::{Credential, CredentialStore};
pub use keys::StorageKeys;
pub use memory::{MemoryPreferences, MemoryStorage};
pub use preferences::JsonFilePreferences;
pub use traits::{PreferenceStorage, SecureStorage};

use thiserror::Error;

/// Service name used for all secure storage entries.
pub const SERVICE_NAME: &str = "com.findmysong.app";

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Platform-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Secure storage is locked or needs user interaction
    #[error("Secure storage is locked: {0}")]
    Locked(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create the default platform-specific secure storage.
pub fn create_storage() -> StorageResult<Box<dyn SecureStorage>> {
    #[cfg(target_os = "macos")]
    {
        let storage = macos::KeychainStorage::new(SERVICE_NAME)?;
        Ok(Box::new(storage))
    }

    #[cfg(target_os = "linux")]
    {
        let storage = linux::SecretServiceStorage::new(SERVICE_NAME)?;
        Ok(Box::new(storage))
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        Err(StorageError::Platform(
            "No secure storage implementation available for this platform".to_string(),
        ))
    }
}
