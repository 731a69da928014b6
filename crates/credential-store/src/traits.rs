//! Storage trait definitions.

use crate::StorageResult;

/// Trait for secure (encrypted at rest) storage backends.
///
/// Implementations are blocking; async callers run them on a blocking pool.
pub trait SecureStorage: Send + Sync {
    /// Store a value securely, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Retrieve a value.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Delete a value. Returns whether something was removed.
    fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Check if a key exists
    fn has(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Trait for plain persisted settings (not secret).
pub trait PreferenceStorage: Send + Sync {
    /// Read a boolean setting.
    fn get_bool(&self, key: &str) -> StorageResult<Option<bool>>;

    /// Write a boolean setting.
    fn set_bool(&self, key: &str, value: bool) -> StorageResult<()>;

    /// Remove a setting. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> StorageResult<()>;
}

impl<T: SecureStorage + ?Sized> SecureStorage for std::sync::Arc<T> {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        (**self).delete(key)
    }
}

impl<T: PreferenceStorage + ?Sized> PreferenceStorage for std::sync::Arc<T> {
    fn get_bool(&self, key: &str) -> StorageResult<Option<bool>> {
        (**self).get_bool(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> StorageResult<()> {
        (**self).set_bool(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }
}
