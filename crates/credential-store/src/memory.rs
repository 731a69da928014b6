//! In-memory storage backends.
//!
//! Used by tests and by callers that must not touch the user's keychain.
//! [`MemoryStorage`] can inject failures per key so that rollback paths can be
//! exercised deterministically.

use crate::{PreferenceStorage, SecureStorage, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    data: HashMap<String, String>,
    failing_writes: HashSet<String>,
    failing_deletes: HashSet<String>,
    locked: bool,
}

/// In-memory secure storage with failure injection.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with the given entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let storage = Self::new();
        storage.lock().data = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        storage
    }

    /// Make every subsequent `set` on `key` fail.
    pub fn fail_writes_to(&self, key: &str) {
        self.lock().failing_writes.insert(key.to_string());
    }

    /// Make every subsequent `delete` on `key` fail.
    pub fn fail_deletes_of(&self, key: &str) {
        self.lock().failing_deletes.insert(key.to_string());
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.failing_writes.clear();
        state.failing_deletes.clear();
    }

    /// Simulate a locked keychain: every operation fails with `Locked`.
    pub fn set_locked(&self, locked: bool) {
        self.lock().locked = locked;
    }

    /// Copy of the current contents.
    pub fn entries(&self) -> HashMap<String, String> {
        self.lock().data.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_unlocked(state: &MemoryState) -> StorageResult<()> {
        if state.locked {
            return Err(StorageError::Locked("memory storage is locked".to_string()));
        }
        Ok(())
    }
}

impl SecureStorage for MemoryStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut state = self.lock();
        Self::check_unlocked(&state)?;
        if state.failing_writes.contains(key) {
            return Err(StorageError::Platform(format!("injected write failure for {}", key)));
        }
        state.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let state = self.lock();
        Self::check_unlocked(&state)?;
        Ok(state.data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut state = self.lock();
        Self::check_unlocked(&state)?;
        if state.failing_deletes.contains(key) {
            return Err(StorageError::Platform(format!("injected delete failure for {}", key)));
        }
        Ok(state.data.remove(key).is_some())
    }
}

/// In-memory preference storage.
#[derive(Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, bool>>,
    fail_writes: Mutex<bool>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes and removals fail.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    fn check_writable(&self) -> StorageResult<()> {
        if *self.fail_writes.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(StorageError::Platform("injected preference write failure".to_string()));
        }
        Ok(())
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, bool>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl PreferenceStorage for MemoryPreferences {
    fn get_bool(&self, key: &str) -> StorageResult<Option<bool>> {
        Ok(self.values().get(key).copied())
    }

    fn set_bool(&self, key: &str, value: bool) -> StorageResult<()> {
        self.check_writable()?;
        self.values().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.check_writable()?;
        self.values().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_injected_write_failure_is_per_key() {
        let storage = MemoryStorage::new();
        storage.fail_writes_to("b");

        storage.set("a", "1").unwrap();
        assert!(storage.set("b", "2").is_err());
        assert_eq!(storage.entries().len(), 1);

        storage.clear_failures();
        storage.set("b", "2").unwrap();
        assert_eq!(storage.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_locked_storage_rejects_everything() {
        let storage = MemoryStorage::with_entries([("k", "v")]);
        storage.set_locked(true);

        assert!(matches!(storage.get("k"), Err(StorageError::Locked(_))));
        assert!(matches!(storage.set("k", "w"), Err(StorageError::Locked(_))));
        assert!(matches!(storage.delete("k"), Err(StorageError::Locked(_))));

        storage.set_locked(false);
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_memory_preferences() {
        let prefs = MemoryPreferences::new();
        assert_eq!(prefs.get_bool("flag").unwrap(), None);

        prefs.set_bool("flag", true).unwrap();
        assert_eq!(prefs.get_bool("flag").unwrap(), Some(true));

        prefs.set_fail_writes(true);
        assert!(prefs.set_bool("flag", false).is_err());
        assert!(prefs.remove("flag").is_err());
        assert_eq!(prefs.get_bool("flag").unwrap(), Some(true));

        prefs.set_fail_writes(false);
        prefs.remove("flag").unwrap();
        prefs.remove("flag").unwrap();
        assert_eq!(prefs.get_bool("flag").unwrap(), None);
    }
}
