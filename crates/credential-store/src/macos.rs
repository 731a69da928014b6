//! macOS Keychain implementation.

use crate::{SecureStorage, StorageError, StorageResult};
use security_framework::base::Error as SecurityError;
use security_framework::item::{ItemClass, ItemSearchOptions, Limit, SearchResult};
use security_framework::passwords::{delete_generic_password, set_generic_password};
use tracing::debug;

/// errSecItemNotFound
const ERR_ITEM_NOT_FOUND: i32 = -25300;
/// errSecInteractionNotAllowed (device locked, no UI available)
const ERR_INTERACTION_NOT_ALLOWED: i32 = -25308;
/// errSecAuthFailed
const ERR_AUTH_FAILED: i32 = -25293;

/// Keychain-based secure storage for macOS.
pub struct KeychainStorage {
    service_name: String,
}

impl KeychainStorage {
    /// Create a new Keychain storage instance.
    pub fn new(service_name: &str) -> StorageResult<Self> {
        Ok(Self {
            service_name: service_name.to_string(),
        })
    }

    fn map_error(context: &str, e: SecurityError) -> StorageError {
        match e.code() {
            ERR_INTERACTION_NOT_ALLOWED | ERR_AUTH_FAILED => {
                StorageError::Locked(format!("{}: {}", context, e))
            }
            _ => StorageError::Platform(format!("{}: {}", context, e)),
        }
    }
}

impl SecureStorage for KeychainStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(service = %self.service_name, key = %key, "Setting keychain item");

        // set_generic_password fails on duplicates, so drop the old item first.
        match delete_generic_password(&self.service_name, key) {
            Ok(()) => {}
            Err(e) if e.code() == ERR_ITEM_NOT_FOUND => {}
            Err(e) => return Err(Self::map_error("Failed to replace keychain item", e)),
        }

        set_generic_password(&self.service_name, key, value.as_bytes())
            .map_err(|e| Self::map_error("Failed to set keychain item", e))
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        debug!(service = %self.service_name, key = %key, "Getting keychain item");

        let mut search = ItemSearchOptions::new();
        search
            .class(ItemClass::generic_password())
            .service(&self.service_name)
            .account(key)
            .limit(Limit::Max(1))
            .load_data(true);

        let results = match search.search() {
            Ok(results) => results,
            Err(e) if e.code() == ERR_ITEM_NOT_FOUND => return Ok(None),
            Err(e) => return Err(Self::map_error("Failed to get keychain item", e)),
        };

        match results.into_iter().next() {
            Some(SearchResult::Data(data)) => String::from_utf8(data)
                .map(Some)
                .map_err(|e| StorageError::Encoding(e.to_string())),
            _ => Ok(None),
        }
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(service = %self.service_name, key = %key, "Deleting keychain item");

        match delete_generic_password(&self.service_name, key) {
            Ok(()) => Ok(true),
            Err(e) if e.code() == ERR_ITEM_NOT_FOUND => Ok(false),
            Err(e) => Err(Self::map_error("Failed to delete keychain item", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SERVICE: &str = "com.findmysong.app.test";

    #[test]
    #[ignore] // Requires macOS Keychain access
    fn test_keychain_operations() {
        let storage = KeychainStorage::new(TEST_SERVICE).unwrap();
        let _ = storage.delete("test_key");

        storage.set("test_key", "test_value").unwrap();
        assert_eq!(storage.get("test_key").unwrap(), Some("test_value".to_string()));

        storage.set("test_key", "new_value").unwrap();
        assert_eq!(storage.get("test_key").unwrap(), Some("new_value".to_string()));

        assert!(storage.delete("test_key").unwrap());
        assert!(!storage.delete("test_key").unwrap());
        assert_eq!(storage.get("test_key").unwrap(), None);
    }
}
