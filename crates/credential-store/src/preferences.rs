//! JSON file backed preferences.

use crate::{PreferenceStorage, StorageResult};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Plain settings persisted as a flat JSON object.
///
/// Every write replaces the file through a temporary sibling and a rename, so
/// readers never observe a half-written document.
pub struct JsonFilePreferences {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFilePreferences {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn store(&self, values: &Map<String, Value>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(values)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut values = self.load()?;
        f(&mut values);
        self.store(&values)
    }
}

impl PreferenceStorage for JsonFilePreferences {
    fn get_bool(&self, key: &str) -> StorageResult<Option<bool>> {
        Ok(self.load()?.get(key).and_then(Value::as_bool))
    }

    fn set_bool(&self, key: &str, value: bool) -> StorageResult<()> {
        debug!(key = %key, value, "Writing preference");
        self.update(|values| {
            values.insert(key.to_string(), Value::Bool(value));
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        debug!(key = %key, "Removing preference");
        self.update(|values| {
            values.remove(key);
        })
    }
}
