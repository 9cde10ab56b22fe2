use std::{collections::HashMap, sync::Mutex};

use super::StorageBackend;
use crate::errors::{LedgerError, Result};

/// Process-local key-value storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let entries = self.lock()?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| LedgerError::Storage("memory storage lock poisoned".into()))
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, data: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), data.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read("k").unwrap(), None);
        storage.write("k", "[]").unwrap();
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("[]"));
        assert_eq!(storage.keys().unwrap(), vec!["k".to_string()]);
        storage.remove("k").unwrap();
        assert_eq!(storage.read("k").unwrap(), None);
    }
}
