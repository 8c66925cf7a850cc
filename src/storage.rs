/// Storage
///
/// Key-value persistence for the pieces of a connection that survive a
/// restart: which wallet was used and which chain was selected.
///
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::Result;

pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        if let Ok(mut items) = self.items.lock() {
            items.insert(key.to_string(), value.to_string());
        }
    }

    fn remove_item(&self, key: &str) {
        if let Ok(mut items) = self.items.lock() {
            items.remove(key);
        }
    }
}

/// JSON file backed storage. The whole map is rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let items = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    fn flush(&self, items: &HashMap<String, String>) {
        let result = serde_json::to_string_pretty(items)
            .map_err(crate::Error::from)
            .and_then(|json| Ok(fs::write(&self.path, json)?));
        if let Err(e) = result {
            log::warn!("failed to persist {}: {e}", self.path.display());
        }
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        if let Ok(mut items) = self.items.lock() {
            items.insert(key.to_string(), value.to_string());
            self.flush(&items);
        }
    }

    fn remove_item(&self, key: &str) {
        if let Ok(mut items) = self.items.lock() {
            if items.remove(key).is_some() {
                self.flush(&items);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("a"), None);
        storage.set_item("a", "1");
        assert_eq!(storage.get_item("a").as_deref(), Some("1"));
        storage.remove_item("a");
        assert_eq!(storage.get_item("a"), None);
    }

    #[test]
    fn test_file_storage_persists() {
        let path = std::env::temp_dir().join(format!(
            "appkit-storage-{}.json",
            rand::random::<u64>()
        ));

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set_item("@w3m/wallet_id", "injected_phantom");
            storage.set_item("other", "x");
            storage.remove_item("other");
        }

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(
            storage.get_item("@w3m/wallet_id").as_deref(),
            Some("injected_phantom")
        );
        assert_eq!(storage.get_item("other"), None);

        fs::remove_file(&path).unwrap();
    }
}
