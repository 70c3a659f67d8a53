//! Key/value storage backends.
//!
//! `StateBackend` is a thin string-to-string store; the real one wraps the
//! browser's localStorage, tests use the in-memory map. Keys are already
//! fully namespaced by the time they reach a backend.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    StorageUnavailable,
    Corrupt(String),
    Io(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::StorageUnavailable => write!(f, "browser storage unavailable"),
            StorageError::Corrupt(msg) => write!(f, "stored state corrupt: {msg}"),
            StorageError::Io(msg) => write!(f, "storage error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

pub trait StateBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    fn has(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    entries: BTreeMap<String, String>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pre-seed a key, bypassing the store's namespacing. Test fixtures use
    /// this to lay out historical storage layouts.
    pub fn seed(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl StateBackend for InMemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.entries.contains_key(key))
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_backend {
    use super::{StateBackend, StorageError};

    #[derive(Debug, Default)]
    pub struct LocalStorageBackend;

    impl LocalStorageBackend {
        pub fn new() -> Self {
            Self
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, StorageError> {
        let win = web_sys::window().ok_or(StorageError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| StorageError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(StorageError::StorageUnavailable)
    }

    impl StateBackend for LocalStorageBackend {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            let storage = window_local_storage()?;
            storage
                .get_item(key)
                .map_err(|e| StorageError::Io(format!("get_item failed: {:?}", e)))
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            let storage = window_local_storage()?;
            storage
                .set_item(key, value)
                .map_err(|e| StorageError::Io(format!("set_item failed: {:?}", e)))
        }

        fn remove(&mut self, key: &str) -> Result<(), StorageError> {
            let storage = window_local_storage()?;
            storage
                .remove_item(key)
                .map_err(|e| StorageError::Io(format!("remove_item failed: {:?}", e)))
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_backend::LocalStorageBackend;

#[cfg(test)]
mod tests {
    use super::{InMemoryBackend, StateBackend};

    #[test]
    fn in_memory_round_trip() {
        let mut backend = InMemoryBackend::new();
        assert_eq!(backend.get("k").unwrap(), None);
        assert!(!backend.has("k").unwrap());

        backend.set("k", "v").unwrap();
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("v"));
        assert!(backend.has("k").unwrap());

        backend.remove("k").unwrap();
        assert!(!backend.has("k").unwrap());
    }
}
