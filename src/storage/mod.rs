//! Key-value persistence port.
//!
//! The booking core persists its state the way a browser profile would: a handful
//! of string keys, each holding one JSON document. Reading a key yields one of
//! three outcomes (present, absent, corrupt) so callers decide explicitly what a
//! damaged entry means.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{StorageBackend, StorageConfig};

/// Storage key for the persisted session blob
pub const SESSION_KEY: &str = "homeServiceAuth";
/// Storage key for the booking list
pub const BOOKINGS_KEY: &str = "homeServiceBookings";
/// Storage key for the notification feed
pub const NOTIFICATIONS_KEY: &str = "homeServiceNotifications";
/// Storage key for accounts created through signup
pub const CUSTOMERS_KEY: &str = "homeServiceUsers";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access storage entry {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode storage entry {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Raw string storage, one value per key.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value for a key, `None` when the key was never written
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Outcome of reading a typed entry
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    Present(T),
    Absent,
    /// The entry exists but does not decode
    Corrupt(String),
}

impl<T> Loaded<T> {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Loaded::Corrupt(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Loaded::Present(value) => Some(value),
            Loaded::Absent | Loaded::Corrupt(_) => None,
        }
    }
}

/// Read and decode a JSON entry. Failing to read the store at all is an
/// error; reading something that does not decode is [`Loaded::Corrupt`].
pub fn load<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Loaded<T>, StoreError> {
    let Some(raw) = store.get(key)? else {
        return Ok(Loaded::Absent);
    };

    Ok(match serde_json::from_str(&raw) {
        Ok(value) => Loaded::Present(value),
        Err(e) => Loaded::Corrupt(e.to_string()),
    })
}

/// Read a JSON entry, removing it when it cannot be decoded.
///
/// Corruption is logged and reported as absence. A read failure is reported
/// as absence too, but the entry is left in place.
pub fn load_or_discard<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    match load(store, key) {
        Ok(Loaded::Present(value)) => Some(value),
        Ok(Loaded::Absent) => None,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Failed to read storage entry; keeping it");
            None
        }
        Ok(Loaded::Corrupt(reason)) => {
            tracing::warn!(key = %key, reason = %reason, "Discarding corrupt storage entry");
            if let Err(e) = store.remove(key) {
                tracing::warn!(key = %key, error = %e, "Failed to remove corrupt storage entry");
            }
            None
        }
    }
}

/// Encode and write a JSON entry.
pub fn save<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

/// Open the store selected by configuration.
pub fn open(config: &StorageConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory storage; state is dropped on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::File => {
            let store = FileStore::open(&config.data_dir)?;
            tracing::info!("Using file storage at {}", store.dir().display());
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        name: String,
        count: u32,
    }

    #[test]
    fn test_load_absent_key() {
        let store = MemoryStore::new();
        let loaded: Loaded<Entry> = load(&store, "missing").unwrap();
        assert_eq!(loaded, Loaded::Absent);
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        let entry = Entry {
            name: "alpha".into(),
            count: 3,
        };
        save(&store, "entry", &entry).unwrap();

        let loaded: Loaded<Entry> = load(&store, "entry").unwrap();
        assert_eq!(loaded, Loaded::Present(entry));
    }

    #[test]
    fn test_malformed_json_is_corrupt() {
        let store = MemoryStore::new();
        store.set("entry", "{\"name\": \"alpha\"").unwrap();

        let loaded: Loaded<Entry> = load(&store, "entry").unwrap();
        assert!(loaded.is_corrupt());
    }

    #[test]
    fn test_wrong_shape_is_corrupt() {
        let store = MemoryStore::new();
        store.set("entry", "[1, 2, 3]").unwrap();

        let loaded: Loaded<Entry> = load(&store, "entry").unwrap();
        assert!(loaded.is_corrupt());
        assert!(loaded.into_option().is_none());
    }

    #[test]
    fn test_load_or_discard_removes_corrupt_entry() {
        let store = MemoryStore::new();
        store.set("entry", "not json").unwrap();

        let loaded: Option<Entry> = load_or_discard(&store, "entry");
        assert!(loaded.is_none());
        assert_eq!(store.get("entry").unwrap(), None);
    }

    /// Store whose reads always fail, recording removals
    #[derive(Default)]
    struct UnreadableStore {
        removed: parking_lot::Mutex<Vec<String>>,
    }

    impl KeyValueStore for UnreadableStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.removed.lock().push(key.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_read_failure_is_not_corruption() {
        let store = UnreadableStore::default();

        assert!(matches!(
            load::<Entry>(&store, "entry"),
            Err(StoreError::Io { .. })
        ));
        let loaded: Option<Entry> = load_or_discard(&store, "entry");
        assert!(loaded.is_none());
        assert!(store.removed.lock().is_empty());
    }

    #[test]
    fn test_open_memory_backend() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            data_dir: "./unused".into(),
        };
        let store = open(&config).unwrap();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_open_file_backend_writes_into_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::File,
            data_dir: dir.path().join("profile"),
        };
        let store = open(&config).unwrap();
        save(store.as_ref(), CUSTOMERS_KEY, &Vec::<String>::new()).unwrap();
        assert!(dir.path().join("profile").join("homeServiceUsers.json").exists());
    }
}
