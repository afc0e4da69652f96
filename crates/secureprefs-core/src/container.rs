use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by preference containers and the storage adapter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// No container handle is available; both initialization paths failed.
    #[error("preference container is not initialized")]
    Uninitialized,
    /// A write did not reach durable storage.
    #[error("could not save entry {key}: {reason}")]
    Save { key: String, reason: String },
    /// A stored entry could not be read back.
    #[error("could not read entry {key}: {reason}")]
    Read { key: String, reason: String },
    /// A removal did not reach durable storage.
    #[error("could not remove entry {key}: {reason}")]
    Remove { key: String, reason: String },
    /// The container could not be emptied.
    #[error("could not clear preference container: {reason}")]
    Clear { reason: String },
    /// Underlying container failure (io, crypto, codec).
    #[error("storage failure: {reason}")]
    Storage { reason: String },
}

/// Contract for a persistent string key-value container. Keys are unique
/// within a container and the last write wins.
#[async_trait]
pub trait PreferenceContainer: Send + Sync {
    /// Persist a value under a key, overwriting any existing entry. The
    /// call does not return until the entry is durable.
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Retrieve the value for a key, or `None` when no entry exists.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Remove a key and its value (idempotent).
    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Drop every entry in the container.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// In-memory container that simulates encryption for tests and smoke runs.
/// This is not cryptographically secure; production containers encrypt with
/// AES-GCM under a key wrapped by the OS keystore.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPreferences {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PreferenceContainer for InMemoryPreferences {
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;

        // XOR is a placeholder to avoid holding plaintext in tests.
        map.insert(key.to_string(), mask(value.as_bytes()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;

        let Some(masked) = map.get(key) else {
            return Ok(None);
        };
        let value = String::from_utf8(unmask(masked)).map_err(|err| StoreError::Storage {
            reason: format!("masked entry is not valid utf-8: {err}"),
        })?;
        Ok(Some(value))
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut map = self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        map.clear();
        Ok(())
    }
}

const MASK_BYTE: u8 = 0xA5;

fn mask(input: &[u8]) -> Vec<u8> {
    input.iter().map(|b| b ^ MASK_BYTE).collect()
}

fn unmask(input: &[u8]) -> Vec<u8> {
    mask(input) // XOR twice restores original.
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_masks_and_unmasks() {
        let store = InMemoryPreferences::new();
        let key = "session/token";
        let value = "abc123";

        store.put(key, value).await.expect("put should succeed");
        let retrieved = store.get(key).await.expect("get should succeed");

        assert_eq!(retrieved.as_deref(), Some(value));
        // Ensure we are not holding plaintext.
        let inner = store.inner.lock().expect("lock");
        assert_ne!(inner.get(key).unwrap(), &value.as_bytes().to_vec());
    }

    #[tokio::test]
    async fn get_of_absent_key_is_none() {
        let store = InMemoryPreferences::new();
        let value = store.get("never-written").await.expect("get");
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_removes_data() {
        let store = InMemoryPreferences::new();
        store.put("k", "v").await.expect("put should succeed");
        store.remove("k").await.expect("remove should succeed");
        store
            .remove("k")
            .await
            .expect("remove again should still succeed");

        let value = store.get("k").await.expect("get after remove");
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn clear_empties_all_entries() {
        let store = InMemoryPreferences::new();
        store.put("a", "1").await.expect("put a");
        store.put("b", "2").await.expect("put b");
        store.clear().await.expect("clear");

        assert_eq!(store.get("a").await.expect("get a"), None);
        assert_eq!(store.get("b").await.expect("get b"), None);
    }
}
