use std::{fs, path::PathBuf};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use secureprefs_core::container::{PreferenceContainer, StoreError};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::entry_file::{clear_dir, read_entry, remove_entry, storage_err, write_entry};

/// Unencrypted container with the same one-file-per-entry layout and
/// commit discipline as the encrypted one. Used as the fallback when
/// encrypted initialization fails: reduced confidentiality, identical
/// operation semantics.
pub struct PlainPreferences {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct PlainEntry {
    value: String,
}

impl PlainPreferences {
    /// Create the container directory. Unlike the encrypted variant there
    /// is no key material to set up.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(storage_err)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Filesystem-safe, reversible encoding; key names are not secret
        // in the fallback container.
        self.root.join(URL_SAFE_NO_PAD.encode(key))
    }
}

#[async_trait]
impl PreferenceContainer for PlainPreferences {
    #[instrument(skip_all, fields(key))]
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let entry = PlainEntry {
            value: value.to_string(),
        };
        let bytes = serde_json::to_vec(&entry).map_err(storage_err)?;
        write_entry(&self.path_for(key), &bytes)
    }

    #[instrument(skip_all, fields(key))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(bytes) = read_entry(&self.path_for(key))? else {
            return Ok(None);
        };
        let entry: PlainEntry = serde_json::from_slice(&bytes).map_err(storage_err)?;
        Ok(Some(entry.value))
    }

    #[instrument(skip_all, fields(key))]
    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        remove_entry(&self.path_for(key))
    }

    #[instrument(skip_all)]
    async fn clear(&self) -> Result<(), StoreError> {
        clear_dir(&self.root)
    }
}
