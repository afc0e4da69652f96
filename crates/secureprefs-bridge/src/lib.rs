//! The storage adapter handed to embedding application layers: an
//! encrypted preference container with silent plaintext fallback, plus a
//! device security flag computed once at startup.

use std::{path::PathBuf, sync::Arc};

use secureprefs_core::{
    container::{PreferenceContainer, StoreError},
    probe::{select_probe, LockScreen},
};
use secureprefs_storage::{
    encrypted_preferences::EncryptedPreferences, key_provider::MasterKeyProvider,
    plain_preferences::PlainPreferences,
};
use tracing::{error, instrument};

/// Where a namespace's container lives on disk.
#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Base data directory; the namespace directory is created beneath it.
    pub data_dir: PathBuf,
    /// Logical container name, shared by the encrypted container and its
    /// plaintext fallback.
    pub namespace: String,
}

impl StorageSettings {
    pub fn new(data_dir: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            namespace: namespace.into(),
        }
    }

    fn namespace_dir(&self) -> PathBuf {
        self.data_dir.join(&self.namespace)
    }
}

/// Process-wide storage adapter. Opened once, shared behind an `Arc` by
/// whatever threading model the host provides; each operation resolves or
/// rejects exactly once and no retries are attempted.
pub struct EncryptedStorage {
    container: Option<Arc<dyn PreferenceContainer>>,
    device_protected: bool,
    encrypted: bool,
}

impl EncryptedStorage {
    /// Open the adapter. Opening never fails: when the encrypted container
    /// cannot be created the plaintext fallback takes over (logged, not
    /// surfaced), and when both fail every subsequent operation rejects
    /// with [`StoreError::Uninitialized`].
    pub async fn open<P: MasterKeyProvider>(
        settings: &StorageSettings,
        key_provider: &P,
        lock_screen: Arc<dyn LockScreen>,
    ) -> Self {
        let root = settings.namespace_dir();

        let (container, encrypted) = match EncryptedPreferences::create(&root, key_provider).await
        {
            Ok(container) => (
                Some(Arc::new(container) as Arc<dyn PreferenceContainer>),
                true,
            ),
            Err(err) => {
                error!("could not create encrypted container, falling back to plaintext: {err}");
                match PlainPreferences::create(&root) {
                    Ok(container) => (
                        Some(Arc::new(container) as Arc<dyn PreferenceContainer>),
                        false,
                    ),
                    Err(err) => {
                        error!("could not create fallback container: {err}");
                        (None, false)
                    }
                }
            }
        };

        let device_protected = select_probe(lock_screen).is_device_protected();

        Self {
            container,
            device_protected,
            encrypted,
        }
    }

    /// Whether the device is protected by a lock-screen credential.
    /// Computed once at open; stable for the process lifetime.
    pub fn is_device_protected(&self) -> bool {
        self.device_protected
    }

    /// Whether values are encrypted at rest, i.e. the fallback container
    /// is not in use. Lets embedders warn about reduced confidentiality.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Persist `value` under `key`; resolves with the stored value.
    #[instrument(skip_all, fields(key))]
    pub async fn set_item(&self, key: &str, value: &str) -> Result<String, StoreError> {
        self.container()?
            .put(key, value)
            .await
            .map_err(|err| StoreError::Save {
                key: key.to_string(),
                reason: reason(err),
            })?;
        Ok(value.to_string())
    }

    /// Read the value under `key`, or `None` when no entry exists.
    #[instrument(skip_all, fields(key))]
    pub async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.container()?
            .get(key)
            .await
            .map_err(|err| StoreError::Read {
                key: key.to_string(),
                reason: reason(err),
            })
    }

    /// Remove the entry under `key` (idempotent); resolves with the key.
    #[instrument(skip_all, fields(key))]
    pub async fn remove_item(&self, key: &str) -> Result<String, StoreError> {
        self.container()?
            .remove(key)
            .await
            .map_err(|err| StoreError::Remove {
                key: key.to_string(),
                reason: reason(err),
            })?;
        Ok(key.to_string())
    }

    /// Drop every entry in the namespace.
    #[instrument(skip_all)]
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.container()?
            .clear()
            .await
            .map_err(|err| StoreError::Clear { reason: reason(err) })
    }

    fn container(&self) -> Result<&dyn PreferenceContainer, StoreError> {
        match &self.container {
            Some(container) => Ok(container.as_ref()),
            None => Err(StoreError::Uninitialized),
        }
    }
}

/// Strip the generic storage wrapper so per-operation errors carry the
/// underlying reason directly.
fn reason(err: StoreError) -> String {
    match err {
        StoreError::Storage { reason } => reason,
        other => other.to_string(),
    }
}
