use std::{path::PathBuf, sync::Arc};

use color_eyre::Result;
use dirs::data_dir;
use secureprefs_bridge::{EncryptedStorage, StorageSettings};
use secureprefs_core::probe::StaticLockScreen;
use secureprefs_storage::key_provider::KeyringProvider;
use tracing::debug;

const KEYRING_SERVICE: &str = "secureprefs-cli";
const KEYRING_ACCOUNT: &str = "master-key";
const DEFAULT_NAMESPACE: &str = "default";

/// Resolve the default base data directory.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("secureprefs"))
}

/// Open the storage adapter using config overrides, with the master key in
/// the OS keychain and the lock-screen answer taken from config.
pub async fn open_from_config(config: &crate::config::Config) -> Result<EncryptedStorage> {
    let data_dir = match &config.data_dir {
        Some(dir) => dir.clone(),
        None => default_data_dir()?,
    };
    let namespace = config
        .namespace
        .clone()
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
    let protected = config
        .lock_screen
        .as_ref()
        .and_then(|lock| lock.protected)
        .unwrap_or(false);

    debug!(?data_dir, %namespace, "opening preference storage");
    let settings = StorageSettings::new(data_dir, namespace);
    let provider = KeyringProvider::new(KEYRING_SERVICE, KEYRING_ACCOUNT);
    let lock_screen = Arc::new(StaticLockScreen::new(protected));
    Ok(EncryptedStorage::open(&settings, &provider, lock_screen).await)
}

/// Helper for tests: storage rooted at a temp dir with an in-memory key.
#[cfg(test)]
pub async fn test_storage(root: impl Into<PathBuf>) -> EncryptedStorage {
    use secureprefs_storage::key_provider::InMemoryKeyProvider;

    EncryptedStorage::open(
        &StorageSettings::new(root, DEFAULT_NAMESPACE),
        &InMemoryKeyProvider::default(),
        Arc::new(StaticLockScreen::new(false)),
    )
    .await
}
