use std::{fs, path::PathBuf};

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use secureprefs_core::container::{PreferenceContainer, StoreError};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::instrument;
use zeroize::Zeroize;

use crate::entry_file::{clear_dir, read_entry, remove_entry, storage_err, write_entry};
use crate::key_provider::MasterKeyProvider;

// Domain separation for the two working keys derived from the master key.
const KEY_SALT: &[u8] = b"secureprefs:container:salt";
const VALUE_KEY_INFO: &[u8] = b"secureprefs:value-key";
const NAME_KEY_INFO: &[u8] = b"secureprefs:name-key";

const NONCE_LEN: usize = 12;

/// Encrypted preference container: one file per entry under the namespace
/// directory. Values are sealed with AES-256-GCM; entry filenames are a
/// deterministic keyed transform of the key, so lookup never decrypts
/// anything and plaintext key names never touch disk.
pub struct EncryptedPreferences {
    root: PathBuf,
    cipher: Aes256Gcm,
    name_mac: Hmac<Sha256>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SealedEntry {
    nonce: String,
    ciphertext: String,
}

impl EncryptedPreferences {
    /// Create the container: fetch or create the master key, derive the
    /// working keys, and ensure the namespace directory exists. Any
    /// failure here is the signal for the caller to fall back.
    pub async fn create<P: MasterKeyProvider>(
        root: impl Into<PathBuf>,
        key_provider: &P,
    ) -> Result<Self, StoreError> {
        let root = root.into();
        let master = key_provider
            .get_or_create()
            .await
            .map_err(|e| storage_err(format!("master key provider: {e}")))?;

        let hkdf = Hkdf::<Sha256>::new(Some(KEY_SALT), &master.bytes);

        let mut value_key = [0u8; 32];
        hkdf.expand(VALUE_KEY_INFO, &mut value_key)
            .map_err(|e| storage_err(format!("value key derivation failed: {e}")))?;
        let cipher = Aes256Gcm::new_from_slice(&value_key)
            .map_err(|e| storage_err(format!("cipher init failed: {e}")))?;
        value_key.zeroize();

        let mut name_key = [0u8; 32];
        hkdf.expand(NAME_KEY_INFO, &mut name_key)
            .map_err(|e| storage_err(format!("name key derivation failed: {e}")))?;
        let name_mac = <Hmac<Sha256> as Mac>::new_from_slice(&name_key)
            .map_err(|e| storage_err(format!("name transform init failed: {e}")))?;
        name_key.zeroize();

        fs::create_dir_all(&root).map_err(storage_err)?;

        Ok(Self {
            root,
            cipher,
            name_mac,
        })
    }

    /// Deterministic: the same key always maps to the same filename, which
    /// is what makes lookup-by-key work without an index.
    fn sealed_name(&self, key: &str) -> String {
        let mut mac = self.name_mac.clone();
        mac.update(key.as_bytes());
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(self.sealed_name(key))
    }
}

#[async_trait]
impl PreferenceContainer for EncryptedPreferences {
    #[instrument(skip_all, fields(key))]
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, value.as_bytes())
            .map_err(|e| storage_err(format!("encrypt failed: {e}")))?;

        let blob = SealedEntry {
            nonce: URL_SAFE_NO_PAD.encode(nonce.as_slice()),
            ciphertext: URL_SAFE_NO_PAD.encode(ciphertext),
        };
        let bytes = serde_json::to_vec(&blob).map_err(storage_err)?;
        write_entry(&self.path_for(key), &bytes)
    }

    #[instrument(skip_all, fields(key))]
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let Some(bytes) = read_entry(&self.path_for(key))? else {
            return Ok(None);
        };
        let blob: SealedEntry = serde_json::from_slice(&bytes).map_err(storage_err)?;

        let nonce_bytes = URL_SAFE_NO_PAD
            .decode(blob.nonce)
            .map_err(|e| storage_err(format!("nonce decode failed: {e}")))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(storage_err(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                nonce_bytes.len()
            )));
        }
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = URL_SAFE_NO_PAD
            .decode(blob.ciphertext)
            .map_err(|e| storage_err(format!("ciphertext decode failed: {e}")))?;

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|e| storage_err(format!("decrypt failed: {e}")))?;
        let value = String::from_utf8(plaintext)
            .map_err(|e| storage_err(format!("entry is not valid utf-8: {e}")))?;
        Ok(Some(value))
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
