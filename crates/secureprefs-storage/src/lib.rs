//! Concrete preference containers with encryption at rest.
//! Values are sealed with AES-256-GCM and entry names with a keyed
//! deterministic transform; master keys live in the OS keyring (or test
//! doubles). A plaintext container with the same layout serves as the
//! fallback when encrypted initialization fails.

mod entry_file;

pub mod encrypted_preferences;
pub mod key_provider;
pub mod plain_preferences;
