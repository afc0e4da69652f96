//! One-file-per-entry layout shared by both containers: atomic writes via
//! a named temp file in the same directory, idempotent removal, and a
//! directory-wide clear.

use std::{
    fs::{self, File},
    io::{Read, Write},
    path::Path,
};

use secureprefs_core::container::StoreError;
use tempfile::NamedTempFile;

/// Write entry bytes so the rename is the commit point. Does not return
/// until the bytes are flushed and the file is in place.
pub(crate) fn write_entry(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| StoreError::Storage {
        reason: "invalid entry path".to_string(),
    })?;
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    tmp.write_all(bytes).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

/// Read an entry's bytes, or `None` when no entry file exists.
pub(crate) fn read_entry(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(storage_err(err)),
    };

    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(storage_err)?;
    Ok(Some(buf))
}

/// Remove an entry file. Removing an absent entry succeeds.
pub(crate) fn remove_entry(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(storage_err(err)),
    }
}

/// Remove every entry file under the container directory. A missing
/// directory counts as already clear.
pub(crate) fn clear_dir(root: &Path) -> Result<(), StoreError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(storage_err(err)),
    };

    for entry in entries {
        let path = entry.map_err(storage_err)?.path();
        if path.is_file() {
            fs::remove_file(&path).map_err(storage_err)?;
        }
    }
    Ok(())
}

pub(crate) fn storage_err<E: ToString>(err: E) -> StoreError {
    StoreError::Storage {
        reason: err.to_string(),
    }
}
