//! Secure storage boundary
//!
//! Mirrors what the platform keychain offers: existence check, write, read and
//! delete of a small blob under a string key.

use crate::{BackendError, BackendResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Keychain-like storage
pub trait SecureStorage: Send + Sync {
    /// Whether an item exists under `key`; never reads the item itself
    fn exists(&self, key: &str) -> bool;

    /// Write `bytes` under `key`
    fn write(&self, key: &str, bytes: &[u8]) -> BackendResult<()>;

    /// Read the item under `key`
    fn read(&self, key: &str) -> BackendResult<Vec<u8>>;

    /// Delete the item under `key`; deleting a missing item is not an error
    fn delete(&self, key: &str) -> BackendResult<()>;
}

/// In-process storage for tests and the developer harness.
///
/// Writes can be made to fail to simulate device policy denial.
#[derive(Default)]
pub struct InMemorySecureStorage {
    items: RwLock<HashMap<String, Vec<u8>>>,
    deny_writes: RwLock<Option<String>>,
}

impl InMemorySecureStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write and delete fail with `PolicyDenied(reason)`
    pub fn deny_writes(&self, reason: impl Into<String>) {
        *self.deny_writes.write() = Some(reason.into());
    }

    /// Lift a previous [`deny_writes`](Self::deny_writes)
    pub fn allow_writes(&self) {
        *self.deny_writes.write() = None;
    }

    /// Overwrite raw bytes, bypassing any policy (test corruption helper)
    pub fn put_raw(&self, key: &str, bytes: Vec<u8>) {
        self.items.write().insert(key.to_string(), bytes);
    }

    fn check_policy(&self) -> BackendResult<()> {
        match self.deny_writes.read().as_ref() {
            Some(reason) => Err(BackendError::PolicyDenied(reason.clone())),
            None => Ok(()),
        }
    }
}

impl SecureStorage for InMemorySecureStorage {
    fn exists(&self, key: &str) -> bool {
        self.items.read().contains_key(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> BackendResult<()> {
        self.check_policy()?;
        self.items.write().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn read(&self, key: &str) -> BackendResult<Vec<u8>> {
        self.items
            .read()
            .get(key)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    fn delete(&self, key: &str) -> BackendResult<()> {
        self.check_policy()?;
        self.items.write().remove(key);
        Ok(())
    }
}

/// One file per key in a private directory (desktop development).
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash never leaves a half-written record.
pub struct FileSecureStorage {
    dir: PathBuf,
}

impl FileSecureStorage {
    /// Use `dir`, creating it if needed
    pub fn new(dir: impl AsRef<Path>) -> BackendResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn file_name(key: &str) -> BackendResult<String> {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '_' { c } else { '_' })
            .collect();
        match file_name.as_str() {
            "" | "." | ".." => Err(BackendError::InvalidKey(key.to_string())),
            _ => Ok(file_name),
        }
    }

    fn path_for(&self, key: &str) -> BackendResult<PathBuf> {
        Ok(self.dir.join(Self::file_name(key)?))
    }
}

impl SecureStorage for FileSecureStorage {
    fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_ok_and(|path| path.is_file())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> BackendResult<()> {
        let file_name = Self::file_name(key)?;
        let path = self.dir.join(&file_name);
        let tmp = self.dir.join(format!("{}.tmp", file_name));
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read(&self, key: &str) -> BackendResult<Vec<u8>> {
        Ok(fs::read(self.path_for(key)?)?)
    }

    fn delete(&self, key: &str) -> BackendResult<()> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_roundtrip() {
        let storage = InMemorySecureStorage::new();
        assert!(!storage.exists("k"));
        storage.write("k", b"v").unwrap();
        assert!(storage.exists("k"));
        assert_eq!(storage.read("k").unwrap(), b"v");
        storage.delete("k").unwrap();
        assert_eq!(storage.read("k"), Err(BackendError::NotFound));
    }

    #[test]
    fn test_in_memory_policy_denial() {
        let storage = InMemorySecureStorage::new();
        storage.deny_writes("device locked");
        assert!(matches!(
            storage.write("k", b"v"),
            Err(BackendError::PolicyDenied(_))
        ));
        assert!(!storage.exists("k"));

        storage.allow_writes();
        storage.write("k", b"v").unwrap();
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSecureStorage::new(dir.path()).unwrap();

        assert!(!storage.exists("lnwallet.recovery_phrase.v1"));
        storage.write("lnwallet.recovery_phrase.v1", b"blob").unwrap();
        assert!(storage.exists("lnwallet.recovery_phrase.v1"));
        assert_eq!(storage.read("lnwallet.recovery_phrase.v1").unwrap(), b"blob");

        storage.delete("lnwallet.recovery_phrase.v1").unwrap();
        storage.delete("lnwallet.recovery_phrase.v1").unwrap();
        assert_eq!(
            storage.read("lnwallet.recovery_phrase.v1"),
            Err(BackendError::NotFound)
        );
    }

    #[test]
    fn test_file_storage_sanitizes_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSecureStorage::new(dir.path()).unwrap();
        storage.write("../escape", b"x").unwrap();
        assert!(dir.path().join(".._escape").is_file());
        assert_eq!(storage.read("../escape").unwrap(), b"x");
        assert!(!dir.path().join(".._escape.tmp").exists());
    }

    #[test]
    fn test_file_storage_temp_file_keeps_full_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileSecureStorage::new(dir.path()).unwrap();
        storage.write("wallet.v1", b"one").unwrap();
        storage.write("wallet.v2", b"two").unwrap();
        assert_eq!(storage.read("wallet.v1").unwrap(), b"one");
        assert_eq!(storage.read("wallet.v2").unwrap(), b"two");
    }

    #[test]
    fn test_file_storage_rejects_dot_keys() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("store");
        let storage = FileSecureStorage::new(&inner).unwrap();

        for key in ["", ".", ".."] {
            assert_eq!(
                storage.write(key, b"x"),
                Err(BackendError::InvalidKey(key.to_string()))
            );
            assert!(!storage.exists(key));
            assert!(matches!(storage.read(key), Err(BackendError::InvalidKey(_))));
            assert!(matches!(storage.delete(key), Err(BackendError::InvalidKey(_))));
        }
        assert!(inner.is_dir());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
