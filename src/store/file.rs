//! File-backed durable store
//!
//! Persists each key as one JSON file in an XDG-compliant data directory
//! (`~/.local/share/leafwise/` on Linux), so history outlives a single
//! session the way the original per-origin store does.

use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::{StorageBackend, StoreError};

/// Durable store keeping one file per key
///
/// Keys map to `<data_dir>/<key>.json`. Callers are expected to use short
/// identifier-like keys; keys are not sanitized beyond what the filesystem
/// enforces.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where key files are stored
    data_dir: PathBuf,
}

impl FileStore {
    /// Creates a new FileStore using the XDG-compliant data directory.
    ///
    /// Returns `None` if no data directory can be determined (e.g., no home
    /// directory), in which case callers should fall back to an in-memory
    /// backend.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "leafwise")?;
        let data_dir = project_dirs.data_dir().to_path_buf();
        Some(Self { data_dir })
    }

    /// Creates a new FileStore with a custom directory.
    ///
    /// Useful for testing or when a specific storage location is needed.
    pub fn with_dir(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Returns the file path backing the given key
    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)?;
        fs::write(self.key_path(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::with_dir(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_save_creates_file_in_data_directory() {
        let (store, temp_dir) = create_test_store();

        store.save("scanHistory", "[]").expect("Save should succeed");

        let expected_path = temp_dir.path().join("scanHistory.json");
        assert!(expected_path.exists(), "Key file should exist");
        let content = fs::read_to_string(&expected_path).expect("Should read file");
        assert_eq!(content, "[]");
    }

    #[test]
    fn test_load_returns_none_for_missing_key() {
        let (store, _temp_dir) = create_test_store();

        let result = store.load("nonexistent").expect("Load should not error");

        assert!(result.is_none(), "Missing key should load as None");
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let (store, _temp_dir) = create_test_store();

        store.save("key", "{\"a\":1}").expect("Save should succeed");
        let result = store.load("key").expect("Load should succeed");

        assert_eq!(result.as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_save_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let nested = temp_dir.path().join("nested").join("store");
        let store = FileStore::with_dir(nested.clone());

        store.save("key", "1").expect("Save should succeed");

        assert!(nested.join("key.json").exists(), "Nested directory should be created");
    }

    #[test]
    fn test_remove_deletes_file() {
        let (store, temp_dir) = create_test_store();

        store.save("key", "1").expect("Save should succeed");
        store.remove("key").expect("Remove should succeed");

        assert!(!temp_dir.path().join("key.json").exists());
        assert!(store.load("key").expect("Load should succeed").is_none());
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let (store, _temp_dir) = create_test_store();

        store.remove("never_written").expect("Removing a missing key should not error");
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = FileStore::new() {
            let path_str = store.data_dir.to_string_lossy();
            assert!(
                path_str.contains("leafwise"),
                "Data path should contain project name"
            );
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }
}
