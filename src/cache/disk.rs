//! On-disk cache store
//!
//! One JSON file per entry under the cache directory. File names are the
//! SHA-256 of the key, so arbitrary URLs never hit filesystem naming rules.
//! Unreadable or corrupt files count as misses and are removed.

use crate::cache::{CacheEntry, CacheError, CacheStore};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub struct DiskStore {
    directory: PathBuf,
}

impl DiskStore {
    /// Opens (creating if needed) a disk store rooted at `directory`
    ///
    /// Failure here means the cache store is unusable and is treated as
    /// fatal by the caller.
    pub fn new(directory: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(directory)?;
        Ok(Self {
            directory: directory.to_path_buf(),
        })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.directory
            .join(format!("{}.json", hex::encode(hasher.finalize())))
    }
}

impl CacheStore for DiskStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.entry_path(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                tracing::warn!("unreadable cache file {}: {}", path.display(), e);
                return Ok(None);
            }
        };

        match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                tracing::warn!("corrupt cache file {}: {}", path.display(), e);
                let _ = std::fs::remove_file(&path);
                Ok(None)
            }
        }
    }

    fn put(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let content = serde_json::to_string(&entry)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Io(e)),
        }
    }

    fn len(&self) -> Result<usize, CacheError> {
        let mut count = 0;
        for entry in std::fs::read_dir(&self.directory)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path()).unwrap();
        let entry = CacheEntry::new("<html>x</html>".to_string(), 42);

        store.put("https://example.com/page?q=1", entry.clone()).unwrap();
        let back = store.get("https://example.com/page?q=1").unwrap().unwrap();
        assert_eq!(back.payload, entry.payload);
        assert_eq!(back.checksum, entry.checksum);
        assert_eq!(back.fetched_at, 42);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path()).unwrap();
        assert!(store.get("absent").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_treated_as_miss_and_removed() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path()).unwrap();
        let path = store.entry_path("key");
        std::fs::write(&path, "not json").unwrap();

        assert!(store.get("key").unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = DiskStore::new(dir.path()).unwrap();
        store.remove("never-written").unwrap();
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = DiskStore::new(dir.path()).unwrap();
            store
                .put("k", CacheEntry::new("persisted".to_string(), 7))
                .unwrap();
        }
        let store = DiskStore::new(dir.path()).unwrap();
        assert_eq!(store.get("k").unwrap().unwrap().payload, "persisted");
    }
}
