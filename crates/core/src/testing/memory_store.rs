//! In-memory file store for tests.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::tracked_file::{FileStatus, FileStore, StoreError, TrackedFile};

/// In-memory implementation of [`FileStore`].
///
/// Keeps everything in a `HashMap` behind a `RwLock`. Not meant for
/// production use; the daemon uses the SQLite store.
#[derive(Default)]
pub struct MemoryFileStore {
    files: RwLock<HashMap<String, TrackedFile>>,
}

impl MemoryFileStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files, active or not.
    pub fn len(&self) -> usize {
        self.files.read().unwrap().len()
    }

    /// Returns true when the store holds no files.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FileStore for MemoryFileStore {
    fn insert(&self, file: &TrackedFile) -> Result<(), StoreError> {
        let mut files = self.files.write().unwrap();
        if files.contains_key(&file.content_hash) {
            return Err(StoreError::DuplicateHash(file.content_hash.clone()));
        }
        files.insert(file.content_hash.clone(), file.clone());
        Ok(())
    }

    fn save(&self, file: &TrackedFile) -> Result<(), StoreError> {
        let mut files = self.files.write().unwrap();
        if !files.contains_key(&file.content_hash) {
            return Err(StoreError::NotFound(file.content_hash.clone()));
        }
        files.insert(file.content_hash.clone(), file.clone());
        Ok(())
    }

    fn find_by_hash(&self, hash: &str) -> Result<Option<TrackedFile>, StoreError> {
        Ok(self.files.read().unwrap().get(hash).cloned())
    }

    fn find_by_hashes(&self, hashes: &[String]) -> Result<Vec<TrackedFile>, StoreError> {
        let files = self.files.read().unwrap();
        Ok(hashes.iter().filter_map(|h| files.get(h).cloned()).collect())
    }

    fn find_by_status(&self, status: FileStatus) -> Result<Vec<TrackedFile>, StoreError> {
        let files = self.files.read().unwrap();
        let mut matching: Vec<TrackedFile> = files
            .values()
            .filter(|f| f.active && f.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(matching)
    }

    fn all_active(&self) -> Result<Vec<TrackedFile>, StoreError> {
        let files = self.files.read().unwrap();
        let mut active: Vec<TrackedFile> =
            files.values().filter(|f| f.active).cloned().collect();
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_save_find() {
        let store = MemoryFileStore::new();
        let mut file = TrackedFile::discovered("h1", "a.mkv", "/in/a.mkv", 10);
        store.insert(&file).unwrap();

        file.mark_as_classified("tv", 0.9).unwrap();
        store.save(&file).unwrap();

        let found = store.find_by_hash("h1").unwrap().unwrap();
        assert_eq!(found.status, FileStatus::Classified);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let store = MemoryFileStore::new();
        let file = TrackedFile::discovered("h1", "a.mkv", "/in/a.mkv", 10);
        store.insert(&file).unwrap();
        assert!(matches!(
            store.insert(&file),
            Err(StoreError::DuplicateHash(_))
        ));
    }

    #[test]
    fn test_save_requires_existing() {
        let store = MemoryFileStore::new();
        let file = TrackedFile::discovered("h1", "a.mkv", "/in/a.mkv", 10);
        assert!(matches!(store.save(&file), Err(StoreError::NotFound(_))));
    }
}
