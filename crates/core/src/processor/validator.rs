//! Pre-flight validation of batch requests.
//!
//! The validator is the only component that performs filesystem existence
//! checks; everything downstream operates purely on entity state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::tracked_file::{FileStore, FileStatus, StoreError, TrackedFile};

/// Why a found file cannot be admitted to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// The file was logically deleted.
    Inactive,
    /// The file is marked moved but has no recorded destination.
    MovedWithoutDestination,
    /// The source file no longer exists on disk.
    SourceMissing,
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            InvalidReason::Inactive => "file is inactive",
            InvalidReason::MovedWithoutDestination => "file is moved but has no destination",
            InvalidReason::SourceMissing => "source file no longer exists on disk",
        };
        f.write_str(text)
    }
}

/// Result of validating a requested set of file identifiers.
///
/// Built once by [`BatchValidator::validate`]; read-only afterwards.
#[derive(Debug, Clone)]
pub struct BatchValidationResult {
    /// Hashes as requested.
    pub requested: Vec<String>,
    /// Found files keyed by content hash.
    pub found: HashMap<String, TrackedFile>,
    /// Requested hashes with no matching file.
    pub missing: Vec<String>,
    /// Found-but-unusable files, with the reason.
    pub invalid: HashMap<String, InvalidReason>,
    /// True when nothing is missing and nothing is invalid.
    pub is_valid: bool,
}

impl BatchValidationResult {
    /// Number of files that passed validation.
    pub fn valid_count(&self) -> usize {
        self.found.len() - self.invalid.len()
    }

    /// Share of requested files that passed validation, in percent.
    pub fn valid_percentage(&self) -> f32 {
        if self.requested.is_empty() {
            return 0.0;
        }
        (self.valid_count() as f32 / self.requested.len() as f32) * 100.0
    }

    /// The files that passed validation, in request order.
    pub fn valid_files(&self) -> Vec<TrackedFile> {
        self.requested
            .iter()
            .filter(|hash| !self.invalid.contains_key(*hash))
            .filter_map(|hash| self.found.get(hash).cloned())
            .collect()
    }
}

/// Screens requested identifiers against current state before a batch is
/// admitted to the coordinator.
pub struct BatchValidator {
    store: Arc<dyn FileStore>,
}

impl BatchValidator {
    /// Creates a validator over the given store.
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// Validates the identifiers in one bulk lookup.
    pub fn validate(&self, hashes: &[String]) -> Result<BatchValidationResult, StoreError> {
        let mut deduped = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if !deduped.contains(hash) {
                deduped.push(hash.clone());
            }
        }

        let files = self.store.find_by_hashes(&deduped)?;
        let found: HashMap<String, TrackedFile> = files
            .into_iter()
            .map(|f| (f.content_hash.clone(), f))
            .collect();

        let missing: Vec<String> = deduped
            .iter()
            .filter(|hash| !found.contains_key(*hash))
            .cloned()
            .collect();

        let mut invalid = HashMap::new();
        for (hash, file) in &found {
            if let Some(reason) = Self::check_file(file) {
                invalid.insert(hash.clone(), reason);
            }
        }

        let is_valid = missing.is_empty() && invalid.is_empty();
        Ok(BatchValidationResult {
            requested: deduped,
            found,
            missing,
            invalid,
            is_valid,
        })
    }

    fn check_file(file: &TrackedFile) -> Option<InvalidReason> {
        if !file.active {
            return Some(InvalidReason::Inactive);
        }
        if file.status == FileStatus::Moved {
            if file.moved_to_path.is_none() {
                return Some(InvalidReason::MovedWithoutDestination);
            }
            return None;
        }
        if !file.original_path.exists() {
            return Some(InvalidReason::SourceMissing);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryFileStore;
    use std::path::Path;
    use tempfile::TempDir;

    fn store_with(files: Vec<TrackedFile>) -> Arc<dyn FileStore> {
        let store = MemoryFileStore::new();
        for file in &files {
            store.insert(file).unwrap();
        }
        Arc::new(store)
    }

    fn on_disk_file(dir: &TempDir, hash: &str, name: &str) -> TrackedFile {
        let path = dir.path().join(name);
        std::fs::write(&path, b"content").unwrap();
        TrackedFile::discovered(hash, name, path, 7)
    }

    #[test]
    fn test_all_valid() {
        let dir = TempDir::new().unwrap();
        let store = store_with(vec![
            on_disk_file(&dir, "h1", "a.mkv"),
            on_disk_file(&dir, "h2", "b.mkv"),
        ]);
        let validator = BatchValidator::new(store);

        let result = validator
            .validate(&["h1".to_string(), "h2".to_string()])
            .unwrap();
        assert!(result.is_valid);
        assert_eq!(result.valid_count(), 2);
        assert_eq!(result.valid_percentage(), 100.0);
        assert!(result.missing.is_empty());
    }

    #[test]
    fn test_missing_hashes() {
        let dir = TempDir::new().unwrap();
        let store = store_with(vec![on_disk_file(&dir, "h1", "a.mkv")]);
        let validator = BatchValidator::new(store);

        let result = validator
            .validate(&["h1".to_string(), "ghost".to_string()])
            .unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.missing, vec!["ghost"]);
        assert_eq!(result.valid_count(), 1);
        assert_eq!(result.valid_percentage(), 50.0);
    }

    #[test]
    fn test_inactive_flagged() {
        let dir = TempDir::new().unwrap();
        let mut file = on_disk_file(&dir, "h1", "a.mkv");
        file.deactivate();
        let validator = BatchValidator::new(store_with(vec![file]));

        let result = validator.validate(&["h1".to_string()]).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.invalid.get("h1"), Some(&InvalidReason::Inactive));
    }

    #[test]
    fn test_source_missing_flagged() {
        let file = TrackedFile::discovered("h1", "gone.mkv", "/nonexistent/gone.mkv", 7);
        let validator = BatchValidator::new(store_with(vec![file]));

        let result = validator.validate(&["h1".to_string()]).unwrap();
        assert_eq!(result.invalid.get("h1"), Some(&InvalidReason::SourceMissing));
    }

    #[test]
    fn test_moved_without_destination_flagged() {
        let mut file = TrackedFile::discovered("h1", "a.mkv", "/nonexistent/a.mkv", 7);
        file.confirm_category("tv", Path::new("/library/a.mkv")).unwrap();
        file.begin_move().unwrap();
        file.mark_as_moved(Path::new("/library/a.mkv")).unwrap();
        // Corrupted audit trail: moved with no destination recorded.
        file.moved_to_path = None;
        let validator = BatchValidator::new(store_with(vec![file]));

        let result = validator.validate(&["h1".to_string()]).unwrap();
        assert_eq!(
            result.invalid.get("h1"),
            Some(&InvalidReason::MovedWithoutDestination)
        );
    }

    #[test]
    fn test_moved_with_destination_skips_disk_check() {
        // A moved file's original path is expected to be gone; that is not
        // an invalidity.
        let mut file = TrackedFile::discovered("h1", "a.mkv", "/nonexistent/a.mkv", 7);
        file.confirm_category("tv", Path::new("/library/a.mkv")).unwrap();
        file.begin_move().unwrap();
        file.mark_as_moved(Path::new("/library/a.mkv")).unwrap();
        let validator = BatchValidator::new(store_with(vec![file]));

        let result = validator.validate(&["h1".to_string()]).unwrap();
        assert!(result.is_valid);
    }

    #[test]
    fn test_duplicate_hashes_deduped() {
        let dir = TempDir::new().unwrap();
        let store = store_with(vec![on_disk_file(&dir, "h1", "a.mkv")]);
        let validator = BatchValidator::new(store);

        let result = validator
            .validate(&["h1".to_string(), "h1".to_string()])
            .unwrap();
        assert_eq!(result.requested.len(), 1);
        assert!(result.is_valid);
    }

    #[test]
    fn test_valid_files_preserve_request_order() {
        let dir = TempDir::new().unwrap();
        let store = store_with(vec![
            on_disk_file(&dir, "h1", "a.mkv"),
            on_disk_file(&dir, "h2", "b.mkv"),
        ]);
        let validator = BatchValidator::new(store);

        let result = validator
            .validate(&["h2".to_string(), "h1".to_string()])
            .unwrap();
        let hashes: Vec<_> = result
            .valid_files()
            .into_iter()
            .map(|f| f.content_hash)
            .collect();
        assert_eq!(hashes, vec!["h2", "h1"]);
    }

    #[test]
    fn test_empty_request() {
        let validator = BatchValidator::new(store_with(vec![]));
        let result = validator.validate(&[]).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.valid_percentage(), 0.0);
    }
}
