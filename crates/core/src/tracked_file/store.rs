//! File storage trait and types.

use thiserror::Error;

use super::types::{FileStatus, TrackedFile};

/// Error type for file store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File not found.
    #[error("file not found: {0}")]
    NotFound(String),

    /// A file with the same content hash already exists.
    #[error("duplicate content hash: {0}")]
    DuplicateHash(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Trait for tracked file storage backends.
///
/// The store is the durability authority: the coordinator's in-memory view
/// of a file is advisory until `save` succeeds.
pub trait FileStore: Send + Sync {
    /// Inserts a newly discovered file.
    fn insert(&self, file: &TrackedFile) -> Result<(), StoreError>;

    /// Persists the current state of a file.
    fn save(&self, file: &TrackedFile) -> Result<(), StoreError>;

    /// Gets a file by content hash.
    fn find_by_hash(&self, hash: &str) -> Result<Option<TrackedFile>, StoreError>;

    /// Gets all files matching the given hashes in a single pass.
    ///
    /// Hashes with no matching row are simply absent from the result.
    fn find_by_hashes(&self, hashes: &[String]) -> Result<Vec<TrackedFile>, StoreError>;

    /// Lists active files with the given status.
    fn find_by_status(&self, status: FileStatus) -> Result<Vec<TrackedFile>, StoreError>;

    /// Lists all active files.
    fn all_active(&self) -> Result<Vec<TrackedFile>, StoreError>;
}
