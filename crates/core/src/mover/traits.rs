//! Trait definitions for the mover module.

use async_trait::async_trait;
use std::path::PathBuf;

use super::error::MoveError;

/// A single move request.
#[derive(Debug, Clone)]
pub struct MoveRequest {
    /// Content hash of the file being moved (for tracking).
    pub content_hash: String,
    /// Source file path.
    pub source: PathBuf,
    /// Destination file path.
    pub destination: PathBuf,
    /// Whether to overwrite an existing destination.
    pub overwrite: bool,
    /// Whether to create missing destination directories.
    pub create_directories: bool,
}

/// Outcome of a successful move.
#[derive(Debug, Clone)]
pub struct MovedFile {
    /// Content hash of the moved file.
    pub content_hash: String,
    /// Path the file landed at.
    pub destination: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Whether the move was a single atomic rename.
    pub atomic: bool,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// A mover that relocates files into the library.
#[async_trait]
pub trait FileMover: Send + Sync {
    /// Returns the name of this mover implementation.
    fn name(&self) -> &str;

    /// Moves a file according to the request.
    async fn move_file(&self, request: MoveRequest) -> Result<MovedFile, MoveError>;

    /// Validates that the mover is properly configured and ready.
    async fn validate(&self) -> Result<(), MoveError>;
}
