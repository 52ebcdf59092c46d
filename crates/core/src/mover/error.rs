//! Error types for the mover module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while moving a file into the library.
#[derive(Debug, Error)]
pub enum MoveError {
    /// Source file not found.
    #[error("source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Destination already exists and overwrite is disabled.
    #[error("destination already exists: {path}")]
    DestinationExists { path: PathBuf },

    /// Failed to create the destination directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to copy the file across filesystems.
    #[error("failed to copy file from {source} to {destination}: {error}")]
    CopyFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to rename the file.
    #[error("failed to move file from {source} to {destination}: {error}")]
    RenameFailed {
        source: PathBuf,
        destination: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Not enough space at the destination.
    #[error(
        "insufficient disk space at {path}: need {required_bytes} bytes, have {available_bytes}"
    )]
    InsufficientSpace {
        path: PathBuf,
        required_bytes: u64,
        available_bytes: u64,
    },

    /// Permission denied.
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// The destination path is not acceptable to the filesystem.
    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation was cancelled.
    #[error("move cancelled")]
    Cancelled,
}

impl MoveError {
    /// Creates a copy failed error.
    pub fn copy_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::CopyFailed {
            source,
            destination,
            error,
        }
    }

    /// Creates a rename failed error.
    pub fn rename_failed(source: PathBuf, destination: PathBuf, error: std::io::Error) -> Self {
        Self::RenameFailed {
            source,
            destination,
            error,
        }
    }
}
