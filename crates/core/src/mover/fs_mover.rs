//! File system mover implementation.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};

use super::config::MoverConfig;
use super::error::MoveError;
use super::traits::{FileMover, MoveRequest, MovedFile};

/// File system based mover.
///
/// Prefers an atomic rename; falls back to copy-then-delete when the source
/// and destination live on different filesystems.
pub struct FsMover {
    config: MoverConfig,
}

impl FsMover {
    /// Creates a new file system mover with the given configuration.
    pub fn new(config: MoverConfig) -> Self {
        Self { config }
    }

    /// Creates a mover with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MoverConfig::default())
    }

    /// Attempts an atomic rename. Returns Ok(false) when the rename cannot
    /// work because the paths are on different filesystems.
    async fn try_atomic_move(source: &Path, destination: &Path) -> Result<bool, std::io::Error> {
        match fs::rename(source, destination).await {
            Ok(()) => Ok(true),
            Err(e) => {
                // Cross-filesystem moves fail with EXDEV (18 on Linux).
                if e.kind() == std::io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                    Ok(false)
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Copies the file, returning the number of bytes written.
    async fn copy_file(&self, source: &Path, destination: &Path) -> Result<u64, MoveError> {
        let source_file = File::open(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MoveError::SourceNotFound {
                    path: source.to_path_buf(),
                }
            } else {
                self.map_io_error(e, source, 0)
            }
        })?;
        let source_len = source_file
            .metadata()
            .await
            .map_err(|e| MoveError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e))?
            .len();

        let dest_file = File::create(destination)
            .await
            .map_err(|e| self.map_io_error(e, destination, source_len))?;

        let mut reader = BufReader::with_capacity(self.config.buffer_size, source_file);
        let mut writer = BufWriter::with_capacity(self.config.buffer_size, dest_file);

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; self.config.buffer_size];

        loop {
            let bytes_read = reader.read(&mut buffer).await.map_err(|e| {
                MoveError::copy_failed(source.to_path_buf(), destination.to_path_buf(), e)
            })?;
            if bytes_read == 0 {
                break;
            }
            writer
                .write_all(&buffer[..bytes_read])
                .await
                .map_err(|e| self.map_io_error(e, destination, source_len))?;
            total_bytes += bytes_read as u64;
        }

        writer
            .flush()
            .await
            .map_err(|e| self.map_io_error(e, destination, source_len))?;

        Ok(total_bytes)
    }

    /// Maps low-level I/O failures to the mover's error taxonomy.
    fn map_io_error(&self, error: std::io::Error, path: &Path, required_bytes: u64) -> MoveError {
        match error.kind() {
            std::io::ErrorKind::StorageFull => MoveError::InsufficientSpace {
                path: path.to_path_buf(),
                required_bytes,
                // statvfs is not consulted; the exact free count is unknown
                // at this point and triage only needs the shortfall signal.
                available_bytes: 0,
            },
            std::io::ErrorKind::PermissionDenied => MoveError::PermissionDenied {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::InvalidFilename | std::io::ErrorKind::InvalidInput => {
                MoveError::InvalidPath {
                    path: path.to_path_buf(),
                    reason: error.to_string(),
                }
            }
            _ if error.raw_os_error() == Some(28) => MoveError::InsufficientSpace {
                path: path.to_path_buf(),
                required_bytes,
                available_bytes: 0,
            },
            _ if error.raw_os_error() == Some(36) => MoveError::InvalidPath {
                path: path.to_path_buf(),
                reason: "file name too long".to_string(),
            },
            _ => MoveError::Io(error),
        }
    }

    async fn ensure_parent_dirs(&self, path: &Path) -> Result<(), MoveError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| MoveError::DirectoryCreationFailed {
                        path: parent.to_path_buf(),
                        source: e,
                    })?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl FileMover for FsMover {
    fn name(&self) -> &str {
        "fs"
    }

    async fn move_file(&self, request: MoveRequest) -> Result<MovedFile, MoveError> {
        let start = Instant::now();
        let source: PathBuf = request.source.clone();
        let destination: PathBuf = request.destination.clone();

        let source_meta = fs::metadata(&source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MoveError::SourceNotFound {
                    path: source.clone(),
                }
            } else {
                self.map_io_error(e, &source, 0)
            }
        })?;
        let size_bytes = source_meta.len();

        if destination.exists() && !request.overwrite {
            return Err(MoveError::DestinationExists { path: destination });
        }

        if request.create_directories || self.config.create_directories {
            self.ensure_parent_dirs(&destination).await?;
        }

        let atomic = if self.config.prefer_atomic_moves {
            Self::try_atomic_move(&source, &destination)
                .await
                .map_err(|e| self.map_io_error(e, &destination, size_bytes))?
        } else {
            false
        };

        if !atomic {
            self.copy_file(&source, &destination).await?;
            // Copy succeeded; the source is cleaned up best-effort. A
            // leftover source never corrupts the library.
            if let Err(e) = fs::remove_file(&source).await {
                tracing::warn!(
                    source = %source.display(),
                    error = %e,
                    "Moved file but failed to remove source"
                );
            }
        }

        Ok(MovedFile {
            content_hash: request.content_hash,
            destination,
            size_bytes,
            atomic,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), MoveError> {
        if self.config.buffer_size == 0 {
            return Err(MoveError::InvalidPath {
                path: PathBuf::new(),
                reason: "buffer_size must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
