//! Discovery scanner: walks configured roots and tracks unseen files.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, BufReader};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::events::{EventHandle, FileEvent};
use crate::metrics;
use crate::tracked_file::{FileStore, StoreError, TrackedFile};

use super::config::ScannerConfig;

const HASH_BUFFER_SIZE: usize = 256 * 1024;

/// Error type for scan runs.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A scan root does not exist or is not a directory.
    #[error("scan root is not a directory: {0}")]
    InvalidRoot(PathBuf),

    /// The file store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Summary of one scan run.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Files that matched the extension filter.
    pub candidates: usize,
    /// Files newly tracked in this run.
    pub new_files: usize,
    /// Files whose hash was already tracked.
    pub known_files: usize,
    /// Files skipped (unreadable, too small).
    pub skipped: usize,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Walks the configured roots, hashes candidate files and creates `New`
/// tracked files for unseen content hashes.
pub struct Scanner {
    config: ScannerConfig,
    store: Arc<dyn FileStore>,
    events: Option<EventHandle>,
}

impl Scanner {
    /// Creates a scanner.
    pub fn new(config: ScannerConfig, store: Arc<dyn FileStore>) -> Self {
        Self {
            config,
            store,
            events: None,
        }
    }

    /// Sets the event handle for discovery notifications.
    pub fn with_events(mut self, events: EventHandle) -> Self {
        self.events = Some(events);
        self
    }

    /// The configured poll interval.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.config.poll_interval_secs.max(1))
    }

    /// Runs one scan over all roots.
    pub async fn scan(&self) -> Result<ScanSummary, ScanError> {
        let start = Instant::now();
        let mut summary = ScanSummary::default();

        for root in &self.config.roots {
            if !root.is_dir() {
                return Err(ScanError::InvalidRoot(root.clone()));
            }
            self.scan_root(root, &mut summary).await?;
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            candidates = summary.candidates,
            new = summary.new_files,
            known = summary.known_files,
            skipped = summary.skipped,
            duration_ms = summary.duration_ms,
            "Scan finished"
        );
        Ok(summary)
    }

    async fn scan_root(&self, root: &Path, summary: &mut ScanSummary) -> Result<(), ScanError> {
        // The directory walk is blocking I/O; keep it off the worker pool.
        let root_buf = root.to_path_buf();
        let extensions = self.config.extensions.clone();
        let candidates: Vec<(PathBuf, u64)> = tokio::task::spawn_blocking(move || {
            WalkDir::new(&root_buf)
                .follow_links(false)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| {
                    entry
                        .path()
                        .extension()
                        .map(|ext| {
                            let ext = ext.to_string_lossy().to_lowercase();
                            extensions.iter().any(|e| *e == ext)
                        })
                        .unwrap_or(false)
                })
                .filter_map(|entry| {
                    entry
                        .metadata()
                        .ok()
                        .map(|meta| (entry.into_path(), meta.len()))
                })
                .collect()
        })
        .await
        .unwrap_or_default();

        for (path, size) in candidates {
            summary.candidates += 1;

            if size < self.config.min_file_size_bytes {
                summary.skipped += 1;
                metrics::FILES_DISCOVERED.with_label_values(&["skipped"]).inc();
                continue;
            }

            let hash = match hash_file(&path).await {
                Ok(hash) => hash,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to hash file, skipping");
                    summary.skipped += 1;
                    metrics::FILES_DISCOVERED.with_label_values(&["skipped"]).inc();
                    continue;
                }
            };

            if self.store.find_by_hash(&hash)?.is_some() {
                summary.known_files += 1;
                metrics::FILES_DISCOVERED.with_label_values(&["known"]).inc();
                continue;
            }

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let file = TrackedFile::discovered(&hash, &file_name, &path, size);

            match self.store.insert(&file) {
                Ok(()) => {
                    summary.new_files += 1;
                    metrics::FILES_DISCOVERED.with_label_values(&["new"]).inc();
                    debug!(hash = %hash, file = %file_name, "Tracking new file");
                    if let Some(ref events) = self.events {
                        events
                            .emit(FileEvent::FileDiscovered {
                                content_hash: hash,
                                file_name,
                                size_bytes: size,
                            })
                            .await;
                    }
                }
                Err(StoreError::DuplicateHash(_)) => {
                    // Another copy of the same content showed up mid-scan.
                    summary.known_files += 1;
                    metrics::FILES_DISCOVERED.with_label_values(&["known"]).inc();
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}

/// Streaming SHA-256 of a file's content, as a lowercase hex digest.
pub async fn hash_file(path: &Path) -> Result<String, std::io::Error> {
    let file = File::open(path).await?;
    let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer).await?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
