//! Types for the processor module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::tracked_file::{FileStatus, MetadataValue};
use crate::triage::ErrorClassification;

/// One file in a batch request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    /// Content hash identifying the tracked file.
    pub content_hash: String,

    /// Category confirmed by the caller.
    pub confirmed_category: String,

    /// Custom target path. When absent, the target is derived as
    /// `<library_root>/<category>/<file_name>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<PathBuf>,

    /// Typed metadata to merge into the tracked file.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl BatchEntry {
    /// Creates an entry with just hash and category.
    pub fn new(content_hash: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            content_hash: content_hash.into(),
            confirmed_category: category.into(),
            target_path: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Sets a custom target path.
    pub fn with_target(mut self, target: impl Into<PathBuf>) -> Self {
        self.target_path = Some(target.into());
        self
    }
}

/// Options governing a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Keep processing after an unrecoverable per-file failure. When false
    /// (the default), the first failure aborts all unstarted files.
    #[serde(default)]
    pub continue_on_error: bool,

    /// Check target paths for characters and lengths the filesystem will
    /// reject before attempting the move.
    #[serde(default = "default_true")]
    pub validate_target_paths: bool,

    /// Create missing target directories.
    #[serde(default = "default_true")]
    pub create_directories: bool,

    /// Classify and validate only; perform no move and persist nothing.
    #[serde(default)]
    pub dry_run: bool,

    /// Optional display name for the batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_name: Option<String>,

    /// Per-batch concurrency override, clamped to
    /// [`MIN_CONCURRENCY`](super::MIN_CONCURRENCY)..=[`MAX_CONCURRENCY`](super::MAX_CONCURRENCY).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            validate_target_paths: true,
            create_directories: true,
            dry_run: false,
            batch_name: None,
            max_concurrency: None,
        }
    }
}

/// A caller-submitted batch of files to confirm and move together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Files to process.
    pub entries: Vec<BatchEntry>,

    /// Batch options.
    #[serde(default)]
    pub options: BatchOptions,
}

impl BatchRequest {
    /// Creates a request with default options.
    pub fn new(entries: Vec<BatchEntry>) -> Self {
        Self {
            entries,
            options: BatchOptions::default(),
        }
    }

    /// Requested content hashes, in request order.
    pub fn hashes(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.content_hash.clone()).collect()
    }
}

/// Outcome of one file within a batch.
///
/// Built once when the file finishes (or is skipped); read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    /// Content hash of the file.
    pub content_hash: String,
    /// File name, for display.
    pub file_name: String,
    /// Whether the file completed its workflow.
    pub succeeded: bool,
    /// Whether the file was never started (batch aborted or cancelled).
    pub skipped: bool,
    /// Status the file ended the batch in.
    pub final_status: FileStatus,
    /// Where the file landed (or, for a dry run, would land).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_to: Option<PathBuf>,
    /// Triage result when the file failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorClassification>,
}

impl FileOutcome {
    /// Shorthand for a file that was never dispatched.
    pub fn skipped(content_hash: impl Into<String>, file_name: impl Into<String>, status: FileStatus) -> Self {
        Self {
            content_hash: content_hash.into(),
            file_name: file_name.into(),
            succeeded: false,
            skipped: true,
            final_status: status,
            moved_to: None,
            error: None,
        }
    }
}

/// Aggregate result of a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Batch display name, if the request named it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_name: Option<String>,
    /// Total files in the batch.
    pub total: usize,
    /// Files that completed their workflow.
    pub succeeded: usize,
    /// Files that failed.
    pub failed: usize,
    /// Files never started (abort or cancellation).
    pub skipped: usize,
    /// Per-file outcomes, in completion order.
    pub outcomes: Vec<FileOutcome>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Whether the batch was cut short by the cancellation signal.
    pub cancelled: bool,
}

impl BatchResult {
    /// Builds the aggregate from per-file outcomes.
    pub fn from_outcomes(
        batch_name: Option<String>,
        outcomes: Vec<FileOutcome>,
        duration_ms: u64,
        cancelled: bool,
    ) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded).count();
        let skipped = outcomes.iter().filter(|o| o.skipped).count();
        let failed = outcomes.len() - succeeded - skipped;
        Self {
            batch_name,
            total: outcomes.len(),
            succeeded,
            failed,
            skipped,
            outcomes,
            duration_ms,
            cancelled,
        }
    }

    /// True when every file completed its workflow.
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0 && !self.cancelled
    }
}
