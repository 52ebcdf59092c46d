//! Types for failure triage.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Kind of a classified file-operation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Expected to resolve without user action (timeout, transient I/O,
    /// lock contention).
    Transient,
    /// Access or permission denied.
    Permission,
    /// Insufficient space at the target.
    Space,
    /// Malformed, too-long or otherwise invalid path.
    Path,
    /// Nothing matched; needs manual investigation.
    Unknown,
}

impl ErrorKind {
    /// Returns the kind as a string (for metrics labels and storage).
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transient => "transient",
            ErrorKind::Permission => "permission",
            ErrorKind::Space => "space",
            ErrorKind::Path => "path",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The file operation that was running when the failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOperation {
    Classify,
    Move,
    Scan,
    Persist,
}

impl std::fmt::Display for FileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FileOperation::Classify => "classify",
            FileOperation::Move => "move",
            FileOperation::Scan => "scan",
            FileOperation::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// Everything triage knows about a failure.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// The failure message as reported by the operation.
    pub message: String,
    /// Which operation failed.
    pub operation: FileOperation,
    /// Source path, if the operation had one.
    pub source_path: Option<PathBuf>,
    /// Target path, if the operation had one.
    pub target_path: Option<PathBuf>,
    /// Size of the file being operated on.
    pub file_size: Option<u64>,
    /// Bytes available at the target at failure time.
    pub available_space: Option<u64>,
    /// Retries already recorded against the file.
    pub prior_retries: u32,
}

impl ErrorContext {
    /// Creates a context with just a message and operation.
    pub fn new(operation: FileOperation, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            operation,
            source_path: None,
            target_path: None,
            file_size: None,
            available_space: None,
            prior_retries: 0,
        }
    }

    /// Attaches source and target paths.
    pub fn with_paths(mut self, source: Option<PathBuf>, target: Option<PathBuf>) -> Self {
        self.source_path = source;
        self.target_path = target;
        self
    }

    /// Attaches the file size and available space at the target.
    pub fn with_space(mut self, file_size: Option<u64>, available: Option<u64>) -> Self {
        self.file_size = file_size;
        self.available_space = available;
        self
    }

    /// Attaches the prior retry count.
    pub fn with_prior_retries(mut self, retries: u32) -> Self {
        self.prior_retries = retries;
        self
    }
}

/// Result of triaging a failure.
///
/// Built once by [`classify`](super::classify); read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorClassification {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Whether retrying without user action can succeed.
    pub can_retry: bool,
    /// Whether the user has to act before this file can proceed.
    pub requires_user_intervention: bool,
    /// Recommended delay before the next attempt.
    pub retry_delay: Duration,
    /// Recommended maximum attempts.
    pub max_attempts: u32,
    /// Short message suitable for display.
    pub user_message: String,
    /// The underlying failure, verbatim.
    pub technical_detail: String,
    /// Ordered steps the user can take to resolve the failure.
    pub resolution_steps: Vec<String>,
    /// How confident the triage rule is (0.0-1.0).
    pub confidence: f32,
}
