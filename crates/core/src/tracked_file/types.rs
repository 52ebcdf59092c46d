//! Core tracked file data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Error raised when a state transition is called with invalid arguments.
///
/// A failed transition never mutates the entity.
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    /// A transition argument violated its contract.
    #[error("invalid {field}: {reason}")]
    InvalidArgument {
        field: &'static str,
        reason: String,
    },

    /// The transition is not allowed from the current status.
    #[error("cannot {operation} from status {status}")]
    InvalidStatus {
        operation: &'static str,
        status: FileStatus,
    },
}

impl TransitionError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }
}

/// Typed metadata value attached to a tracked file or batch entry.
///
/// A closed variant set instead of an open JSON bag, so everything that
/// lands in the store round-trips without reflection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetadataValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

/// Lifecycle status of a tracked file.
///
/// State machine flow:
/// ```text
/// New -> Processing -> Classified -> ReadyToMove -> Moving -> Moved
///
/// Any non-terminal state can transition to Error or Retry via record_error,
/// and back into Processing on the next attempt. Moved and Ignored are
/// terminal.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// Discovered on disk, not yet processed.
    New,
    /// Claimed by a batch, classification in progress.
    Processing,
    /// Category suggested by the classifier.
    Classified,
    /// Category confirmed, target path assigned.
    ReadyToMove,
    /// Move to the library in progress.
    Moving,
    /// Moved into the library (terminal).
    Moved,
    /// Failed with a non-retryable error.
    Error,
    /// Failed with a retryable error, waiting for the next attempt.
    Retry,
    /// Excluded from processing by the user (terminal).
    Ignored,
}

impl FileStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Moved | FileStatus::Ignored)
    }

    /// Returns true if the file is waiting for user action.
    pub fn needs_attention(&self) -> bool {
        matches!(self, FileStatus::Error)
    }

    /// Returns true if the file can be picked up by a batch.
    pub fn is_processable(&self) -> bool {
        matches!(
            self,
            FileStatus::New | FileStatus::Classified | FileStatus::ReadyToMove | FileStatus::Retry
        )
    }

    /// Returns the status as a string (for filtering and storage).
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::New => "new",
            FileStatus::Processing => "processing",
            FileStatus::Classified => "classified",
            FileStatus::ReadyToMove => "ready_to_move",
            FileStatus::Moving => "moving",
            FileStatus::Moved => "moved",
            FileStatus::Error => "error",
            FileStatus::Retry => "retry",
            FileStatus::Ignored => "ignored",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media file under management, identified by its content hash.
///
/// All mutation goes through the named transition methods below; fields are
/// public for reading and store serialization, but direct assignment outside
/// this module and the stores is a bug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedFile {
    /// SHA-256 hex digest of the file content. Unique, immutable.
    pub content_hash: String,

    /// File name as discovered.
    pub file_name: String,

    /// Absolute path where the file was discovered.
    pub original_path: PathBuf,

    /// File size in bytes at discovery time.
    pub size_bytes: u64,

    /// Current lifecycle status.
    pub status: FileStatus,

    /// Category suggested by the classifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_category: Option<String>,

    /// Classifier confidence in the suggestion (0.0-1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// Category confirmed by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmed_category: Option<String>,

    /// Target path assigned at confirmation. Preserved after the move
    /// for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<PathBuf>,

    /// Path the file actually landed at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_to_path: Option<PathBuf>,

    /// Most recent error message. Overwritten on each failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,

    /// When the most recent error was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error_at: Option<DateTime<Utc>>,

    /// Number of failures recorded against this file. Never decreases.
    #[serde(default)]
    pub retry_count: u32,

    /// Logical deletion flag. Inactive files are never processed.
    #[serde(default = "default_active")]
    pub active: bool,

    /// Caller-supplied metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, MetadataValue>,

    /// When the file was discovered.
    pub created_at: DateTime<Utc>,

    /// When classification succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classified_at: Option<DateTime<Utc>>,

    /// When the move completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_at: Option<DateTime<Utc>>,

    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl TrackedFile {
    /// Creates a newly discovered file in status `New`.
    pub fn discovered(
        content_hash: impl Into<String>,
        file_name: impl Into<String>,
        original_path: impl Into<PathBuf>,
        size_bytes: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            content_hash: content_hash.into(),
            file_name: file_name.into(),
            original_path: original_path.into(),
            size_bytes,
            status: FileStatus::New,
            suggested_category: None,
            confidence: None,
            confirmed_category: None,
            target_path: None,
            moved_to_path: None,
            last_error: None,
            last_error_at: None,
            retry_count: 0,
            active: true,
            metadata: BTreeMap::new(),
            created_at: now,
            classified_at: None,
            moved_at: None,
            updated_at: now,
        }
    }

    /// Claims the file for processing within a batch.
    pub fn begin_processing(&mut self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::InvalidStatus {
                operation: "begin processing",
                status: self.status,
            });
        }
        self.set_status(FileStatus::Processing);
        Ok(())
    }

    /// Records the classifier's suggestion and moves to `Classified`.
    ///
    /// Fails without mutating if the category is empty or the confidence is
    /// outside [0, 1].
    pub fn mark_as_classified(
        &mut self,
        category: &str,
        confidence: f32,
    ) -> Result<(), TransitionError> {
        if category.trim().is_empty() {
            return Err(TransitionError::invalid("category", "must not be empty"));
        }
        if !(0.0..=1.0).contains(&confidence) || confidence.is_nan() {
            return Err(TransitionError::invalid(
                "confidence",
                format!("{confidence} is outside [0.0, 1.0]"),
            ));
        }
        self.suggested_category = Some(category.to_string());
        self.confidence = Some(confidence);
        self.classified_at = Some(Utc::now());
        self.set_status(FileStatus::Classified);
        Ok(())
    }

    /// Confirms the category and assigns the target path, moving to
    /// `ReadyToMove`.
    pub fn confirm_category(
        &mut self,
        category: &str,
        target_path: &std::path::Path,
    ) -> Result<(), TransitionError> {
        if category.trim().is_empty() {
            return Err(TransitionError::invalid("category", "must not be empty"));
        }
        if target_path.as_os_str().is_empty() {
            return Err(TransitionError::invalid("target_path", "must not be empty"));
        }
        self.confirmed_category = Some(category.to_string());
        self.target_path = Some(target_path.to_path_buf());
        self.set_status(FileStatus::ReadyToMove);
        Ok(())
    }

    /// Claims the file for the move phase.
    pub fn begin_move(&mut self) -> Result<(), TransitionError> {
        if self.status != FileStatus::ReadyToMove {
            return Err(TransitionError::InvalidStatus {
                operation: "begin move",
                status: self.status,
            });
        }
        self.set_status(FileStatus::Moving);
        Ok(())
    }

    /// Records the completed move.
    ///
    /// The confirmed `target_path` is preserved unchanged for audit; the
    /// actual landing path goes into `moved_to_path`.
    pub fn mark_as_moved(&mut self, final_path: &std::path::Path) -> Result<(), TransitionError> {
        if final_path.as_os_str().is_empty() {
            return Err(TransitionError::invalid("final_path", "must not be empty"));
        }
        self.moved_to_path = Some(final_path.to_path_buf());
        self.moved_at = Some(Utc::now());
        self.set_status(FileStatus::Moved);
        Ok(())
    }

    /// Records a failure against the file.
    ///
    /// The retry count increments unconditionally and the last-error fields
    /// are overwritten with the most recent failure. Status becomes `Retry`
    /// when `should_retry`, else `Error`.
    pub fn record_error(
        &mut self,
        message: &str,
        should_retry: bool,
    ) -> Result<(), TransitionError> {
        if message.trim().is_empty() {
            return Err(TransitionError::invalid("message", "must not be empty"));
        }
        self.retry_count += 1;
        self.last_error = Some(message.to_string());
        self.last_error_at = Some(Utc::now());
        self.set_status(if should_retry {
            FileStatus::Retry
        } else {
            FileStatus::Error
        });
        Ok(())
    }

    /// Excludes the file from further processing (terminal).
    pub fn ignore(&mut self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::InvalidStatus {
                operation: "ignore",
                status: self.status,
            });
        }
        self.set_status(FileStatus::Ignored);
        Ok(())
    }

    /// Logically deletes the file. The row is kept for audit.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    fn set_status(&mut self, status: FileStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn test_file() -> TrackedFile {
        TrackedFile::discovered(
            "ab".repeat(32),
            "show.s01e01.mkv",
            "/incoming/show.s01e01.mkv",
            700 * 1024 * 1024,
        )
    }

    #[test]
    fn test_discovered_starts_new_and_active() {
        let file = test_file();
        assert_eq!(file.status, FileStatus::New);
        assert!(file.active);
        assert_eq!(file.retry_count, 0);
        assert!(file.classified_at.is_none());
        assert!(file.moved_at.is_none());
    }

    #[test]
    fn test_mark_as_classified_valid() {
        let mut file = test_file();
        let before = Utc::now();
        file.mark_as_classified("tv", 0.92).unwrap();

        assert_eq!(file.status, FileStatus::Classified);
        assert_eq!(file.suggested_category.as_deref(), Some("tv"));
        assert_eq!(file.confidence, Some(0.92));
        assert!(file.classified_at.unwrap() >= before);
    }

    #[test]
    fn test_mark_as_classified_confidence_bounds() {
        for confidence in [-0.1_f32, 1.1, f32::NAN, f32::INFINITY] {
            let mut file = test_file();
            let result = file.mark_as_classified("tv", confidence);
            assert!(matches!(
                result,
                Err(TransitionError::InvalidArgument {
                    field: "confidence",
                    ..
                })
            ));
            // A failed transition leaves the entity untouched.
            assert_eq!(file.status, FileStatus::New);
            assert!(file.suggested_category.is_none());
            assert!(file.classified_at.is_none());
        }
    }

    #[test]
    fn test_mark_as_classified_boundary_confidence_accepted() {
        let mut file = test_file();
        file.mark_as_classified("tv", 0.0).unwrap();
        assert_eq!(file.status, FileStatus::Classified);

        let mut file = test_file();
        file.mark_as_classified("tv", 1.0).unwrap();
        assert_eq!(file.status, FileStatus::Classified);
    }

    #[test]
    fn test_mark_as_classified_empty_category() {
        let mut file = test_file();
        let result = file.mark_as_classified("  ", 0.5);
        assert!(matches!(
            result,
            Err(TransitionError::InvalidArgument {
                field: "category",
                ..
            })
        ));
        assert_eq!(file.status, FileStatus::New);
    }

    #[test]
    fn test_confirm_and_move_round_trip() {
        let mut file = test_file();
        file.mark_as_classified("tv", 0.9).unwrap();
        file.confirm_category("tv", Path::new("/library/tv/show/s01e01.mkv"))
            .unwrap();
        assert_eq!(file.status, FileStatus::ReadyToMove);

        file.begin_move().unwrap();
        assert_eq!(file.status, FileStatus::Moving);

        file.mark_as_moved(Path::new("/library/tv/show/s01e01.mkv"))
            .unwrap();
        assert_eq!(file.status, FileStatus::Moved);
        // Confirmed target preserved, landing path recorded separately.
        assert_eq!(
            file.target_path.as_deref(),
            Some(Path::new("/library/tv/show/s01e01.mkv"))
        );
        assert_eq!(
            file.moved_to_path.as_deref(),
            Some(Path::new("/library/tv/show/s01e01.mkv"))
        );
        assert!(file.moved_at.is_some());
    }

    #[test]
    fn test_moved_preserves_distinct_target_path() {
        let mut file = test_file();
        file.confirm_category("tv", Path::new("/library/tv/planned.mkv"))
            .unwrap();
        file.begin_move().unwrap();
        // The mover may land somewhere else (e.g. conflict suffix).
        file.mark_as_moved(Path::new("/library/tv/planned (1).mkv"))
            .unwrap();

        assert_eq!(
            file.target_path.as_deref(),
            Some(Path::new("/library/tv/planned.mkv"))
        );
        assert_eq!(
            file.moved_to_path.as_deref(),
            Some(Path::new("/library/tv/planned (1).mkv"))
        );
    }

    #[test]
    fn test_begin_move_requires_ready_to_move() {
        let mut file = test_file();
        let result = file.begin_move();
        assert!(matches!(result, Err(TransitionError::InvalidStatus { .. })));
        assert_eq!(file.status, FileStatus::New);
    }

    #[test]
    fn test_record_error_increments_count_each_call() {
        let mut file = test_file();

        file.record_error("timeout reading source", true).unwrap();
        assert_eq!(file.retry_count, 1);
        assert_eq!(file.status, FileStatus::Retry);

        file.record_error("timeout reading source", true).unwrap();
        assert_eq!(file.retry_count, 2);
        assert_eq!(file.status, FileStatus::Retry);

        file.record_error("permission denied", false).unwrap();
        assert_eq!(file.retry_count, 3);
        assert_eq!(file.status, FileStatus::Error);
        assert_eq!(file.last_error.as_deref(), Some("permission denied"));
    }

    #[test]
    fn test_record_error_overwrites_last_error() {
        let mut file = test_file();
        file.record_error("first failure", true).unwrap();
        let first_at = file.last_error_at.unwrap();

        file.record_error("second failure", true).unwrap();
        assert_eq!(file.last_error.as_deref(), Some("second failure"));
        assert!(file.last_error_at.unwrap() >= first_at);
    }

    #[test]
    fn test_record_error_empty_message() {
        let mut file = test_file();
        let result = file.record_error("", true);
        assert!(matches!(
            result,
            Err(TransitionError::InvalidArgument {
                field: "message",
                ..
            })
        ));
        assert_eq!(file.retry_count, 0);
        assert_eq!(file.status, FileStatus::New);
    }

    #[test]
    fn test_retry_loop_then_success() {
        let mut file = test_file();
        file.record_error("transient", true).unwrap();
        file.begin_processing().unwrap();
        file.mark_as_classified("music", 0.8).unwrap();

        assert_eq!(file.status, FileStatus::Classified);
        // Retry count never regresses on success.
        assert_eq!(file.retry_count, 1);
    }

    #[test]
    fn test_ignore_from_error() {
        let mut file = test_file();
        file.record_error("broken", false).unwrap();
        file.ignore().unwrap();
        assert_eq!(file.status, FileStatus::Ignored);
        assert!(file.status.is_terminal());
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let mut file = test_file();
        file.confirm_category("tv", Path::new("/library/a.mkv")).unwrap();
        file.begin_move().unwrap();
        file.mark_as_moved(Path::new("/library/a.mkv")).unwrap();

        assert!(file.begin_processing().is_err());
        assert!(file.ignore().is_err());
    }

    #[test]
    fn test_deactivate_keeps_status() {
        let mut file = test_file();
        file.mark_as_classified("tv", 0.5).unwrap();
        file.deactivate();
        assert!(!file.active);
        assert_eq!(file.status, FileStatus::Classified);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(FileStatus::New.as_str(), "new");
        assert_eq!(FileStatus::ReadyToMove.as_str(), "ready_to_move");
        assert_eq!(FileStatus::Moved.as_str(), "moved");
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&FileStatus::ReadyToMove).unwrap();
        assert_eq!(json, r#""ready_to_move""#);
        let parsed: FileStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, FileStatus::ReadyToMove);
    }

    #[test]
    fn test_tracked_file_serialization_round_trip() {
        let mut file = test_file();
        file.mark_as_classified("movies", 0.73).unwrap();
        file.metadata
            .insert("source".to_string(), MetadataValue::Text("scan".to_string()));

        let json = serde_json::to_string(&file).unwrap();
        let parsed: TrackedFile = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, file);
    }

    #[test]
    fn test_metadata_value_serialization() {
        let value = MetadataValue::Integer(42);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"type":"integer","value":42}"#);
    }

    #[test]
    fn test_processable_statuses() {
        assert!(FileStatus::New.is_processable());
        assert!(FileStatus::Retry.is_processable());
        assert!(!FileStatus::Moving.is_processable());
        assert!(!FileStatus::Moved.is_processable());
        assert!(!FileStatus::Error.is_processable());
    }
}
