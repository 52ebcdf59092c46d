//! Event types emitted on file and batch state changes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::tracked_file::FileStatus;
use crate::triage::ErrorKind;

/// Best-effort notification of something the core did.
///
/// Events are advisory: losing one never affects correctness, and emission
/// never fails the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FileEvent {
    /// A tracked file changed status.
    StatusChanged {
        content_hash: String,
        from: FileStatus,
        to: FileStatus,
    },

    /// A new file was discovered and is now tracked.
    FileDiscovered {
        content_hash: String,
        file_name: String,
        size_bytes: u64,
    },

    /// A file landed in the library.
    FileMoved {
        content_hash: String,
        destination: PathBuf,
        size_bytes: u64,
    },

    /// A file failed and was triaged.
    FileFailed {
        content_hash: String,
        kind: ErrorKind,
        will_retry: bool,
        message: String,
    },

    /// A batch started processing.
    BatchStarted {
        job_id: String,
        batch_name: Option<String>,
        total_files: usize,
    },

    /// A batch finished (including aborted and cancelled batches).
    BatchCompleted {
        job_id: String,
        succeeded: usize,
        failed: usize,
        cancelled: bool,
        duration_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = FileEvent::StatusChanged {
            content_hash: "abc".to_string(),
            from: FileStatus::New,
            to: FileStatus::Classified,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"status_changed\""));
        assert!(json.contains("\"from\":\"new\""));

        let parsed: FileEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
