//! Failure triage rules.
//!
//! `classify` is a pure function of the [`ErrorContext`]: the same input
//! always yields the same kind, confidence and resolution steps. Rules are
//! applied in priority order, first match wins.

use std::time::Duration;

use super::types::{ErrorClassification, ErrorContext, ErrorKind};

const TRANSIENT_RETRY_DELAY: Duration = Duration::from_millis(1000);
const TRANSIENT_MAX_ATTEMPTS: u32 = 3;

/// Triage a failure into a recovery strategy.
pub fn classify(ctx: &ErrorContext) -> ErrorClassification {
    let message = ctx.message.to_lowercase();

    if is_space_exhaustion(ctx, &message) {
        return space_classification(ctx);
    }
    if is_permission_denied(&message) {
        return permission_classification(ctx);
    }
    if is_invalid_path(&message) {
        return path_classification(ctx);
    }
    if is_transient(&message) {
        return transient_classification(ctx);
    }
    unknown_classification(ctx)
}

fn is_space_exhaustion(ctx: &ErrorContext, message: &str) -> bool {
    if let (Some(size), Some(available)) = (ctx.file_size, ctx.available_space) {
        if available < size {
            return true;
        }
    }
    message.contains("no space left")
        || message.contains("disk full")
        || message.contains("insufficient disk space")
        || message.contains("insufficient space")
        || message.contains("quota exceeded")
}

fn is_permission_denied(message: &str) -> bool {
    message.contains("permission denied")
        || message.contains("access denied")
        || message.contains("access is denied")
        || message.contains("operation not permitted")
        || message.contains("read-only file system")
}

fn is_invalid_path(message: &str) -> bool {
    message.contains("file name too long")
        || message.contains("path too long")
        || message.contains("invalid path")
        || message.contains("invalid filename")
        || message.contains("invalid character")
        || message.contains("not a directory")
}

fn is_transient(message: &str) -> bool {
    message.contains("timed out")
        || message.contains("timeout")
        || message.contains("temporarily unavailable")
        || message.contains("resource busy")
        || message.contains("device or resource busy")
        || message.contains("locked")
        || message.contains("lock contention")
        || message.contains("interrupted")
        || message.contains("connection reset")
        || message.contains("broken pipe")
        || message.contains("would block")
}

fn space_classification(ctx: &ErrorContext) -> ErrorClassification {
    let user_message = match (ctx.file_size, ctx.available_space) {
        (Some(size), Some(available)) => format!(
            "Not enough space at the target: need {} bytes, have {}",
            size, available
        ),
        _ => "Not enough space at the target location".to_string(),
    };
    ErrorClassification {
        kind: ErrorKind::Space,
        can_retry: false,
        requires_user_intervention: true,
        retry_delay: Duration::ZERO,
        max_attempts: 0,
        user_message,
        technical_detail: ctx.message.clone(),
        resolution_steps: vec![
            "Free up space on the target volume".to_string(),
            "Or point the library at a volume with more space".to_string(),
            "Then re-run the batch for the affected files".to_string(),
        ],
        confidence: 0.95,
    }
}

fn permission_classification(ctx: &ErrorContext) -> ErrorClassification {
    ErrorClassification {
        kind: ErrorKind::Permission,
        can_retry: false,
        requires_user_intervention: true,
        retry_delay: Duration::ZERO,
        max_attempts: 0,
        user_message: "The service is not allowed to access the file or target directory"
            .to_string(),
        technical_detail: ctx.message.clone(),
        resolution_steps: vec![
            "Check ownership and permissions on the source file".to_string(),
            "Check that the service user can write to the target directory".to_string(),
            "Then re-run the batch for the affected files".to_string(),
        ],
        confidence: 0.9,
    }
}

fn path_classification(ctx: &ErrorContext) -> ErrorClassification {
    ErrorClassification {
        kind: ErrorKind::Path,
        can_retry: false,
        requires_user_intervention: true,
        retry_delay: Duration::ZERO,
        max_attempts: 0,
        user_message: "The target path is malformed or too long for the filesystem".to_string(),
        technical_detail: ctx.message.clone(),
        resolution_steps: vec![
            "Shorten or correct the target path".to_string(),
            "Remove characters the target filesystem does not accept".to_string(),
            "Then confirm the category again with the corrected path".to_string(),
        ],
        confidence: 0.9,
    }
}

fn transient_classification(ctx: &ErrorContext) -> ErrorClassification {
    ErrorClassification {
        kind: ErrorKind::Transient,
        can_retry: true,
        requires_user_intervention: false,
        retry_delay: TRANSIENT_RETRY_DELAY,
        max_attempts: TRANSIENT_MAX_ATTEMPTS,
        user_message: format!("A temporary {} failure occurred; it will be retried", ctx.operation),
        technical_detail: ctx.message.clone(),
        resolution_steps: vec![
            "No action needed; the operation is retried automatically".to_string(),
            "If it keeps failing, check the disk and network health".to_string(),
        ],
        confidence: 0.8,
    }
}

fn unknown_classification(ctx: &ErrorContext) -> ErrorClassification {
    ErrorClassification {
        kind: ErrorKind::Unknown,
        can_retry: false,
        requires_user_intervention: true,
        retry_delay: Duration::ZERO,
        max_attempts: 0,
        user_message: format!("The {} operation failed for an unrecognized reason", ctx.operation),
        technical_detail: ctx.message.clone(),
        resolution_steps: vec![
            "Inspect the technical detail for this file".to_string(),
            "Check the service logs around the failure timestamp".to_string(),
            "Re-run the batch once the cause is addressed".to_string(),
        ],
        confidence: 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::FileOperation;

    fn ctx(message: &str) -> ErrorContext {
        ErrorContext::new(FileOperation::Move, message)
    }

    #[test]
    fn test_space_from_known_sizes() {
        let context = ctx("write failed").with_space(Some(500 * 1024 * 1024), Some(0));
        let result = classify(&context);
        assert_eq!(result.kind, ErrorKind::Space);
        assert!(!result.can_retry);
        assert!(result.requires_user_intervention);
        assert_eq!(result.confidence, 0.95);
        assert!(result.user_message.contains("524288000"));
    }

    #[test]
    fn test_space_from_message() {
        let result = classify(&ctx("os error 28: No space left on device"));
        assert_eq!(result.kind, ErrorKind::Space);
    }

    #[test]
    fn test_space_beats_permission() {
        // Priority order: a message matching both rules triages as Space.
        let context =
            ctx("permission denied while writing").with_space(Some(100), Some(10));
        assert_eq!(classify(&context).kind, ErrorKind::Space);
    }

    #[test]
    fn test_permission_denied() {
        let result = classify(&ctx("Permission denied (os error 13)"));
        assert_eq!(result.kind, ErrorKind::Permission);
        assert!(!result.can_retry);
        assert!(result.requires_user_intervention);
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn test_invalid_path() {
        let result = classify(&ctx("File name too long (os error 36)"));
        assert_eq!(result.kind, ErrorKind::Path);
        assert!(!result.can_retry);
    }

    #[test]
    fn test_transient_timeout() {
        let result = classify(&ctx("read timed out"));
        assert_eq!(result.kind, ErrorKind::Transient);
        assert!(result.can_retry);
        assert!(!result.requires_user_intervention);
        assert_eq!(result.retry_delay, Duration::from_millis(1000));
        assert_eq!(result.max_attempts, 3);
        assert_eq!(result.confidence, 0.8);
    }

    #[test]
    fn test_transient_lock_contention() {
        let result = classify(&ctx("database is locked"));
        assert_eq!(result.kind, ErrorKind::Transient);
    }

    #[test]
    fn test_unknown_fallback() {
        let result = classify(&ctx("flux capacitor misaligned"));
        assert_eq!(result.kind, ErrorKind::Unknown);
        assert!(!result.can_retry);
        assert!(result.requires_user_intervention);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.technical_detail, "flux capacitor misaligned");
    }

    #[test]
    fn test_unknown_confidence_is_lowest() {
        let unknown = classify(&ctx("???")).confidence;
        for message in [
            "no space left on device",
            "permission denied",
            "file name too long",
            "timed out",
        ] {
            assert!(classify(&ctx(message)).confidence > unknown);
        }
    }

    #[test]
    fn test_deterministic() {
        let context = ctx("Connection reset by peer").with_space(Some(10), Some(100));
        let a = classify(&context);
        let b = classify(&context);
        assert_eq!(a, b);
    }

    #[test]
    fn test_resolution_steps_always_present() {
        for message in ["no space left", "access denied", "invalid path", "timeout", "???"] {
            let result = classify(&ctx(message));
            assert!(!result.resolution_steps.is_empty());
        }
    }
}
