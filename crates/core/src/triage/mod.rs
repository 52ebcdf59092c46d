//! Failure triage: maps heterogeneous file-operation failures to actionable
//! recovery strategies.
//!
//! The coordinator never surfaces raw I/O errors to batch callers. Every
//! failure is turned into an [`ErrorClassification`] that says whether a
//! retry can help, how long to wait, and what the user can do about it.

mod classify;
mod types;

pub use classify::classify;
pub use types::{ErrorClassification, ErrorContext, ErrorKind, FileOperation};
