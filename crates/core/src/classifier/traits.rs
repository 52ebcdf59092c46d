//! Trait definitions for the classifier module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Error type for classification.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// The classifier could not produce a suggestion for this file.
    #[error("unclassifiable file: {reason}")]
    Unclassifiable { reason: String },

    /// The classification backend failed.
    #[error("classifier backend error: {0}")]
    Backend(String),
}

/// What the classifier sees about a file.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    /// Content hash of the file.
    pub content_hash: String,
    /// File name as discovered.
    pub file_name: String,
    /// Path where the file currently lives.
    pub path: PathBuf,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// A category suggestion with a confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Suggested category (e.g. "movies", "tv", "music").
    pub category: String,
    /// Confidence in the suggestion (0.0-1.0).
    pub confidence: f32,
}

impl Classification {
    /// Creates a classification, clamping confidence into [0, 1].
    pub fn new(category: impl Into<String>, confidence: f32) -> Self {
        Self {
            category: category.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// A backend that suggests a category for a file.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Returns the name of this classifier implementation.
    fn name(&self) -> &str;

    /// Suggests a category for the given file.
    async fn classify(&self, file: &FileDescriptor) -> Result<Classification, ClassifierError>;
}
