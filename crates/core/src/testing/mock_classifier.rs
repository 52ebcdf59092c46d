//! Mock classifier for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::classifier::{Classification, Classifier, ClassifierError, FileDescriptor};

/// A recorded classification call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedClassification {
    /// Content hash of the file that was classified.
    pub content_hash: String,
    /// Whether the call succeeded.
    pub success: bool,
}

/// Mock implementation of the [`Classifier`] trait.
///
/// Provides controllable behavior for testing:
/// - A default suggestion returned for every file
/// - Per-hash suggestion overrides
/// - Per-hash error injection (errors are consumed in order, so a file can
///   fail N times and then succeed)
/// - Recorded calls for assertions
#[derive(Clone)]
pub struct MockClassifier {
    default: Classification,
    overrides: Arc<RwLock<HashMap<String, Classification>>>,
    errors: Arc<RwLock<HashMap<String, Vec<ClassifierError>>>>,
    calls: Arc<RwLock<Vec<RecordedClassification>>>,
}

impl MockClassifier {
    /// Creates a mock that suggests the given category for every file.
    pub fn suggesting(category: impl Into<String>, confidence: f32) -> Self {
        Self {
            default: Classification::new(category, confidence),
            overrides: Arc::new(RwLock::new(HashMap::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Overrides the suggestion for a specific hash.
    pub async fn set_suggestion(
        &self,
        hash: impl Into<String>,
        category: impl Into<String>,
        confidence: f32,
    ) {
        self.overrides
            .write()
            .await
            .insert(hash.into(), Classification::new(category, confidence));
    }

    /// Queues an error for the given hash; consumed on the next call.
    pub async fn push_error(&self, hash: impl Into<String>, error: ClassifierError) {
        self.errors
            .write()
            .await
            .entry(hash.into())
            .or_default()
            .push(error);
    }

    /// Queues `count` backend failures for the given hash.
    pub async fn fail_times(&self, hash: &str, count: usize, message: &str) {
        for _ in 0..count {
            self.push_error(hash, ClassifierError::Backend(message.to_string()))
                .await;
        }
    }

    /// All recorded calls.
    pub async fn recorded_calls(&self) -> Vec<RecordedClassification> {
        self.calls.read().await.clone()
    }

    /// Number of classification calls made.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn classify(&self, file: &FileDescriptor) -> Result<Classification, ClassifierError> {
        let queued_error = {
            let mut errors = self.errors.write().await;
            match errors.get_mut(&file.content_hash) {
                Some(queue) if !queue.is_empty() => Some(queue.remove(0)),
                _ => None,
            }
        };

        if let Some(error) = queued_error {
            self.calls.write().await.push(RecordedClassification {
                content_hash: file.content_hash.clone(),
                success: false,
            });
            return Err(error);
        }

        let result = self
            .overrides
            .read()
            .await
            .get(&file.content_hash)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        self.calls.write().await.push(RecordedClassification {
            content_hash: file.content_hash.clone(),
            success: true,
        });
        Ok(result)
    }
}
