//! Fire-and-forget batch submission.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::classifier::Classifier;
use crate::events::{EventHandle, FileEvent};
use crate::mover::FileMover;
use crate::processor::{
    BatchProcessor, BatchRequest, BatchValidationResult, BatchValidator, MAX_CONCURRENCY,
    MIN_CONCURRENCY,
};
use crate::queue::{QueueError, TaskQueue, WorkItem};
use crate::tracked_file::{FileStore, StoreError};

use super::results::{JobResultStore, JobStatus};

/// Why a batch submission was rejected.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The request itself is malformed.
    #[error("invalid batch request: {0}")]
    InvalidRequest(String),

    /// Pre-flight validation found missing or unusable files.
    #[error(
        "batch validation failed: {} missing, {} invalid of {} requested",
        .0.missing.len(),
        .0.invalid.len(),
        .0.requested.len()
    )]
    Validation(Box<BatchValidationResult>),

    /// The task queue is at capacity; try again later or shrink the batch.
    #[error(transparent)]
    QueueFull(QueueError),

    /// The file store failed during validation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Accepts batch requests, screens them, and hands them to the task queue.
///
/// Submission is fire-and-forget: the caller gets a job id immediately and
/// queries progress through the [`JobResultStore`].
pub struct BatchJobService<C: Classifier, M: FileMover> {
    queue: Arc<TaskQueue>,
    validator: BatchValidator,
    processor: Arc<BatchProcessor<C, M>>,
    results: Arc<dyn JobResultStore>,
    events: Option<EventHandle>,
    shutdown: CancellationToken,
}

impl<C: Classifier + 'static, M: FileMover + 'static> BatchJobService<C, M> {
    /// Creates the service.
    pub fn new(
        queue: Arc<TaskQueue>,
        store: Arc<dyn FileStore>,
        processor: Arc<BatchProcessor<C, M>>,
        results: Arc<dyn JobResultStore>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            queue,
            validator: BatchValidator::new(store),
            processor,
            results,
            events: None,
            shutdown,
        }
    }

    /// Sets the event handle for batch lifecycle notifications.
    pub fn with_events(mut self, events: EventHandle) -> Self {
        self.events = Some(events);
        self
    }

    /// Validates and enqueues a batch, returning its job id.
    ///
    /// Fails fast with [`SubmitError::QueueFull`] when the queue is at
    /// capacity; nothing is silently dropped.
    pub async fn enqueue_batch(&self, request: BatchRequest) -> Result<String, SubmitError> {
        if request.entries.is_empty() {
            return Err(SubmitError::InvalidRequest("batch has no entries".to_string()));
        }
        for entry in &request.entries {
            if entry.confirmed_category.trim().is_empty() {
                return Err(SubmitError::InvalidRequest(format!(
                    "entry {} has an empty category",
                    entry.content_hash
                )));
            }
        }
        if let Some(concurrency) = request.options.max_concurrency {
            if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
                return Err(SubmitError::InvalidRequest(format!(
                    "max_concurrency {concurrency} outside {MIN_CONCURRENCY}..={MAX_CONCURRENCY}"
                )));
            }
        }

        let validation = self.validator.validate(&request.hashes())?;
        if !validation.is_valid {
            return Err(SubmitError::Validation(Box::new(validation)));
        }
        let files = validation.valid_files();

        let job_id = uuid::Uuid::new_v4().to_string();
        let label = match &request.options.batch_name {
            Some(name) => format!("batch {name} ({} files)", files.len()),
            None => format!("batch of {} files", files.len()),
        };

        let item = {
            let job_id = job_id.clone();
            let processor = Arc::clone(&self.processor);
            let results = Arc::clone(&self.results);
            let events = self.events.clone();
            let cancel = self.shutdown.child_token();
            let total = files.len();

            WorkItem::new(label, async move {
                results.set(&job_id, JobStatus::Running);
                if let Some(ref events) = events {
                    events
                        .emit(FileEvent::BatchStarted {
                            job_id: job_id.clone(),
                            batch_name: request.options.batch_name.clone(),
                            total_files: total,
                        })
                        .await;
                }

                let result = processor.process_batch(files, &request, &cancel).await;

                info!(
                    job = %job_id,
                    succeeded = result.succeeded,
                    failed = result.failed,
                    skipped = result.skipped,
                    cancelled = result.cancelled,
                    "Batch finished"
                );
                if let Some(ref events) = events {
                    events
                        .emit(FileEvent::BatchCompleted {
                            job_id: job_id.clone(),
                            succeeded: result.succeeded,
                            failed: result.failed,
                            cancelled: result.cancelled,
                            duration_ms: result.duration_ms,
                        })
                        .await;
                }
                results.set(&job_id, JobStatus::Completed { result });
            })
        };

        match self.queue.try_enqueue(item) {
            Ok(()) => {
                self.results.set(&job_id, JobStatus::Queued);
                info!(job = %job_id, "Batch enqueued");
                Ok(job_id)
            }
            Err(err) => {
                warn!(error = %err, "Batch rejected by queue");
                Err(SubmitError::QueueFull(err))
            }
        }
    }

    /// Queries the status of a submitted batch.
    pub fn job_status(&self, job_id: &str) -> Option<JobStatus> {
        self.results.get(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{BatchEntry, ProcessorConfig};
    use crate::queue::{QueueConsumer, QueueConfig};
    use crate::testing::{MemoryFileStore, MockClassifier, MockMover};
    use crate::tracked_file::TrackedFile;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        service: BatchJobService<MockClassifier, MockMover>,
        store: Arc<dyn FileStore>,
        shutdown: CancellationToken,
        source_dir: TempDir,
    }

    fn harness() -> Harness {
        let store: Arc<dyn FileStore> = Arc::new(MemoryFileStore::new());
        let source_dir = TempDir::new().unwrap();
        let queue = Arc::new(TaskQueue::new(&QueueConfig::default()));
        let shutdown = CancellationToken::new();
        let processor = Arc::new(BatchProcessor::new(
            ProcessorConfig::default().with_library_root("/library".into()),
            Arc::clone(&store),
            MockClassifier::suggesting("tv", 0.9),
            MockMover::new(),
        ));
        let results: Arc<dyn JobResultStore> = Arc::new(super::super::MemoryJobStore::new());
        let service = BatchJobService::new(
            Arc::clone(&queue),
            Arc::clone(&store),
            processor,
            results,
            shutdown.clone(),
        );
        QueueConsumer::new(queue, shutdown.clone()).spawn();
        Harness {
            service,
            store,
            shutdown,
            source_dir,
        }
    }

    fn add_file(harness: &Harness, hash: &str, name: &str) {
        let path = harness.source_dir.path().join(name);
        std::fs::write(&path, b"content").unwrap();
        let file = TrackedFile::discovered(hash, name, path, 7);
        harness.store.insert(&file).unwrap();
    }

    #[tokio::test]
    async fn test_enqueue_and_complete() {
        let harness = harness();
        add_file(&harness, "h1", "a.mkv");

        let request = BatchRequest::new(vec![BatchEntry::new("h1", "tv")]);
        let job_id = harness.service.enqueue_batch(request).await.unwrap();

        let mut status = harness.service.job_status(&job_id).unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !status.is_finished() {
            assert!(tokio::time::Instant::now() < deadline, "job never finished");
            tokio::time::sleep(Duration::from_millis(10)).await;
            status = harness.service.job_status(&job_id).unwrap();
        }

        match status {
            JobStatus::Completed { result } => {
                assert_eq!(result.succeeded, 1);
                assert_eq!(result.failed, 0);
            }
            other => panic!("expected completed, got {other:?}"),
        }
        harness.shutdown.cancel();
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let harness = harness();
        let result = harness.service.enqueue_batch(BatchRequest::new(vec![])).await;
        assert!(matches!(result, Err(SubmitError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_unknown_hash_rejected_by_validation() {
        let harness = harness();
        let request = BatchRequest::new(vec![BatchEntry::new("ghost", "tv")]);
        let result = harness.service.enqueue_batch(request).await;

        match result {
            Err(SubmitError::Validation(validation)) => {
                assert_eq!(validation.missing, vec!["ghost"]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_concurrency_rejected() {
        let harness = harness();
        add_file(&harness, "h1", "a.mkv");
        let mut request = BatchRequest::new(vec![BatchEntry::new("h1", "tv")]);
        request.options.max_concurrency = Some(64);

        let result = harness.service.enqueue_batch(request).await;
        assert!(matches!(result, Err(SubmitError::InvalidRequest(_))));
    }
}
