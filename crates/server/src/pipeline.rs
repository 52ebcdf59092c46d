//! The daemon's periodic pipeline loop.
//!
//! Each tick: scan the configured roots, queue a classification pass for
//! newly discovered files, then auto-confirm high-confidence suggestions
//! and re-submit files waiting on a retry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shelver_core::classifier::Classifier;
use shelver_core::jobs::SubmitError;
use shelver_core::mover::FileMover;
use shelver_core::processor::{BatchEntry, BatchProcessor, BatchRequest};
use shelver_core::queue::{TaskQueue, WorkItem};
use shelver_core::tracked_file::{FileStatus, FileStore, TrackedFile};
use shelver_core::{BatchJobService, Scanner};

/// Periodic driver for the discovery -> classification -> auto-confirm
/// pipeline.
pub struct PipelineLoop<C: Classifier, M: FileMover> {
    scanner: Scanner,
    store: Arc<dyn FileStore>,
    queue: Arc<TaskQueue>,
    processor: Arc<BatchProcessor<C, M>>,
    service: Arc<BatchJobService<C, M>>,
    auto_confirm_threshold: Option<f32>,
    shutdown: CancellationToken,
    classification_in_flight: Arc<AtomicBool>,
}

impl<C: Classifier + 'static, M: FileMover + 'static> PipelineLoop<C, M> {
    /// Creates the loop.
    pub fn new(
        scanner: Scanner,
        store: Arc<dyn FileStore>,
        queue: Arc<TaskQueue>,
        processor: Arc<BatchProcessor<C, M>>,
        service: Arc<BatchJobService<C, M>>,
        auto_confirm_threshold: Option<f32>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            scanner,
            store,
            queue,
            processor,
            service,
            auto_confirm_threshold,
            shutdown,
            classification_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawns the loop task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Pipeline loop started");
            let interval = self.scanner.poll_interval();
            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("Pipeline loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        self.run_once().await;
                    }
                }
            }
            info!("Pipeline loop stopped");
        })
    }

    /// One tick of the pipeline.
    pub async fn run_once(&self) {
        if let Err(e) = self.scanner.scan().await {
            warn!("Scan failed: {}", e);
        }
        self.queue_classification_pass().await;
        self.submit_auto_confirm_batch().await;
        self.submit_retry_sweep().await;
    }

    /// Queues a classification-only pass over files still in `New`.
    ///
    /// At most one classification pass is in flight at a time so a slow
    /// pass never piles up duplicates for the same files.
    async fn queue_classification_pass(&self) {
        if self.classification_in_flight.load(Ordering::SeqCst) {
            debug!("Classification pass already in flight");
            return;
        }

        let new_files = match self.store.find_by_status(FileStatus::New) {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list new files: {}", e);
                return;
            }
        };
        if new_files.is_empty() {
            return;
        }

        let processor = Arc::clone(&self.processor);
        let cancel = self.shutdown.child_token();
        let in_flight = Arc::clone(&self.classification_in_flight);
        let count = new_files.len();

        let mut request = BatchRequest::new(vec![]);
        request.options.batch_name = Some("auto-classify".to_string());
        request.options.continue_on_error = true;

        in_flight.store(true, Ordering::SeqCst);
        let item = WorkItem::new(format!("classify {count} new files"), async move {
            let result = processor.process_batch(new_files, &request, &cancel).await;
            debug!(
                succeeded = result.succeeded,
                failed = result.failed,
                "Classification pass finished"
            );
            in_flight.store(false, Ordering::SeqCst);
        });

        if let Err(e) = self.queue.try_enqueue(item) {
            // Backpressure: drop the flag and let a later tick retry.
            self.classification_in_flight.store(false, Ordering::SeqCst);
            warn!("Could not queue classification pass: {}", e);
        }
    }

    /// Submits a confirm-and-move batch for classified files whose
    /// confidence clears the configured threshold.
    async fn submit_auto_confirm_batch(&self) {
        let Some(threshold) = self.auto_confirm_threshold else {
            return;
        };

        let classified = match self.store.find_by_status(FileStatus::Classified) {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list classified files: {}", e);
                return;
            }
        };

        let entries: Vec<BatchEntry> = classified
            .iter()
            .filter(|f| f.confidence.unwrap_or(0.0) >= threshold)
            .filter_map(|f| {
                f.suggested_category
                    .as_ref()
                    .map(|category| BatchEntry::new(&f.content_hash, category))
            })
            .collect();
        if entries.is_empty() {
            return;
        }

        let mut request = BatchRequest::new(entries);
        request.options.batch_name = Some("auto-confirm".to_string());
        request.options.continue_on_error = true;

        match self.service.enqueue_batch(request).await {
            Ok(job_id) => info!(job = %job_id, threshold, "Auto-confirm batch enqueued"),
            Err(SubmitError::QueueFull(e)) => warn!("Auto-confirm deferred: {}", e),
            Err(e) => warn!("Auto-confirm rejected: {}", e),
        }
    }

    /// Re-submits files parked in `Retry` that already have a confirmed
    /// category.
    async fn submit_retry_sweep(&self) {
        let retryable = match self.store.find_by_status(FileStatus::Retry) {
            Ok(files) => files,
            Err(e) => {
                warn!("Failed to list retryable files: {}", e);
                return;
            }
        };

        let entries: Vec<BatchEntry> = retryable
            .iter()
            .filter_map(|f| Self::retry_entry(f))
            .collect();
        if entries.is_empty() {
            return;
        }

        let mut request = BatchRequest::new(entries);
        request.options.batch_name = Some("retry-sweep".to_string());
        request.options.continue_on_error = true;

        match self.service.enqueue_batch(request).await {
            Ok(job_id) => info!(job = %job_id, "Retry sweep enqueued"),
            Err(SubmitError::QueueFull(e)) => warn!("Retry sweep deferred: {}", e),
            Err(e) => warn!("Retry sweep rejected: {}", e),
        }
    }

    fn retry_entry(file: &TrackedFile) -> Option<BatchEntry> {
        let category = file.confirmed_category.as_ref()?;
        let mut entry = BatchEntry::new(&file.content_hash, category);
        entry.target_path = file.target_path.clone();
        Some(entry)
    }
}
