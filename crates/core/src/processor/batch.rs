//! Batch processing coordinator.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::classifier::{Classifier, FileDescriptor};
use crate::events::{EventHandle, FileEvent};
use crate::metrics;
use crate::mover::{FileMover, MoveError, MoveRequest};
use crate::tracked_file::{FileStatus, FileStore, TrackedFile};
use crate::triage::{self, ErrorClassification, ErrorContext, FileOperation};

use super::config::{ProcessorConfig, RetryConfig};
use super::types::{BatchEntry, BatchOptions, BatchRequest, BatchResult, FileOutcome};

/// Orchestrates a batch of tracked files through the state machine.
///
/// Generic over the classification and move collaborators so tests can plug
/// in mocks. The coordinator owns the in-flight lifecycle of each file in a
/// batch: it claims a file before dispatch and never dispatches the same
/// file twice within a batch. The store remains the durability authority;
/// the in-memory entity is advisory until a save succeeds.
pub struct BatchProcessor<C: Classifier, M: FileMover> {
    config: ProcessorConfig,
    store: Arc<dyn FileStore>,
    classifier: Arc<C>,
    mover: Arc<M>,
    events: Option<EventHandle>,
}

impl<C: Classifier + 'static, M: FileMover + 'static> BatchProcessor<C, M> {
    /// Creates a new batch processor.
    pub fn new(config: ProcessorConfig, store: Arc<dyn FileStore>, classifier: C, mover: M) -> Self {
        Self {
            config,
            store,
            classifier: Arc::new(classifier),
            mover: Arc::new(mover),
            events: None,
        }
    }

    /// Sets the event handle for status change notifications.
    pub fn with_events(mut self, events: EventHandle) -> Self {
        self.events = Some(events);
        self
    }

    /// Processes a batch of already-materialized files.
    ///
    /// Files run with bounded concurrency. One file's unrecoverable failure
    /// never aborts files already dispatched; under the default
    /// abort-on-first-error policy it prevents *unstarted* files from being
    /// dispatched. Cancellation is cooperative and checked between files:
    /// the in-flight files finish (or settle in `Retry`), the rest are
    /// reported as skipped.
    pub async fn process_batch(
        &self,
        files: Vec<TrackedFile>,
        request: &BatchRequest,
        cancel: &CancellationToken,
    ) -> BatchResult {
        let start = Instant::now();
        let options = request.options.clone();
        let continue_on_error = options.continue_on_error || self.config.continue_on_error;
        let concurrency = self.config.concurrency_bound(options.max_concurrency);

        let entries: HashMap<String, BatchEntry> = request
            .entries
            .iter()
            .map(|e| (e.content_hash.clone(), e.clone()))
            .collect();

        debug!(
            files = files.len(),
            concurrency,
            continue_on_error,
            dry_run = options.dry_run,
            "Processing batch"
        );

        let semaphore = Arc::new(Semaphore::new(concurrency));
        let abort = CancellationToken::new();
        let mut claimed: HashSet<String> = HashSet::new();
        let mut outcomes: Vec<FileOutcome> = Vec::with_capacity(files.len());
        let mut join_set: JoinSet<FileOutcome> = JoinSet::new();
        let mut cancelled = false;

        for file in files {
            // Claim before dispatch; a file already in flight within this
            // batch is never re-dispatched.
            if !claimed.insert(file.content_hash.clone()) {
                warn!(hash = %file.content_hash, "Duplicate file reference in batch, skipping");
                continue;
            }

            if cancel.is_cancelled() {
                cancelled = true;
                outcomes.push(FileOutcome::skipped(
                    &file.content_hash,
                    &file.file_name,
                    file.status,
                ));
                continue;
            }
            if abort.is_cancelled() {
                outcomes.push(FileOutcome::skipped(
                    &file.content_hash,
                    &file.file_name,
                    file.status,
                ));
                continue;
            }

            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            // Re-check after possibly waiting on the permit.
            if cancel.is_cancelled() || abort.is_cancelled() {
                cancelled = cancelled || cancel.is_cancelled();
                outcomes.push(FileOutcome::skipped(
                    &file.content_hash,
                    &file.file_name,
                    file.status,
                ));
                continue;
            }

            let entry = entries.get(&file.content_hash).cloned();
            let classifier = Arc::clone(&self.classifier);
            let mover = Arc::clone(&self.mover);
            let store = Arc::clone(&self.store);
            let events = self.events.clone();
            let config = self.config.clone();
            let task_options = options.clone();
            let abort_handle = abort.clone();
            let cancel_child = cancel.clone();
            let hash = file.content_hash.clone();
            let name = file.file_name.clone();

            join_set.spawn(async move {
                let _permit = permit;
                let outcome = std::panic::AssertUnwindSafe(Self::process_file(
                    file,
                    entry,
                    classifier,
                    mover,
                    store,
                    events,
                    config,
                    task_options,
                    cancel_child,
                ))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(hash = %hash, "File task panicked");
                    let ctx = ErrorContext::new(
                        FileOperation::Classify,
                        "file processing task panicked",
                    );
                    FileOutcome {
                        content_hash: hash.clone(),
                        file_name: name.clone(),
                        succeeded: false,
                        skipped: false,
                        final_status: FileStatus::Processing,
                        moved_to: None,
                        error: Some(triage::classify(&ctx)),
                    }
                });

                if !outcome.succeeded && !outcome.skipped && !continue_on_error {
                    abort_handle.cancel();
                }
                outcome
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => {
                    metrics::BATCH_FILES
                        .with_label_values(&[if outcome.succeeded { "succeeded" } else { "failed" }])
                        .inc();
                    outcomes.push(outcome);
                }
                Err(join_error) => {
                    // catch_unwind above means this only fires on abort.
                    error!(error = %join_error, "File task aborted");
                }
            }
        }

        cancelled = cancelled || cancel.is_cancelled();
        let duration_ms = start.elapsed().as_millis() as u64;

        let outcome_label = if cancelled {
            "cancelled"
        } else if abort.is_cancelled() {
            "aborted"
        } else {
            "completed"
        };
        metrics::BATCH_DURATION
            .with_label_values(&[outcome_label])
            .observe(duration_ms as f64 / 1000.0);

        BatchResult::from_outcomes(options.batch_name.clone(), outcomes, duration_ms, cancelled)
    }

    /// Runs one file through its workflow:
    /// claim -> classify -> confirm -> move.
    #[allow(clippy::too_many_arguments)]
    async fn process_file(
        mut file: TrackedFile,
        entry: Option<BatchEntry>,
        classifier: Arc<C>,
        mover: Arc<M>,
        store: Arc<dyn FileStore>,
        events: Option<EventHandle>,
        config: ProcessorConfig,
        options: BatchOptions,
        cancel: CancellationToken,
    ) -> FileOutcome {
        let dry_run = options.dry_run;

        // Claim the file.
        let previous = file.status;
        if let Err(e) = file.begin_processing() {
            return Self::contract_violation_outcome(&file, FileOperation::Classify, e.to_string());
        }
        if let Err(e) = Self::persist(&store, &file, dry_run) {
            return Self::store_failure_outcome(&file, e);
        }
        Self::emit_status_change(&events, &file, previous).await;

        if let Some(ref entry) = entry {
            file.metadata.extend(entry.metadata.clone());
        }

        // Stage 1: classification, unless a prior pass already suggested a
        // category.
        if file.suggested_category.is_none() {
            if let Some(outcome) = Self::classification_stage(
                &mut file, &classifier, &store, &events, &config, &options, &cancel,
            )
            .await
            {
                return outcome;
            }
        }

        // Stage 2: confirmation. Without a batch entry this was a
        // classification-only pass.
        let Some(entry) = entry else {
            return Self::success_outcome(&file, None);
        };

        let target = entry.target_path.clone().unwrap_or_else(|| {
            config
                .library_root
                .join(&entry.confirmed_category)
                .join(&file.file_name)
        });

        if options.validate_target_paths {
            if let Some(reason) = Self::check_target_path(&target) {
                let message = format!("invalid path: {reason}");
                let ctx = ErrorContext::new(FileOperation::Move, &message)
                    .with_paths(Some(file.original_path.clone()), Some(target.clone()))
                    .with_prior_retries(file.retry_count);
                let classification = triage::classify(&ctx);
                metrics::TRIAGED_ERRORS
                    .with_label_values(&[classification.kind.as_str()])
                    .inc();
                return Self::terminal_failure(
                    &mut file,
                    &store,
                    &events,
                    &message,
                    classification,
                    dry_run,
                )
                .await;
            }
        }

        let previous = file.status;
        if let Err(e) = file.confirm_category(&entry.confirmed_category, &target) {
            return Self::contract_violation_outcome(&file, FileOperation::Move, e.to_string());
        }
        if let Err(e) = Self::persist(&store, &file, dry_run) {
            return Self::store_failure_outcome(&file, e);
        }
        Self::emit_status_change(&events, &file, previous).await;

        // Dry run stops short of the move; the outcome reports the planned
        // destination.
        if dry_run {
            return Self::success_outcome(&file, Some(target));
        }

        // Stage 3: the move.
        let previous = file.status;
        if let Err(e) = file.begin_move() {
            return Self::contract_violation_outcome(&file, FileOperation::Move, e.to_string());
        }
        if let Err(e) = Self::persist(&store, &file, dry_run) {
            return Self::store_failure_outcome(&file, e);
        }
        Self::emit_status_change(&events, &file, previous).await;

        Self::move_stage(
            &mut file, &mover, &store, &events, &config, &options, &target, &cancel,
        )
        .await
    }

    /// Classification with triage-driven retries. Returns `Some(outcome)`
    /// when the file failed terminally, `None` on success.
    #[allow(clippy::too_many_arguments)]
    async fn classification_stage(
        file: &mut TrackedFile,
        classifier: &Arc<C>,
        store: &Arc<dyn FileStore>,
        events: &Option<EventHandle>,
        config: &ProcessorConfig,
        options: &BatchOptions,
        cancel: &CancellationToken,
    ) -> Option<FileOutcome> {
        let descriptor = FileDescriptor {
            content_hash: file.content_hash.clone(),
            file_name: file.file_name.clone(),
            path: file.original_path.clone(),
            size_bytes: file.size_bytes,
        };

        let mut attempt: u32 = 0;
        loop {
            match classifier.classify(&descriptor).await {
                Ok(classification) => {
                    let previous = file.status;
                    if let Err(e) = file
                        .mark_as_classified(&classification.category, classification.confidence)
                    {
                        return Some(Self::contract_violation_outcome(
                            file,
                            FileOperation::Classify,
                            e.to_string(),
                        ));
                    }
                    if let Err(e) = Self::persist(store, file, options.dry_run) {
                        return Some(Self::store_failure_outcome(file, e));
                    }
                    Self::emit_status_change(events, file, previous).await;
                    return None;
                }
                Err(err) => {
                    attempt += 1;
                    let message = err.to_string();
                    let ctx = ErrorContext::new(FileOperation::Classify, &message)
                        .with_paths(Some(file.original_path.clone()), None)
                        .with_space(Some(file.size_bytes), None)
                        .with_prior_retries(file.retry_count);
                    let classification = triage::classify(&ctx);
                    metrics::TRIAGED_ERRORS
                        .with_label_values(&[classification.kind.as_str()])
                        .inc();

                    match Self::handle_failure(
                        file,
                        store,
                        events,
                        &config.retry,
                        options.dry_run,
                        &message,
                        classification,
                        attempt,
                        cancel,
                    )
                    .await
                    {
                        FailureDisposition::RetryNow => continue,
                        FailureDisposition::Settled(outcome) => return Some(outcome),
                    }
                }
            }
        }
    }

    /// The move with triage-driven retries.
    #[allow(clippy::too_many_arguments)]
    async fn move_stage(
        file: &mut TrackedFile,
        mover: &Arc<M>,
        store: &Arc<dyn FileStore>,
        events: &Option<EventHandle>,
        config: &ProcessorConfig,
        options: &BatchOptions,
        target: &std::path::Path,
        cancel: &CancellationToken,
    ) -> FileOutcome {
        let mut attempt: u32 = 0;
        loop {
            let request = MoveRequest {
                content_hash: file.content_hash.clone(),
                source: file.original_path.clone(),
                destination: target.to_path_buf(),
                overwrite: false,
                create_directories: options.create_directories,
            };

            match mover.move_file(request).await {
                Ok(moved) => {
                    metrics::MOVE_DURATION.observe(moved.duration_ms as f64 / 1000.0);
                    let previous = file.status;
                    if let Err(e) = file.mark_as_moved(&moved.destination) {
                        return Self::contract_violation_outcome(
                            file,
                            FileOperation::Move,
                            e.to_string(),
                        );
                    }
                    if let Err(e) = Self::persist(store, file, options.dry_run) {
                        return Self::store_failure_outcome(file, e);
                    }
                    Self::emit_status_change(events, file, previous).await;
                    if let Some(ref events) = events {
                        events
                            .emit(FileEvent::FileMoved {
                                content_hash: file.content_hash.clone(),
                                destination: moved.destination.clone(),
                                size_bytes: moved.size_bytes,
                            })
                            .await;
                    }
                    return Self::success_outcome(file, Some(moved.destination));
                }
                Err(err) => {
                    attempt += 1;
                    let message = err.to_string();
                    let (required, available) = match &err {
                        MoveError::InsufficientSpace {
                            required_bytes,
                            available_bytes,
                            ..
                        } => (Some(*required_bytes), Some(*available_bytes)),
                        _ => (Some(file.size_bytes), None),
                    };
                    let ctx = ErrorContext::new(FileOperation::Move, &message)
                        .with_paths(Some(file.original_path.clone()), Some(target.to_path_buf()))
                        .with_space(required, available)
                        .with_prior_retries(file.retry_count);
                    let classification = triage::classify(&ctx);
                    metrics::TRIAGED_ERRORS
                        .with_label_values(&[classification.kind.as_str()])
                        .inc();

                    match Self::handle_failure(
                        file,
                        store,
                        events,
                        &config.retry,
                        options.dry_run,
                        &message,
                        classification,
                        attempt,
                        cancel,
                    )
                    .await
                    {
                        FailureDisposition::RetryNow => continue,
                        FailureDisposition::Settled(outcome) => return outcome,
                    }
                }
            }
        }
    }

    /// Records a non-retryable failure and settles the file.
    async fn terminal_failure(
        file: &mut TrackedFile,
        store: &Arc<dyn FileStore>,
        events: &Option<EventHandle>,
        message: &str,
        classification: ErrorClassification,
        dry_run: bool,
    ) -> FileOutcome {
        if let Err(e) = file.record_error(message, false) {
            return Self::contract_violation_outcome(file, FileOperation::Persist, e.to_string());
        }
        if let Err(e) = Self::persist(store, file, dry_run) {
            return Self::store_failure_outcome(file, e);
        }
        if let Some(ref events) = events {
            events
                .emit(FileEvent::FileFailed {
                    content_hash: file.content_hash.clone(),
                    kind: classification.kind,
                    will_retry: false,
                    message: message.to_string(),
                })
                .await;
        }
        FileOutcome {
            content_hash: file.content_hash.clone(),
            file_name: file.file_name.clone(),
            succeeded: false,
            skipped: false,
            final_status: file.status,
            moved_to: None,
            error: Some(classification),
        }
    }

    /// Applies the retry policy to a triaged failure: records the error on
    /// the entity, sleeps out the backoff for retryable failures, and
    /// settles the file otherwise.
    #[allow(clippy::too_many_arguments)]
    async fn handle_failure(
        file: &mut TrackedFile,
        store: &Arc<dyn FileStore>,
        events: &Option<EventHandle>,
        retry_config: &RetryConfig,
        dry_run: bool,
        message: &str,
        classification: ErrorClassification,
        attempt: u32,
        cancel: &CancellationToken,
    ) -> FailureDisposition {
        let ceiling_hit = retry_config
            .max_total_retries
            .map_or(false, |max| file.retry_count >= max);
        let will_retry =
            classification.can_retry && attempt < classification.max_attempts && !ceiling_hit;

        if let Err(e) = file.record_error(message, will_retry) {
            return FailureDisposition::Settled(Self::contract_violation_outcome(
                file,
                FileOperation::Persist,
                e.to_string(),
            ));
        }
        if let Err(e) = Self::persist(store, file, dry_run) {
            return FailureDisposition::Settled(Self::store_failure_outcome(file, e));
        }
        if let Some(ref events) = events {
            events
                .emit(FileEvent::FileFailed {
                    content_hash: file.content_hash.clone(),
                    kind: classification.kind,
                    will_retry,
                    message: message.to_string(),
                })
                .await;
        }

        if !will_retry {
            return FailureDisposition::Settled(FileOutcome {
                content_hash: file.content_hash.clone(),
                file_name: file.file_name.clone(),
                succeeded: false,
                skipped: false,
                final_status: file.status,
                moved_to: None,
                error: Some(classification),
            });
        }

        let delay = Self::backoff_delay(retry_config, classification.retry_delay, attempt - 1);
        debug!(
            hash = %file.content_hash,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Retrying after transient failure"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                // Cancelled mid-backoff: the file stays in Retry, a
                // consistent state for the next batch to pick up.
                FailureDisposition::Settled(FileOutcome {
                    content_hash: file.content_hash.clone(),
                    file_name: file.file_name.clone(),
                    succeeded: false,
                    skipped: false,
                    final_status: file.status,
                    moved_to: None,
                    error: Some(classification),
                })
            }
            _ = tokio::time::sleep(delay) => FailureDisposition::RetryNow,
        }
    }

    /// Delay for the given zero-based attempt: triage base delay scaled by
    /// the configured multiplier, capped at the configured maximum.
    fn backoff_delay(retry: &RetryConfig, base: Duration, attempt: u32) -> Duration {
        let scaled =
            base.as_millis() as f64 * retry.backoff_multiplier.powi(attempt.min(16) as i32);
        Duration::from_millis((scaled as u64).min(retry.max_delay_ms))
    }

    fn check_target_path(target: &std::path::Path) -> Option<String> {
        let text = target.to_string_lossy();
        if text.is_empty() {
            return Some("target path is empty".to_string());
        }
        if text.contains('\0') {
            return Some("target path contains a NUL byte".to_string());
        }
        if let Some(name) = target.file_name() {
            if name.len() > 255 {
                return Some("file name too long".to_string());
            }
        } else {
            return Some("target path has no file name".to_string());
        }
        None
    }

    fn persist(
        store: &Arc<dyn FileStore>,
        file: &TrackedFile,
        dry_run: bool,
    ) -> Result<(), crate::tracked_file::StoreError> {
        if dry_run {
            return Ok(());
        }
        store.save(file)
    }

    async fn emit_status_change(
        events: &Option<EventHandle>,
        file: &TrackedFile,
        previous: FileStatus,
    ) {
        if let Some(events) = events {
            events
                .emit(FileEvent::StatusChanged {
                    content_hash: file.content_hash.clone(),
                    from: previous,
                    to: file.status,
                })
                .await;
        }
    }

    fn success_outcome(file: &TrackedFile, moved_to: Option<std::path::PathBuf>) -> FileOutcome {
        FileOutcome {
            content_hash: file.content_hash.clone(),
            file_name: file.file_name.clone(),
            succeeded: true,
            skipped: false,
            final_status: file.status,
            moved_to,
            error: None,
        }
    }

    /// A coordinator-side contract violation (terminal entity, invalid
    /// argument). Reported loudly in the outcome; the entity keeps its last
    /// consistent state.
    fn contract_violation_outcome(
        file: &TrackedFile,
        operation: FileOperation,
        message: String,
    ) -> FileOutcome {
        warn!(hash = %file.content_hash, error = %message, "Contract violation in batch");
        let ctx = ErrorContext::new(operation, &message).with_prior_retries(file.retry_count);
        FileOutcome {
            content_hash: file.content_hash.clone(),
            file_name: file.file_name.clone(),
            succeeded: false,
            skipped: false,
            final_status: file.status,
            moved_to: None,
            error: Some(triage::classify(&ctx)),
        }
    }

    fn store_failure_outcome(
        file: &TrackedFile,
        error: crate::tracked_file::StoreError,
    ) -> FileOutcome {
        warn!(hash = %file.content_hash, error = %error, "Failed to persist file state");
        let ctx = ErrorContext::new(FileOperation::Persist, error.to_string())
            .with_prior_retries(file.retry_count);
        FileOutcome {
            content_hash: file.content_hash.clone(),
            file_name: file.file_name.clone(),
            succeeded: false,
            skipped: false,
            final_status: file.status,
            moved_to: None,
            error: Some(triage::classify(&ctx)),
        }
    }
}

/// What to do after a recorded failure.
enum FailureDisposition {
    /// The failure was transient and within budget; try again now.
    RetryNow,
    /// The file settled (terminal failure or cancelled backoff).
    Settled(FileOutcome),
}
