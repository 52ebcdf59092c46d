//! Batch job results store.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::processor::BatchResult;

/// Status of a submitted batch job, queryable by job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted and waiting in the task queue.
    Queued,
    /// Claimed by a consumer and running.
    Running,
    /// Finished; the batch result is attached.
    Completed { result: BatchResult },
    /// The work item died before producing a result.
    Failed { error: String },
}

impl JobStatus {
    /// True for `Completed` and `Failed`.
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }
}

/// Storage for batch job statuses.
pub trait JobResultStore: Send + Sync {
    /// Records a status for the job, replacing any previous one.
    fn set(&self, job_id: &str, status: JobStatus);

    /// Gets the current status of a job.
    fn get(&self, job_id: &str) -> Option<JobStatus>;
}

/// In-memory job result store.
///
/// Results live for the process lifetime; a restart forgets finished jobs,
/// which is acceptable because the durable outcome lives on the tracked
/// files themselves.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, JobStatus>>,
}

impl MemoryJobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known jobs.
    pub fn len(&self) -> usize {
        self.jobs.read().unwrap().len()
    }

    /// Returns true when no jobs are recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobResultStore for MemoryJobStore {
    fn set(&self, job_id: &str, status: JobStatus) {
        self.jobs
            .write()
            .unwrap()
            .insert(job_id.to_string(), status);
    }

    fn get(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().unwrap().get(job_id).cloned()
    }
}
