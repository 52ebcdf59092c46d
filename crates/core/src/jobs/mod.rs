//! Batch job submission and result tracking.

mod results;
mod service;

pub use results::{JobResultStore, JobStatus, MemoryJobStore};
pub use service::{BatchJobService, SubmitError};
