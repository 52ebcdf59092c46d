//! Core machinery of the shelver media shelving service.
//!
//! Pipeline: discovery ([`scanner`]) -> classification ([`classifier`]) ->
//! confirmation and move ([`processor`], [`mover`]), with each file's
//! lifecycle tracked by the [`tracked_file`] state machine. Work enters the
//! system through the bounded [`queue`] via [`jobs`], and every failure is
//! turned into an actionable recovery strategy by [`triage`].

pub mod classifier;
pub mod config;
pub mod events;
pub mod jobs;
pub mod metrics;
pub mod mover;
pub mod processor;
pub mod queue;
pub mod scanner;
pub mod testing;
pub mod tracked_file;
pub mod triage;

pub use classifier::{Classification, Classifier, ClassifierError, ExtensionClassifier};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use events::{spawn_event_logger, EventHandle, FileEvent};
pub use jobs::{BatchJobService, JobResultStore, JobStatus, MemoryJobStore, SubmitError};
pub use mover::{FileMover, FsMover, MoveError, MoverConfig};
pub use processor::{
    BatchEntry, BatchOptions, BatchProcessor, BatchRequest, BatchResult, BatchValidator,
    FileOutcome, ProcessorConfig,
};
pub use queue::{QueueConfig, QueueConsumer, TaskQueue, WorkItem};
pub use scanner::{Scanner, ScannerConfig};
pub use tracked_file::{
    FileStatus, FileStore, SqliteFileStore, TrackedFile, TransitionError,
};
pub use triage::{classify as classify_error, ErrorClassification, ErrorContext, ErrorKind};
