//! Processor module: batch validation and the processing coordinator.
//!
//! The [`BatchProcessor`] drives a batch of tracked files through the state
//! machine with bounded concurrency, routing every failure through triage
//! instead of surfacing raw errors to the caller. The [`BatchValidator`]
//! screens requested identifiers before a batch is admitted.
//!
//! # Example
//!
//! ```ignore
//! use shelver_core::processor::{BatchProcessor, BatchRequest, BatchEntry, ProcessorConfig};
//! use shelver_core::classifier::ExtensionClassifier;
//! use shelver_core::mover::{FsMover, MoverConfig};
//!
//! let processor = BatchProcessor::new(
//!     ProcessorConfig::default(),
//!     store,
//!     ExtensionClassifier::new(),
//!     FsMover::new(MoverConfig::default()),
//! );
//!
//! let request = BatchRequest::new(vec![BatchEntry::new(hash, "tv")]);
//! let result = processor.process_batch(files, &request, &cancel).await;
//! println!("{}/{} succeeded", result.succeeded, result.total);
//! ```

mod batch;
mod config;
mod types;
mod validator;

pub use batch::BatchProcessor;
pub use config::{ProcessorConfig, RetryConfig, MAX_CONCURRENCY, MIN_CONCURRENCY};
pub use types::{BatchEntry, BatchOptions, BatchRequest, BatchResult, FileOutcome};
pub use validator::{BatchValidationResult, BatchValidator, InvalidReason};
