//! Configuration for the processor module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lowest allowed per-batch concurrency.
pub const MIN_CONCURRENCY: usize = 1;
/// Highest allowed per-batch concurrency.
///
/// The bound exists to cap peak memory on constrained hardware, not for
/// correctness; the per-file state machine is the correctness boundary.
pub const MAX_CONCURRENCY: usize = 10;

/// Configuration for the batch processing coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Default maximum files processed concurrently within a batch.
    /// Requests can override this within [MIN_CONCURRENCY, MAX_CONCURRENCY].
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Default batch policy when the request does not choose one:
    /// abort on the first unrecoverable failure.
    #[serde(default)]
    pub continue_on_error: bool,

    /// Root of the organized library; targets default to
    /// `<library_root>/<category>/<file_name>`.
    #[serde(default = "default_library_root")]
    pub library_root: PathBuf,

    /// Files classified at or above this confidence are automatically
    /// confirmed into their suggested category by the daemon. `None`
    /// disables auto-confirmation; every file then waits for an explicit
    /// batch request.
    #[serde(default)]
    pub auto_confirm_threshold: Option<f32>,

    /// Retry configuration.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Multiplier applied to the triage-recommended delay per attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Ceiling for a single backoff delay in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Hard ceiling on a file's cumulative retry count. Once reached, the
    /// next failure is terminal regardless of triage. `None` means no
    /// ceiling: a file may loop through Retry indefinitely.
    #[serde(default)]
    pub max_total_retries: Option<u32>,
}

fn default_max_concurrency() -> usize {
    // Keep the default low: the target is single-board hardware where
    // memory, not CPU, is the scarce resource.
    std::thread::available_parallelism()
        .map(|n| n.get().min(4))
        .unwrap_or(2)
        .clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
}

fn default_library_root() -> PathBuf {
    PathBuf::from("/srv/library")
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            max_total_retries: None,
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            continue_on_error: false,
            library_root: default_library_root(),
            auto_confirm_threshold: None,
            retry: RetryConfig::default(),
        }
    }
}

impl ProcessorConfig {
    /// Sets the default max concurrency.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Sets the library root.
    pub fn with_library_root(mut self, root: PathBuf) -> Self {
        self.library_root = root;
        self
    }

    /// Sets the batch policy default.
    pub fn with_continue_on_error(mut self, enabled: bool) -> Self {
        self.continue_on_error = enabled;
        self
    }

    /// Resolves the effective concurrency bound for a batch, applying the
    /// request override and clamping into [MIN_CONCURRENCY, MAX_CONCURRENCY].
    pub fn concurrency_bound(&self, request_override: Option<usize>) -> usize {
        request_override
            .unwrap_or(self.max_concurrency)
            .clamp(MIN_CONCURRENCY, MAX_CONCURRENCY)
    }
}
