//! Configuration for the queue module.

use serde::{Deserialize, Serialize};

/// Configuration for the task queue and its consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of queued items before enqueue blocks or rejects.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Number of consumer loops.
    ///
    /// One consumer (the default) preserves strict FIFO execution order.
    /// More consumers trade ordering for throughput.
    #[serde(default = "default_consumers")]
    pub consumers: usize,
}

fn default_capacity() -> usize {
    100
}

fn default_consumers() -> usize {
    1
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            consumers: default_consumers(),
        }
    }
}
