//! Background task queue: bounded FIFO plus the long-lived consumer loop.
//!
//! The queue is the single synchronization point between request-facing
//! producers and background execution. Producers enqueue [`WorkItem`]s and
//! get backpressure when the queue is at capacity; the [`QueueConsumer`]
//! drains the queue one item at a time, isolating item failures so the loop
//! itself never dies.

mod config;
mod consumer;
mod task_queue;
mod types;

pub use config::QueueConfig;
pub use consumer::QueueConsumer;
pub use task_queue::TaskQueue;
pub use types::{DequeueOutcome, QueueError, WorkItem};
