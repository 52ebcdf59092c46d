//! Types for the queue module.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// The deferred unit of work held by the task queue.
pub struct WorkItem {
    /// Opaque identifier (UUID).
    pub id: String,
    /// Human-readable label for logs and monitoring.
    pub label: String,
    /// When the item was created.
    pub enqueued_at: DateTime<Utc>,
    task: Pin<Box<dyn Future<Output = ()> + Send + 'static>>,
}

impl WorkItem {
    /// Creates a work item wrapping the given action.
    pub fn new(label: impl Into<String>, task: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: label.into(),
            enqueued_at: Utc::now(),
            task: Box::pin(task),
        }
    }

    /// Consumes the item, returning its executable action.
    pub fn into_task(self) -> Pin<Box<dyn Future<Output = ()> + Send + 'static>> {
        self.task
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

/// Error type for queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue is at capacity; the caller decides whether to wait or
    /// reject.
    #[error("queue is full (capacity {capacity}), rejected item: {label}")]
    Full { capacity: usize, label: String },

    /// The queue has been closed; no further items are accepted.
    #[error("queue is closed")]
    Closed,
}

/// Outcome of a dequeue call.
///
/// Cancellation is a distinguishable outcome, not an error.
#[derive(Debug)]
pub enum DequeueOutcome {
    /// An item is ready for execution.
    Item(WorkItem),
    /// The cancellation signal fired while waiting.
    Cancelled,
    /// All producers are gone and the queue is drained.
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_gets_unique_ids() {
        let a = WorkItem::new("a", async {});
        let b = WorkItem::new("b", async {});
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_work_item_debug_omits_task() {
        let item = WorkItem::new("scan incoming", async {});
        let output = format!("{item:?}");
        assert!(output.contains("scan incoming"));
        assert!(output.contains(".."));
    }

    #[test]
    fn test_into_task_runs_action() {
        tokio_test::block_on(async {
            let (tx, rx) = tokio::sync::oneshot::channel();
            let item = WorkItem::new("signal", async move {
                let _ = tx.send(42);
            });
            item.into_task().await;
            assert_eq!(rx.await.unwrap(), 42);
        });
    }
}
