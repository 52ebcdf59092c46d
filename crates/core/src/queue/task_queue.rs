//! Bounded FIFO task queue.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::metrics;

use super::config::QueueConfig;
use super::types::{DequeueOutcome, QueueError, WorkItem};

/// Bounded, thread-safe FIFO queue of work items.
///
/// Multiple producers share the queue through `&self`; dequeue is safe for
/// concurrent callers (the receiver sits behind an async mutex), though a
/// single consumer is the default and the only configuration with a strict
/// FIFO execution guarantee.
pub struct TaskQueue {
    tx: mpsc::Sender<WorkItem>,
    rx: Mutex<mpsc::Receiver<WorkItem>>,
    depth: AtomicUsize,
    capacity: usize,
}

impl TaskQueue {
    /// Creates a queue with the given configuration.
    pub fn new(config: &QueueConfig) -> Self {
        Self::with_capacity(config.capacity)
    }

    /// Creates a queue bounded to `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx: Mutex::new(rx),
            depth: AtomicUsize::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Queue capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current queue depth.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Returns true when no items are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enqueues an item, suspending while the queue is at capacity.
    ///
    /// Backpressure: the call does not return until the item is accepted or
    /// the queue is closed. Items are never silently dropped.
    pub async fn enqueue(&self, item: WorkItem) -> Result<(), QueueError> {
        self.tx
            .send(item)
            .await
            .map_err(|_| QueueError::Closed)?;
        let depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::QUEUE_DEPTH.set(depth as i64);
        Ok(())
    }

    /// Enqueues an item, failing fast with [`QueueError::Full`] when at
    /// capacity.
    pub fn try_enqueue(&self, item: WorkItem) -> Result<(), QueueError> {
        match self.tx.try_send(item) {
            Ok(()) => {
                let depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
                metrics::QUEUE_DEPTH.set(depth as i64);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(rejected)) => Err(QueueError::Full {
                capacity: self.capacity,
                label: rejected.label,
            }),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// Dequeues the next item in FIFO order.
    ///
    /// Suspends until an item is available, the cancellation signal fires,
    /// or the queue is closed and drained.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> DequeueOutcome {
        tokio::select! {
            // Biased so a fired cancellation always wins over a ready item;
            // shutdown must never start new work.
            biased;
            _ = cancel.cancelled() => DequeueOutcome::Cancelled,
            received = async { self.rx.lock().await.recv().await } => match received {
                Some(item) => {
                    let depth = self.depth.fetch_sub(1, Ordering::Relaxed) - 1;
                    metrics::QUEUE_DEPTH.set(depth as i64);
                    DequeueOutcome::Item(item)
                }
                None => DequeueOutcome::Closed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn noop_item(label: &str) -> WorkItem {
        WorkItem::new(label, async {})
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = TaskQueue::with_capacity(10);
        let cancel = CancellationToken::new();

        for label in ["first", "second", "third"] {
            queue.enqueue(noop_item(label)).await.unwrap();
        }

        for expected in ["first", "second", "third"] {
            match queue.dequeue(&cancel).await {
                DequeueOutcome::Item(item) => assert_eq!(item.label, expected),
                other => panic!("expected item, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_depth_tracking() {
        let queue = TaskQueue::with_capacity(10);
        let cancel = CancellationToken::new();
        assert!(queue.is_empty());

        queue.enqueue(noop_item("a")).await.unwrap();
        queue.enqueue(noop_item("b")).await.unwrap();
        assert_eq!(queue.len(), 2);

        let _ = queue.dequeue(&cancel).await;
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_try_enqueue_full() {
        let queue = TaskQueue::with_capacity(1);
        queue.try_enqueue(noop_item("fits")).unwrap();

        let result = queue.try_enqueue(noop_item("rejected"));
        match result {
            Err(QueueError::Full { capacity, label }) => {
                assert_eq!(capacity, 1);
                assert_eq!(label, "rejected");
            }
            other => panic!("expected Full, got {other:?}"),
        }
        // The accepted item is still there.
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_blocks_until_space_frees() {
        let queue = std::sync::Arc::new(TaskQueue::with_capacity(1));
        let cancel = CancellationToken::new();
        queue.enqueue(noop_item("occupant")).await.unwrap();

        let producer = {
            let queue = std::sync::Arc::clone(&queue);
            tokio::spawn(async move { queue.enqueue(noop_item("waiter")).await })
        };

        // The producer cannot finish while the queue is full.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!producer.is_finished());

        // Draining one item unblocks it; nothing was dropped.
        let _ = queue.dequeue(&cancel).await;
        producer.await.unwrap().unwrap();
        match queue.dequeue(&cancel).await {
            DequeueOutcome::Item(item) => assert_eq!(item.label, "waiter"),
            other => panic!("expected item, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dequeue_cancelled() {
        let queue = TaskQueue::with_capacity(4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        match queue.dequeue(&cancel).await {
            DequeueOutcome::Cancelled => {}
            other => panic!("expected cancelled, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_item() {
        let queue = std::sync::Arc::new(TaskQueue::with_capacity(4));
        let cancel = CancellationToken::new();

        let consumer = {
            let queue = std::sync::Arc::clone(&queue);
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.dequeue(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.enqueue(noop_item("late arrival")).await.unwrap();

        match consumer.await.unwrap() {
            DequeueOutcome::Item(item) => assert_eq!(item.label, "late arrival"),
            other => panic!("expected item, got {other:?}"),
        }
    }
}
