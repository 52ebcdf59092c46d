//! Queue consumer worker loop.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::metrics;

use super::task_queue::TaskQueue;
use super::types::DequeueOutcome;

/// Long-lived consumer that executes queued work items sequentially.
///
/// Failure isolation: each item runs in its own spawned task, so a panic
/// inside an item is caught at the join point and logged; the loop itself
/// never dies from item failure. Shutdown is cooperative: the in-flight
/// item finishes, no new item is started.
pub struct QueueConsumer {
    queue: Arc<TaskQueue>,
    shutdown: CancellationToken,
}

impl QueueConsumer {
    /// Creates a consumer over the given queue.
    pub fn new(queue: Arc<TaskQueue>, shutdown: CancellationToken) -> Self {
        Self { queue, shutdown }
    }

    /// Spawns the consumer loop, returning its join handle.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run("worker-0"))
    }

    /// Spawns a pool of `count` consumers over the same queue.
    ///
    /// With more than one consumer, cross-item completion order is no
    /// longer guaranteed; per-item atomicity still holds.
    pub fn spawn_pool(
        queue: Arc<TaskQueue>,
        shutdown: CancellationToken,
        count: usize,
    ) -> Vec<JoinHandle<()>> {
        (0..count.max(1))
            .map(|i| {
                let consumer = Self::new(Arc::clone(&queue), shutdown.clone());
                tokio::spawn(consumer.run(format!("worker-{i}")))
            })
            .collect()
    }

    async fn run(self, name: impl Into<String>) {
        let name = name.into();
        info!(worker = %name, "Queue consumer started");

        loop {
            match self.queue.dequeue(&self.shutdown).await {
                DequeueOutcome::Item(item) => {
                    let item_id = item.id.clone();
                    let label = item.label.clone();
                    debug!(worker = %name, item = %item_id, label = %label, "Executing work item");

                    // Run the item in its own task so a panic is contained
                    // at the join point instead of tearing down the loop.
                    match tokio::spawn(item.into_task()).await {
                        Ok(()) => {
                            metrics::WORK_ITEMS.with_label_values(&["ok"]).inc();
                            debug!(worker = %name, item = %item_id, "Work item finished");
                        }
                        Err(join_error) if join_error.is_panic() => {
                            metrics::WORK_ITEMS.with_label_values(&["panicked"]).inc();
                            error!(
                                worker = %name,
                                item = %item_id,
                                label = %label,
                                "Work item panicked; consumer continues"
                            );
                        }
                        Err(join_error) => {
                            metrics::WORK_ITEMS.with_label_values(&["failed"]).inc();
                            error!(
                                worker = %name,
                                item = %item_id,
                                label = %label,
                                error = %join_error,
                                "Work item aborted; consumer continues"
                            );
                        }
                    }
                }
                DequeueOutcome::Cancelled => {
                    info!(worker = %name, "Queue consumer received shutdown signal");
                    break;
                }
                DequeueOutcome::Closed => {
                    info!(worker = %name, "Queue closed, consumer exiting");
                    break;
                }
            }
        }

        info!(worker = %name, "Queue consumer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::WorkItem;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_consumer_executes_items_in_order() {
        let queue = Arc::new(TaskQueue::with_capacity(10));
        let shutdown = CancellationToken::new();
        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            queue
                .enqueue(WorkItem::new(format!("item-{i}"), async move {
                    order.lock().await.push(i);
                }))
                .await
                .unwrap();
        }

        let handle = QueueConsumer::new(Arc::clone(&queue), shutdown.clone()).spawn();
        while !queue.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert_eq!(*order.lock().await, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_panicking_item_does_not_kill_loop() {
        let queue = Arc::new(TaskQueue::with_capacity(10));
        let shutdown = CancellationToken::new();
        let executed = Arc::new(AtomicUsize::new(0));

        queue
            .enqueue(WorkItem::new("bomb", async {
                panic!("intentional test panic");
            }))
            .await
            .unwrap();
        {
            let executed = Arc::clone(&executed);
            queue
                .enqueue(WorkItem::new("survivor", async move {
                    executed.fetch_add(1, Ordering::SeqCst);
                }))
                .await
                .unwrap();
        }

        let handle = QueueConsumer::new(Arc::clone(&queue), shutdown.clone()).spawn();
        while executed.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.cancel();
        handle.await.unwrap();

        // The loop survived the panic and ran the next item.
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_finishes_in_flight_item() {
        let queue = Arc::new(TaskQueue::with_capacity(10));
        let shutdown = CancellationToken::new();
        let finished = Arc::new(AtomicUsize::new(0));
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();

        {
            let finished = Arc::clone(&finished);
            queue
                .enqueue(WorkItem::new("slow", async move {
                    let _ = started_tx.send(());
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                }))
                .await
                .unwrap();
        }

        let handle = QueueConsumer::new(Arc::clone(&queue), shutdown.clone()).spawn();

        // Cancel while the item is mid-flight.
        started_rx.await.unwrap();
        shutdown.cancel();
        handle.await.unwrap();

        // The in-flight item was allowed to finish.
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_does_not_start_queued_items() {
        let queue = Arc::new(TaskQueue::with_capacity(10));
        let shutdown = CancellationToken::new();
        let executed = Arc::new(AtomicUsize::new(0));

        shutdown.cancel();
        {
            let executed = Arc::clone(&executed);
            queue
                .enqueue(WorkItem::new("never-runs", async move {
                    executed.fetch_add(1, Ordering::SeqCst);
                }))
                .await
                .unwrap();
        }

        let handle = QueueConsumer::new(Arc::clone(&queue), shutdown.clone()).spawn();
        handle.await.unwrap();

        assert_eq!(executed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pool_processes_all_items() {
        let queue = Arc::new(TaskQueue::with_capacity(32));
        let shutdown = CancellationToken::new();
        let executed = Arc::new(AtomicUsize::new(0));

        for i in 0..16 {
            let executed = Arc::clone(&executed);
            queue
                .enqueue(WorkItem::new(format!("item-{i}"), async move {
                    executed.fetch_add(1, Ordering::SeqCst);
                }))
                .await
                .unwrap();
        }

        let handles = QueueConsumer::spawn_pool(Arc::clone(&queue), shutdown.clone(), 4);
        while executed.load(Ordering::SeqCst) < 16 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.cancel();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(executed.load(Ordering::SeqCst), 16);
    }
}
