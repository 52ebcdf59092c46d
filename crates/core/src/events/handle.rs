//! Handle for emitting file events.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::types::FileEvent;

/// Envelope wrapping an event with its emission timestamp.
#[derive(Debug, Clone)]
pub struct FileEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: FileEvent,
}

/// Handle for emitting file events.
///
/// Cheaply cloneable and shareable across tasks. Emission is fire-and-forget:
/// a full or closed channel is logged and the caller is never blocked or
/// failed. There is exactly one consumer per channel; no global registry.
#[derive(Clone)]
pub struct EventHandle {
    tx: mpsc::Sender<FileEventEnvelope>,
}

impl EventHandle {
    /// Creates a handle from a channel sender.
    pub fn new(tx: mpsc::Sender<FileEventEnvelope>) -> Self {
        Self { tx }
    }

    /// Creates a handle together with its receiving end.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<FileEventEnvelope>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }

    /// Emits an event asynchronously.
    ///
    /// Waits for channel space, but never fails the caller; a closed channel
    /// is logged and ignored.
    pub async fn emit(&self, event: FileEvent) {
        let envelope = FileEventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(envelope).await {
            tracing::warn!("Failed to emit file event: {}", e);
        }
    }

    /// Emits an event without waiting.
    ///
    /// Returns true if the event was accepted.
    pub fn try_emit(&self, event: FileEvent) -> bool {
        let envelope = FileEventEnvelope {
            timestamp: Utc::now(),
            event,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to emit file event: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracked_file::FileStatus;

    fn sample_event() -> FileEvent {
        FileEvent::StatusChanged {
            content_hash: "abc".to_string(),
            from: FileStatus::New,
            to: FileStatus::Processing,
        }
    }

    #[tokio::test]
    async fn test_emit_event() {
        let (handle, mut rx) = EventHandle::channel(10);
        handle.emit(sample_event()).await;

        let envelope = rx.recv().await.expect("Should receive event");
        assert_eq!(envelope.event, sample_event());
    }

    #[tokio::test]
    async fn test_multiple_handles_same_channel() {
        let (handle1, mut rx) = EventHandle::channel(10);
        let handle2 = handle1.clone();

        handle1.emit(sample_event()).await;
        handle2
            .emit(FileEvent::BatchStarted {
                job_id: "j1".to_string(),
                batch_name: None,
                total_files: 2,
            })
            .await;

        assert!(matches!(
            rx.recv().await.unwrap().event,
            FileEvent::StatusChanged { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap().event,
            FileEvent::BatchStarted { .. }
        ));
    }

    #[test]
    fn test_try_emit_full_channel() {
        let (handle, _rx) = EventHandle::channel(1);

        assert!(handle.try_emit(sample_event()));
        // Channel full: dropped and reported, caller not failed.
        assert!(!handle.try_emit(sample_event()));
    }

    #[tokio::test]
    async fn test_emit_closed_channel_does_not_panic() {
        let (handle, rx) = EventHandle::channel(10);
        drop(rx);
        handle.emit(sample_event()).await;
    }

    #[test]
    fn test_envelope_has_timestamp() {
        let (handle, mut rx) = EventHandle::channel(10);
        let before = Utc::now();
        handle.try_emit(sample_event());
        let after = Utc::now();

        let envelope = rx.try_recv().expect("Should receive event");
        assert!(envelope.timestamp >= before);
        assert!(envelope.timestamp <= after);
    }
}
