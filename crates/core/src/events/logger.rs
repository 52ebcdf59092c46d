//! The event channel's consumer: drains envelopes into structured logs.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::handle::FileEventEnvelope;
use super::types::FileEvent;

/// Spawns the single consumer of an event channel.
///
/// Runs until every sender is dropped, then exits. Each event becomes one
/// structured log line.
pub fn spawn_event_logger(mut rx: mpsc::Receiver<FileEventEnvelope>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            log_event(&envelope);
        }
        info!("Event logger stopped");
    })
}

fn log_event(envelope: &FileEventEnvelope) {
    match &envelope.event {
        FileEvent::StatusChanged {
            content_hash,
            from,
            to,
        } => {
            info!(hash = %content_hash, from = %from, to = %to, "File status changed");
        }
        FileEvent::FileDiscovered {
            content_hash,
            file_name,
            size_bytes,
        } => {
            info!(hash = %content_hash, file = %file_name, size = size_bytes, "File discovered");
        }
        FileEvent::FileMoved {
            content_hash,
            destination,
            size_bytes,
        } => {
            info!(
                hash = %content_hash,
                destination = %destination.display(),
                size = size_bytes,
                "File moved into library"
            );
        }
        FileEvent::FileFailed {
            content_hash,
            kind,
            will_retry,
            message,
        } => {
            info!(
                hash = %content_hash,
                kind = %kind,
                will_retry,
                error = %message,
                "File failed"
            );
        }
        FileEvent::BatchStarted {
            job_id,
            batch_name,
            total_files,
        } => {
            info!(
                job = %job_id,
                name = batch_name.as_deref().unwrap_or("-"),
                total = total_files,
                "Batch started"
            );
        }
        FileEvent::BatchCompleted {
            job_id,
            succeeded,
            failed,
            cancelled,
            duration_ms,
        } => {
            info!(
                job = %job_id,
                succeeded,
                failed,
                cancelled,
                duration_ms,
                "Batch completed"
            );
        }
    }
}
