//! Mock mover for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::mover::{FileMover, MoveError, MoveRequest, MovedFile};

/// A recorded move for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedMove {
    /// The request that was submitted.
    pub request: MoveRequest,
    /// Whether the move succeeded.
    pub success: bool,
}

/// Mock implementation of the [`FileMover`] trait.
///
/// Provides controllable behavior for testing:
/// - Track move requests for assertions
/// - Per-hash error injection (errors are consumed in order, so a move can
///   fail N times and then succeed)
/// - Simulated latency
#[derive(Clone)]
pub struct MockMover {
    moves: Arc<RwLock<Vec<RecordedMove>>>,
    errors: Arc<RwLock<HashMap<String, Vec<MoveError>>>>,
    move_duration: Arc<RwLock<Duration>>,
    reported_size: Arc<RwLock<u64>>,
}

impl Default for MockMover {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMover {
    /// Creates a mock mover where every move succeeds instantly.
    pub fn new() -> Self {
        Self {
            moves: Arc::new(RwLock::new(Vec::new())),
            errors: Arc::new(RwLock::new(HashMap::new())),
            move_duration: Arc::new(RwLock::new(Duration::ZERO)),
            reported_size: Arc::new(RwLock::new(1024)),
        }
    }

    /// Queues an error for the given hash; consumed on the next move.
    pub async fn push_error(&self, hash: impl Into<String>, error: MoveError) {
        self.errors
            .write()
            .await
            .entry(hash.into())
            .or_default()
            .push(error);
    }

    /// Queues an insufficient-space failure for the given hash.
    pub async fn fail_with_no_space(&self, hash: &str, required_bytes: u64) {
        self.push_error(
            hash,
            MoveError::InsufficientSpace {
                path: std::path::PathBuf::from("/library"),
                required_bytes,
                available_bytes: 0,
            },
        )
        .await;
    }

    /// Queues `count` transient I/O failures for the given hash.
    pub async fn fail_times_transient(&self, hash: &str, count: usize) {
        for _ in 0..count {
            self.push_error(
                hash,
                MoveError::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "simulated timeout",
                )),
            )
            .await;
        }
    }

    /// Sets the simulated move latency.
    pub async fn set_move_duration(&self, duration: Duration) {
        *self.move_duration.write().await = duration;
    }

    /// Sets the size reported for moved files.
    pub async fn set_reported_size(&self, size: u64) {
        *self.reported_size.write().await = size;
    }

    /// All recorded moves.
    pub async fn recorded_moves(&self) -> Vec<RecordedMove> {
        self.moves.read().await.clone()
    }

    /// Number of move calls made.
    pub async fn move_count(&self) -> usize {
        self.moves.read().await.len()
    }
}

#[async_trait]
impl FileMover for MockMover {
    fn name(&self) -> &str {
        "mock"
    }

    async fn move_file(&self, request: MoveRequest) -> Result<MovedFile, MoveError> {
        let duration = *self.move_duration.read().await;
        if duration > Duration::ZERO {
            tokio::time::sleep(duration).await;
        }

        let queued_error = {
            let mut errors = self.errors.write().await;
            match errors.get_mut(&request.content_hash) {
                Some(queue) if !queue.is_empty() => Some(queue.remove(0)),
                _ => None,
            }
        };

        if let Some(error) = queued_error {
            self.moves.write().await.push(RecordedMove {
                request,
                success: false,
            });
            return Err(error);
        }

        let moved = MovedFile {
            content_hash: request.content_hash.clone(),
            destination: request.destination.clone(),
            size_bytes: *self.reported_size.read().await,
            atomic: true,
            duration_ms: duration.as_millis() as u64,
        };
        self.moves.write().await.push(RecordedMove {
            request,
            success: true,
        });
        Ok(moved)
    }

    async fn validate(&self) -> Result<(), MoveError> {
        Ok(())
    }
}
