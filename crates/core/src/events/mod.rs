//! Best-effort event emission on status changes.
//!
//! An explicit channel with one well-typed consumer instead of a global
//! publish/subscribe registry: the coordinator gets an [`EventHandle`], the
//! daemon spawns [`spawn_event_logger`] as the consuming end.

mod handle;
mod logger;
mod types;

pub use handle::{EventHandle, FileEventEnvelope};
pub use logger::spawn_event_logger;
pub use types::FileEvent;
