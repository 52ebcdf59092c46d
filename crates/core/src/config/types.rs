//! Root configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::mover::MoverConfig;
use crate::processor::ProcessorConfig;
use crate::queue::QueueConfig;
use crate::scanner::ScannerConfig;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file missing.
    #[error("config file not found: {0}")]
    FileNotFound(String),

    /// Config file could not be parsed.
    #[error("config parse error: {0}")]
    ParseError(String),

    /// A value fails validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub processor: ProcessorConfig,
    #[serde(default)]
    pub mover: MoverConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("shelver.db")
}

/// Event channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Event channel buffer size.
    #[serde(default = "default_event_buffer")]
    pub buffer: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            buffer: default_event_buffer(),
        }
    }
}

fn default_event_buffer() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database.path, PathBuf::from("shelver.db"));
        assert_eq!(config.queue.capacity, 100);
        assert_eq!(config.events.buffer, 1000);
    }
}
