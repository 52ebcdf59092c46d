//! Configuration for the mover module.

use serde::{Deserialize, Serialize};

/// Configuration for the file mover.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoverConfig {
    /// Prefer atomic rename over copy when source and destination are on
    /// the same filesystem.
    #[serde(default = "default_prefer_atomic")]
    pub prefer_atomic_moves: bool,

    /// Buffer size for cross-filesystem copies.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Create missing destination directories by default.
    #[serde(default = "default_create_directories")]
    pub create_directories: bool,
}

fn default_prefer_atomic() -> bool {
    true
}

fn default_buffer_size() -> usize {
    256 * 1024
}

fn default_create_directories() -> bool {
    true
}

impl Default for MoverConfig {
    fn default() -> Self {
        Self {
            prefer_atomic_moves: default_prefer_atomic(),
            buffer_size: default_buffer_size(),
            create_directories: default_create_directories(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MoverConfig::default();
        assert!(config.prefer_atomic_moves);
        assert_eq!(config.buffer_size, 256 * 1024);
        assert!(config.create_directories);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: MoverConfig = toml::from_str("buffer_size = 4096").unwrap();
        assert_eq!(config.buffer_size, 4096);
        assert!(config.prefer_atomic_moves);
    }
}
