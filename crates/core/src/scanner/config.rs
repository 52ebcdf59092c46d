//! Configuration for the discovery scanner.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the discovery scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Directories to scan for new media files.
    #[serde(default)]
    pub roots: Vec<PathBuf>,

    /// File extensions (lowercase, no dot) considered media. Everything
    /// else is skipped.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Files smaller than this are skipped (sample files, artwork).
    #[serde(default)]
    pub min_file_size_bytes: u64,

    /// How often the daemon runs a scan, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_extensions() -> Vec<String> {
    [
        "mkv", "mp4", "avi", "m4v", "mov", "webm", "ts", "flac", "mp3", "ogg", "opus", "m4a",
        "wav", "aac", "epub", "mobi", "azw3", "pdf", "cbz", "cbr",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_poll_interval() -> u64 {
    300
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            extensions: default_extensions(),
            min_file_size_bytes: 0,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert!(config.roots.is_empty());
        assert!(config.extensions.iter().any(|e| e == "mkv"));
        assert_eq!(config.poll_interval_secs, 300);
    }

    #[test]
    fn test_deserialize() {
        let toml = r#"
            roots = ["/incoming"]
            extensions = ["mkv"]
            min_file_size_bytes = 1048576
        "#;
        let config: ScannerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.roots, vec![PathBuf::from("/incoming")]);
        assert_eq!(config.extensions, vec!["mkv"]);
        assert_eq!(config.min_file_size_bytes, 1024 * 1024);
    }
}
