//! Extension-based heuristic classifier.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::traits::{Classification, Classifier, ClassifierError, FileDescriptor};

/// Heuristic classifier that maps file extensions (and a few filename
/// patterns) to categories.
///
/// Confidences are fixed per rule so results are reproducible run to run.
pub struct ExtensionClassifier;

const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "m4v", "mov", "webm", "ts"];
const AUDIO_EXTENSIONS: &[&str] = &["flac", "mp3", "ogg", "opus", "m4a", "wav", "aac"];
const BOOK_EXTENSIONS: &[&str] = &["epub", "mobi", "azw3", "pdf", "cbz", "cbr"];

/// SxxExx / 1x02 style episode markers.
static EPISODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(s\d{1,2}e\d{1,3}|\b\d{1,2}x\d{2,3}\b)").unwrap());

impl ExtensionClassifier {
    /// Creates the classifier.
    pub fn new() -> Self {
        Self
    }

    fn extension(file: &FileDescriptor) -> Option<String> {
        file.path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }
}

impl Default for ExtensionClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for ExtensionClassifier {
    fn name(&self) -> &str {
        "extension"
    }

    async fn classify(&self, file: &FileDescriptor) -> Result<Classification, ClassifierError> {
        let Some(ext) = Self::extension(file) else {
            return Err(ClassifierError::Unclassifiable {
                reason: format!("no file extension: {}", file.file_name),
            });
        };

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            // An episode marker in the name separates tv from movies.
            if EPISODE_PATTERN.is_match(&file.file_name) {
                return Ok(Classification::new("tv", 0.9));
            }
            return Ok(Classification::new("movies", 0.7));
        }
        if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(Classification::new("music", 0.85));
        }
        if BOOK_EXTENSIONS.contains(&ext.as_str()) {
            return Ok(Classification::new("books", 0.8));
        }

        Err(ClassifierError::Unclassifiable {
            reason: format!("unrecognized extension: .{ext}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn descriptor(name: &str) -> FileDescriptor {
        FileDescriptor {
            content_hash: "h".to_string(),
            file_name: name.to_string(),
            path: PathBuf::from("/incoming").join(name),
            size_bytes: 1024,
        }
    }

    #[tokio::test]
    async fn test_tv_episode_marker() {
        let classifier = ExtensionClassifier::new();
        let result = classifier
            .classify(&descriptor("Show.S02E05.1080p.mkv"))
            .await
            .unwrap();
        assert_eq!(result.category, "tv");
        assert_eq!(result.confidence, 0.9);
    }

    #[tokio::test]
    async fn test_alternate_episode_marker() {
        let classifier = ExtensionClassifier::new();
        let result = classifier
            .classify(&descriptor("show 3x07 hdtv.avi"))
            .await
            .unwrap();
        assert_eq!(result.category, "tv");
    }

    #[tokio::test]
    async fn test_movie_without_marker() {
        let classifier = ExtensionClassifier::new();
        let result = classifier
            .classify(&descriptor("Some.Film.2019.mkv"))
            .await
            .unwrap();
        assert_eq!(result.category, "movies");
        assert_eq!(result.confidence, 0.7);
    }

    #[tokio::test]
    async fn test_music() {
        let classifier = ExtensionClassifier::new();
        let result = classifier
            .classify(&descriptor("01 - Track.flac"))
            .await
            .unwrap();
        assert_eq!(result.category, "music");
    }

    #[tokio::test]
    async fn test_books() {
        let classifier = ExtensionClassifier::new();
        let result = classifier.classify(&descriptor("novel.epub")).await.unwrap();
        assert_eq!(result.category, "books");
    }

    #[tokio::test]
    async fn test_unrecognized_extension() {
        let classifier = ExtensionClassifier::new();
        let result = classifier.classify(&descriptor("archive.rar")).await;
        assert!(matches!(
            result,
            Err(ClassifierError::Unclassifiable { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_extension() {
        let classifier = ExtensionClassifier::new();
        let result = classifier.classify(&descriptor("README")).await;
        assert!(matches!(
            result,
            Err(ClassifierError::Unclassifiable { .. })
        ));
    }

    #[tokio::test]
    async fn test_deterministic() {
        let classifier = ExtensionClassifier::new();
        let a = classifier.classify(&descriptor("a.mkv")).await.unwrap();
        let b = classifier.classify(&descriptor("a.mkv")).await.unwrap();
        assert_eq!(a, b);
    }
}
