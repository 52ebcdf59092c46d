//! Configuration validation.

use crate::processor::{MAX_CONCURRENCY, MIN_CONCURRENCY};

use super::types::{Config, ConfigError};

/// Rejects configurations that would misbehave at runtime.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.queue.capacity == 0 {
        return Err(ConfigError::Invalid(
            "queue.capacity must be at least 1".to_string(),
        ));
    }
    if config.queue.consumers == 0 {
        return Err(ConfigError::Invalid(
            "queue.consumers must be at least 1".to_string(),
        ));
    }
    if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&config.processor.max_concurrency) {
        return Err(ConfigError::Invalid(format!(
            "processor.max_concurrency must be within {MIN_CONCURRENCY}..={MAX_CONCURRENCY}"
        )));
    }
    if config.processor.retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::Invalid(
            "processor.retry.backoff_multiplier must be at least 1.0".to_string(),
        ));
    }
    if config.processor.library_root.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "processor.library_root must not be empty".to_string(),
        ));
    }
    if let Some(threshold) = config.processor.auto_confirm_threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(
                "processor.auto_confirm_threshold must be within 0.0..=1.0".to_string(),
            ));
        }
    }
    if config.mover.buffer_size == 0 {
        return Err(ConfigError::Invalid(
            "mover.buffer_size must be at least 1".to_string(),
        ));
    }
    if config.scanner.poll_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "scanner.poll_interval_secs must be at least 1".to_string(),
        ));
    }
    if config.events.buffer == 0 {
        return Err(ConfigError::Invalid(
            "events.buffer must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = Config::default();
        config.queue.capacity = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_out_of_range_concurrency_rejected() {
        let mut config = Config::default();
        config.processor.max_concurrency = 50;
        assert!(validate_config(&config).is_err());

        config.processor.max_concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_sub_one_backoff_rejected() {
        let mut config = Config::default();
        config.processor.retry.backoff_multiplier = 0.5;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_library_root_rejected() {
        let mut config = Config::default();
        config.processor.library_root = std::path::PathBuf::new();
        assert!(validate_config(&config).is_err());
    }
}
