//! Configuration validator for Memory-Inspector
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{
    Config, ConfigError, LoggingConfig, NeighborConfig, ScannerConfig, SettingsConfig,
    WatchConfig,
};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_scanner(&config.scanner)?;
        Self::validate_watch(&config.watch)?;
        Self::validate_neighbors(&config.neighbors)?;
        Self::validate_settings(&config.settings)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    /// Validates scanner configuration
    fn validate_scanner(scanner: &ScannerConfig) -> Result<(), ConfigError> {
        if scanner.max_threads == 0 {
            return Err(ConfigError::Invalid(
                "Scanner threads must be at least 1".to_string(),
            ));
        }

        if scanner.max_threads > 128 {
            return Err(ConfigError::Invalid(
                "Scanner threads cannot exceed 128".to_string(),
            ));
        }

        if !scanner.chunk_size.is_power_of_two() || scanner.chunk_size < 4096 {
            return Err(ConfigError::Invalid(
                "Chunk size must be a power of 2 of at least 4096".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates watch configuration
    fn validate_watch(watch: &WatchConfig) -> Result<(), ConfigError> {
        if watch.poll_interval_ms == 0 || watch.poll_interval_ms > 60_000 {
            return Err(ConfigError::Invalid(
                "Watch poll interval must be between 1 and 60000 ms".to_string(),
            ));
        }

        if watch.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "Watch channel capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates neighbor window configuration
    fn validate_neighbors(neighbors: &NeighborConfig) -> Result<(), ConfigError> {
        if neighbors.radius == 0 || neighbors.radius > 4096 {
            return Err(ConfigError::Invalid(
                "Neighbor radius must be between 1 and 4096".to_string(),
            ));
        }
        Ok(())
    }

    /// Validates the initial settings
    fn validate_settings(settings: &SettingsConfig) -> Result<(), ConfigError> {
        settings
            .value_size()
            .map(|_| ())
            .map_err(|e| ConfigError::Invalid(format!("settings.value_size: {}", e)))
    }

    /// Validates logging configuration
    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
