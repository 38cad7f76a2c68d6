//! Configuration loader for Memory-Inspector
//!
//! Handles loading configuration from TOML files and merging with defaults.

use super::defaults::default_config;
use crate::core::types::{ValidationError, ValueSize};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "MEMORY_INSPECTOR_CONFIG";

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_scanner")]
    pub scanner: ScannerConfig,

    #[serde(default = "default_watch")]
    pub watch: WatchConfig,

    #[serde(default = "default_neighbors")]
    pub neighbors: NeighborConfig,

    #[serde(default = "default_settings")]
    pub settings: SettingsConfig,

    #[serde(default = "default_attach")]
    pub attach: AttachConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_writable_only")]
    pub writable_only: bool,
    #[serde(default = "default_refresh_regions_before_scan")]
    pub refresh_regions_before_scan: bool,
}

/// Watch poller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Neighbor window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborConfig {
    #[serde(default = "default_radius")]
    pub radius: usize,
}

/// Initial engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default = "default_value_size")]
    pub value_size: usize,
}

impl SettingsConfig {
    pub fn value_size(&self) -> Result<ValueSize, ValidationError> {
        ValueSize::try_from(self.value_size)
    }
}

/// Attach policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachConfig {
    #[serde(default = "default_allow_reattach")]
    pub allow_reattach: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Path this loader reads from
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration, falling back to defaults only when the file is absent
    ///
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(&self) -> Result<Config, ConfigError> {
        match self.load() {
            Err(ConfigError::FileNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Saves configuration to file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Loads configuration from `path`, `$MEMORY_INSPECTOR_CONFIG`, or `config.toml`
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.toml")),
    };
    ConfigLoader::new(path).load_or_default()
}

// Default functions for serde
fn default_scanner() -> ScannerConfig {
    let defaults = default_config();
    ScannerConfig {
        max_threads: defaults.scanner.max_threads,
        chunk_size: defaults.scanner.chunk_size,
        writable_only: defaults.scanner.writable_only,
        refresh_regions_before_scan: defaults.scanner.refresh_regions_before_scan,
    }
}

fn default_watch() -> WatchConfig {
    let defaults = default_config();
    WatchConfig {
        poll_interval_ms: defaults.watch.poll_interval_ms,
        channel_capacity: defaults.watch.channel_capacity,
    }
}

fn default_neighbors() -> NeighborConfig {
    NeighborConfig {
        radius: default_config().neighbors.radius,
    }
}

fn default_settings() -> SettingsConfig {
    SettingsConfig {
        value_size: default_config().settings.value_size,
    }
}

fn default_attach() -> AttachConfig {
    AttachConfig {
        allow_reattach: default_config().attach.allow_reattach,
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_config().logging.level,
    }
}

// Individual field defaults
fn default_max_threads() -> usize {
    default_config().scanner.max_threads
}

fn default_chunk_size() -> usize {
    default_config().scanner.chunk_size
}

fn default_writable_only() -> bool {
    default_config().scanner.writable_only
}

fn default_refresh_regions_before_scan() -> bool {
    default_config().scanner.refresh_regions_before_scan
}

fn default_poll_interval_ms() -> u64 {
    default_config().watch.poll_interval_ms
}

fn default_channel_capacity() -> usize {
    default_config().watch.channel_capacity
}

fn default_radius() -> usize {
    default_config().neighbors.radius
}

fn default_value_size() -> usize {
    default_config().settings.value_size
}

fn default_allow_reattach() -> bool {
    default_config().attach.allow_reattach
}

fn default_log_level() -> String {
    default_config().logging.level
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scanner: default_scanner(),
            watch: default_watch(),
            neighbors: default_neighbors(),
            settings: default_settings(),
            attach: default_attach(),
            logging: default_logging(),
        }
    }
}
