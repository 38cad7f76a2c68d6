//! Configuration module for Memory-Inspector
//!
//! Provides configuration loading, validation, and default settings
//! for the inspection engine.

mod defaults;
mod loader;
mod validator;

pub use defaults::{default_config, ConfigDefaults};
pub use loader::{
    load_config, AttachConfig, ConfigLoader, LoggingConfig, NeighborConfig, ScannerConfig,
    SettingsConfig, WatchConfig, CONFIG_PATH_ENV,
};
pub use validator::{validate_config, ConfigValidator};

// Re-export the main configuration structure
pub use loader::Config;

// Configuration-related error type
pub use loader::ConfigError;

// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;
