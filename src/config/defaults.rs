//! Default configuration values for Memory-Inspector

use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub scanner: ScannerDefaults,
    pub watch: WatchDefaults,
    pub neighbors: NeighborDefaults,
    pub settings: SettingsDefaults,
    pub attach: AttachDefaults,
    pub logging: LoggingDefaults,
}

/// Default scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDefaults {
    pub max_threads: usize,
    pub chunk_size: usize,
    pub writable_only: bool,
    pub refresh_regions_before_scan: bool,
}

/// Default watch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchDefaults {
    pub poll_interval_ms: u64,
    pub channel_capacity: usize,
}

/// Default neighbor window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeighborDefaults {
    pub radius: usize,
}

/// Default engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsDefaults {
    pub value_size: usize,
}

/// Default attach policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachDefaults {
    pub allow_reattach: bool,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        scanner: ScannerDefaults {
            max_threads: num_cpus::get().min(8),
            chunk_size: 65536, // 64KB
            writable_only: false,
            refresh_regions_before_scan: true,
        },
        watch: WatchDefaults {
            poll_interval_ms: 10,
            channel_capacity: 10,
        },
        neighbors: NeighborDefaults { radius: 25 },
        settings: SettingsDefaults { value_size: 4 },
        attach: AttachDefaults {
            allow_reattach: true,
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
        },
    }
}
