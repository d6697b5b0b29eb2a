//! Configuration management for spendview
//!
//! Loads and validates the YAML configuration that drives the transport
//! simulation, the initial view session and logging.

pub mod error;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use error::{ConfigError, ConfigErrorCode, ConfigErrorDetails, ConfigErrorSeverity, ConfigResult};

// ==================== Configuration Types ====================

/// Transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Simulated latency for every retrieval, in milliseconds
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
    /// Transactions per page on the paginated endpoint
    #[serde(default = "default_per_page")]
    pub per_page: usize,
    /// JSON dataset to serve instead of the built-in sample
    #[serde(default)]
    pub dataset: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            latency_ms: default_latency_ms(),
            per_page: default_per_page(),
            dataset: None,
        }
    }
}

fn default_latency_ms() -> u64 {
    150
}

fn default_per_page() -> usize {
    5
}

/// View session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Pages to load, including the first one
    #[serde(default = "default_initial_pages")]
    pub initial_pages: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            initial_pages: default_initial_pages(),
        }
    }
}

fn default_initial_pages() -> usize {
    1
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Transport settings
    #[serde(default)]
    pub transport: TransportConfig,
    /// View session settings
    #[serde(default)]
    pub view: ViewConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: PathBuf) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let content = std::fs::read_to_string(&path)
            .map_err(|_| ConfigError::IoError)?;

        let config = Self::from_yaml(&content)?;
        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|_| ConfigError::InvalidYaml)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.transport.per_page == 0 {
            return Err(ConfigError::InvalidValue {
                field: "transport.per_page".to_string(),
                reason: "Page size must be greater than 0".to_string(),
            });
        }

        if self.view.initial_pages == 0 {
            return Err(ConfigError::InvalidValue {
                field: "view.initial_pages".to_string(),
                reason: "At least the first page must be loaded".to_string(),
            });
        }

        let level = self.logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Log level must be one of {}", LOG_LEVELS.join(", ")),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Simulated transport latency
    pub fn latency(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.transport.latency_ms)
    }
}

// ==================== Tests ====================
