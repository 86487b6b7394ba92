//! Configuration management for tirelire
//!
//! This module handles loading, validation, and management of
//! tirelire configuration from YAML files.

pub mod error;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub use error::{ConfigError, ConfigResult};

// ==================== Configuration Types ====================

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding one JSON file per stored key
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./data")
}

/// Savings (Epargne) roll-up settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpargneConfig {
    /// Year at which the opening balances are injected
    #[serde(default = "default_base_year")]
    pub base_year: i32,
    /// Opening balance per savings category, used when no state has been saved yet
    #[serde(default = "default_base_amounts")]
    pub base_amounts: BTreeMap<String, Decimal>,
    /// Categories summed into the LDDS-like pot
    #[serde(default = "default_ldds")]
    pub ldds: Vec<String>,
    /// Categories summed into the Livret A-like pot
    #[serde(default = "default_livret_a")]
    pub livret_a: Vec<String>,
}

impl Default for EpargneConfig {
    fn default() -> Self {
        Self {
            base_year: default_base_year(),
            base_amounts: default_base_amounts(),
            ldds: default_ldds(),
            livret_a: default_livret_a(),
        }
    }
}

fn default_base_year() -> i32 {
    2025
}

fn default_base_amounts() -> BTreeMap<String, Decimal> {
    [
        ("Fin de mois", Decimal::new(387083, 2)),
        ("Pets/Home/Auto", Decimal::new(1653, 1)),
        ("Santé", Decimal::new(37977, 2)),
        ("Urgences", Decimal::new(2035, 1)),
    ]
    .into_iter()
    .map(|(name, amount)| (name.to_string(), amount))
    .collect()
}

fn default_ldds() -> Vec<String> {
    ["Fin de mois", "Pets/Home/Auto", "Anniv/Noël", "Vacances"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_livret_a() -> Vec<String> {
    ["Santé", "Travaux", "Urgences"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Remote synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Enable last-write-wins replication
    #[serde(default = "default_false")]
    pub enabled: bool,
    /// Path of the JSON document acting as the remote store
    #[serde(default)]
    pub remote_path: Option<PathBuf>,
    /// Quiet period before a push, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Name written as `lastDevice` in the remote document
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            remote_path: None,
            debounce_ms: default_debounce_ms(),
            device_name: default_device_name(),
        }
    }
}

fn default_false() -> bool {
    false
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_device_name() -> String {
    format!("tirelire-cli/{}", std::env::consts::OS)
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
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

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Data directory settings
    #[serde(default)]
    pub data: DataConfig,
    /// Savings roll-up settings
    #[serde(default)]
    pub epargne: EpargneConfig,
    /// Synchronization settings
    #[serde(default)]
    pub sync: SyncConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound { path }) => {
                log::info!("No configuration at {}, using defaults", path);
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Parse and validate YAML content
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::InvalidYaml { message: e.to_string() })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.sync.debounce_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sync.debounce_ms".to_string(),
                reason: "Debounce delay must be greater than 0".to_string(),
            });
        }

        if self.sync.enabled && self.sync.remote_path.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "sync.remote_path".to_string(),
                reason: "A remote path is required when sync is enabled".to_string(),
            });
        }

        if let Err(reason) = self.logging.level.parse::<LogLevel>() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason,
            });
        }

        if let Some(shared) = self
            .epargne
            .ldds
            .iter()
            .find(|name| self.epargne.livret_a.contains(name))
        {
            return Err(ConfigError::InvalidValue {
                field: "epargne.livret_a".to_string(),
                reason: format!("Category '{}' cannot belong to both pots", shared),
            });
        }

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Configured log level
    pub fn log_level(&self) -> LogLevel {
        self.logging.level.parse().unwrap_or(LogLevel::Info)
    }

    /// Push debounce window
    pub fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.sync.debounce_ms)
    }
}
