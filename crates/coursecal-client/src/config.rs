//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/coursecal/config.toml` by default. Every section is optional;
//! missing values fall back to the built-in scheduling rules.

use std::path::{Path, PathBuf};

use chrono::Duration;
use coursecal_core::{LogFormat, Locale, ValidationRules};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Configuration for the coursecal client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Thresholds used when validating sessions.
    pub rules: ValidationRules,

    /// Display settings.
    pub display: DisplaySettings,

    /// Where events and reference data are stored.
    pub storage: StorageSettings,

    /// Log output settings.
    pub logging: LoggingSettings,
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Line format on stderr.
    pub format: LogFormat,

    /// Filter directive such as `coursecal_core=trace`, replacing `RUST_LOG`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Display settings for output formatting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Language for warnings and labels.
    pub locale: Locale,

    /// Print JSON instead of text.
    pub json: bool,
}

/// Storage locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path to the events JSON file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events_path: Option<PathBuf>,

    /// Path to the trainers/courses JSON file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
}

impl StorageSettings {
    /// Returns the events file, defaulting to the data directory.
    pub fn events_path(&self) -> PathBuf {
        self.events_path
            .clone()
            .unwrap_or_else(|| ClientConfig::default_data_dir().join("events.json"))
    }

    /// Returns the catalog file, defaulting to the data directory.
    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| ClientConfig::default_data_dir().join("catalog.json"))
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ClientError::Config(format!("failed to read config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {}", e)))
    }

    /// Checks that the rules make sense.
    pub fn validate(&self) -> ClientResult<()> {
        let rules = &self.rules;
        if rules.standard_duration_minutes <= 0 {
            return Err(ClientError::Config(
                "rules.standard_duration_minutes must be positive".to_string(),
            ));
        }
        if Duration::try_minutes(rules.standard_duration_minutes).is_none() {
            return Err(ClientError::Config(format!(
                "rules.standard_duration_minutes is too large: {}",
                rules.standard_duration_minutes
            )));
        }
        if rules.minimum_gap_hours < 0 {
            return Err(ClientError::Config(
                "rules.minimum_gap_hours must not be negative".to_string(),
            ));
        }
        if Duration::try_hours(rules.minimum_gap_hours).is_none() {
            return Err(ClientError::Config(format!(
                "rules.minimum_gap_hours is too large: {}",
                rules.minimum_gap_hours
            )));
        }
        if rules.max_occurrences == 0 {
            return Err(ClientError::Config(
                "rules.max_occurrences must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coursecal")
    }

    /// Returns the default data directory path.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("coursecal")
    }
}
