//! TOML-based application configuration.
//!
//! Stores:
//! - Adherence engine parameters (look-back bound, trend threshold, window)
//! - Trend window sizes
//! - Object storage connection settings (credentials stay in the environment)
//! - Default log filter
//!
//! Configuration is stored at `<data dir>/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::adherence::{AdherenceEngine, DEFAULT_LOOKBACK_DAYS, DEFAULT_TREND_THRESHOLD_PERCENT};
use crate::error::ConfigError;
use crate::tracker::SummaryOptions;

/// Adherence engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on how far back the live streak walks.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_trend_threshold")]
    pub trend_threshold_percent: f64,
    /// Default window for completion rates and averages.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

/// Trend window sizes, in daily points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    #[serde(default = "default_trend_window")]
    pub recent_window: usize,
    #[serde(default = "default_trend_window")]
    pub prior_window: usize,
}

/// Object storage connection settings.
///
/// Empty strings mean "not set"; environment variables override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub bucket: String,
    /// Custom endpoint for S3-compatible services (path-style addressing).
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `WELLNEST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub trend: TrendConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default functions
fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}
fn default_trend_threshold() -> f64 {
    DEFAULT_TREND_THRESHOLD_PERCENT
}
fn default_window_days() -> u32 {
    7
}
fn default_trend_window() -> usize {
    7
}
fn default_prefix() -> String {
    "backups/".into()
}
fn default_log_level() -> String {
    "warn".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            trend_threshold_percent: default_trend_threshold(),
            window_days: default_window_days(),
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            recent_window: default_trend_window(),
            prior_window: default_trend_window(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            bucket: String::new(),
            endpoint: String::new(),
            prefix: default_prefix(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            trend: TrendConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot replace a whole section".into()));
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, writing defaults if no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if it does not exist.
    ///
    /// # Errors
    /// Unreadable or unparsable file, or failure writing defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                tracing::info!(path = %path.display(), "wrote default configuration");
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    /// Serialization or write failure.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a value by dot-separated key, keeping the existing value's type.
    /// Does not write to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation. On error the config is left unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// # Errors
    /// The first out-of-range parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        AdherenceEngine::with_params(self.engine.lookback_days, self.engine.trend_threshold_percent)
            .map_err(|e| ConfigError::InvalidValue {
                key: "engine".into(),
                message: e.to_string(),
            })?;
        if self.engine.window_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "engine.window_days".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Build the engine from `[engine]`.
    ///
    /// # Errors
    /// Out-of-range parameters.
    pub fn engine(&self) -> Result<AdherenceEngine, ConfigError> {
        self.validate()?;
        AdherenceEngine::with_params(self.engine.lookback_days, self.engine.trend_threshold_percent)
            .map_err(|e| ConfigError::InvalidValue {
                key: "engine".into(),
                message: e.to_string(),
            })
    }

    /// Summary windows from `[engine]` and `[trend]`, anchored at `as_of`.
    pub fn summary_options(&self, as_of: chrono::NaiveDate) -> SummaryOptions {
        SummaryOptions {
            as_of,
            window_days: self.engine.window_days,
            recent_window: self.trend.recent_window,
            prior_window: self.trend.prior_window,
        }
    }
}
