mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, EngineConfig, LoggingConfig, StorageConfig, TrendConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the Wellnest data directory, creating it if needed.
///
/// `WELLNEST_HOME` wins when set. Otherwise `~/.config/wellnest`, or
/// `~/.config/wellnest-dev` when `WELLNEST_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("WELLNEST_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("WELLNEST_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("wellnest-dev")
            } else {
                base_dir.join("wellnest")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
