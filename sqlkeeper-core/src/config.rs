//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/sqlkeeper/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/sqlkeeper/` (~/.config/sqlkeeper/)
//! - State/Logs: `$XDG_STATE_HOME/sqlkeeper/` (~/.local/state/sqlkeeper/)
//!
//! There is deliberately no configured default database path or sweep root:
//! every operation takes its target explicitly.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Fleet sweep configuration
    #[serde(default)]
    pub fleet: FleetConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Fleet sweep configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FleetConfig {
    /// Recognized database file extensions (without the leading dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Number of sweep workers; 1 means sequential
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            jobs: default_jobs(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["db".to_string(), "sqlite".to_string()]
}

fn default_jobs() -> usize {
    1
}

impl FleetConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(Error::Config(
                "fleet.extensions must list at least one file extension".to_string(),
            ));
        }
        if let Some(ext) = self.extensions.iter().find(|e| e.starts_with('.')) {
            return Err(Error::Config(format!(
                "fleet.extensions entries are written without the leading dot (got '{}')",
                ext
            )));
        }
        if self.jobs == 0 {
            return Err(Error::Config("fleet.jobs must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.fleet.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/sqlkeeper/config.toml` (~/.config/sqlkeeper/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("sqlkeeper").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/sqlkeeper/` (~/.local/state/sqlkeeper/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("sqlkeeper")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/sqlkeeper/sqlkeeper.log` (~/.local/state/sqlkeeper/sqlkeeper.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("sqlkeeper.log")
    }
}
