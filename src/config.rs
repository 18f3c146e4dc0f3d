//! Scan configuration.
//!
//! Defaults can be overridden by an optional JSON file (`--config`, or
//! `<config_dir>/portsy/config.json` when present) and then by CLI flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::scanner::catalog::RouteMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// TCP connect deadline per port, in milliseconds
    pub connect_timeout_ms: u64,

    /// HTTP request deadline per path, in milliseconds
    pub http_timeout_ms: u64,

    /// Number of ports worked on at once
    pub workers: usize,

    /// Number of paths requested at once on a single port
    pub route_workers: usize,

    pub route_mode: RouteMode,

    pub discover_routes: bool,

    pub detect_duplicates: bool,

    pub show_progress: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 500,
            http_timeout_ms: 2000,
            workers: 100,
            route_workers: 8,
            route_mode: RouteMode::Quick,
            discover_routes: true,
            detect_duplicates: true,
            show_progress: false,
        }
    }
}

impl ScanConfig {
    /// Loads the config file at `path`, or the default location when it
    /// exists, or falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ScanConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("portsy").join("config.json"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue("connect timeout"));
        }
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue("HTTP timeout"));
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroValue("worker count"));
        }
        if self.route_workers == 0 {
            return Err(ConfigError::ZeroValue("route worker count"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}
