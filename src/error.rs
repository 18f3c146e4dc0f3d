//! Error types for configuration and scan orchestration.
//!
//! Per-port failures (refused connections, missing processes, failed HTTP
//! requests) are not errors: they degrade the record for that port. Only
//! problems that stop a scan from starting, or stop it as a whole, live here.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid port range {start}-{end}: ports must satisfy 1 <= start <= end <= 65535")]
    InvalidRange { start: u32, end: u32 },

    #[error("invalid port specification '{0}'")]
    InvalidPortSpec(String),

    #[error("scan target needs at least one port range")]
    EmptyTarget,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("unknown preset '{0}' (try --list-presets)")]
    UnknownPreset(String),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("worker pool closed before all ports were checked")]
    WorkerPoolClosed,

    #[error("scan cancelled")]
    Cancelled,
}

pub type Result<T, E = ScanError> = std::result::Result<T, E>;
