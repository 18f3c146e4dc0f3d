//! Finds what is listening on localhost: open TCP ports, the processes
//! behind them, the HTTP routes they serve and the framework they run.

pub mod config;
pub mod error;
pub mod presets;
pub mod scanner;
pub mod utils;

pub use config::ScanConfig;
pub use error::{ConfigError, Result, ScanError};
pub use presets::{Preset, PRESETS};
pub use scanner::{
    DuplicateGroup, PortRange, RouteMode, ScanReport, ScanTarget, Scanner, ServiceRecord,
};
