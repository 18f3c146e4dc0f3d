use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use portsy::config::ScanConfig;
use portsy::scanner::RouteMode;

#[derive(Parser, Debug)]
#[command(name = "portsy")]
#[command(version)]
#[command(about = "Find the dev servers, databases and daemons listening on localhost", long_about = None)]
pub struct Cli {
    #[arg(long, default_value_t = 3000, help = "First port of the scan range")]
    pub start_port: u32,

    #[arg(long, default_value_t = 9000, help = "Last port of the scan range")]
    pub end_port: u32,

    #[arg(short, long, help = "Explicit ports: 80,443,3000-3100. Overrides the range")]
    pub ports: Option<String>,

    #[arg(long, help = "Named port preset (quick, dev, web, full, services). Overrides ports and range")]
    pub preset: Option<String>,

    #[arg(long, help = "List the available presets and exit")]
    pub list_presets: bool,

    #[arg(long, help = "Request the full framework path catalog instead of the common subset")]
    pub comprehensive_routes: bool,

    #[arg(long, help = "Skip HTTP route discovery")]
    pub no_routes: bool,

    #[arg(long, help = "Skip duplicate service detection")]
    pub no_duplicates: bool,

    #[arg(long, help = "TCP connect timeout per port in milliseconds")]
    pub timeout: Option<u64>,

    #[arg(long, help = "HTTP timeout per request in milliseconds")]
    pub http_timeout: Option<u64>,

    #[arg(long, help = "Ports inspected concurrently")]
    pub workers: Option<usize>,

    #[arg(long, help = "Paths requested concurrently on a single port")]
    pub route_workers: Option<usize>,

    #[arg(short = 'o', long, value_enum, default_value = "human", help = "Output format")]
    pub output_format: OutputFormat,

    #[arg(short = 'f', long, help = "Output file path")]
    pub output_file: Option<PathBuf>,

    #[arg(long, help = "Config file (defaults to <config dir>/portsy/config.json)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Show a progress bar on stderr")]
    pub progress: bool,

    #[arg(long, help = "Disable colored output")]
    pub no_color: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Cli {
    /// Layers the flags given on the command line over `config`.
    pub fn apply(&self, config: &mut ScanConfig) {
        if let Some(timeout) = self.timeout {
            config.connect_timeout_ms = timeout;
        }
        if let Some(timeout) = self.http_timeout {
            config.http_timeout_ms = timeout;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(workers) = self.route_workers {
            config.route_workers = workers;
        }
        if self.comprehensive_routes {
            config.route_mode = RouteMode::Comprehensive;
        }
        if self.no_routes {
            config.discover_routes = false;
        }
        if self.no_duplicates {
            config.detect_duplicates = false;
        }
        if self.progress {
            config.show_progress = true;
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OutputFormat {
    #[value(name = "human", help = "Human-readable output")]
    Human,
    #[value(name = "json", help = "JSON output")]
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["portsy"]);
        assert_eq!(cli.start_port, 3000);
        assert_eq!(cli.end_port, 9000);
        assert_eq!(cli.output_format, OutputFormat::Human);

        let mut config = ScanConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, ScanConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "portsy",
            "--comprehensive-routes",
            "--no-duplicates",
            "--timeout",
            "250",
            "--workers",
            "16",
            "-o",
            "json",
        ]);
        let mut config = ScanConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.route_mode, RouteMode::Comprehensive);
        assert!(!config.detect_duplicates);
        assert!(config.discover_routes);
        assert_eq!(config.connect_timeout_ms, 250);
        assert_eq!(config.workers, 16);
        assert_eq!(cli.output_format, OutputFormat::Json);
    }
}
