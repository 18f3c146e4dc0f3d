mod cli;
mod output;

use anyhow::Result;
use clap::Parser;
use colored::*;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use portsy::config::ScanConfig;
use portsy::error::ScanError;
use portsy::presets::{Preset, PRESETS};
use portsy::scanner::{PortRange, ScanTarget, Scanner};
use portsy::utils::parse_ports;

use crate::cli::Cli;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "portsy=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    if cli.list_presets {
        print!("{}", output::format_presets(PRESETS));
        return Ok(());
    }

    let mut config = ScanConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    let target = build_target(&cli)?;
    let scanner = Scanner::new(config)?;
    let output_writer = OutputWriter::new(cli.output_format, cli.output_file.clone());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping scan");
            ctrl_c.cancel();
        }
    });

    let report = match scanner.scan_with_cancel(&target, cancel).await {
        Ok(report) => report,
        Err(ScanError::Cancelled) => {
            eprintln!("{}", "Scan cancelled.".truecolor(255, 140, 0));
            std::process::exit(130);
        }
        Err(e) => return Err(e.into()),
    };

    output_writer.write(&report)?;

    Ok(())
}

/// Preset beats an explicit port list, which beats the start/end range.
fn build_target(cli: &Cli) -> Result<ScanTarget> {
    if let Some(name) = &cli.preset {
        return Ok(Preset::find(name)?.target()?);
    }
    if let Some(spec) = &cli.ports {
        return Ok(ScanTarget::new(parse_ports(spec)?)?);
    }
    let range = PortRange::new(cli.start_port, cli.end_port)?;
    Ok(ScanTarget::from_range(range))
}
