use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::*;
use serde::Serialize;

use portsy::presets::Preset;
use portsy::scanner::{DuplicateGroup, RouteMode, ScanReport, ServiceRecord};

use crate::cli::OutputFormat;

const SHOWN_ROUTES: usize = 3;

pub struct OutputWriter {
    format: OutputFormat,
    file: Option<PathBuf>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    scan_time: DateTime<Utc>,
    route_mode: RouteMode,
    ports_scanned: usize,
    duration_ms: i64,
    services: &'a [ServiceRecord],
    duplicates: &'a [DuplicateGroup],
}

impl OutputWriter {
    pub fn new(format: OutputFormat, file: Option<PathBuf>) -> Self {
        Self { format, file }
    }

    pub fn write(&self, report: &ScanReport) -> Result<()> {
        let output = match self.format {
            OutputFormat::Human => format_human(report),
            OutputFormat::Json => format_json(report)?,
        };

        match &self.file {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                let mut writer = BufWriter::new(file);
                writer.write_all(output.as_bytes())?;
                writer.flush()?;
                eprintln!("Results written to {}", path.display());
            }
            None => {
                print!("{}", output);
                io::stdout().flush()?;
            }
        }

        Ok(())
    }
}

pub fn format_json(report: &ScanReport) -> Result<String> {
    let json = JsonReport {
        scan_time: report.start_time,
        route_mode: report.route_mode,
        ports_scanned: report.ports_scanned,
        duration_ms: report.duration_ms(),
        services: &report.services,
        duplicates: &report.duplicates,
    };
    let mut output = serde_json::to_string_pretty(&json)?;
    output.push('\n');
    Ok(output)
}

pub fn format_human(report: &ScanReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n{} {} {} {} {} {}\n\n",
        "⟦".truecolor(64, 64, 64),
        format!("{} ports", report.ports_scanned).truecolor(191, 64, 191).bold(),
        "•".truecolor(0, 255, 65),
        format!("{} routes", report.route_mode).truecolor(255, 140, 0).bold(),
        "•".truecolor(0, 255, 65),
        format!("{}ms ⟧", report.duration_ms()).truecolor(0, 212, 255).bold(),
    ));

    if report.services.is_empty() {
        output.push_str(&format!(
            "{} {}\n",
            "⚠".truecolor(255, 140, 0).bold(),
            "No listening services found".truecolor(128, 128, 128)
        ));
        return output;
    }

    output.push_str(&format!(
        "{}\n",
        format!(
            "{:<7} {:<8} {:<20} {:<22} {:<44} {}",
            "PORT", "PID", "PROCESS", "FRAMEWORK", "ROUTES", "RESPONSE"
        )
        .truecolor(128, 128, 128)
        .bold()
    ));
    for service in &report.services {
        output.push_str(&service_row(service));
        output.push('\n');
    }

    output.push_str(&format!("\n{}\n", "Frameworks".truecolor(0, 255, 65).bold()));
    for (framework, count) in report.framework_breakdown() {
        output.push_str(&format!(
            "  {} {}\n",
            format!("{:<24}", framework).truecolor(255, 255, 255),
            count.to_string().truecolor(0, 212, 255).bold()
        ));
    }

    if !report.duplicates.is_empty() {
        output.push_str(&format!(
            "\n{} {}\n",
            "⚠".truecolor(255, 140, 0).bold(),
            "Potential duplicate services".truecolor(255, 140, 0).bold()
        ));
        for group in &report.duplicates {
            output.push_str(&format!(
                "  {} {} {}\n",
                "▶".truecolor(0, 255, 65).bold(),
                format!("{} / {}", group.key.process, group.key.framework)
                    .truecolor(255, 255, 255)
                    .bold(),
                match &group.shared_fingerprint {
                    Some(fp) => format!("({} instances, fingerprint {})", group.len(), fp),
                    None => format!("({} instances)", group.len()),
                }
                .truecolor(128, 128, 128)
            ));
            for member in &group.members {
                output.push_str(&format!(
                    "      port {} {}\n",
                    member.port().to_string().truecolor(0, 212, 255),
                    format!("pid {}", display_pid(member.open_port.pid)).truecolor(128, 128, 128)
                ));
            }
        }
    }

    output.push_str(&format!(
        "\n{} {}\n",
        "⚡".truecolor(0, 255, 65).bold(),
        format!(
            "{} services • {} duplicate groups",
            report.services.len(),
            report.duplicates.len()
        )
        .truecolor(255, 255, 255)
        .bold()
    ));

    output
}

fn service_row(service: &ServiceRecord) -> String {
    let response = service
        .response_time_ms
        .map(|ms| format!("{:.1}ms", ms))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "{} {} {} {} {} {}",
        format!("{:<7}", service.port()).truecolor(255, 255, 255).bold(),
        format!("{:<8}", display_pid(service.open_port.pid)).truecolor(128, 128, 128),
        format!("{:<20}", service.process_name().unwrap_or("-")).truecolor(0, 212, 255),
        if service.is_classified() {
            format!("{:<22}", service.framework).truecolor(0, 255, 65).bold()
        } else {
            format!("{:<22}", service.framework).truecolor(128, 128, 128)
        },
        format!("{:<44}", routes_summary(service)),
        response.truecolor(191, 64, 191),
    )
}

fn routes_summary(service: &ServiceRecord) -> String {
    let paths = service.routes.paths();
    if paths.is_empty() {
        return "-".to_string();
    }
    let mut summary = paths
        .iter()
        .take(SHOWN_ROUTES)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    if paths.len() > SHOWN_ROUTES {
        summary.push_str(&format!(" (+{} more)", paths.len() - SHOWN_ROUTES));
    }
    summary
}

fn display_pid(pid: Option<u32>) -> String {
    pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn format_presets(presets: &[Preset]) -> String {
    let mut output = format!("{}\n", "Available presets".truecolor(0, 255, 65).bold());
    for preset in presets {
        output.push_str(&format!(
            "  {} {}\n",
            format!("{:<10}", preset.name).truecolor(255, 255, 255).bold(),
            preset.description.truecolor(128, 128, 128)
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use portsy::scanner::{GroupKey, OpenPort, RouteHit, RouteDiscovery};

    fn service(port: u16, paths: &[&str]) -> ServiceRecord {
        ServiceRecord {
            open_port: OpenPort {
                port,
                pid: Some(321),
                process_name: Some("Python".to_string()),
                command: None,
            },
            framework: "FastAPI".to_string(),
            routes: RouteDiscovery {
                port,
                hits: paths
                    .iter()
                    .map(|p| RouteHit {
                        path: p.to_string(),
                        status: 200,
                        response_time_ms: 2.0,
                    })
                    .collect(),
                ..Default::default()
            },
            fingerprint: Some("5f3a9c01".to_string()),
            response_time_ms: None,
        }
    }

    fn report() -> ScanReport {
        let services = vec![
            service(8001, &["/", "/docs", "/redoc", "/openapi.json", "/health"]),
            service(8005, &["/docs"]),
        ];
        let duplicates = vec![DuplicateGroup {
            key: GroupKey {
                process: "python".to_string(),
                framework: "FastAPI".to_string(),
            },
            members: services.clone(),
            shared_fingerprint: Some("5f3a9c01".to_string()),
        }];
        let now = Utc::now();
        ScanReport {
            start_time: now,
            end_time: now,
            route_mode: RouteMode::Comprehensive,
            ports_scanned: 100,
            services,
            duplicates,
        }
    }

    #[test]
    fn test_routes_summary_truncates() {
        let report = report();
        assert_eq!(
            routes_summary(&report.services[0]),
            "/, /docs, /redoc (+2 more)"
        );
        assert_eq!(routes_summary(&report.services[1]), "/docs");
        assert_eq!(routes_summary(&service(9000, &[])), "-");
    }

    #[test]
    fn test_human_report_content() {
        colored::control::set_override(false);
        let text = format_human(&report());
        assert!(text.contains("8001"));
        assert!(text.contains("N/A"));
        assert!(text.contains("python / FastAPI"));
        assert!(text.contains("(2 instances, fingerprint 5f3a9c01)"));
    }

    #[test]
    fn test_json_report_fields() {
        let value: serde_json::Value = serde_json::from_str(&format_json(&report()).unwrap()).unwrap();
        for field in ["scan_time", "route_mode", "ports_scanned", "duration_ms", "services", "duplicates"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["route_mode"], "comprehensive");
        assert_eq!(value["services"][0]["process"], "Python");
        assert_eq!(value["duplicates"][0]["process"], "python");
        assert_eq!(value["duplicates"][0]["members"].as_array().unwrap().len(), 2);
        assert_eq!(value["duplicates"][0]["shared_fingerprint"], "5f3a9c01");
        assert_eq!(value["services"][0]["fingerprint"], "5f3a9c01");
    }
}
