pub mod catalog;
pub mod duplicates;
pub mod framework;
pub mod process;
pub mod results;
pub mod routes;
pub mod target;
pub mod tcp;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::error::{Result, ScanError};

pub use catalog::RouteMode;
pub use duplicates::{find_duplicates, fingerprint};
pub use framework::{classify, ClassifierInput};
pub use process::{ProcessResolver, SystemProcessResolver};
pub use results::{
    DuplicateGroup, GroupKey, OpenPort, PortStatus, RouteHit, RouteDiscovery, ScanReport,
    ServiceRecord, UNKNOWN_FRAMEWORK,
};
pub use routes::RouteDiscoverer;
pub use target::{PortRange, ScanTarget};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

pub struct Scanner {
    config: ScanConfig,
    resolver: Arc<dyn ProcessResolver>,
    discoverer: Option<Arc<RouteDiscoverer>>,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self> {
        Self::with_resolver(config, Arc::new(SystemProcessResolver))
    }

    /// Builds a scanner that asks `resolver` for port owners instead of the
    /// OS tables.
    pub fn with_resolver(config: ScanConfig, resolver: Arc<dyn ProcessResolver>) -> Result<Self> {
        config.validate()?;
        let discoverer = if config.discover_routes {
            Some(Arc::new(RouteDiscoverer::new(&config)?))
        } else {
            None
        };

        Ok(Self {
            config,
            resolver,
            discoverer,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub async fn scan(&self, target: &ScanTarget) -> Result<ScanReport> {
        self.scan_with_cancel(target, CancellationToken::new()).await
    }

    /// Scans every port of `target` on the loopback interface. Each open port
    /// is resolved to its owner, queried for routes and classified; records
    /// come back sorted by port. Cancelling `cancel` abandons in-flight work
    /// and returns [`ScanError::Cancelled`].
    pub async fn scan_with_cancel(
        &self,
        target: &ScanTarget,
        cancel: CancellationToken,
    ) -> Result<ScanReport> {
        let start_time = chrono::Utc::now();
        let total = target.len();
        info!(
            ports = total,
            target = %target,
            workers = self.config.workers,
            routes = self.config.discover_routes,
            mode = %self.config.route_mode,
            "starting scan"
        );

        let pb = self.progress_bar(total);
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let (tx, mut rx) = mpsc::unbounded_channel::<ServiceRecord>();
        let connect_timeout = self.config.connect_timeout();

        let mut tasks = Vec::with_capacity(total);
        for port in target.ports() {
            let sem = semaphore.clone();
            let tx = tx.clone();
            let pb = pb.clone();
            let cancel = cancel.clone();
            let resolver = self.resolver.clone();
            let discoverer = self.discoverer.clone();

            let task = tokio::spawn(async move {
                let _permit = tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    permit = sem.acquire_owned() => permit.map_err(|_| ScanError::WorkerPoolClosed)?,
                };

                let outcome = tokio::select! {
                    _ = cancel.cancelled() => None,
                    record = inspect_port(port, connect_timeout, resolver, discoverer) => record,
                };
                pb.inc(1);

                if let Some(record) = outcome {
                    // Receiver lives until every task is joined
                    let _ = tx.send(record);
                }
                Ok::<(), ScanError>(())
            });
            tasks.push(task);
        }
        drop(tx);

        let collector = async {
            let mut services = Vec::new();
            while let Some(record) = rx.recv().await {
                services.push(record);
            }
            services
        };
        let (task_results, mut services) = tokio::join!(join_all(tasks), collector);

        for result in task_results {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    pb.abandon();
                    return Err(e);
                }
                // A panicking port task only costs that port
                Err(e) => warn!(error = %e, "port task failed"),
            }
        }

        if cancel.is_cancelled() {
            pb.abandon_with_message("scan cancelled");
            info!("scan cancelled");
            return Err(ScanError::Cancelled);
        }

        services.sort_by_key(|s| s.port());
        let duplicates = if self.config.detect_duplicates {
            find_duplicates(&services)
        } else {
            Vec::new()
        };

        pb.finish_and_clear();
        let end_time = chrono::Utc::now();
        info!(
            open = services.len(),
            duplicate_groups = duplicates.len(),
            elapsed_ms = (end_time - start_time).num_milliseconds(),
            "scan finished"
        );

        Ok(ScanReport {
            start_time,
            end_time,
            route_mode: self.config.route_mode,
            ports_scanned: total,
            services,
            duplicates,
        })
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "⟦{spinner:.bright_magenta}⟧ [{elapsed_precise}] ⟨{bar:40.bright_green/bright_black}⟩ {pos}/{len} ports ({eta})",
        ) {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
        }
        pb
    }
}

async fn inspect_port(
    port: u16,
    connect_timeout: Duration,
    resolver: Arc<dyn ProcessResolver>,
    discoverer: Option<Arc<RouteDiscoverer>>,
) -> Option<ServiceRecord> {
    let addr = SocketAddr::new(LOCALHOST, port);
    if tcp::connect_scan(addr, connect_timeout).await != PortStatus::Open {
        return None;
    }
    debug!(port, "open");

    let discover = async {
        match &discoverer {
            Some(discoverer) => discoverer.discover(port).await,
            None => RouteDiscovery::empty(port),
        }
    };
    let (open_port, routes) = tokio::join!(resolver.resolve(port), discover);

    let framework = classify(&ClassifierInput::new(
        open_port.process_name.as_deref(),
        &routes,
    ));
    debug!(
        port,
        process = open_port.process_name.as_deref().unwrap_or("-"),
        framework = %framework,
        routes = routes.hits.len(),
        "classified"
    );

    Some(ServiceRecord {
        response_time_ms: routes.first_response_ms,
        fingerprint: fingerprint(&routes),
        open_port,
        framework,
        routes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::net::TcpListener;

    struct NamedResolver(&'static str);

    #[async_trait]
    impl ProcessResolver for NamedResolver {
        async fn resolve(&self, port: u16) -> OpenPort {
            OpenPort {
                port,
                pid: Some(7),
                process_name: Some(self.0.to_string()),
                command: None,
            }
        }
    }

    fn tcp_only() -> ScanConfig {
        ScanConfig {
            discover_routes: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_zero_workers() {
        let config = ScanConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(
            Scanner::new(config),
            Err(ScanError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_single_port_target() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let scanner = Scanner::with_resolver(tcp_only(), Arc::new(NamedResolver("postgres"))).unwrap();
        let target = ScanTarget::from_range(PortRange::single(port).unwrap());
        let report = scanner.scan(&target).await.unwrap();

        assert_eq!(report.ports_scanned, 1);
        assert_eq!(report.services.len(), 1);
        assert_eq!(report.services[0].framework, "PostgreSQL");
        assert!(report.services[0].routes.hits.is_empty());
        assert_eq!(report.services[0].response_time_ms, None);
    }

    #[tokio::test]
    async fn test_cancelled_scan() {
        let scanner = Scanner::with_resolver(tcp_only(), Arc::new(NamedResolver("x"))).unwrap();
        let target = ScanTarget::from_range(PortRange::new(40000, 40100).unwrap());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = scanner.scan_with_cancel(&target, cancel).await;
        assert!(matches!(result, Err(ScanError::Cancelled)));
    }

    #[tokio::test]
    async fn test_duplicate_detection_can_be_disabled() {
        let a = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let b = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ports = [a.local_addr().unwrap().port(), b.local_addr().unwrap().port()];
        let target = ScanTarget::new(ports.iter().map(|&p| PortRange::single(p).unwrap()).collect()).unwrap();

        let scanner = Scanner::with_resolver(tcp_only(), Arc::new(NamedResolver("redis-server"))).unwrap();
        let report = scanner.scan(&target).await.unwrap();
        assert_eq!(report.services.len(), 2);
        assert_eq!(report.duplicates.len(), 1);

        let config = ScanConfig {
            detect_duplicates: false,
            ..tcp_only()
        };
        let scanner = Scanner::with_resolver(config, Arc::new(NamedResolver("redis-server"))).unwrap();
        let report = scanner.scan(&target).await.unwrap();
        assert_eq!(report.services.len(), 2);
        assert!(report.duplicates.is_empty());
    }
}
