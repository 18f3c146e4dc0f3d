//! HTTP route discovery.
//!
//! Every open port gets a baseline `GET /`. Ports that never answer with
//! HTTP are left alone after that; the rest have the catalog for the chosen
//! mode walked through a small ordered pool, so hits come back in catalog
//! order no matter which request finishes first.
//!
//! Servers that answer every path (SPA history fallback, custom 404 pages
//! with a 200 status) are caught by requesting a random path first. Hits
//! that look like that canary response are dropped.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, trace};

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::scanner::catalog::RouteMode;
use crate::scanner::results::{RouteHit, RouteDiscovery};

const BODY_SNIPPET_LIMIT: usize = 2048;

/// Prefix of the random path used to detect catch-all servers.
pub const CANARY_PREFIX: &str = "/portsy-";

/// Bodies within this many bytes of the canary body count as the same page.
const SOFT_404_LENGTH_SLACK: u64 = 100;

pub struct RouteDiscoverer {
    client: Client,
    host: IpAddr,
    mode: RouteMode,
    concurrency: usize,
}

struct Baseline {
    root: Option<PathResponse>,
    headers: BTreeMap<String, String>,
    body_snippet: Option<String>,
    elapsed_ms: f64,
}

#[derive(Clone)]
struct PathResponse {
    hit: RouteHit,
    content_length: Option<u64>,
}

/// What a path that cannot exist looks like on a catch-all server.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Canary {
    status: u16,
    content_length: Option<u64>,
}

impl Canary {
    fn resembles(&self, response: &PathResponse) -> bool {
        if response.hit.status != self.status {
            return false;
        }
        match (self.content_length, response.content_length) {
            (Some(a), Some(b)) => a.abs_diff(b) < SOFT_404_LENGTH_SLACK,
            _ => true,
        }
    }
}

impl RouteDiscoverer {
    /// Connections are never kept idle: once a port's work item is done its
    /// sockets are closed. In-flight HTTP connections are bounded by
    /// `workers * route_workers`.
    pub fn new(config: &ScanConfig) -> Result<Self, ScanError> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .redirect(Policy::none())
            .no_proxy()
            .pool_max_idle_per_host(0)
            .user_agent(concat!("portsy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            mode: config.route_mode,
            concurrency: config.route_workers.max(1),
        })
    }

    pub fn mode(&self) -> RouteMode {
        self.mode
    }

    /// Paths this discoverer walks, in request order.
    pub fn paths(&self) -> &'static [&'static str] {
        self.mode.paths()
    }

    pub async fn discover(&self, port: u16) -> RouteDiscovery {
        let base = format!("http://{}:{}", self.host, port);

        let Some(baseline) = self.fetch_baseline(&base).await else {
            debug!(port, "no HTTP response, skipping route discovery");
            return RouteDiscovery::empty(port);
        };

        let canary = self.fetch_canary(&base).await;
        if let Some(canary) = &canary {
            debug!(port, status = canary.status, "server answers unknown paths, filtering hits");
        }

        let requests: Vec<_> = self
            .paths()
            .iter()
            .copied()
            .map(|path| {
                let client = self.client.clone();
                let url = format!("{base}{path}");
                let root = (path == "/").then(|| baseline.root.clone());
                async move {
                    match root {
                        Some(root) => root,
                        None => fetch_path(client, url, path).await,
                    }
                }
            })
            .collect();

        let responses: Vec<Option<PathResponse>> = stream::iter(requests)
            .buffered(self.concurrency)
            .collect()
            .await;

        let hits: Vec<RouteHit> = responses
            .into_iter()
            .flatten()
            .filter(|response| {
                response.hit.path == "/" || !canary.is_some_and(|canary| canary.resembles(response))
            })
            .map(|response| response.hit)
            .collect();

        debug!(port, hits = hits.len(), mode = %self.mode, "route discovery finished");

        RouteDiscovery {
            port,
            hits,
            headers: baseline.headers,
            body_snippet: baseline.body_snippet,
            first_response_ms: Some(baseline.elapsed_ms),
            catch_all: canary.is_some(),
        }
    }

    async fn fetch_baseline(&self, base: &str) -> Option<Baseline> {
        let started = Instant::now();
        let response = match self.client.get(format!("{base}/")).send().await {
            Ok(response) => response,
            Err(e) => {
                trace!(url = base, error = %e, "baseline request failed");
                return None;
            }
        };
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let status = response.status();

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let root = is_hit(status).then(|| PathResponse {
            hit: RouteHit {
                path: "/".to_string(),
                status: status.as_u16(),
                response_time_ms: elapsed_ms,
            },
            content_length: response.content_length(),
        });

        Some(Baseline {
            root,
            headers,
            body_snippet: read_snippet(response).await,
            elapsed_ms,
        })
    }

    async fn fetch_canary(&self, base: &str) -> Option<Canary> {
        let url = format!("{base}{CANARY_PREFIX}{:016x}", rand::random::<u64>());
        match self.client.get(&url).send().await {
            Ok(response) if is_hit(response.status()) => Some(Canary {
                status: response.status().as_u16(),
                content_length: response.content_length(),
            }),
            Ok(_) => None,
            Err(e) => {
                trace!(url = base, error = %e, "canary request failed");
                None
            }
        }
    }
}

async fn fetch_path(client: Client, url: String, path: &'static str) -> Option<PathResponse> {
    let started = Instant::now();
    match client.get(&url).send().await {
        Ok(response) => {
            let status = response.status();
            trace!(url = %url, status = status.as_u16(), "path answered");
            is_hit(status).then(|| PathResponse {
                hit: RouteHit {
                    path: path.to_string(),
                    status: status.as_u16(),
                    response_time_ms: started.elapsed().as_secs_f64() * 1000.0,
                },
                content_length: response.content_length(),
            })
        }
        Err(e) => {
            trace!(url = %url, error = %e, "path request failed");
            None
        }
    }
}

// 2xx and 3xx both mean something is served there
fn is_hit(status: StatusCode) -> bool {
    status.is_success() || status.is_redirection()
}

async fn read_snippet(mut response: Response) -> Option<String> {
    let mut buf: Vec<u8> = Vec::new();
    while buf.len() < BODY_SNIPPET_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            _ => break,
        }
    }
    if buf.is_empty() {
        return None;
    }
    buf.truncate(BODY_SNIPPET_LIMIT);
    Some(String::from_utf8_lossy(&buf).into_owned())
}
