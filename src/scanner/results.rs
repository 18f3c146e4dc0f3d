use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::scanner::catalog::RouteMode;

pub const UNKNOWN_FRAMEWORK: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PortStatus {
    Open,
    Closed,
}

impl std::fmt::Display for PortStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortStatus::Open => write!(f, "open"),
            PortStatus::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPort {
    pub port: u16,
    pub pid: Option<u32>,
    pub process_name: Option<String>,
    pub command: Option<String>,
}

impl OpenPort {
    pub fn unresolved(port: u16) -> Self {
        Self {
            port,
            pid: None,
            process_name: None,
            command: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteHit {
    pub path: String,
    pub status: u16,
    pub response_time_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteDiscovery {
    pub port: u16,
    /// Successful paths in catalog order
    pub hits: Vec<RouteHit>,
    /// Headers of the baseline `GET /`, lowercase names
    pub headers: BTreeMap<String, String>,
    pub body_snippet: Option<String>,
    /// Elapsed time of the baseline request, if it got an HTTP response
    pub first_response_ms: Option<f64>,
    /// The server answered a path that cannot exist
    pub catch_all: bool,
}

impl RouteDiscovery {
    pub fn empty(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    pub fn paths(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.path.as_str()).collect()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|v| v.as_str())
    }

    pub fn speaks_http(&self) -> bool {
        self.first_response_ms.is_some()
    }
}

// Reports only carry the route list
impl Serialize for RouteDiscovery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.hits)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRecord {
    pub open_port: OpenPort,
    pub framework: String,
    pub routes: RouteDiscovery,
    /// Short hash of the identifying headers and route set
    pub fingerprint: Option<String>,
    pub response_time_ms: Option<f64>,
}

impl Serialize for ServiceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ServiceRecord", 10)?;
        state.serialize_field("port", &self.open_port.port)?;
        state.serialize_field("pid", &self.open_port.pid)?;
        state.serialize_field("process", &self.open_port.process_name)?;
        match &self.open_port.command {
            Some(command) => state.serialize_field("command", command)?,
            None => state.skip_field("command")?,
        }
        state.serialize_field("framework", &self.framework)?;
        state.serialize_field("routes", &self.routes)?;
        state.serialize_field("headers", &self.routes.headers)?;
        state.serialize_field("catch_all", &self.routes.catch_all)?;
        state.serialize_field("fingerprint", &self.fingerprint)?;
        state.serialize_field("response_time_ms", &self.response_time_ms)?;
        state.end()
    }
}

impl ServiceRecord {
    pub fn port(&self) -> u16 {
        self.open_port.port
    }

    pub fn process_name(&self) -> Option<&str> {
        self.open_port.process_name.as_deref()
    }

    pub fn is_classified(&self) -> bool {
        self.framework != UNKNOWN_FRAMEWORK
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    pub process: String,
    pub framework: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    #[serde(flatten)]
    pub key: GroupKey,
    /// Members in port order
    pub members: Vec<ServiceRecord>,
    /// Set when every member has the same fingerprint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_fingerprint: Option<String>,
}

impl DuplicateGroup {
    pub fn ports(&self) -> Vec<u16> {
        self.members.iter().map(|m| m.port()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub route_mode: RouteMode,
    pub ports_scanned: usize,
    pub services: Vec<ServiceRecord>,
    pub duplicates: Vec<DuplicateGroup>,
}

impl ScanReport {
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }

    pub fn service(&self, port: u16) -> Option<&ServiceRecord> {
        self.services.iter().find(|s| s.port() == port)
    }

    /// Service count per framework label, most common first.
    pub fn framework_breakdown(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for service in &self.services {
            *counts.entry(service.framework.as_str()).or_default() += 1;
        }
        let mut breakdown: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        breakdown.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        breakdown
    }
}
