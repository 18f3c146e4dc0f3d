use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Inclusive port range, always within 1..=65535 and never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct PortRange {
    start: u16,
    end: u16,
}

/// Unchecked bounds as they appear in serialized input.
#[derive(Deserialize)]
struct RangeBounds {
    start: u32,
    end: u32,
}

impl TryFrom<RangeBounds> for PortRange {
    type Error = ConfigError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        PortRange::new(bounds.start, bounds.end)
    }
}

impl PortRange {
    pub fn new(start: u32, end: u32) -> Result<Self, ConfigError> {
        if start == 0 || start > end || end > u16::MAX as u32 {
            return Err(ConfigError::InvalidRange { start, end });
        }
        Ok(Self {
            start: start as u16,
            end: end as u16,
        })
    }

    pub fn single(port: u16) -> Result<Self, ConfigError> {
        Self::new(port as u32, port as u32)
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.start..=self.end).contains(&port)
    }

    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    pub fn ports(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// The set of ports one scan covers. Overlapping ranges collapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    ranges: Vec<PortRange>,
    ports: BTreeSet<u16>,
}

impl ScanTarget {
    pub fn new(ranges: Vec<PortRange>) -> Result<Self, ConfigError> {
        if ranges.is_empty() {
            return Err(ConfigError::EmptyTarget);
        }
        let ports = ranges.iter().flat_map(|r| r.ports()).collect();
        Ok(Self { ranges, ports })
    }

    pub fn from_range(range: PortRange) -> Self {
        Self {
            ports: range.ports().collect(),
            ranges: vec![range],
        }
    }

    pub fn ranges(&self) -> &[PortRange] {
        &self.ranges
    }

    /// Ports in ascending order.
    pub fn ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().copied()
    }

    pub fn contains(&self, port: u16) -> bool {
        self.ports.contains(&port)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}
