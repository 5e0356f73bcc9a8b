//! Service health status aggregate

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{structured_record, structured_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeType {
    Liveness,
    Readiness,
    Startup,
}

impl ProbeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeType::Liveness => "liveness",
            ProbeType::Readiness => "readiness",
            ProbeType::Startup => "startup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Degraded => "degraded",
            HealthState::Unhealthy => "unhealthy",
            HealthState::Unknown => "unknown",
        }
    }

    /// Overall state implied by a tally.
    ///
    /// Any unhealthy check wins, then any degraded one; all-healthy (and
    /// non-empty) is healthy; everything else is unknown.
    pub fn derive(summary: &HealthSummary) -> HealthState {
        if summary.unhealthy > 0 {
            HealthState::Unhealthy
        } else if summary.degraded > 0 {
            HealthState::Degraded
        } else if summary.total > 0 && summary.healthy == summary.total {
            HealthState::Healthy
        } else {
            HealthState::Unknown
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub probe_type: ProbeType,
    pub status: HealthState,
    pub message: String,
    pub duration_ms: f64,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl HealthCheckResult {
    pub fn new(
        name: impl Into<String>,
        probe_type: ProbeType,
        status: HealthState,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            probe_type,
            status,
            message: String::new(),
            duration_ms: 0.0,
            timestamp: timestamp.into(),
            details: Map::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    #[serde(deserialize_with = "crate::contracts::whole_number::deserialize")]
    pub total: u64,
    #[serde(deserialize_with = "crate::contracts::whole_number::deserialize")]
    pub healthy: u64,
    #[serde(deserialize_with = "crate::contracts::whole_number::deserialize")]
    pub degraded: u64,
    #[serde(deserialize_with = "crate::contracts::whole_number::deserialize")]
    pub unhealthy: u64,
    #[serde(deserialize_with = "crate::contracts::whole_number::deserialize")]
    pub unknown: u64,
}

impl HealthSummary {
    /// Count checks by state
    pub fn tally(checks: &[HealthCheckResult]) -> Self {
        let mut summary = HealthSummary {
            total: checks.len() as u64,
            ..Default::default()
        };
        for check in checks {
            match check.status {
                HealthState::Healthy => summary.healthy += 1,
                HealthState::Degraded => summary.degraded += 1,
                HealthState::Unhealthy => summary.unhealthy += 1,
                HealthState::Unknown => summary.unknown += 1,
            }
        }
        summary
    }

    /// (key, value) pairs in wire order
    pub fn entries(&self) -> [(&'static str, u64); 5] {
        [
            ("total", self.total),
            ("healthy", self.healthy),
            ("degraded", self.degraded),
            ("unhealthy", self.unhealthy),
            ("unknown", self.unknown),
        ]
    }
}

/// Aggregate health report for one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Derived from `summary`; never authored independently
    pub status: HealthState,
    pub timestamp: String,
    pub service: String,
    pub checks: Vec<HealthCheckResult>,
    pub summary: HealthSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl HealthStatus {
    /// Build a report whose summary and status are computed from `checks`
    pub fn from_checks(
        service: impl Into<String>,
        timestamp: impl Into<String>,
        checks: Vec<HealthCheckResult>,
    ) -> Self {
        let summary = HealthSummary::tally(&checks);
        Self {
            status: HealthState::derive(&summary),
            timestamp: timestamp.into(),
            service: service.into(),
            checks,
            summary,
            version: None,
            latency_ms: None,
            meta: Map::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

structured_text!(ProbeType, HealthState);
structured_record!(HealthCheckResult {
    name,
    probe_type,
    status,
    message,
    duration_ms,
    timestamp,
    details
});
structured_record!(HealthSummary {
    total,
    healthy,
    degraded,
    unhealthy,
    unknown
});
structured_record!(HealthStatus {
    status,
    timestamp,
    service,
    checks,
    summary,
    version,
    latency_ms,
    meta
});
