//! OpenClaw Contract Definitions
//!
//! Typed aggregates for the four records the guard validates, plus the
//! [`Decision`] shared by the cost-governance engine and log events.
//!
//! # Architecture
//!
//! Every aggregate is an immutable value object:
//! - Deserialized from a raw document only after schema validation passed
//! - Never checked at construction; cross-field rules live in
//!   `crate::invariants` and run against an already-built value
//! - Exposed to tree walks through `crate::document::Structured`
//!
//! # Design Principles
//!
//! - **Closed enums**: every response policy and status is an exhaustive enum
//! - **Wire names**: serde names match the JSON contracts exactly
//! - **No secrets**: secret material is referenced as `${ENV_VAR}`, never stored

pub mod cost_governor;
pub mod decision;
pub mod health;
pub mod log_event;
pub mod routing;
pub(crate) mod whole_number;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use cost_governor::{
    CostGovernor, DropPolicy, OnHardCap, OnSoftCap, QueuePolicy, SpendMonitoring,
};
pub use decision::{Decision, DecisionAction};
pub use health::{HealthCheckResult, HealthState, HealthStatus, HealthSummary, ProbeType};
pub use log_event::{Level, LogEvent};
pub use routing::{ConstraintSnapshot, PrivacyClass, RouteTarget, RoutingDecision};

/// Contract schema version
pub const CONTRACT_VERSION: &str = "1.0.0";

/// The four validated record shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContractKind {
    CostGovernor,
    HealthStatus,
    LogEvent,
    RoutingDecision,
}

impl ContractKind {
    /// Every contract, in a stable order
    pub const ALL: [ContractKind; 4] = [
        ContractKind::CostGovernor,
        ContractKind::HealthStatus,
        ContractKind::LogEvent,
        ContractKind::RoutingDecision,
    ];

    /// Display name used in violation reports
    pub fn name(&self) -> &'static str {
        match self {
            ContractKind::CostGovernor => "CostGovernor",
            ContractKind::HealthStatus => "HealthStatus",
            ContractKind::LogEvent => "LogEvent",
            ContractKind::RoutingDecision => "RoutingDecision",
        }
    }

    /// Versioned schema identifier; also the schema file stem
    pub fn schema_id(&self) -> &'static str {
        match self {
            ContractKind::CostGovernor => "openclaw.cost_governor",
            ContractKind::HealthStatus => "openclaw.health_status",
            ContractKind::LogEvent => "openclaw.log_event",
            ContractKind::RoutingDecision => "openclaw.routing_decision",
        }
    }

    /// Short label used on the command line and in metrics
    pub fn label(&self) -> &'static str {
        match self {
            ContractKind::CostGovernor => "cost-governor",
            ContractKind::HealthStatus => "health",
            ContractKind::LogEvent => "log-event",
            ContractKind::RoutingDecision => "routing",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            ContractKind::CostGovernor => 0,
            ContractKind::HealthStatus => 1,
            ContractKind::LogEvent => 2,
            ContractKind::RoutingDecision => 3,
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContractKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "cost-governor" | "costgovernor" | "governor" => Ok(ContractKind::CostGovernor),
            "health" | "health-status" | "healthstatus" => Ok(ContractKind::HealthStatus),
            "log-event" | "logevent" | "logging" | "log" => Ok(ContractKind::LogEvent),
            "routing" | "routing-decision" | "routingdecision" => {
                Ok(ContractKind::RoutingDecision)
            }
            other => Err(format!(
                "unknown contract '{}' (expected cost-governor, health, log-event or routing)",
                other
            )),
        }
    }
}
