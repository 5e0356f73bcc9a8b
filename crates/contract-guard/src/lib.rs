//! contract-guard
//!
//! Runtime contract validation and cost-governance decisions for
//! multi-provider model routing.
//!
//! ## Features
//!
//! - **Decision engine**: a pure function from a cost-governor configuration
//!   and a spend request to ALLOW / DEGRADE / QUEUE / BLOCK
//! - **Schema validation**: Draft 2020-12 schemas for the four contracts,
//!   embedded or loaded from a directory, compiled once per registry
//! - **Runtime invariants**: cross-field rules, RFC3339 timestamp checks and
//!   a secret scan, with every violation collected before reporting
//! - **Policy ceilings**: tier caps checked against a rule table, with table
//!   linting and a SHA-256 policy digest
//! - **Telemetry**: `tracing` logs and Prometheus counters at the facade
//!
//! ## Contracts
//!
//! | Contract | Schema id |
//! |----------|-----------|
//! | cost governor | `openclaw.cost_governor` |
//! | health status | `openclaw.health_status` |
//! | log event | `openclaw.log_event` |
//! | routing decision | `openclaw.routing_decision` |
//!
//! ## CLI Usage
//!
//! ```bash
//! contract-guard validate --contract cost-governor --file governor.yaml
//! contract-guard validate --contract log-event --file event.json --strict-links
//! contract-guard evaluate --governor governor.yaml --estimated-cost 0.4 \
//!     --spent-today 9.8 --task-id job-42
//! contract-guard ceiling --file deploy/tier2/governor.yaml
//! contract-guard policy-lint --format json
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use contract_guard::{ContractGuard, ContractKind, SpendRequest};
//! use serde_json::json;
//!
//! let guard = ContractGuard::new().unwrap();
//! let doc = json!({
//!     "currency": "USD",
//!     "daily_soft_cap": 10,
//!     "daily_hard_cap": 20,
//!     "on_soft_cap": "log-only",
//!     "on_hard_cap": "halt-all"
//! });
//!
//! let validated = guard.validate(ContractKind::CostGovernor, &doc).unwrap();
//! let gov = validated.as_cost_governor().unwrap();
//! let decision = guard.evaluate(gov, &SpendRequest::new("job-42", 8.0, 5.0));
//! assert_eq!(decision.reason, "soft_cap_exceeded: log-only");
//! ```

pub mod cli;
pub mod config;
pub mod decision;
pub mod document;
pub mod error;
pub mod guard;
pub mod invariants;
pub mod policy;
pub mod scanner;
pub mod schema;
pub mod telemetry;
pub mod timestamp;

// Contract types live at ../contracts relative to src/
#[path = "../contracts/mod.rs"]
pub mod contracts;

pub use contracts::{
    ContractKind, CostGovernor, Decision, DecisionAction, HealthStatus, LogEvent, OnHardCap,
    OnSoftCap, RoutingDecision,
};

pub use config::{GuardConfig, GuardConfigBuilder};
pub use decision::{evaluate, SpendRequest};
pub use error::{GuardError, InvariantViolation, PolicyError, Result};
pub use guard::{ContractGuard, ValidatedDocument};
pub use invariants::{Violation, ViolationKind};
pub use policy::{CeilingEnforcer, CeilingReport, PolicyTable};
pub use schema::{SchemaError, SchemaRegistry, SchemaSource, SchemaViolation};
pub use scanner::{scan_document, SecretFinding};
pub use telemetry::{init_tracing, GuardMetrics, LogFormat, TelemetryError};

pub use cli::{ExitCode, GuardCli, GuardCommands, OutputFormat};

/// Crate version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the CLI with a loaded configuration
///
/// # Example
///
/// ```rust,no_run
/// use clap::Parser;
/// use contract_guard::{run_cli, GuardCli, GuardConfig};
///
/// let cli = GuardCli::parse();
/// let config = GuardConfig::load(cli.config.as_deref()).unwrap_or_default();
/// std::process::exit(run_cli(cli, config).into());
/// ```
pub fn run_cli(cli: GuardCli, config: GuardConfig) -> ExitCode {
    match cli::run(cli, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from_error(&e)
        }
    }
}
