//! Validation facade
//!
//! [`ContractGuard`] owns the schema registry and the policy table, runs the
//! schema and invariant layers in order, and is the only place that logs or
//! records metrics. The layers underneath stay pure.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::GuardConfig;
use crate::contracts::{
    ContractKind, CostGovernor, Decision, HealthStatus, LogEvent, RoutingDecision,
};
use crate::decision::{self, SpendRequest};
use crate::error::{GuardError, InvariantViolation, Result};
use crate::invariants::{self, materialize, nest, Violation, EMBEDDED_SCHEMA_RULE};
use crate::policy::{self, CeilingReport, PolicyTable};
use crate::schema::{SchemaRegistry, SchemaSource};
use crate::telemetry::GuardMetrics;

/// Path under which an embedded routing decision is reported
const EMBEDDED_ROUTING_PREFIX: &str = "$.meta.routing_decision";

/// A document that passed both the schema and the invariant layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ValidatedDocument {
    CostGovernor(CostGovernor),
    HealthStatus(HealthStatus),
    LogEvent(LogEvent),
    RoutingDecision(RoutingDecision),
}

impl ValidatedDocument {
    pub fn kind(&self) -> ContractKind {
        match self {
            ValidatedDocument::CostGovernor(_) => ContractKind::CostGovernor,
            ValidatedDocument::HealthStatus(_) => ContractKind::HealthStatus,
            ValidatedDocument::LogEvent(_) => ContractKind::LogEvent,
            ValidatedDocument::RoutingDecision(_) => ContractKind::RoutingDecision,
        }
    }

    pub fn as_cost_governor(&self) -> Option<&CostGovernor> {
        match self {
            ValidatedDocument::CostGovernor(gov) => Some(gov),
            _ => None,
        }
    }
}

/// Schema + invariant validation, spend decisions and ceiling checks
#[derive(Debug)]
pub struct ContractGuard {
    schemas: SchemaRegistry,
    policy: PolicyTable,
    default_tier: Option<String>,
    strict_embedded_routing: bool,
    metrics: Option<Arc<GuardMetrics>>,
}

impl ContractGuard {
    /// Guard over the embedded schemas and policy table, without metrics
    pub fn new() -> Result<Self> {
        Ok(Self {
            schemas: SchemaRegistry::embedded(),
            policy: PolicyTable::embedded()?,
            default_tier: None,
            strict_embedded_routing: false,
            metrics: None,
        })
    }

    /// Build a guard from configuration, loading the policy table and
    /// creating a metrics registry when enabled
    pub fn from_config(config: &GuardConfig) -> Result<Self> {
        let schemas = match &config.schema_dir {
            Some(dir) => SchemaRegistry::from_dir(dir),
            None => SchemaRegistry::embedded(),
        };
        let policy = match &config.policy_path {
            Some(path) => PolicyTable::load(path)?,
            None => PolicyTable::embedded()?,
        };
        let metrics = if config.enable_metrics {
            let metrics = GuardMetrics::new()
                .map_err(|e| GuardError::Internal(format!("metrics setup failed: {}", e)))?;
            Some(Arc::new(metrics))
        } else {
            None
        };

        tracing::debug!(
            schemas = ?schemas.source(),
            policy_digest = %policy.digest(),
            strict_embedded_routing = config.strict_embedded_routing,
            "contract guard configured"
        );

        Ok(Self {
            schemas,
            policy,
            default_tier: config.default_tier.clone(),
            strict_embedded_routing: config.strict_embedded_routing,
            metrics,
        })
    }

    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = schemas;
        self
    }

    pub fn with_policy(mut self, policy: PolicyTable) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_default_tier(mut self, tier: impl Into<String>) -> Self {
        self.default_tier = Some(tier.into());
        self
    }

    pub fn with_strict_embedded_routing(mut self, strict: bool) -> Self {
        self.strict_embedded_routing = strict;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<GuardMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn metrics(&self) -> Option<&GuardMetrics> {
        self.metrics.as_deref()
    }

    /// Validate a raw document against `kind`: schema first, then the
    /// runtime invariants on the typed aggregate.
    ///
    /// Schema violations stop validation; invariant violations are
    /// collected and returned together.
    pub fn validate(&self, kind: ContractKind, doc: &Value) -> Result<ValidatedDocument> {
        let _timer = self.metrics().map(|metrics| metrics.start_timer(kind));
        let outcome = self.run_layers(kind, doc);

        match &outcome {
            Ok(_) => {
                tracing::debug!(contract = %kind, "document passed");
            }
            Err(GuardError::Schema(err)) if err.is_violation() => {
                tracing::info!(
                    contract = %kind,
                    violations = err.violations().len(),
                    "schema validation failed"
                );
                if let Some(metrics) = self.metrics() {
                    metrics.record_schema_violations(kind, err.violations().len());
                }
            }
            Err(GuardError::Invariant(err)) => {
                tracing::info!(
                    contract = %kind,
                    violations = err.violations.len(),
                    "runtime invariants failed"
                );
                if let Some(metrics) = self.metrics() {
                    metrics.record_violations(kind, &err.violations);
                }
            }
            Err(err) => {
                tracing::warn!(contract = %kind, error = %err, "validation did not complete");
            }
        }
        if let Some(metrics) = self.metrics() {
            metrics.record_validation(kind, outcome.is_ok());
        }
        outcome
    }

    fn run_layers(&self, kind: ContractKind, doc: &Value) -> Result<ValidatedDocument> {
        self.schemas.validate(kind, doc)?;

        let validated = match kind {
            ContractKind::CostGovernor => ValidatedDocument::CostGovernor(
                invariants::cost_governor::runtime_invariants_value(doc)?,
            ),
            ContractKind::HealthStatus => {
                ValidatedDocument::HealthStatus(invariants::health::runtime_invariants_value(doc)?)
            }
            ContractKind::RoutingDecision => ValidatedDocument::RoutingDecision(
                invariants::routing::runtime_invariants_value(doc)?,
            ),
            ContractKind::LogEvent => ValidatedDocument::LogEvent(self.log_event(doc)?),
        };
        Ok(validated)
    }

    fn log_event(&self, doc: &Value) -> Result<LogEvent> {
        let event: LogEvent = materialize(ContractKind::LogEvent, doc)?;
        let mut violations = invariants::logging::INVARIANTS.collect(&event, doc);

        if self.strict_embedded_routing {
            if let Some(embedded) = doc.pointer("/meta/routing_decision").filter(|v| v.is_object()) {
                violations.extend(self.embedded_routing_violations(embedded)?);
            }
        }

        if violations.is_empty() {
            Ok(event)
        } else {
            Err(InvariantViolation::new(ContractKind::LogEvent, violations).into())
        }
    }

    /// Schema and invariant violations of an embedded routing decision,
    /// re-rooted under `meta.routing_decision`. The secret scan has already
    /// covered the embedded tree as part of the enclosing event.
    fn embedded_routing_violations(&self, embedded: &Value) -> Result<Vec<Violation>> {
        let as_violation = |path: String, message: String| Violation {
            rule: EMBEDDED_SCHEMA_RULE,
            path,
            message,
        };

        let structural = self
            .schemas
            .violations(ContractKind::RoutingDecision, embedded)?;
        if !structural.is_empty() {
            return Ok(structural
                .into_iter()
                .map(|v| nest(as_violation(v.path, v.message), EMBEDDED_ROUTING_PREFIX))
                .collect());
        }

        let violations = match materialize::<RoutingDecision>(ContractKind::RoutingDecision, embedded)
        {
            Ok(decision) => invariants::routing::INVARIANTS
                .collect(&decision, &Value::Null)
                .into_iter()
                .map(|v| nest(v, EMBEDDED_ROUTING_PREFIX))
                .collect(),
            Err(err) => vec![nest(
                as_violation("$".to_string(), err.to_string()),
                EMBEDDED_ROUTING_PREFIX,
            )],
        };
        Ok(violations)
    }

    /// Evaluate one spend request against a validated governor.
    ///
    /// A governor that breaks its own invariants yields a BLOCK with an
    /// `invariant_violation` reason, which is logged here as an error.
    pub fn evaluate(&self, gov: &CostGovernor, request: &SpendRequest<'_>) -> Decision {
        let decision = decision::evaluate(gov, request);

        if decision.is_invariant_violation() {
            tracing::error!(
                task_id = request.task_id,
                reason = %decision.reason,
                "cost governor invariant violated at decision time"
            );
        } else {
            tracing::debug!(
                task_id = request.task_id,
                action = %decision.action,
                reason = %decision.reason,
                projected = request.projected(),
                "spend decision"
            );
        }
        if let Some(metrics) = self.metrics() {
            metrics.record_decision(decision.action);
        }
        decision
    }

    /// Check a document's caps against the policy table. The tier is the
    /// explicit one, else inferred from the document or path, else the
    /// configured default.
    pub fn ceiling(
        &self,
        doc: &Value,
        explicit_tier: Option<&str>,
        path: Option<&Path>,
    ) -> Result<CeilingReport> {
        let tier = policy::infer_tier(explicit_tier, doc, path).or_else(|| self.default_tier.clone());
        let report = policy::check_document(&self.policy, doc, tier.as_deref(), path)?;

        if report.passed() {
            tracing::debug!(tier = %report.tier, "caps within policy");
        } else {
            tracing::info!(
                tier = %report.tier,
                violations = report.violations.len(),
                "caps exceed policy"
            );
        }
        Ok(report)
    }

    /// Where schemas are loaded from
    pub fn schema_source(&self) -> &SchemaSource {
        self.schemas.source()
    }
}
