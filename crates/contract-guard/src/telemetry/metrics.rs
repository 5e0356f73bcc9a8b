//! Prometheus metrics for contract checks
//!
//! - `contract_guard_validations_total` (counter) - validations by contract and result
//! - `contract_guard_violations_total` (counter) - individual violations by contract and kind
//! - `contract_guard_decisions_total` (counter) - spend decisions by action
//! - `contract_guard_validation_duration_seconds` (histogram) - time per validation
//!
//! # Example
//!
//! ```rust,no_run
//! use contract_guard::contracts::ContractKind;
//! use contract_guard::telemetry::GuardMetrics;
//!
//! let metrics = GuardMetrics::new().unwrap();
//! {
//!     let _timer = metrics.start_timer(ContractKind::CostGovernor);
//!     metrics.record_validation(ContractKind::CostGovernor, true);
//! }
//! println!("{}", metrics.gather_text().unwrap());
//! ```

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;
use std::time::Instant;

use super::{Result, TelemetryError};
use crate::contracts::{ContractKind, DecisionAction};
use crate::invariants::Violation;

const NAMESPACE: &str = "contract_guard";

/// Counters and histograms for validations and spend decisions
pub struct GuardMetrics {
    registry: Arc<Registry>,

    /// Validations by contract and result (`pass` / `fail`)
    validations_total: CounterVec,

    /// Violations by contract and kind (`rule`, `timestamp`, `secret`, `schema`)
    violations_total: CounterVec,

    /// Spend decisions by action
    decisions_total: CounterVec,

    /// Validation duration in seconds by contract
    duration_seconds: HistogramVec,
}

impl GuardMetrics {
    /// Metrics in a fresh registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::new(Registry::new()))
    }

    /// Register the metrics with an existing registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let validations_total = CounterVec::new(
            Opts::new(
                "validations_total",
                "Total number of contract validations by result",
            )
            .namespace(NAMESPACE),
            &["contract", "result"],
        )?;

        let violations_total = CounterVec::new(
            Opts::new(
                "violations_total",
                "Total number of contract violations by kind",
            )
            .namespace(NAMESPACE),
            &["contract", "kind"],
        )?;

        let decisions_total = CounterVec::new(
            Opts::new("decisions_total", "Total number of spend decisions by action")
                .namespace(NAMESPACE),
            &["action"],
        )?;

        let duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "validation_duration_seconds",
                "Contract validation duration in seconds",
            )
            .namespace(NAMESPACE)
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            &["contract"],
        )?;

        registry.register(Box::new(validations_total.clone()))?;
        registry.register(Box::new(violations_total.clone()))?;
        registry.register(Box::new(decisions_total.clone()))?;
        registry.register(Box::new(duration_seconds.clone()))?;

        Ok(Self {
            registry,
            validations_total,
            violations_total,
            decisions_total,
            duration_seconds,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn record_validation(&self, contract: ContractKind, passed: bool) {
        let result = if passed { "pass" } else { "fail" };
        self.validations_total
            .with_label_values(&[contract.label(), result])
            .inc();
    }

    /// Count each violation under its kind
    pub fn record_violations(&self, contract: ContractKind, violations: &[Violation]) {
        for violation in violations {
            let kind = violation.kind().to_string();
            self.violations_total
                .with_label_values(&[contract.label(), kind.as_str()])
                .inc();
        }
    }

    /// Count schema violations, which carry no rule id
    pub fn record_schema_violations(&self, contract: ContractKind, count: usize) {
        if count > 0 {
            self.violations_total
                .with_label_values(&[contract.label(), "schema"])
                .inc_by(count as f64);
        }
    }

    pub fn record_decision(&self, action: DecisionAction) {
        self.decisions_total
            .with_label_values(&[action.as_str()])
            .inc();
    }

    pub fn observe_duration(&self, contract: ContractKind, duration_secs: f64) {
        self.duration_seconds
            .with_label_values(&[contract.label()])
            .observe(duration_secs);
    }

    /// Start a validation timer (returns a guard that records duration on drop)
    pub fn start_timer(&self, contract: ContractKind) -> ValidationTimer<'_> {
        ValidationTimer {
            start: Instant::now(),
            contract,
            metrics: self,
        }
    }

    /// Encode every metric in the Prometheus text format
    pub fn gather_text(&self) -> Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::EncodingFailed(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::EncodingFailed(e.to_string()))
    }
}

impl std::fmt::Debug for GuardMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardMetrics").finish_non_exhaustive()
    }
}

/// RAII guard for timing validations
pub struct ValidationTimer<'a> {
    start: Instant,
    contract: ContractKind,
    metrics: &'a GuardMetrics,
}

impl ValidationTimer<'_> {
    /// Get elapsed time in seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for ValidationTimer<'_> {
    fn drop(&mut self) {
        self.metrics
            .observe_duration(self.contract, self.start.elapsed().as_secs_f64());
    }
}
