//! Cost-governor invariants
//!
//! Cross-field rules the cost-governor schema cannot express on its own,
//! plus the secret scan over every field.

use serde_json::Value;

use super::{materialize, InvariantValidator, Rule, ViolationReport};
use crate::contracts::{ContractKind, CostGovernor, OnHardCap, OnSoftCap};
use crate::error::{GuardError, InvariantViolation};

fn soft_cap_below_hard_cap(gov: &CostGovernor, report: &mut ViolationReport) {
    if let Some(hard) = gov.daily_hard_cap {
        if gov.daily_soft_cap > hard {
            report.push(
                "$.daily_soft_cap",
                format!(
                    "daily_soft_cap ({}) must be <= daily_hard_cap ({})",
                    gov.daily_soft_cap, hard
                ),
            );
        }
    }
}

fn null_hard_cap_means_none(gov: &CostGovernor, report: &mut ViolationReport) {
    if gov.daily_hard_cap.is_none() && gov.on_hard_cap != OnHardCap::None {
        report.push(
            "$.on_hard_cap",
            format!(
                "daily_hard_cap is null so on_hard_cap must be 'none', got '{}'",
                gov.on_hard_cap
            ),
        );
    }
}

fn degrade_needs_ladder(gov: &CostGovernor, report: &mut ViolationReport) {
    if gov.on_soft_cap == OnSoftCap::DegradeModel && gov.model_degrade_ladder.is_empty() {
        report.push(
            "$.model_degrade_ladder",
            "on_soft_cap='degrade-model' requires a non-empty model_degrade_ladder",
        );
    }
}

fn halt_noncritical_needs_allowlist(gov: &CostGovernor, report: &mut ViolationReport) {
    if gov.on_hard_cap == OnHardCap::HaltNoncritical
        && gov.allowlist_tasks_under_hard_cap.is_empty()
    {
        report.push(
            "$.allowlist_tasks_under_hard_cap",
            "on_hard_cap='halt-noncritical' requires a non-empty allowlist_tasks_under_hard_cap",
        );
    }
}

fn queue_needs_policy(gov: &CostGovernor, report: &mut ViolationReport) {
    if gov.uses_queue() && gov.queue_policy.is_none() {
        report.push(
            "$.queue_policy",
            "queue_policy is required when on_soft_cap or on_hard_cap uses a queue-* action",
        );
    }
}

static RULES: [Rule<CostGovernor>; 5] = [
    Rule {
        id: "soft_cap_below_hard_cap",
        description: "daily_soft_cap <= daily_hard_cap when a hard cap is set",
        check: soft_cap_below_hard_cap,
    },
    Rule {
        id: "null_hard_cap_means_none",
        description: "no hard cap implies on_hard_cap = none",
        check: null_hard_cap_means_none,
    },
    Rule {
        id: "degrade_needs_ladder",
        description: "degrade-model needs at least one ladder entry",
        check: degrade_needs_ladder,
    },
    Rule {
        id: "halt_noncritical_needs_allowlist",
        description: "halt-noncritical needs at least one allowlisted task",
        check: halt_noncritical_needs_allowlist,
    },
    Rule {
        id: "queue_needs_policy",
        description: "queue-* responses need a queue_policy",
        check: queue_needs_policy,
    },
];

/// Rule table for cost-governor configurations
pub static INVARIANTS: InvariantValidator<CostGovernor> =
    InvariantValidator::new(ContractKind::CostGovernor, &RULES);

/// Check a typed configuration
pub fn runtime_invariants(gov: &CostGovernor) -> Result<(), InvariantViolation> {
    INVARIANTS.check(gov, gov)
}

/// Materialize a raw, schema-valid document and check it.
///
/// The secret scan runs over the raw tree, so keys the typed aggregate
/// does not carry are still inspected.
pub fn runtime_invariants_value(value: &Value) -> Result<CostGovernor, GuardError> {
    let gov: CostGovernor = materialize(ContractKind::CostGovernor, value)?;
    INVARIANTS.check(&gov, value)?;
    Ok(gov)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::QueuePolicy;
    use serde_json::json;

    fn minimal() -> CostGovernor {
        CostGovernor::new("USD", 4.0, Some(5.0), OnSoftCap::LogOnly, OnHardCap::HaltAll)
    }

    #[test]
    fn test_valid_minimal() {
        assert!(runtime_invariants(&minimal()).is_ok());
    }

    #[test]
    fn test_valid_enterprise_without_hard_cap() {
        let gov = CostGovernor::new("USD", 500.0, None, OnSoftCap::NotifyOps, OnHardCap::None);
        assert!(runtime_invariants(&gov).is_ok());
    }

    #[test]
    fn test_soft_above_hard() {
        let gov = CostGovernor::new("USD", 10.0, Some(5.0), OnSoftCap::LogOnly, OnHardCap::HaltAll);
        let err = runtime_invariants(&gov).unwrap_err();
        assert!(err.mentions("daily_soft_cap (10) must be <= daily_hard_cap (5)"));
    }

    #[test]
    fn test_null_hard_cap_with_halt() {
        let gov = CostGovernor::new("USD", 10.0, None, OnSoftCap::LogOnly, OnHardCap::HaltAll);
        let err = runtime_invariants(&gov).unwrap_err();
        assert!(err.mentions("on_hard_cap must be 'none', got 'halt-all'"));
    }

    #[test]
    fn test_all_violations_collected() {
        let gov = CostGovernor::new(
            "USD",
            30.0,
            Some(25.0),
            OnSoftCap::DegradeModel,
            OnHardCap::HaltNoncritical,
        );
        let err = runtime_invariants(&gov).unwrap_err();
        assert_eq!(err.violations.len(), 3);
        assert!(err.mentions("daily_soft_cap"));
        assert!(err.mentions("model_degrade_ladder"));
        assert!(err.mentions("allowlist_tasks_under_hard_cap"));
    }

    #[test]
    fn test_queue_requires_policy() {
        let gov = CostGovernor::new(
            "USD",
            80.0,
            Some(100.0),
            OnSoftCap::NotifyOps,
            OnHardCap::QueueRequestsDefer,
        );
        assert!(runtime_invariants(&gov).unwrap_err().mentions("queue_policy is required"));
        assert!(runtime_invariants(&gov.with_queue_policy(QueuePolicy::default())).is_ok());
    }

    #[test]
    fn test_secret_in_ladder() {
        let gov = CostGovernor::new("USD", 20.0, Some(25.0), OnSoftCap::DegradeModel, OnHardCap::HaltAll)
            .with_degrade_ladder(["gpt-4o-mini", "sk-live-abc123"]);
        let err = runtime_invariants(&gov).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].path, "$.model_degrade_ladder[1]");
        assert!(err.mentions("sk-"));
        assert!(!err.to_string().contains("abc123"));
    }

    #[test]
    fn test_raw_document_keys_are_scanned() {
        let raw = json!({
            "currency": "USD",
            "daily_soft_cap": 4,
            "daily_hard_cap": 5,
            "on_soft_cap": "log-only",
            "on_hard_cap": "halt-all",
            "apiKey": "plain-literal"
        });
        let err = runtime_invariants_value(&raw).unwrap_err();
        match err {
            GuardError::Invariant(violation) => {
                assert!(violation.mentions("literal apiKey detected at $.apiKey"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_raw_document_returns_typed_config() {
        let raw = json!({
            "currency": "USD",
            "daily_soft_cap": 20,
            "daily_hard_cap": 25,
            "on_soft_cap": "degrade-model",
            "on_hard_cap": "halt-noncritical",
            "model_degrade_ladder": ["gpt-4o-mini", "claude-3-haiku"],
            "allowlist_tasks_under_hard_cap": ["health-check", "billing-webhook"]
        });
        let gov = runtime_invariants_value(&raw).unwrap();
        assert_eq!(gov.degrade_target(), Some("gpt-4o-mini"));
    }
}
