//! Routing decision invariants

use std::collections::HashSet;

use serde_json::Value;

use super::{materialize, InvariantValidator, Rule, ViolationReport};
use crate::contracts::{ContractKind, RoutingDecision};
use crate::error::{GuardError, InvariantViolation};

fn decision_timestamp(decision: &RoutingDecision, report: &mut ViolationReport) {
    report.check_timestamp("$.timestamp", "timestamp", &decision.timestamp);
}

fn identifiers_present(decision: &RoutingDecision, report: &mut ViolationReport) {
    report.require_text("$.decision_id", "decision_id", &decision.decision_id);
    report.require_text("$.task_id", "task_id", &decision.task_id);
    report.require_text("$.trace_id", "trace_id", &decision.trace_id);
}

fn selection_heads_chain(decision: &RoutingDecision, report: &mut ViolationReport) {
    match decision.fallback_chain.first() {
        None => report.push("$.fallback_chain", "fallback_chain must be a non-empty list"),
        Some(head) => {
            if head.provider != decision.selected_provider || head.model != decision.selected_model {
                report.push(
                    "$.selected_provider",
                    "selected_provider/selected_model must match fallback_chain[0].provider/model",
                );
            }
        }
    }
}

fn reason_codes_canonical(decision: &RoutingDecision, report: &mut ViolationReport) {
    let codes = &decision.reason_codes;
    if codes.is_empty() {
        report.push("$.reason_codes", "reason_codes must be a non-empty list");
        return;
    }
    if codes.iter().any(|code| code.trim().is_empty()) {
        report.push("$.reason_codes", "reason_codes entries must be non-empty strings");
        return;
    }

    let unique: HashSet<&str> = codes.iter().map(String::as_str).collect();
    if unique.len() != codes.len() {
        report.push("$.reason_codes", "reason_codes must not contain duplicates");
    }
    if codes.windows(2).any(|pair| pair[0] > pair[1]) {
        report.push("$.reason_codes", "reason_codes must be sorted for deterministic ordering");
    }
}

fn cost_has_currency(decision: &RoutingDecision, report: &mut ViolationReport) {
    let has_currency = decision
        .currency
        .as_deref()
        .is_some_and(|currency| !currency.trim().is_empty());
    if decision.cost_estimate.is_some() && !has_currency {
        report.push("$.currency", "currency is required when cost_estimate is present");
    }
}

fn constraint_caps_ordered(decision: &RoutingDecision, report: &mut ViolationReport) {
    let constraints = &decision.constraints;
    if let (Some(soft), Some(hard)) = (constraints.daily_soft_cap, constraints.daily_hard_cap) {
        if soft > hard {
            report.push(
                "$.constraints.daily_soft_cap",
                "constraints.daily_soft_cap must be <= constraints.daily_hard_cap",
            );
        }
    }
}

static RULES: [Rule<RoutingDecision>; 6] = [
    Rule {
        id: "decision_timestamp",
        description: "timestamp is RFC3339 with timezone",
        check: decision_timestamp,
    },
    Rule {
        id: "identifiers_present",
        description: "decision_id, task_id and trace_id are non-empty",
        check: identifiers_present,
    },
    Rule {
        id: "selection_heads_chain",
        description: "the selected route is the first fallback hop",
        check: selection_heads_chain,
    },
    Rule {
        id: "reason_codes_canonical",
        description: "reason codes are non-empty, unique and sorted",
        check: reason_codes_canonical,
    },
    Rule {
        id: "cost_has_currency",
        description: "cost_estimate carries a currency",
        check: cost_has_currency,
    },
    Rule {
        id: "constraint_caps_ordered",
        description: "constraint soft cap does not exceed hard cap",
        check: constraint_caps_ordered,
    },
];

/// Rule table for routing decisions
pub static INVARIANTS: InvariantValidator<RoutingDecision> =
    InvariantValidator::new(ContractKind::RoutingDecision, &RULES);

pub fn runtime_invariants(decision: &RoutingDecision) -> Result<(), InvariantViolation> {
    INVARIANTS.check(decision, decision)
}

pub fn runtime_invariants_value(value: &Value) -> Result<RoutingDecision, GuardError> {
    let decision: RoutingDecision = materialize(ContractKind::RoutingDecision, value)?;
    INVARIANTS.check(&decision, value)?;
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ConstraintSnapshot, PrivacyClass, RouteTarget};

    fn valid() -> RoutingDecision {
        let mut constraints = ConstraintSnapshot::new(PrivacyClass::Internal);
        constraints.latency_target_ms = Some(500);
        RoutingDecision {
            decision_id: "dec-900".to_string(),
            timestamp: "2026-02-07T12:20:00Z".to_string(),
            task_id: "job-route-900".to_string(),
            trace_id: "trace-route-900".to_string(),
            selected_provider: "openrouter".to_string(),
            selected_model: "gpt-4o-mini".to_string(),
            fallback_chain: vec![
                RouteTarget::new("openrouter", "gpt-4o-mini"),
                RouteTarget::new("anthropic", "claude-3-haiku"),
            ],
            reason_codes: vec!["COST_SOFT_CAP".to_string(), "LATENCY_TARGET".to_string()],
            constraints,
            cost_estimate: None,
            currency: None,
            policy_hash: None,
        }
    }

    #[test]
    fn test_valid_decision() {
        assert!(runtime_invariants(&valid()).is_ok());
    }

    #[test]
    fn test_selection_mismatch() {
        let mut decision = valid();
        decision.selected_model = "claude-3-haiku".to_string();
        assert!(runtime_invariants(&decision)
            .unwrap_err()
            .mentions("must match fallback_chain[0]"));
    }

    #[test]
    fn test_empty_chain() {
        let mut decision = valid();
        decision.fallback_chain.clear();
        assert!(runtime_invariants(&decision)
            .unwrap_err()
            .mentions("fallback_chain must be a non-empty list"));
    }

    #[test]
    fn test_unsorted_reason_codes() {
        let mut decision = valid();
        decision.reason_codes.reverse();
        let err = runtime_invariants(&decision).unwrap_err();
        assert!(err.mentions("sorted"));
        assert!(!err.mentions("duplicates"));
    }

    #[test]
    fn test_duplicate_reason_codes() {
        let mut decision = valid();
        decision.reason_codes = vec!["COST_SOFT_CAP".to_string(), "COST_SOFT_CAP".to_string()];
        let err = runtime_invariants(&decision).unwrap_err();
        assert!(err.mentions("duplicates"));
        assert!(!err.mentions("sorted"));
    }

    #[test]
    fn test_blank_reason_code_stops_ordering_checks() {
        let mut decision = valid();
        decision.reason_codes = vec!["Z".to_string(), "".to_string()];
        let err = runtime_invariants(&decision).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(err.mentions("entries must be non-empty strings"));
    }

    #[test]
    fn test_constraint_caps() {
        let mut decision = valid();
        decision.constraints.daily_soft_cap = Some(30.0);
        decision.constraints.daily_hard_cap = Some(20.0);
        assert!(runtime_invariants(&decision)
            .unwrap_err()
            .mentions("constraints.daily_soft_cap must be <= constraints.daily_hard_cap"));
    }

    #[test]
    fn test_cost_requires_currency() {
        let mut decision = valid();
        decision.cost_estimate = Some(0.01);
        assert!(runtime_invariants(&decision).is_err());
        decision.currency = Some("USD".to_string());
        assert!(runtime_invariants(&decision).is_ok());
    }
}
