//! Log event invariants

use serde_json::Value;

use super::{materialize, InvariantValidator, Rule, ViolationReport};
use crate::contracts::{ContractKind, DecisionAction, LogEvent};
use crate::error::{GuardError, InvariantViolation};

fn event_timestamp(event: &LogEvent, report: &mut ViolationReport) {
    report.check_timestamp("$.timestamp", "timestamp", &event.timestamp);
}

fn identifiers_present(event: &LogEvent, report: &mut ViolationReport) {
    report.require_text("$.event_id", "event_id", &event.event_id);
    report.require_text("$.task_id", "task_id", &event.task_id);
    report.require_text("$.trace_id", "trace_id", &event.trace_id);
}

fn token_counts_paired(event: &LogEvent, report: &mut ViolationReport) {
    if event.tokens_in.is_some() != event.tokens_out.is_some() {
        report.push(
            "$.tokens_in",
            "tokens_in and tokens_out must both be present when either is provided",
        );
    }
}

fn cost_has_currency(event: &LogEvent, report: &mut ViolationReport) {
    let has_currency = event
        .currency
        .as_deref()
        .is_some_and(|currency| !currency.trim().is_empty());
    if event.cost_estimate.is_some() && !has_currency {
        report.push("$.currency", "currency is required when cost_estimate is present");
    }
}

fn decision_consistent(event: &LogEvent, report: &mut ViolationReport) {
    let Some(decision) = &event.decision else {
        return;
    };
    match decision.action {
        DecisionAction::Degrade => {
            let named = decision
                .degraded_model
                .as_deref()
                .is_some_and(|model| !model.trim().is_empty());
            if !named {
                report.push(
                    "$.decision.degraded_model",
                    "decision.degraded_model is required when decision.action == DEGRADE",
                );
            }
        }
        DecisionAction::Queue => {
            if decision.deferred && !decision.reason.to_ascii_lowercase().contains("defer") {
                report.push(
                    "$.decision.reason",
                    "decision.reason must include 'defer' when decision.action == QUEUE and deferred is true",
                );
            }
        }
        DecisionAction::Allow | DecisionAction::Block => {}
    }
}

fn routing_link(event: &LogEvent, report: &mut ViolationReport) {
    if let Some(id) = &event.routing_decision_id {
        if id.trim().is_empty() {
            report.push(
                "$.routing_decision_id",
                "routing_decision_id must be a non-empty string when provided",
            );
        }
    }

    if event.is_decision_event() {
        let linked = event
            .routing_decision_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
            || event.embedded_routing().is_some();
        if !linked {
            report.push(
                "$.routing_decision_id",
                "event_type='decision' requires routing_decision_id or meta.routing_decision",
            );
        }
    }
}

static RULES: [Rule<LogEvent>; 6] = [
    Rule {
        id: "event_timestamp",
        description: "timestamp is RFC3339 with timezone",
        check: event_timestamp,
    },
    Rule {
        id: "identifiers_present",
        description: "event_id, task_id and trace_id are non-empty",
        check: identifiers_present,
    },
    Rule {
        id: "token_counts_paired",
        description: "tokens_in and tokens_out appear together",
        check: token_counts_paired,
    },
    Rule {
        id: "cost_has_currency",
        description: "cost_estimate carries a currency",
        check: cost_has_currency,
    },
    Rule {
        id: "decision_consistent",
        description: "embedded decision flags agree with its action",
        check: decision_consistent,
    },
    Rule {
        id: "routing_link",
        description: "decision events link to a routing decision",
        check: routing_link,
    },
];

/// Rule table for log events
pub static INVARIANTS: InvariantValidator<LogEvent> =
    InvariantValidator::new(ContractKind::LogEvent, &RULES);

pub fn runtime_invariants(event: &LogEvent) -> Result<(), InvariantViolation> {
    INVARIANTS.check(event, event)
}

pub fn runtime_invariants_value(value: &Value) -> Result<LogEvent, GuardError> {
    let event: LogEvent = materialize(ContractKind::LogEvent, value)?;
    INVARIANTS.check(&event, value)?;
    Ok(event)
}
