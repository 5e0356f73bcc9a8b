//! Health status invariants

use std::collections::HashSet;

use serde_json::Value;

use super::{materialize, InvariantValidator, Rule, ViolationReport};
use crate::contracts::{ContractKind, HealthState, HealthStatus, HealthSummary};
use crate::error::{GuardError, InvariantViolation};

fn report_timestamp(status: &HealthStatus, report: &mut ViolationReport) {
    report.check_timestamp("$.timestamp", "timestamp", &status.timestamp);
}

fn service_named(status: &HealthStatus, report: &mut ViolationReport) {
    report.require_text("$.service", "service", &status.service);
}

fn checks_well_formed(status: &HealthStatus, report: &mut ViolationReport) {
    if status.checks.is_empty() {
        report.push("$.checks", "checks must be a non-empty list");
        return;
    }

    let mut seen = HashSet::new();
    for (index, check) in status.checks.iter().enumerate() {
        let path = format!("checks[{}]", index);
        if check.name.trim().is_empty() {
            report.push(
                format!("$.{}.name", path),
                format!("{}.name must be a non-empty string", path),
            );
        } else if !seen.insert(check.name.as_str()) {
            report.push(
                format!("$.{}.name", path),
                format!("duplicate check name: {}", check.name),
            );
        }
    }
}

fn check_timestamps(status: &HealthStatus, report: &mut ViolationReport) {
    for (index, check) in status.checks.iter().enumerate() {
        let field = format!("checks[{}].timestamp", index);
        report.check_timestamp(&format!("$.{}", field), &field, &check.timestamp);
    }
}

fn summary_matches_checks(status: &HealthStatus, report: &mut ViolationReport) {
    let expected = HealthSummary::tally(&status.checks);
    for ((key, want), (_, got)) in expected.entries().into_iter().zip(status.summary.entries()) {
        if want != got {
            report.push(
                format!("$.summary.{}", key),
                format!("summary.{} must equal computed value {}, got {}", key, want, got),
            );
        }
    }
}

fn status_derived(status: &HealthStatus, report: &mut ViolationReport) {
    let expected = HealthState::derive(&HealthSummary::tally(&status.checks));
    if status.status != expected {
        report.push(
            "$.status",
            format!(
                "status must be '{}' for current checks/summary, got '{}'",
                expected, status.status
            ),
        );
    }
}

static RULES: [Rule<HealthStatus>; 6] = [
    Rule {
        id: "report_timestamp",
        description: "top-level timestamp is RFC3339 with timezone",
        check: report_timestamp,
    },
    Rule {
        id: "service_named",
        description: "service is a non-empty string",
        check: service_named,
    },
    Rule {
        id: "checks_well_formed",
        description: "checks are non-empty with unique non-empty names",
        check: checks_well_formed,
    },
    Rule {
        id: "check_timestamps",
        description: "every check timestamp is RFC3339 with timezone",
        check: check_timestamps,
    },
    Rule {
        id: "summary_matches_checks",
        description: "summary counts equal the tally of checks",
        check: summary_matches_checks,
    },
    Rule {
        id: "status_derived",
        description: "status is derived from the checks",
        check: status_derived,
    },
];

/// Rule table for health status reports
pub static INVARIANTS: InvariantValidator<HealthStatus> =
    InvariantValidator::new(ContractKind::HealthStatus, &RULES);

pub fn runtime_invariants(status: &HealthStatus) -> Result<(), InvariantViolation> {
    INVARIANTS.check(status, status)
}

pub fn runtime_invariants_value(value: &Value) -> Result<HealthStatus, GuardError> {
    let status: HealthStatus = materialize(ContractKind::HealthStatus, value)?;
    INVARIANTS.check(&status, value)?;
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{HealthCheckResult, ProbeType};
    use crate::invariants::ViolationKind;

    const TS: &str = "2026-02-08T04:00:00Z";

    fn ping() -> HealthCheckResult {
        HealthCheckResult::new("runtime_ping", ProbeType::Liveness, HealthState::Healthy, TS)
            .with_message("runtime alive")
            .with_duration_ms(4.2)
    }

    fn valid() -> HealthStatus {
        HealthStatus::from_checks("openclaw-runtime", TS, vec![ping()])
    }

    #[test]
    fn test_valid_report() {
        assert!(runtime_invariants(&valid()).is_ok());
    }

    #[test]
    fn test_naive_timestamp_rejected() {
        let mut status = valid();
        status.timestamp = "2026-02-08T04:00:00".to_string();
        let err = runtime_invariants(&status).unwrap_err();
        assert!(err.mentions("timestamp must include timezone"));
        assert_eq!(err.violations[0].kind(), ViolationKind::Timestamp);
    }

    #[test]
    fn test_check_timestamp_rejected() {
        let mut status = valid();
        status.checks[0].timestamp = "yesterday".to_string();
        let err = runtime_invariants(&status).unwrap_err();
        assert!(err.mentions("checks[0].timestamp must use RFC3339 date-time format"));
    }

    #[test]
    fn test_summary_mismatch_and_status() {
        let mut status = valid();
        status.summary.total = 2;
        status.status = HealthState::Degraded;
        let err = runtime_invariants(&status).unwrap_err();
        assert!(err.mentions("summary.total must equal computed value 1, got 2"));
        assert!(err.mentions("status must be 'healthy' for current checks/summary, got 'degraded'"));
    }

    #[test]
    fn test_duplicate_and_blank_names() {
        let mut blank = ping();
        blank.name = " ".to_string();
        let status = HealthStatus::from_checks("openclaw-runtime", TS, vec![ping(), ping(), blank]);
        let err = runtime_invariants(&status).unwrap_err();
        assert!(err.mentions("duplicate check name: runtime_ping"));
        assert!(err.mentions("checks[2].name must be a non-empty string"));
    }

    #[test]
    fn test_empty_checks() {
        let status = HealthStatus::from_checks("openclaw-runtime", TS, Vec::new());
        let err = runtime_invariants(&status).unwrap_err();
        assert!(err.mentions("checks must be a non-empty list"));
    }

    #[test]
    fn test_secret_in_details() {
        let mut status = valid();
        status.checks[0]
            .details
            .insert("token".to_string(), Value::String("sk-leaked".to_string()));
        let err = runtime_invariants(&status).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].path, "$.checks[0].details.token");
    }
}
