//! Cost-governance decision engine
//!
//! [`evaluate`] is a pure function: the same configuration and request
//! always produce the same [`Decision`], and nothing is logged or counted
//! here. Precedence is fixed:
//!
//! 1. per-request cap
//! 2. daily hard cap (projected spend = spent today + estimated cost)
//! 3. daily soft cap
//! 4. under budget
//!
//! Any QUEUE outcome is subject to the queue overflow check.

use crate::contracts::{CostGovernor, Decision, OnHardCap, OnSoftCap};

pub use crate::contracts::DecisionAction;

/// Attributes of the unit of work being governed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendRequest<'a> {
    pub estimated_cost: f64,
    pub spent_today: f64,
    pub task_id: &'a str,
    /// Resolved upstream, normally against the allowlist
    pub is_critical: bool,
    pub queue_depth: u64,
}

impl<'a> SpendRequest<'a> {
    pub fn new(task_id: &'a str, estimated_cost: f64, spent_today: f64) -> Self {
        Self {
            estimated_cost,
            spent_today,
            task_id,
            is_critical: false,
            queue_depth: 0,
        }
    }

    pub fn critical(mut self, is_critical: bool) -> Self {
        self.is_critical = is_critical;
        self
    }

    pub fn with_queue_depth(mut self, depth: u64) -> Self {
        self.queue_depth = depth;
        self
    }

    /// Spend if this request goes ahead
    pub fn projected(&self) -> f64 {
        self.spent_today + self.estimated_cost
    }
}

/// Decide what to do with one request under `gov`.
pub fn evaluate(gov: &CostGovernor, request: &SpendRequest<'_>) -> Decision {
    if let Some(cap) = gov.per_request_cap {
        if request.estimated_cost > cap {
            return Decision::block(format!(
                "estimated_cost ({}) exceeds per_request_cap ({})",
                request.estimated_cost, cap
            ));
        }
    }

    let projected = request.projected();

    if let Some(hard) = gov.daily_hard_cap {
        if projected > hard {
            return hard_cap_response(gov, request);
        }
    }

    if projected > gov.daily_soft_cap {
        return soft_cap_response(gov, request);
    }

    Decision::allow("under_budget")
}

fn hard_cap_response(gov: &CostGovernor, request: &SpendRequest<'_>) -> Decision {
    match gov.on_hard_cap {
        OnHardCap::HaltAll => Decision::block("hard_cap_exceeded: halt-all"),
        OnHardCap::HaltNoncritical => {
            if request.is_critical {
                Decision::allow(format!(
                    "hard_cap_exceeded: halt-noncritical, '{}' is critical",
                    request.task_id
                ))
            } else {
                Decision::block(format!(
                    "hard_cap_exceeded: halt-noncritical, '{}' not in allowlist",
                    request.task_id
                ))
            }
        }
        OnHardCap::QueueRequests => {
            check_queue_overflow(gov, request, Decision::queue("hard_cap_exceeded: queue-requests"))
        }
        OnHardCap::QueueRequestsDefer => check_queue_overflow(
            gov,
            request,
            Decision::queue("hard_cap_exceeded: queue-requests-defer").with_deferred(true),
        ),
        // validation rejects a hard cap paired with `none`; block rather than
        // let spend through unchecked
        OnHardCap::None => {
            Decision::block("invariant_violation: on_hard_cap='none' with non-null daily_hard_cap")
        }
    }
}

fn soft_cap_response(gov: &CostGovernor, request: &SpendRequest<'_>) -> Decision {
    match gov.on_soft_cap {
        OnSoftCap::LogOnly => Decision::allow("soft_cap_exceeded: log-only").with_log(),
        OnSoftCap::DegradeModel => match gov.degrade_target() {
            Some(model) => Decision::degrade("soft_cap_exceeded: degrade-model", model),
            // A DEGRADE with no target model fails the log-event degraded_model rule.
            None => Decision::block(
                "invariant_violation: on_soft_cap='degrade-model' with empty model_degrade_ladder",
            ),
        },
        OnSoftCap::NotifyOps => Decision::allow("soft_cap_exceeded: notify-ops").with_notify(),
        OnSoftCap::QueueRequests => {
            check_queue_overflow(gov, request, Decision::queue("soft_cap_exceeded: queue-requests"))
        }
    }
}

fn check_queue_overflow(gov: &CostGovernor, request: &SpendRequest<'_>, queued: Decision) -> Decision {
    match &gov.queue_policy {
        Some(policy) if request.queue_depth >= policy.max_queue_depth => {
            Decision::block("queue_overflow")
        }
        _ => queued,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::QueuePolicy;

    fn minimal() -> CostGovernor {
        CostGovernor::new("USD", 4.0, Some(5.0), OnSoftCap::LogOnly, OnHardCap::HaltAll)
    }

    fn degrade() -> CostGovernor {
        CostGovernor::new("USD", 20.0, Some(25.0), OnSoftCap::DegradeModel, OnHardCap::HaltNoncritical)
            .with_degrade_ladder(["gpt-4o-mini", "claude-3-haiku"])
            .with_allowlist(["health-check", "billing-webhook"])
    }

    fn queued(on_hard: OnHardCap) -> CostGovernor {
        CostGovernor::new("USD", 80.0, Some(100.0), OnSoftCap::NotifyOps, on_hard)
            .with_queue_policy(QueuePolicy::default().with_max_queue_depth(200).with_ttl_seconds(300))
    }

    #[test]
    fn test_under_budget() {
        let decision = evaluate(&minimal(), &SpendRequest::new("job-1", 1.0, 1.0));
        assert_eq!(decision, Decision::allow("under_budget"));
    }

    #[test]
    fn test_per_request_cap_dominates() {
        let gov = minimal().with_per_request_cap(0.5);
        let decision = evaluate(&gov, &SpendRequest::new("job-1", 0.75, 0.0));
        assert_eq!(decision.action, DecisionAction::Block);
        assert!(decision.reason.contains("per_request_cap"));
        assert!(decision.reason.contains("0.5"));
    }

    #[test]
    fn test_halt_all() {
        let decision = evaluate(&minimal(), &SpendRequest::new("job-1", 1.0, 4.5));
        assert_eq!(decision.action, DecisionAction::Block);
        assert_eq!(decision.reason, "hard_cap_exceeded: halt-all");
    }

    #[test]
    fn test_soft_cap_log_only() {
        let decision = evaluate(&minimal(), &SpendRequest::new("job-1", 0.5, 4.0));
        assert_eq!(decision.action, DecisionAction::Allow);
        assert!(decision.log);
        assert_eq!(decision.reason, "soft_cap_exceeded: log-only");
    }

    #[test]
    fn test_halt_noncritical() {
        let gov = degrade();
        let critical = evaluate(&gov, &SpendRequest::new("health-check", 2.0, 24.0).critical(true));
        assert_eq!(critical.action, DecisionAction::Allow);
        assert!(critical.reason.contains("'health-check' is critical"));

        let other = evaluate(&gov, &SpendRequest::new("nightly-report", 2.0, 24.0));
        assert_eq!(other.action, DecisionAction::Block);
        assert!(other.reason.contains("not in allowlist"));
    }

    #[test]
    fn test_degrade_picks_first_rung() {
        let decision = evaluate(&degrade(), &SpendRequest::new("job-1", 1.0, 20.0));
        assert_eq!(decision.action, DecisionAction::Degrade);
        assert_eq!(decision.degraded_model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_queue_defer_and_overflow() {
        let gov = queued(OnHardCap::QueueRequestsDefer);
        let request = SpendRequest::new("job-1", 5.0, 99.0);

        let decision = evaluate(&gov, &request.with_queue_depth(199));
        assert_eq!(decision.action, DecisionAction::Queue);
        assert!(decision.deferred);
        assert!(decision.reason.contains("defer"));

        let overflow = evaluate(&gov, &request.with_queue_depth(200));
        assert_eq!(overflow, Decision::block("queue_overflow"));
    }

    #[test]
    fn test_soft_cap_queue_overflow() {
        let gov = CostGovernor::new("USD", 80.0, Some(100.0), OnSoftCap::QueueRequests, OnHardCap::HaltAll)
            .with_queue_policy(QueuePolicy::default().with_max_queue_depth(200));
        let request = SpendRequest::new("job-1", 5.0, 80.0);

        let queued = evaluate(&gov, &request.with_queue_depth(199));
        assert_eq!(queued.action, DecisionAction::Queue);
        assert_eq!(queued.reason, "soft_cap_exceeded: queue-requests");

        let overflow = evaluate(&gov, &request.with_queue_depth(200));
        assert_eq!(overflow, Decision::block("queue_overflow"));
    }

    #[test]
    fn test_queue_without_policy_passes_through() {
        let gov = CostGovernor::new("USD", 80.0, Some(100.0), OnSoftCap::QueueRequests, OnHardCap::HaltAll);
        let decision = evaluate(&gov, &SpendRequest::new("job-1", 5.0, 80.0).with_queue_depth(1_000_000));
        assert_eq!(decision.action, DecisionAction::Queue);
        assert!(!decision.deferred);
    }

    #[test]
    fn test_none_with_hard_cap_blocks() {
        let gov = CostGovernor::new("USD", 5.0, Some(10.0), OnSoftCap::LogOnly, OnHardCap::None);
        let decision = evaluate(&gov, &SpendRequest::new("job-1", 5.0, 8.0));
        assert_eq!(decision.action, DecisionAction::Block);
        assert!(decision.is_invariant_violation());
    }

    #[test]
    fn test_null_hard_cap_never_blocks_at_hard_phase() {
        let gov = CostGovernor::new("USD", 500.0, None, OnSoftCap::NotifyOps, OnHardCap::None);
        let decision = evaluate(&gov, &SpendRequest::new("job-1", 10_000.0, 10_000.0));
        assert_eq!(decision.action, DecisionAction::Allow);
        assert!(decision.notify);
    }

    #[test]
    fn test_soft_hard_scenario() {
        let gov = CostGovernor::new("USD", 10.0, Some(20.0), OnSoftCap::LogOnly, OnHardCap::HaltAll);
        let blocked = evaluate(&gov, &SpendRequest::new("job-1", 5.0, 18.0));
        assert_eq!(blocked.action, DecisionAction::Block);

        let logged = evaluate(&gov, &SpendRequest::new("job-1", 5.0, 8.0));
        assert_eq!(logged.action, DecisionAction::Allow);
        assert!(logged.log);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn on_hard_cap() -> impl Strategy<Value = OnHardCap> {
            prop_oneof![
                Just(OnHardCap::HaltAll),
                Just(OnHardCap::HaltNoncritical),
                Just(OnHardCap::QueueRequests),
                Just(OnHardCap::QueueRequestsDefer),
                Just(OnHardCap::None),
            ]
        }

        proptest! {
            #[test]
            fn per_request_cap_always_wins(
                cap in 0.01f64..100.0,
                excess in 0.01f64..100.0,
                spent in 0.0f64..1000.0,
                on_hard in on_hard_cap(),
            ) {
                let gov = CostGovernor::new("USD", 1.0, Some(2.0), OnSoftCap::NotifyOps, on_hard)
                    .with_per_request_cap(cap)
                    .with_allowlist(["health-check"])
                    .with_queue_policy(QueuePolicy::default());
                let decision = evaluate(&gov, &SpendRequest::new("health-check", cap + excess, spent).critical(true));
                prop_assert_eq!(decision.action, DecisionAction::Block);
                prop_assert!(decision.reason.contains("per_request_cap"));
            }

            #[test]
            fn null_hard_cap_never_hard_blocks(
                cost in 0.0f64..1e6,
                spent in 0.0f64..1e6,
                depth in 0u64..10_000,
            ) {
                let gov = CostGovernor::new("USD", 100.0, None, OnSoftCap::LogOnly, OnHardCap::None);
                let decision = evaluate(&gov, &SpendRequest::new("job-1", cost, spent).with_queue_depth(depth));
                prop_assert!(!decision.reason.starts_with("hard_cap_exceeded"));
                prop_assert_eq!(decision.action, DecisionAction::Allow);
            }

            #[test]
            fn evaluation_is_deterministic(
                cost in 0.0f64..50.0,
                spent in 0.0f64..50.0,
                depth in 0u64..2000,
                critical in any::<bool>(),
                on_hard in on_hard_cap(),
            ) {
                let gov = CostGovernor::new("USD", 20.0, Some(25.0), OnSoftCap::DegradeModel, on_hard)
                    .with_degrade_ladder(["gpt-4o-mini"])
                    .with_allowlist(["health-check"])
                    .with_queue_policy(QueuePolicy::default());
                let request = SpendRequest::new("health-check", cost, spent)
                    .critical(critical)
                    .with_queue_depth(depth);
                prop_assert_eq!(evaluate(&gov, &request), evaluate(&gov, &request));
            }

            #[test]
            fn overflow_boundary(max in 1u64..5000) {
                let gov = queued(OnHardCap::QueueRequests);
                let gov = CostGovernor {
                    queue_policy: Some(QueuePolicy::default().with_max_queue_depth(max)),
                    ..gov
                };
                let request = SpendRequest::new("job-1", 5.0, 99.0);
                prop_assert_eq!(
                    evaluate(&gov, &request.with_queue_depth(max)).reason,
                    "queue_overflow"
                );
                prop_assert_eq!(
                    evaluate(&gov, &request.with_queue_depth(max - 1)).action,
                    DecisionAction::Queue
                );
            }
        }
    }
}
