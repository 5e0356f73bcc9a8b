//! Cost-governor configuration aggregate

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{structured_record, structured_text};

/// Response when projected spend crosses the soft cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnSoftCap {
    LogOnly,
    DegradeModel,
    NotifyOps,
    QueueRequests,
}

impl OnSoftCap {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnSoftCap::LogOnly => "log-only",
            OnSoftCap::DegradeModel => "degrade-model",
            OnSoftCap::NotifyOps => "notify-ops",
            OnSoftCap::QueueRequests => "queue-requests",
        }
    }

    pub fn is_queue(&self) -> bool {
        matches!(self, OnSoftCap::QueueRequests)
    }
}

/// Response when projected spend crosses the hard cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnHardCap {
    HaltAll,
    HaltNoncritical,
    QueueRequests,
    QueueRequestsDefer,
    None,
}

impl OnHardCap {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnHardCap::HaltAll => "halt-all",
            OnHardCap::HaltNoncritical => "halt-noncritical",
            OnHardCap::QueueRequests => "queue-requests",
            OnHardCap::QueueRequestsDefer => "queue-requests-defer",
            OnHardCap::None => "none",
        }
    }

    pub fn is_queue(&self) -> bool {
        matches!(self, OnHardCap::QueueRequests | OnHardCap::QueueRequestsDefer)
    }
}

/// Which queued entry gives way when the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DropPolicy {
    DropOldest,
    DropNewest,
    #[default]
    DropNoncriticalFirst,
}

impl DropPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropPolicy::DropOldest => "drop-oldest",
            DropPolicy::DropNewest => "drop-newest",
            DropPolicy::DropNoncriticalFirst => "drop-noncritical-first",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(OnSoftCap, OnHardCap, DropPolicy);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuePolicy {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_queue_depth", deserialize_with = "crate::contracts::whole_number::deserialize")]
    pub max_queue_depth: u64,

    #[serde(default = "default_ttl_seconds", deserialize_with = "crate::contracts::whole_number::deserialize")]
    pub default_ttl_seconds: u64,

    #[serde(default)]
    pub drop_policy: DropPolicy,
}

fn default_true() -> bool {
    true
}

fn default_max_queue_depth() -> u64 {
    1000
}

fn default_ttl_seconds() -> u64 {
    3600
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_queue_depth: default_max_queue_depth(),
            default_ttl_seconds: default_ttl_seconds(),
            drop_policy: DropPolicy::default(),
        }
    }
}

impl QueuePolicy {
    pub fn with_max_queue_depth(mut self, depth: u64) -> Self {
        self.max_queue_depth = depth;
        self
    }

    pub fn with_ttl_seconds(mut self, ttl: u64) -> Self {
        self.default_ttl_seconds = ttl;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendMonitoring {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub alert_emails: Vec<String>,

    #[serde(default)]
    pub daily_report: bool,

    #[serde(default)]
    pub anomaly_detection: bool,

    #[serde(default = "default_alert_threshold")]
    pub alert_threshold_percent: f64,
}

fn default_alert_threshold() -> f64 {
    15.0
}

impl Default for SpendMonitoring {
    fn default() -> Self {
        Self {
            enabled: false,
            alert_emails: Vec::new(),
            daily_report: false,
            anomaly_detection: false,
            alert_threshold_percent: default_alert_threshold(),
        }
    }
}

/// Budget configuration for one deployment.
///
/// Construction never checks the cross-field rules; run
/// `crate::invariants::cost_governor::runtime_invariants` before trusting
/// a value built by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostGovernor {
    pub currency: String,

    pub daily_soft_cap: f64,

    /// `None` means there is no hard ceiling
    #[serde(default)]
    pub daily_hard_cap: Option<f64>,

    pub on_soft_cap: OnSoftCap,

    pub on_hard_cap: OnHardCap,

    /// Degrade targets, most preferred first
    #[serde(default)]
    pub model_degrade_ladder: Vec<String>,

    #[serde(default)]
    pub allowlist_tasks_under_hard_cap: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_request_cap: Option<f64>,

    #[serde(default = "default_reset_timezone")]
    pub reset_timezone: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_policy: Option<QueuePolicy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spend_monitoring: Option<SpendMonitoring>,
}

fn default_reset_timezone() -> String {
    "UTC".to_string()
}

impl CostGovernor {
    pub fn new(
        currency: impl Into<String>,
        daily_soft_cap: f64,
        daily_hard_cap: Option<f64>,
        on_soft_cap: OnSoftCap,
        on_hard_cap: OnHardCap,
    ) -> Self {
        Self {
            currency: currency.into(),
            daily_soft_cap,
            daily_hard_cap,
            on_soft_cap,
            on_hard_cap,
            model_degrade_ladder: Vec::new(),
            allowlist_tasks_under_hard_cap: Vec::new(),
            per_request_cap: None,
            reset_timezone: default_reset_timezone(),
            queue_policy: None,
            spend_monitoring: None,
        }
    }

    pub fn with_degrade_ladder<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.model_degrade_ladder = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_allowlist<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowlist_tasks_under_hard_cap = tasks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_per_request_cap(mut self, cap: f64) -> Self {
        self.per_request_cap = Some(cap);
        self
    }

    pub fn with_reset_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.reset_timezone = timezone.into();
        self
    }

    pub fn with_queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.queue_policy = Some(policy);
        self
    }

    pub fn with_spend_monitoring(mut self, monitoring: SpendMonitoring) -> Self {
        self.spend_monitoring = Some(monitoring);
        self
    }

    /// True when either response policy queues work
    pub fn uses_queue(&self) -> bool {
        self.on_soft_cap.is_queue() || self.on_hard_cap.is_queue()
    }

    /// Whether `task_id` is exempt from halt-noncritical blocking
    pub fn is_allowlisted(&self, task_id: &str) -> bool {
        self.allowlist_tasks_under_hard_cap
            .iter()
            .any(|task| task == task_id)
    }

    /// Preferred degrade target
    pub fn degrade_target(&self) -> Option<&str> {
        self.model_degrade_ladder.first().map(String::as_str)
    }
}

structured_text!(OnSoftCap, OnHardCap, DropPolicy);
structured_record!(QueuePolicy {
    enabled,
    max_queue_depth,
    default_ttl_seconds,
    drop_policy
});
structured_record!(SpendMonitoring {
    enabled,
    alert_emails,
    daily_report,
    anomaly_detection,
    alert_threshold_percent
});
structured_record!(CostGovernor {
    currency,
    daily_soft_cap,
    daily_hard_cap,
    on_soft_cap,
    on_hard_cap,
    model_degrade_ladder,
    allowlist_tasks_under_hard_cap,
    per_request_cap,
    reset_timezone,
    queue_policy,
    spend_monitoring
});

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_with_defaults() {
        let gov: CostGovernor = serde_json::from_value(json!({
            "currency": "USD",
            "daily_soft_cap": 80,
            "daily_hard_cap": 100,
            "on_soft_cap": "notify-ops",
            "on_hard_cap": "queue-requests",
            "queue_policy": {"max_queue_depth": 200}
        }))
        .unwrap();

        assert_eq!(gov.reset_timezone, "UTC");
        assert!(gov.model_degrade_ladder.is_empty());
        let queue = gov.queue_policy.as_ref().unwrap();
        assert!(queue.enabled);
        assert_eq!(queue.max_queue_depth, 200);
        assert_eq!(queue.default_ttl_seconds, 3600);
        assert_eq!(queue.drop_policy, DropPolicy::DropNoncriticalFirst);
        assert!(gov.uses_queue());
    }

    #[test]
    fn test_null_hard_cap() {
        let gov: CostGovernor = serde_json::from_value(json!({
            "currency": "USD",
            "daily_soft_cap": 500,
            "daily_hard_cap": null,
            "on_soft_cap": "notify-ops",
            "on_hard_cap": "none"
        }))
        .unwrap();
        assert_eq!(gov.daily_hard_cap, None);
        assert_eq!(gov.on_hard_cap, OnHardCap::None);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let result: Result<CostGovernor, _> = serde_json::from_value(json!({
            "currency": "USD",
            "daily_soft_cap": 1,
            "daily_hard_cap": 2,
            "on_soft_cap": "panic",
            "on_hard_cap": "halt-all"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_and_helpers() {
        let gov = CostGovernor::new("USD", 20.0, Some(25.0), OnSoftCap::DegradeModel, OnHardCap::HaltNoncritical)
            .with_degrade_ladder(["gpt-4o-mini", "claude-3-haiku"])
            .with_allowlist(["health-check"]);
        assert_eq!(gov.degrade_target(), Some("gpt-4o-mini"));
        assert!(gov.is_allowlisted("health-check"));
        assert!(!gov.is_allowlisted("nightly-report"));
        assert!(!gov.uses_queue());
    }

    #[test]
    fn test_spend_monitoring_threshold_default() {
        let monitoring: SpendMonitoring = serde_json::from_value(json!({"enabled": true})).unwrap();
        assert_eq!(monitoring.alert_threshold_percent, 15.0);
    }
}
