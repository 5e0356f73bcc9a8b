//! Routing decision aggregate

use serde::{Deserialize, Serialize};

use crate::{structured_record, structured_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyClass {
    Public,
    Internal,
    Restricted,
    Confidential,
}

impl PrivacyClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyClass::Public => "public",
            PrivacyClass::Internal => "internal",
            PrivacyClass::Restricted => "restricted",
            PrivacyClass::Confidential => "confidential",
        }
    }
}

/// One provider/model hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub provider: String,
    pub model: String,
}

impl RouteTarget {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// Constraints in force when the route was chosen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSnapshot {
    pub privacy_class: PrivacyClass,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::contracts::whole_number::option")]
    pub latency_target_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_request_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_soft_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_hard_cap: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::contracts::whole_number::option")]
    pub max_tokens: Option<u64>,
}

impl ConstraintSnapshot {
    pub fn new(privacy_class: PrivacyClass) -> Self {
        Self {
            privacy_class,
            latency_target_ms: None,
            cap_action: None,
            per_request_cap: None,
            daily_soft_cap: None,
            daily_hard_cap: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub decision_id: String,
    pub timestamp: String,
    pub task_id: String,
    pub trace_id: String,
    pub selected_provider: String,
    pub selected_model: String,
    /// Ordered hops; the first is the selected route
    pub fallback_chain: Vec<RouteTarget>,
    /// Canonical explanation codes, unique and sorted
    pub reason_codes: Vec<String>,
    pub constraints: ConstraintSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_hash: Option<String>,
}

impl RoutingDecision {
    /// The route named by `selected_provider`/`selected_model`
    pub fn selected(&self) -> RouteTarget {
        RouteTarget::new(self.selected_provider.clone(), self.selected_model.clone())
    }
}

structured_text!(PrivacyClass);
structured_record!(RouteTarget { provider, model });
structured_record!(ConstraintSnapshot {
    privacy_class,
    latency_target_ms,
    cap_action,
    per_request_cap,
    daily_soft_cap,
    daily_hard_cap,
    max_tokens
});
structured_record!(RoutingDecision {
    decision_id,
    timestamp,
    task_id,
    trace_id,
    selected_provider,
    selected_model,
    fallback_chain,
    reason_codes,
    constraints,
    cost_estimate,
    currency,
    policy_hash
});
