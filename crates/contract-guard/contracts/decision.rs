//! Cost-governance decision record
//!
//! Produced by `crate::decision::evaluate` and embedded verbatim in log
//! events under `decision`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{structured_record, structured_text};

/// What to do with the unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionAction {
    Allow,
    Block,
    Queue,
    Degrade,
}

impl DecisionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionAction::Allow => "ALLOW",
            DecisionAction::Block => "BLOCK",
            DecisionAction::Queue => "QUEUE",
            DecisionAction::Degrade => "DEGRADE",
        }
    }
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one request against a cost governor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,

    /// Stable prefix per cause, e.g. `hard_cap_exceeded: halt-all`
    pub reason: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub deferred: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded_model: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub log: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub notify: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl Decision {
    fn new(action: DecisionAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
            deferred: false,
            degraded_model: None,
            log: false,
            notify: false,
        }
    }

    pub fn allow(reason: impl Into<String>) -> Self {
        Self::new(DecisionAction::Allow, reason)
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self::new(DecisionAction::Block, reason)
    }

    pub fn queue(reason: impl Into<String>) -> Self {
        Self::new(DecisionAction::Queue, reason)
    }

    pub fn degrade(reason: impl Into<String>, model: impl Into<String>) -> Self {
        let mut decision = Self::new(DecisionAction::Degrade, reason);
        decision.degraded_model = Some(model.into());
        decision
    }

    pub fn with_deferred(mut self, deferred: bool) -> Self {
        self.deferred = deferred;
        self
    }

    pub fn with_log(mut self) -> Self {
        self.log = true;
        self
    }

    pub fn with_notify(mut self) -> Self {
        self.notify = true;
        self
    }

    /// True when the engine hit a configuration that validation should
    /// have rejected
    pub fn is_invariant_violation(&self) -> bool {
        self.reason.starts_with("invariant_violation")
    }
}

structured_text!(DecisionAction);
structured_record!(Decision {
    action,
    reason,
    deferred,
    degraded_model,
    log,
    notify
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_names() {
        let json = serde_json::to_string(&DecisionAction::Degrade).unwrap();
        assert_eq!(json, "\"DEGRADE\"");
        let parsed: DecisionAction = serde_json::from_str("\"QUEUE\"").unwrap();
        assert_eq!(parsed, DecisionAction::Queue);
    }

    #[test]
    fn test_flags_omitted_when_unset() {
        let json = serde_json::to_value(Decision::allow("under_budget")).unwrap();
        assert_eq!(json, serde_json::json!({"action": "ALLOW", "reason": "under_budget"}));
    }

    #[test]
    fn test_missing_flags_default_to_false() {
        let decision: Decision =
            serde_json::from_str(r#"{"action": "QUEUE", "reason": "deferred work", "deferred": true}"#)
                .unwrap();
        assert!(decision.deferred);
        assert!(!decision.log);
        assert!(decision.degraded_model.is_none());
    }
}
