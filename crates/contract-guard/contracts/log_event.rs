//! Structured log event aggregate

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::decision::Decision;
use crate::{structured_record, structured_text};

/// Event type that must link to a routing decision
pub const DECISION_EVENT_TYPE: &str = "decision";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub event_id: String,
    pub timestamp: String,
    pub task_id: String,
    pub trace_id: String,
    pub source: String,
    pub level: Level,
    pub message: String,
    pub event_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_decision_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::contracts::whole_number::option")]
    pub tokens_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "crate::contracts::whole_number::option")]
    pub tokens_out: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl LogEvent {
    /// Embedded routing decision carried under `meta.routing_decision`
    pub fn embedded_routing(&self) -> Option<&Map<String, Value>> {
        self.meta.get("routing_decision").and_then(Value::as_object)
    }

    pub fn is_decision_event(&self) -> bool {
        self.event_type == DECISION_EVENT_TYPE
    }
}

structured_text!(Level);
structured_record!(LogEvent {
    event_id,
    timestamp,
    task_id,
    trace_id,
    source,
    level,
    message,
    event_type,
    provider,
    model,
    operation,
    request_id,
    response_id,
    routing_decision_id,
    tokens_in,
    tokens_out,
    cost_estimate,
    currency,
    decision,
    meta
});

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_with_embedded_routing() {
        let event: LogEvent = serde_json::from_value(json!({
            "event_id": "evt-101",
            "timestamp": "2026-02-07T12:00:00Z",
            "task_id": "job-101",
            "trace_id": "trace-101",
            "source": "openclaw",
            "level": "WARN",
            "message": "queued",
            "event_type": "decision",
            "decision": {"action": "QUEUE", "reason": "defer request", "deferred": true},
            "meta": {"routing_decision": {"decision_id": "dec-1"}}
        }))
        .unwrap();

        assert_eq!(event.level, Level::Warn);
        assert!(event.is_decision_event());
        assert!(event.embedded_routing().is_some());
        assert!(event.decision.as_ref().is_some_and(|d| d.deferred));
    }
}
