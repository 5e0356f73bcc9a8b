//! Structural validation against the versioned contract schemas
//!
//! Each contract has a Draft 2020-12 JSON Schema. The schemas ship inside
//! the binary and can be overridden by a directory of
//! `<schema_id>.schema.json` files. Compiled validators are cached in the
//! [`SchemaRegistry`] that owns them; first use compiles once, even under
//! concurrent access.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::contracts::ContractKind;

const COST_GOVERNOR_SCHEMA: &str = include_str!("../schemas/openclaw.cost_governor.schema.json");
const HEALTH_STATUS_SCHEMA: &str = include_str!("../schemas/openclaw.health_status.schema.json");
const LOG_EVENT_SCHEMA: &str = include_str!("../schemas/openclaw.log_event.schema.json");
const ROUTING_DECISION_SCHEMA: &str =
    include_str!("../schemas/openclaw.routing_decision.schema.json");

/// One structural problem reported by the schema engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// JSONPath-style location of the offending value
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Error, Debug, Clone)]
pub enum SchemaError {
    /// The document does not conform to the contract schema
    #[error("{contract} schema violation(s):{}", render(.violations))]
    Violations {
        contract: ContractKind,
        violations: Vec<SchemaViolation>,
    },

    /// The schema document itself could not be compiled
    #[error("Invalid JSON schema for {contract}: {message}")]
    InvalidSchema {
        contract: ContractKind,
        message: String,
    },

    /// The schema file could not be read or parsed
    #[error("Failed to load schema for {contract} from '{path}': {message}")]
    Load {
        contract: ContractKind,
        path: String,
        message: String,
    },
}

fn render(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|violation| format!("\n  • {}", violation))
        .collect()
}

impl SchemaError {
    /// True when the document was at fault rather than the schema
    pub fn is_violation(&self) -> bool {
        matches!(self, SchemaError::Violations { .. })
    }

    pub fn violations(&self) -> &[SchemaViolation] {
        match self {
            SchemaError::Violations { violations, .. } => violations,
            _ => &[],
        }
    }
}

/// Where schema documents come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// Schemas compiled into the binary
    Embedded,
    /// `<schema_id>.schema.json` files in a directory
    Directory(PathBuf),
}

type Compiled = Result<jsonschema::Validator, SchemaError>;

/// Owns the compiled validator for every contract.
pub struct SchemaRegistry {
    source: SchemaSource,
    compiled: [OnceLock<Compiled>; 4],
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loaded: Vec<&str> = ContractKind::ALL
            .iter()
            .filter(|kind| self.compiled[kind.index()].get().is_some())
            .map(|kind| kind.label())
            .collect();
        f.debug_struct("SchemaRegistry")
            .field("source", &self.source)
            .field("loaded", &loaded)
            .finish()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::embedded()
    }
}

impl SchemaRegistry {
    pub fn new(source: SchemaSource) -> Self {
        Self {
            source,
            compiled: Default::default(),
        }
    }

    /// Registry backed by the schemas shipped with the crate
    pub fn embedded() -> Self {
        Self::new(SchemaSource::Embedded)
    }

    /// Registry backed by `<schema_id>.schema.json` files under `dir`
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(SchemaSource::Directory(dir.into()))
    }

    pub fn source(&self) -> &SchemaSource {
        &self.source
    }

    /// Raw schema document for `contract`
    pub fn document(&self, contract: ContractKind) -> Result<Value, SchemaError> {
        match &self.source {
            SchemaSource::Embedded => {
                let text = match contract {
                    ContractKind::CostGovernor => COST_GOVERNOR_SCHEMA,
                    ContractKind::HealthStatus => HEALTH_STATUS_SCHEMA,
                    ContractKind::LogEvent => LOG_EVENT_SCHEMA,
                    ContractKind::RoutingDecision => ROUTING_DECISION_SCHEMA,
                };
                serde_json::from_str(text).map_err(|err| SchemaError::Load {
                    contract,
                    path: format!("embedded:{}", contract.schema_id()),
                    message: err.to_string(),
                })
            }
            SchemaSource::Directory(dir) => load_from_dir(dir, contract),
        }
    }

    /// Compile every schema now instead of on first use
    pub fn warm(&self) -> Result<(), SchemaError> {
        for contract in ContractKind::ALL {
            self.validator(contract)?;
        }
        Ok(())
    }

    /// Validate `doc`, collecting every structural violation
    pub fn validate(&self, contract: ContractKind, doc: &Value) -> Result<(), SchemaError> {
        let violations = self.violations(contract, doc)?;
        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Violations {
                contract,
                violations,
            })
        }
    }

    /// Structural violations of `doc`, empty when it conforms
    pub fn violations(
        &self,
        contract: ContractKind,
        doc: &Value,
    ) -> Result<Vec<SchemaViolation>, SchemaError> {
        let validator = self.validator(contract)?;
        Ok(validator
            .iter_errors(doc)
            .map(|error| SchemaViolation {
                path: pointer_to_path(&error.instance_path.to_string()),
                message: error.to_string(),
            })
            .collect())
    }

    fn validator(&self, contract: ContractKind) -> Result<&jsonschema::Validator, SchemaError> {
        self.compiled[contract.index()]
            .get_or_init(|| {
                let schema = self.document(contract)?;
                tracing::debug!(contract = %contract, "compiling contract schema");
                jsonschema::options()
                    .should_validate_formats(true)
                    .build(&schema)
                    .map_err(|err| SchemaError::InvalidSchema {
                        contract,
                        message: err.to_string(),
                    })
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

fn load_from_dir(dir: &Path, contract: ContractKind) -> Result<Value, SchemaError> {
    let path = dir.join(format!("{}.schema.json", contract.schema_id()));
    let load_error = |message: String| SchemaError::Load {
        contract,
        path: path.display().to_string(),
        message,
    };
    let text = std::fs::read_to_string(&path).map_err(|err| load_error(err.to_string()))?;
    serde_json::from_str(&text).map_err(|err| load_error(err.to_string()))
}

/// `/fallback_chain/0/model` -> `$.fallback_chain[0].model`
fn pointer_to_path(pointer: &str) -> String {
    let mut path = String::from("$");
    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            path.push('[');
            path.push_str(&segment);
            path.push(']');
        } else {
            path.push('.');
            path.push_str(&segment);
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn governor() -> Value {
        json!({
            "currency": "USD",
            "daily_soft_cap": 4,
            "daily_hard_cap": 5,
            "on_soft_cap": "log-only",
            "on_hard_cap": "halt-all"
        })
    }

    #[test]
    fn test_pointer_to_path() {
        assert_eq!(pointer_to_path(""), "$");
        assert_eq!(pointer_to_path("/fallback_chain/0/model"), "$.fallback_chain[0].model");
        assert_eq!(pointer_to_path("/meta/a~1b"), "$.meta.a/b");
    }

    #[test]
    fn test_embedded_schemas_compile() {
        let registry = SchemaRegistry::embedded();
        assert!(registry.warm().is_ok());
        for contract in ContractKind::ALL {
            let schema = registry.document(contract).unwrap();
            let id = schema["$id"].as_str().unwrap_or_default();
            assert!(id.ends_with(&format!("{}.schema.json", contract.schema_id())));
        }
    }

    #[test]
    fn test_valid_governor_passes() {
        let registry = SchemaRegistry::embedded();
        assert!(registry.validate(ContractKind::CostGovernor, &governor()).is_ok());
    }

    #[test]
    fn test_all_structural_violations_reported() {
        let registry = SchemaRegistry::embedded();
        let mut doc = governor();
        doc["on_soft_cap"] = json!("panic");
        doc["daily_soft_cap"] = json!(-1);
        let err = registry.validate(ContractKind::CostGovernor, &doc).unwrap_err();
        assert!(err.is_violation());
        assert!(err.violations().len() >= 2);
        assert!(err
            .violations()
            .iter()
            .any(|v| v.path == "$.on_soft_cap"));
        assert!(err.to_string().starts_with("CostGovernor schema violation(s):"));
    }

    #[test]
    fn test_degrade_requires_ladder_structurally() {
        let registry = SchemaRegistry::embedded();
        let mut doc = governor();
        doc["on_soft_cap"] = json!("degrade-model");
        assert!(registry.validate(ContractKind::CostGovernor, &doc).is_err());
        doc["model_degrade_ladder"] = json!(["gpt-4o-mini"]);
        assert!(registry.validate(ContractKind::CostGovernor, &doc).is_ok());
    }

    #[test]
    fn test_directory_source() {
        let dir = tempfile::tempdir().unwrap();
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "required": ["service"]
        });
        std::fs::write(
            dir.path().join("openclaw.health_status.schema.json"),
            serde_json::to_string(&schema).unwrap(),
        )
        .unwrap();

        let registry = SchemaRegistry::from_dir(dir.path());
        assert!(registry.validate(ContractKind::HealthStatus, &json!({"service": "x"})).is_ok());
        assert!(registry.validate(ContractKind::HealthStatus, &json!({})).is_err());

        let missing = registry.validate(ContractKind::LogEvent, &json!({})).unwrap_err();
        assert!(matches!(missing, SchemaError::Load { .. }));
        assert!(!missing.is_violation());
    }
}
