//! Error types for contract-guard
//!
//! Structural (schema) failures, runtime invariant failures, policy table
//! problems and the usual I/O and parsing errors all funnel into
//! [`GuardError`]. Invariant failures carry every violation found in a
//! single pass; nothing here is raised on the first problem.

use std::fmt;

use thiserror::Error;

use crate::contracts::ContractKind;
use crate::invariants::Violation;
use crate::schema::SchemaError;

/// A document that passed schema validation but broke one or more
/// cross-field rules or leaked a secret-like value.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantViolation {
    /// Contract the document was checked against
    pub contract: ContractKind,
    /// Every violation found, in rule order
    pub violations: Vec<Violation>,
}

impl InvariantViolation {
    pub fn new(contract: ContractKind, violations: Vec<Violation>) -> Self {
        Self {
            contract,
            violations,
        }
    }

    /// Human-readable messages, one per violation
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.message.clone()).collect()
    }

    /// True when any violation message contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.violations.iter().any(|v| v.message.contains(needle))
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invariant violation(s):", self.contract)?;
        for violation in &self.violations {
            write!(f, "\n  • {}", violation.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for InvariantViolation {}

/// Problems with the policy rule table itself
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Failed to read policy table '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed policy rule on line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Could not determine tier: {0}")]
    UnknownTier(String),
}

/// Main error type for contract-guard operations
#[derive(Error, Debug)]
pub enum GuardError {
    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// File access or I/O error
    #[error("File error: {0}")]
    FileError(String),

    /// Document parsing error
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Structural violation or schema loading failure
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Cross-field rule or secret hygiene violation
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    /// A schema-valid document could not be turned into its typed aggregate
    #[error("Failed to materialize {contract}: {message}")]
    Materialize {
        contract: ContractKind,
        message: String,
    },

    /// Policy table error
    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GuardError {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        GuardError::InvalidInput(msg.into())
    }

    /// Create a file error
    pub fn file_error(msg: impl Into<String>) -> Self {
        GuardError::FileError(msg.into())
    }

    /// Create a parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        GuardError::ParseError(msg.into())
    }

    /// Check if this is a user-facing error (vs internal)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            GuardError::InvalidInput(_)
                | GuardError::FileError(_)
                | GuardError::ParseError(_)
                | GuardError::Config(_)
                | GuardError::Policy(_)
        )
    }

    /// True when the document itself was rejected (as opposed to the
    /// tooling failing to run)
    pub fn is_rejection(&self) -> bool {
        match self {
            GuardError::Invariant(_) | GuardError::Materialize { .. } => true,
            GuardError::Schema(err) => err.is_violation(),
            _ => false,
        }
    }
}

impl From<std::io::Error> for GuardError {
    fn from(err: std::io::Error) -> Self {
        GuardError::FileError(err.to_string())
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        GuardError::ParseError(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for GuardError {
    fn from(err: serde_yaml::Error) -> Self {
        GuardError::ParseError(format!("YAML error: {}", err))
    }
}

impl From<toml::de::Error> for GuardError {
    fn from(err: toml::de::Error) -> Self {
        GuardError::ParseError(format!("TOML error: {}", err))
    }
}

/// Result type alias for contract-guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(message: &str) -> Violation {
        Violation {
            rule: "test",
            path: "$".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_error_display() {
        let err = GuardError::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "Invalid input: test error");
    }

    #[test]
    fn test_is_user_error() {
        assert!(GuardError::InvalidInput("test".to_string()).is_user_error());
        assert!(GuardError::FileError("test".to_string()).is_user_error());
        assert!(!GuardError::Internal("test".to_string()).is_user_error());
    }

    #[test]
    fn test_invariant_violation_lists_every_problem() {
        let err = InvariantViolation::new(
            ContractKind::CostGovernor,
            vec![violation("first problem"), violation("second problem")],
        );
        let rendered = err.to_string();
        assert!(rendered.starts_with("CostGovernor invariant violation(s):"));
        assert!(rendered.contains("  • first problem"));
        assert!(rendered.contains("  • second problem"));
        assert!(err.mentions("second"));
        assert_eq!(err.messages().len(), 2);
    }

    #[test]
    fn test_invariant_is_rejection() {
        let err: GuardError =
            InvariantViolation::new(ContractKind::HealthStatus, vec![violation("x")]).into();
        assert!(err.is_rejection());
        assert!(!err.is_user_error());
    }
}
