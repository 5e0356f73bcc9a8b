//! Runtime invariant framework
//!
//! Schema validation covers structure; the rules here cover what a schema
//! cannot say: values derived from other values, cross-field ordering,
//! timestamp hygiene and the secret scan. Each contract module declares a
//! static table of [`Rule`]s and wraps it in an [`InvariantValidator`].
//!
//! Every rule runs, and every violation is collected, before anything is
//! reported.

pub mod cost_governor;
pub mod health;
pub mod logging;
pub mod routing;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contracts::ContractKind;
use crate::document::Structured;
use crate::error::{GuardError, InvariantViolation};
use crate::scanner;
use crate::timestamp;

/// Broad category of a violation, used for reporting and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Cross-field or derived-value rule
    Rule,
    /// RFC3339 timestamp problem
    Timestamp,
    /// Secret-like value or bare sensitive literal
    Secret,
    /// Structural violation inside an embedded document
    Schema,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Rule => write!(f, "rule"),
            ViolationKind::Timestamp => write!(f, "timestamp"),
            ViolationKind::Secret => write!(f, "secret"),
            ViolationKind::Schema => write!(f, "schema"),
        }
    }
}

/// A single broken invariant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Identifier of the rule that produced it
    pub rule: &'static str,
    /// JSONPath-style location, `$` for the whole document
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn kind(&self) -> ViolationKind {
        match self.rule {
            SECRET_SCAN_RULE => ViolationKind::Secret,
            EMBEDDED_SCHEMA_RULE => ViolationKind::Schema,
            rule if rule.contains("timestamp") => ViolationKind::Timestamp,
            _ => ViolationKind::Rule,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Rule identifier attached to secret scan findings
pub const SECRET_SCAN_RULE: &str = "secret_scan";

/// Rule identifier attached to schema violations of embedded documents
pub const EMBEDDED_SCHEMA_RULE: &str = "embedded_schema";

/// Collects violations for one document while rules run
#[derive(Debug, Default)]
pub struct ViolationReport {
    current_rule: &'static str,
    violations: Vec<Violation>,
}

impl ViolationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation against the rule currently running
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation {
            rule: self.current_rule,
            path: path.into(),
            message: message.into(),
        });
    }

    /// Check an RFC3339 timestamp field, recording a violation on failure
    pub fn check_timestamp(&mut self, path: &str, field: &str, value: &str) {
        if let Some(message) = timestamp::check_field(field, value) {
            self.push(path, message);
        }
    }

    /// Require a non-blank string field
    pub fn require_text(&mut self, path: &str, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(path, format!("{} must be a non-empty string", field));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}

/// A named cross-field check over one contract aggregate
pub struct Rule<D: ?Sized> {
    pub id: &'static str,
    pub description: &'static str,
    pub check: fn(&D, &mut ViolationReport),
}

/// Runs a contract's rule table followed by the secret scan.
pub struct InvariantValidator<D: ?Sized + 'static> {
    contract: ContractKind,
    rules: &'static [Rule<D>],
}

impl<D: ?Sized + 'static> InvariantValidator<D> {
    pub const fn new(contract: ContractKind, rules: &'static [Rule<D>]) -> Self {
        Self { contract, rules }
    }

    pub fn contract(&self) -> ContractKind {
        self.contract
    }

    pub fn rules(&self) -> &'static [Rule<D>] {
        self.rules
    }

    /// Run every rule against `doc` and scan `scan_root` for secrets.
    ///
    /// `scan_root` is normally `doc` itself; raw documents pass the parsed
    /// tree instead so that map keys the typed form drops are still seen.
    pub fn collect(&self, doc: &D, scan_root: &dyn Structured) -> Vec<Violation> {
        let mut report = ViolationReport::new();
        for rule in self.rules {
            report.current_rule = rule.id;
            (rule.check)(doc, &mut report);
        }

        report.current_rule = SECRET_SCAN_RULE;
        for finding in scanner::scan_document(scan_root) {
            let message = finding.to_string();
            report.push(finding.path, message);
        }
        report.into_violations()
    }

    /// Like [`collect`](Self::collect) but folds the result into a `Result`
    pub fn check(&self, doc: &D, scan_root: &dyn Structured) -> Result<(), InvariantViolation> {
        let violations = self.collect(doc, scan_root);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(InvariantViolation::new(self.contract, violations))
        }
    }
}

/// Turn a schema-valid raw document into its typed aggregate
pub fn materialize<T: DeserializeOwned>(
    contract: ContractKind,
    value: &Value,
) -> Result<T, GuardError> {
    T::deserialize(value).map_err(|err| GuardError::Materialize {
        contract,
        message: err.to_string(),
    })
}

/// Re-root a violation found in an embedded document under `prefix`
pub(crate) fn nest(mut violation: Violation, prefix: &str) -> Violation {
    violation.path = match violation.path.strip_prefix('$') {
        Some(rest) => format!("{}{}", prefix, rest),
        None => format!("{}.{}", prefix, violation.path),
    };
    violation.message = format!("{}: {}", prefix.trim_start_matches("$."), violation.message);
    violation
}
