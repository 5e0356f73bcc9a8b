//! Secret hygiene scan
//!
//! Walks any [`Structured`] tree and reports values or keys that look like
//! provider keys, plus sensitive fields holding literals instead of
//! `${ENV_VAR}` references. Findings carry the JSONPath-style location
//! only; the offending value is never copied into a message.

use std::fmt;

use crate::document::{Node, Structured};

/// Substring that marks provider secret keys
pub const KEY_PREFIX: &str = "sk-";

/// Field names that must only ever hold `${...}` references
pub const SENSITIVE_FIELDS: [&str; 3] = ["apiKey", "api_key", "API_KEY"];

const ENV_REFERENCE_PREFIX: &str = "${";

/// What kind of leak was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretKind {
    /// A string value contains the key prefix
    PrefixInValue,
    /// A map key contains the key prefix
    PrefixInKey,
    /// A string value mentions an api key literal
    BareApiKey,
    /// A sensitive field holds something other than an env reference
    SensitiveLiteral { field: String },
}

/// One secret-like occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFinding {
    pub path: String,
    pub kind: SecretKind,
}

impl fmt::Display for SecretFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SecretKind::PrefixInValue => {
                write!(f, "secret-like '{}' pattern found at {}", KEY_PREFIX, self.path)
            }
            SecretKind::PrefixInKey => write!(
                f,
                "secret-like '{}' pattern found in key at {}",
                KEY_PREFIX, self.path
            ),
            SecretKind::BareApiKey => write!(f, "bare apiKey literal found at {}", self.path),
            SecretKind::SensitiveLiteral { field } => write!(
                f,
                "literal {} detected at {}; use ${{ENV_VAR}}",
                field, self.path
            ),
        }
    }
}

/// Scan a whole document rooted at `$`
pub fn scan_document(root: &dyn Structured) -> Vec<SecretFinding> {
    scan(root, "$")
}

/// Scan `node`, reporting paths relative to `path`
pub fn scan(node: &dyn Structured, path: &str) -> Vec<SecretFinding> {
    let mut findings = Vec::new();
    walk(node, path, &mut findings);
    findings
}

fn walk(node: &dyn Structured, path: &str, findings: &mut Vec<SecretFinding>) {
    match node.node() {
        Node::Text(text) => {
            let lowered = text.to_ascii_lowercase();
            if lowered.contains(KEY_PREFIX) {
                findings.push(SecretFinding {
                    path: path.to_string(),
                    kind: SecretKind::PrefixInValue,
                });
            }
            if lowered.contains("apikey") && !text.starts_with(ENV_REFERENCE_PREFIX) {
                findings.push(SecretFinding {
                    path: path.to_string(),
                    kind: SecretKind::BareApiKey,
                });
            }
        }
        Node::Sequence(items) => {
            for (index, item) in items.into_iter().enumerate() {
                walk(item, &format!("{}[{}]", path, index), findings);
            }
        }
        Node::Mapping(fields) => {
            for (key, value) in fields {
                let child = format!("{}.{}", path, key);
                if key.to_ascii_lowercase().contains(KEY_PREFIX) {
                    findings.push(SecretFinding {
                        path: child.clone(),
                        kind: SecretKind::PrefixInKey,
                    });
                }
                let name: &str = &key;
                if SENSITIVE_FIELDS.contains(&name) && !is_env_reference(value) {
                    findings.push(SecretFinding {
                        path: child.clone(),
                        kind: SecretKind::SensitiveLiteral {
                            field: key.to_string(),
                        },
                    });
                }
                walk(value, &child, findings);
            }
        }
        Node::Null | Node::Scalar => {}
    }
}

fn is_env_reference(value: &dyn Structured) -> bool {
    value
        .node()
        .as_text()
        .map(|text| text.starts_with(ENV_REFERENCE_PREFIX))
        .unwrap_or(false)
}
