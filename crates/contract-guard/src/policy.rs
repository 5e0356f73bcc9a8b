//! Tier ceilings for cost-governor caps
//!
//! The policy table is a small rule list, one rule per line:
//!
//! ```text
//! p, tier3, usd_daily_hard_cap, 150, allow
//! ```
//!
//! A configured cap passes when an `allow` rule for its tier and resource
//! has a limit at or above it and no `deny` rule for the same pair does.
//! Null caps always pass. Anything not explicitly allowed is denied.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::contracts::CostGovernor;
use crate::error::PolicyError;

const EMBEDDED_POLICY: &str = include_str!("../policy/policy.csv");

/// Resource names a policy table may use
pub const CANONICAL_RESOURCES: [&str; 5] = [
    "usd_daily_soft_cap",
    "usd_daily_hard_cap",
    "usd_per_request_cap",
    "usd_daily_hard_cap_null_ok",
    "usd_per_request_cap_null_ok",
];

const NULL_OK_SUFFIX: &str = "_null_ok";

// Both patterns are literals; a compile failure is a programming error.
fn tier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^tier[1-5]$").expect("tier pattern is a valid regex"))
}

fn tier_token() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"tier([1-5])").expect("tier token is a valid regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

/// One `p` line of the table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyRule {
    pub line: usize,
    pub tier: String,
    pub resource: String,
    /// `None` when the limit column is not numeric
    pub limit: Option<f64>,
    pub effect: Effect,
}

impl PolicyRule {
    fn covers(&self, tier: &str, resource: &str, value: f64) -> bool {
        self.tier == tier && self.resource == resource && self.limit.is_some_and(|limit| value <= limit)
    }
}

/// Decides whether a numeric cap is within a tier's ceiling
pub trait CeilingEnforcer {
    fn enforce(&self, tier: &str, category: &str, action: &str, value: Option<f64>) -> bool;
}

/// Parsed policy table
#[derive(Debug, Clone)]
pub struct PolicyTable {
    rules: Vec<PolicyRule>,
    digest: String,
}

impl PolicyTable {
    /// Parse table source; comment (`#`) and blank lines are skipped
    pub fn parse(source: &str) -> Result<Self, PolicyError> {
        let mut rules = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            if fields.len() < 5 {
                return Err(PolicyError::Malformed {
                    line,
                    message: format!("expected 5 fields, found {}", fields.len()),
                });
            }
            if fields[0] != "p" {
                continue;
            }

            let effect = match fields[4] {
                "allow" => Effect::Allow,
                "deny" => Effect::Deny,
                other => {
                    return Err(PolicyError::Malformed {
                        line,
                        message: format!("effect must be 'allow' or 'deny', got '{}'", other),
                    })
                }
            };

            rules.push(PolicyRule {
                line,
                tier: fields[1].to_string(),
                resource: fields[2].to_string(),
                limit: fields[3].parse().ok(),
                effect,
            });
        }

        Ok(Self {
            rules,
            digest: hex::encode(Sha256::digest(source.as_bytes())),
        })
    }

    /// The table shipped with the crate
    pub fn embedded() -> Result<Self, PolicyError> {
        Self::parse(EMBEDDED_POLICY)
    }

    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let source = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn rules(&self) -> &[PolicyRule] {
        &self.rules
    }

    /// SHA-256 of the table source, lowercase hex
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Naming and monotonicity problems in the table
    pub fn lint(&self) -> PolicyLint {
        PolicyLint {
            naming: self.naming_violations(),
            monotonic: self.monotonic_violations(),
        }
    }

    fn allow_rules(&self) -> impl Iterator<Item = &PolicyRule> {
        self.rules.iter().filter(|rule| rule.effect == Effect::Allow)
    }

    fn naming_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for rule in self.allow_rules() {
            if !tier_pattern().is_match(&rule.tier) {
                problems.push(format!(
                    "non-canonical tier '{}' on line {}",
                    rule.tier, rule.line
                ));
            }
            if !CANONICAL_RESOURCES.contains(&rule.resource.as_str()) {
                problems.push(format!(
                    "unknown resource '{}' on line {}",
                    rule.resource, rule.line
                ));
            }
        }
        problems
    }

    fn monotonic_violations(&self) -> Vec<String> {
        let mut caps: BTreeMap<&str, BTreeMap<u32, f64>> = BTreeMap::new();
        for rule in self.allow_rules() {
            if rule.resource.ends_with(NULL_OK_SUFFIX) {
                continue;
            }
            let tier = rule.tier.strip_prefix("tier").and_then(|n| n.parse::<u32>().ok());
            if let (Some(tier), Some(limit)) = (tier, rule.limit) {
                caps.entry(rule.resource.as_str()).or_default().insert(tier, limit);
            }
        }

        let mut problems = Vec::new();
        for (resource, by_tier) in caps {
            let mut previous: Option<(u32, f64)> = None;
            for (tier, limit) in by_tier {
                if let Some((last_tier, last_limit)) = previous {
                    if limit < last_limit {
                        problems.push(format!(
                            "policy not monotonic for {}: tier{}={} < tier{}={}",
                            resource, tier, limit, last_tier, last_limit
                        ));
                    }
                }
                previous = Some((tier, limit));
            }
        }
        problems
    }
}

impl CeilingEnforcer for PolicyTable {
    fn enforce(&self, tier: &str, category: &str, action: &str, value: Option<f64>) -> bool {
        let Some(value) = value else {
            return true;
        };
        let resource = format!("usd_{}_{}", category, action);
        let mut allowed = false;
        for rule in self.rules.iter().filter(|rule| rule.covers(tier, &resource, value)) {
            match rule.effect {
                Effect::Deny => return false,
                Effect::Allow => allowed = true,
            }
        }
        allowed
    }
}

/// Result of [`PolicyTable::lint`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PolicyLint {
    pub naming: Vec<String>,
    pub monotonic: Vec<String>,
}

impl PolicyLint {
    pub fn is_clean(&self) -> bool {
        self.naming.is_empty() && self.monotonic.is_empty()
    }

    pub fn problems(&self) -> impl Iterator<Item = &String> {
        self.naming.iter().chain(self.monotonic.iter())
    }
}

/// The three caps a ceiling check looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConfiguredCaps {
    pub daily_soft_cap: Option<f64>,
    pub daily_hard_cap: Option<f64>,
    pub per_request_cap: Option<f64>,
}

impl From<&CostGovernor> for ConfiguredCaps {
    fn from(gov: &CostGovernor) -> Self {
        Self {
            daily_soft_cap: Some(gov.daily_soft_cap),
            daily_hard_cap: gov.daily_hard_cap,
            per_request_cap: gov.per_request_cap,
        }
    }
}

impl ConfiguredCaps {
    /// Read caps from a raw document, descending into a `cost_governor`
    /// block when there is one
    pub fn from_value(doc: &Value) -> Self {
        let block = doc
            .get("cost_governor")
            .filter(|block| block.is_object())
            .unwrap_or(doc);
        let cap = |name: &str| block.get(name).and_then(Value::as_f64);
        Self {
            daily_soft_cap: cap("daily_soft_cap"),
            daily_hard_cap: cap("daily_hard_cap"),
            per_request_cap: cap("per_request_cap"),
        }
    }
}

/// Check each configured cap against `tier`, one message per offending field
pub fn check_ceilings(
    enforcer: &dyn CeilingEnforcer,
    caps: &ConfiguredCaps,
    tier: &str,
) -> Vec<String> {
    let checks = [
        ("daily_soft_cap", "daily", "soft_cap", caps.daily_soft_cap),
        ("daily_hard_cap", "daily", "hard_cap", caps.daily_hard_cap),
        ("per_request_cap", "per_request", "cap", caps.per_request_cap),
    ];
    checks
        .into_iter()
        .filter(|(_, category, action, value)| !enforcer.enforce(tier, category, action, *value))
        .map(|(field, _, _, value)| {
            let shown = value.map(|v| v.to_string()).unwrap_or_else(|| "null".to_string());
            format!("{} {} exceeds policy for {}", field, shown, tier)
        })
        .collect()
}

/// Pick the tier for a ceiling check: the explicit one, else the
/// document's `tier` key, else a `tier1`..`tier5` token in the file path
pub fn infer_tier(explicit: Option<&str>, doc: &Value, path: Option<&Path>) -> Option<String> {
    if let Some(tier) = explicit {
        return Some(tier.to_string());
    }
    let declared = doc
        .get("tier")
        .or_else(|| doc.get("cost_governor").and_then(|block| block.get("tier")))
        .and_then(Value::as_str);
    if let Some(tier) = declared {
        return Some(tier.to_string());
    }
    let path = path?;
    let from_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| tier_token().captures(name));
    if let Some(captures) = from_name {
        return Some(format!("tier{}", &captures[1]));
    }
    path.components()
        .filter_map(|part| part.as_os_str().to_str())
        .find_map(|part| tier_token().captures(part).map(|c| format!("tier{}", &c[1])))
}

/// Outcome of a ceiling check on one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CeilingReport {
    pub tier: String,
    pub policy_digest: String,
    pub caps: ConfiguredCaps,
    pub violations: Vec<String>,
}

impl CeilingReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Infer the tier for `doc` and check its caps against `table`
pub fn check_document(
    table: &PolicyTable,
    doc: &Value,
    explicit_tier: Option<&str>,
    path: Option<&Path>,
) -> Result<CeilingReport, PolicyError> {
    let tier = infer_tier(explicit_tier, doc, path).ok_or_else(|| {
        PolicyError::UnknownTier(match path {
            Some(path) => format!("no tier given, declared or named in '{}'", path.display()),
            None => "no tier given or declared in the document".to_string(),
        })
    })?;
    let caps = ConfiguredCaps::from_value(doc);
    let violations = check_ceilings(table, &caps, &tier);
    Ok(CeilingReport {
        tier,
        policy_digest: table.digest().to_string(),
        caps,
        violations,
    })
}
