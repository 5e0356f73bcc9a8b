//! Guard configuration
//!
//! Loaded from a TOML or YAML file (chosen by extension), then overridden
//! by `CONTRACT_GUARD_*` environment variables. Every field has a default,
//! so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GuardError, Result};
use crate::telemetry::LogFormat;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "CONTRACT_GUARD_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Directory of `<schema_id>.schema.json` files replacing the embedded schemas
    pub schema_dir: Option<PathBuf>,

    /// Policy table path; the embedded table is used when unset
    pub policy_path: Option<PathBuf>,

    /// Tier used by ceiling checks when none is given or inferred
    pub default_tier: Option<String>,

    /// Validate `meta.routing_decision` inside log events as a routing decision
    pub strict_embedded_routing: bool,

    pub enable_metrics: bool,

    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            schema_dir: None,
            policy_path: None,
            default_tier: None,
            strict_embedded_routing: false,
            enable_metrics: true,
            log_level: "warn".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl GuardConfig {
    /// Create a new config builder
    pub fn builder() -> GuardConfigBuilder {
        GuardConfigBuilder::new()
    }

    /// Parse a config file; `.toml`, `.yaml` and `.yml` are supported
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GuardError::file_error(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            other => Err(GuardError::Config(format!(
                "unsupported config format {:?} for {} (expected toml, yaml or yml)",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }

    /// Defaults overridden by the environment
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Optional file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply `CONTRACT_GUARD_*` overrides read through `lookup`.
    ///
    /// Unparseable boolean or format values leave the current setting alone.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(dir) = var("SCHEMA_DIR") {
            self.schema_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = var("POLICY_PATH") {
            self.policy_path = Some(PathBuf::from(path));
        }
        if let Some(tier) = var("DEFAULT_TIER") {
            self.default_tier = Some(tier);
        }
        if let Some(strict) = var("STRICT_EMBEDDED_ROUTING").and_then(|v| v.parse().ok()) {
            self.strict_embedded_routing = strict;
        }
        if let Some(enabled) = var("ENABLE_METRICS").and_then(|v| v.parse().ok()) {
            self.enable_metrics = enabled;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(format) = var("LOG_FORMAT").and_then(|v| v.parse().ok()) {
            self.log_format = format;
        }
        self
    }
}

/// Builder for GuardConfig
pub struct GuardConfigBuilder {
    config: GuardConfig,
}

impl GuardConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            config: GuardConfig::default(),
        }
    }

    pub fn schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.schema_dir = Some(dir.into());
        self
    }

    pub fn policy_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.policy_path = Some(path.into());
        self
    }

    pub fn default_tier(mut self, tier: impl Into<String>) -> Self {
        self.config.default_tier = Some(tier.into());
        self
    }

    pub fn strict_embedded_routing(mut self, strict: bool) -> Self {
        self.config.strict_embedded_routing = strict;
        self
    }

    pub fn enable_metrics(mut self, enabled: bool) -> Self {
        self.config.enable_metrics = enabled;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.log_level = level.into();
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.log_format = format;
        self
    }

    /// Build the configuration
    pub fn build(self) -> GuardConfig {
        self.config
    }
}

impl Default for GuardConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = GuardConfig::default();
        assert!(config.enable_metrics);
        assert!(!config.strict_embedded_routing);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.schema_dir.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = GuardConfig::builder()
            .schema_dir("/etc/contract-guard/schemas")
            .default_tier("tier3")
            .strict_embedded_routing(true)
            .enable_metrics(false)
            .log_format(LogFormat::Json)
            .build();

        assert_eq!(
            config.schema_dir.as_deref(),
            Some(Path::new("/etc/contract-guard/schemas"))
        );
        assert_eq!(config.default_tier.as_deref(), Some("tier3"));
        assert!(config.strict_embedded_routing);
        assert!(!config.enable_metrics);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<String, String> = [
            ("CONTRACT_GUARD_DEFAULT_TIER", "tier2"),
            ("CONTRACT_GUARD_STRICT_EMBEDDED_ROUTING", "true"),
            ("CONTRACT_GUARD_ENABLE_METRICS", "not-a-bool"),
            ("CONTRACT_GUARD_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = GuardConfig::default().with_env_overrides(|key| env.get(key).cloned());
        assert_eq!(config.default_tier.as_deref(), Some("tier2"));
        assert!(config.strict_embedded_routing);
        assert!(config.enable_metrics);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "default_tier = \"tier4\"\nlog_format = \"json\"").unwrap();

        let config = GuardConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_tier.as_deref(), Some("tier4"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.enable_metrics);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "strict_embedded_routing: true\nlog_level: debug").unwrap();

        let config = GuardConfig::from_file(file.path()).unwrap();
        assert!(config.strict_embedded_routing);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            GuardConfig::from_file(file.path()),
            Err(GuardError::Config(_))
        ));
    }
}
