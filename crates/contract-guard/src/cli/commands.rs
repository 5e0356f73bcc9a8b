//! CLI command definitions for contract-guard

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use super::output::{CeilingOutput, DecisionOutput, LintOutput, OutputFormat, ValidationReport};
use super::ExitCode;
use crate::contracts::ContractKind;
use crate::decision::SpendRequest;
use crate::error::GuardError;
use crate::guard::ContractGuard;
use crate::policy::PolicyTable;
use crate::telemetry::LogFormat;

/// contract-guard CLI
///
/// Validate cost-governor, health, log-event and routing documents, evaluate
/// spend requests, and check caps against the tier policy.
#[derive(Parser, Debug)]
#[command(name = "contract-guard")]
#[command(about = "Runtime contract validation and cost-governance decisions", long_about = None)]
#[command(version)]
pub struct GuardCli {
    /// Guard configuration file (toml or yaml)
    #[arg(long, global = true, env = "CONTRACT_GUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log line format (pretty or json); overrides the configuration
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Output format for results
    #[arg(long, value_enum, global = true, default_value = "table")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: GuardCommands,
}

#[derive(Subcommand, Debug)]
pub enum GuardCommands {
    /// Validate a document against a contract schema and its invariants
    Validate {
        /// Contract to validate against (cost-governor, health, log-event, routing)
        #[arg(short, long)]
        contract: ContractKind,

        /// Document to validate (json, yaml or toml)
        #[arg(short, long)]
        file: PathBuf,

        /// Also validate `meta.routing_decision` inside log events
        #[arg(long)]
        strict_links: bool,
    },

    /// Evaluate one spend request against a cost-governor document
    Evaluate {
        /// Cost-governor document
        #[arg(short, long)]
        governor: PathBuf,

        /// Estimated cost of the request
        #[arg(long)]
        estimated_cost: f64,

        /// Spend so far today
        #[arg(long)]
        spent_today: f64,

        #[arg(long)]
        task_id: String,

        /// Treat the task as critical even if it is not allowlisted
        #[arg(long)]
        critical: bool,

        /// Current depth of the request queue
        #[arg(long)]
        queue_depth: Option<u64>,
    },

    /// Check configured caps against the tier policy table
    Ceiling {
        /// Document holding the caps, or a `cost_governor` block
        #[arg(short, long)]
        file: PathBuf,

        /// Tier to check against; inferred from the document or file name otherwise
        #[arg(long)]
        tier: Option<String>,

        /// Policy table replacing the configured one
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Lint a policy table for tier naming and monotonic caps
    PolicyLint {
        /// Policy table; the configured or embedded table otherwise
        #[arg(long)]
        policy: Option<PathBuf>,
    },
}

/// Spend request arguments as given on the command line
#[derive(Debug, Clone)]
pub struct EvaluateArgs {
    pub estimated_cost: f64,
    pub spent_today: f64,
    pub task_id: String,
    pub critical: bool,
    pub queue_depth: Option<u64>,
}

/// Execute the validate command
pub fn execute_validate(
    guard: &ContractGuard,
    contract: ContractKind,
    file: &Path,
    format: OutputFormat,
) -> Result<ExitCode, GuardError> {
    let doc = read_document(file)?;
    let report = match guard.validate(contract, &doc) {
        Ok(_) => ValidationReport::passed(contract, file),
        Err(err) if err.is_rejection() => ValidationReport::rejected(contract, file, &err),
        Err(err) => return Err(err),
    };
    report.render(format)?;
    Ok(ExitCode::from_outcome(report.valid))
}

/// Execute the evaluate command
pub fn execute_evaluate(
    guard: &ContractGuard,
    governor: &Path,
    args: &EvaluateArgs,
    format: OutputFormat,
) -> Result<ExitCode, GuardError> {
    if args.task_id.trim().is_empty() {
        return Err(GuardError::invalid_input("--task-id must not be empty"));
    }
    if !args.estimated_cost.is_finite() || args.estimated_cost < 0.0 {
        return Err(GuardError::invalid_input(
            "--estimated-cost must be a non-negative number",
        ));
    }
    if !args.spent_today.is_finite() || args.spent_today < 0.0 {
        return Err(GuardError::invalid_input(
            "--spent-today must be a non-negative number",
        ));
    }

    let doc = read_document(governor)?;
    let gov = match guard.validate(ContractKind::CostGovernor, &doc) {
        Ok(validated) => match validated.as_cost_governor() {
            Some(gov) => gov.clone(),
            None => return Err(GuardError::Internal("expected a cost governor".to_string())),
        },
        Err(err) if err.is_rejection() => {
            ValidationReport::rejected(ContractKind::CostGovernor, governor, &err).render(format)?;
            return Ok(ExitCode::ValidationError);
        }
        Err(err) => return Err(err),
    };

    let is_critical = args.critical || gov.is_allowlisted(&args.task_id);
    let mut request = SpendRequest::new(&args.task_id, args.estimated_cost, args.spent_today)
        .critical(is_critical);
    if let Some(depth) = args.queue_depth {
        request = request.with_queue_depth(depth);
    }

    let decision = guard.evaluate(&gov, &request);
    let output = DecisionOutput::new(&request, decision);
    output.render(format)?;
    Ok(ExitCode::from_outcome(!output.decision.is_invariant_violation()))
}

/// Execute the ceiling command
pub fn execute_ceiling(
    guard: &ContractGuard,
    file: &Path,
    tier: Option<&str>,
    format: OutputFormat,
) -> Result<ExitCode, GuardError> {
    let doc = read_document(file)?;
    let report = guard.ceiling(&doc, tier, Some(file))?;
    let output = CeilingOutput::new(file, report);
    output.render(format)?;
    Ok(ExitCode::from_outcome(output.report.passed()))
}

/// Execute the policy-lint command
pub fn execute_policy_lint(table: &PolicyTable, format: OutputFormat) -> Result<ExitCode, GuardError> {
    let output = LintOutput::new(table);
    output.render(format)?;
    Ok(ExitCode::from_outcome(output.lint.is_clean()))
}

/// Read and parse a document, choosing the parser by file extension
pub fn read_document(path: &Path) -> Result<serde_json::Value, GuardError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        GuardError::file_error(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_document(path, &content)
}

fn parse_document(path: &Path, content: &str) -> Result<serde_json::Value, GuardError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "json" => serde_json::from_str(content)
            .map_err(|e| GuardError::ParseError(format!("Invalid JSON: {}", e))),
        "yaml" | "yml" => serde_yaml::from_str(content)
            .map_err(|e| GuardError::ParseError(format!("Invalid YAML: {}", e))),
        "toml" => {
            let toml_value: toml::Value = toml::from_str(content)
                .map_err(|e| GuardError::ParseError(format!("Invalid TOML: {}", e)))?;
            serde_json::to_value(toml_value)
                .map_err(|e| GuardError::ParseError(format!("Conversion error: {}", e)))
        }
        _ => Err(GuardError::InvalidInput(format!(
            "Unsupported file format: {}. Supported formats: json, yaml, yml, toml",
            extension
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_json() {
        let value = parse_document(Path::new("gov.json"), r#"{"currency": "USD"}"#).unwrap();
        assert_eq!(value["currency"], "USD");
    }

    #[test]
    fn test_parse_document_yaml() {
        let value = parse_document(Path::new("gov.yaml"), "daily_soft_cap: 4\n").unwrap();
        assert_eq!(value["daily_soft_cap"], 4);
    }

    #[test]
    fn test_parse_document_toml() {
        let value = parse_document(Path::new("gov.toml"), "tier = \"tier2\"\n").unwrap();
        assert_eq!(value["tier"], "tier2");
    }

    #[test]
    fn test_parse_document_unsupported() {
        let err = parse_document(Path::new("gov.ini"), "").unwrap_err();
        assert!(matches!(err, GuardError::InvalidInput(_)));
    }

    #[test]
    fn test_cli_parses_validate() {
        let cli = GuardCli::try_parse_from([
            "contract-guard",
            "validate",
            "--contract",
            "log-event",
            "--file",
            "event.json",
            "--strict-links",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            GuardCommands::Validate {
                contract,
                strict_links,
                ..
            } => {
                assert_eq!(contract, ContractKind::LogEvent);
                assert!(strict_links);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_contract() {
        let parsed = GuardCli::try_parse_from([
            "contract-guard",
            "validate",
            "--contract",
            "invoice",
            "--file",
            "x.json",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_evaluate_rejects_blank_task() {
        let guard = ContractGuard::new().unwrap();
        let args = EvaluateArgs {
            estimated_cost: 1.0,
            spent_today: 0.0,
            task_id: "  ".to_string(),
            critical: false,
            queue_depth: None,
        };
        let err =
            execute_evaluate(&guard, Path::new("gov.json"), &args, OutputFormat::Json).unwrap_err();
        assert!(matches!(err, GuardError::InvalidInput(_)));
    }

    #[test]
    fn test_evaluate_rejects_non_finite_spend() {
        let guard = ContractGuard::new().unwrap();
        for spent_today in [f64::NAN, f64::INFINITY, -1e9] {
            let args = EvaluateArgs {
                estimated_cost: 5.0,
                spent_today,
                task_id: "job-1".to_string(),
                critical: false,
                queue_depth: None,
            };
            let err = execute_evaluate(&guard, Path::new("gov.json"), &args, OutputFormat::Json)
                .unwrap_err();
            assert!(matches!(err, GuardError::InvalidInput(_)), "{spent_today}");
        }
    }
}
