//! Output formatting for the contract-guard CLI
//!
//! Every command result renders as JSON, YAML, or a colored table.

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use crate::contracts::{ContractKind, Decision, DecisionAction};
use crate::decision::SpendRequest;
use crate::error::GuardError;
use crate::policy::{CeilingReport, PolicyLint, PolicyTable};

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

/// Serialize `value` for the machine formats, or hand stdout to `table`
fn emit<T, F>(value: &T, format: OutputFormat, table: F) -> Result<(), GuardError>
where
    T: Serialize,
    F: FnOnce(&mut io::Stdout),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| GuardError::SerializationError(e.to_string()))?;
            println!("{}", json);
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(value)
                .map_err(|e| GuardError::SerializationError(e.to_string()))?;
            println!("{}", yaml);
        }
        OutputFormat::Table => {
            let mut stdout = io::stdout();
            table(&mut stdout);
            stdout.flush().ok();
        }
    }
    Ok(())
}

fn header(stdout: &mut io::Stdout, title: &str) {
    writeln!(stdout).ok();
    writeln!(stdout, "{}", title.cyan().bold()).ok();
    writeln!(stdout, "{}", "=".repeat(60)).ok();
    writeln!(stdout).ok();
}

fn status_line(stdout: &mut io::Stdout, passed: bool, summary: &str) {
    let icon = if passed { "+".green() } else { "x".red() };
    writeln!(stdout, "{} {}", icon, summary).ok();
}

/// Result of validating one document
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub contract: String,
    pub file: String,
    pub valid: bool,
    pub summary: String,
    pub findings: Vec<FindingOutput>,
}

/// One violation as reported by the CLI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FindingOutput {
    /// `schema`, `rule`, `timestamp` or `secret`
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub path: String,
    pub message: String,
}

impl ValidationReport {
    pub fn passed(contract: ContractKind, file: &Path) -> Self {
        Self {
            contract: contract.label().to_string(),
            file: file.display().to_string(),
            valid: true,
            summary: format!("{} document is valid", contract),
            findings: Vec::new(),
        }
    }

    /// Report for a rejected document, one finding per violation
    pub fn rejected(contract: ContractKind, file: &Path, err: &GuardError) -> Self {
        let findings: Vec<FindingOutput> = match err {
            GuardError::Schema(schema) => schema
                .violations()
                .iter()
                .map(|v| FindingOutput {
                    kind: "schema".to_string(),
                    rule: None,
                    path: v.path.clone(),
                    message: v.message.clone(),
                })
                .collect(),
            GuardError::Invariant(invariant) => invariant
                .violations
                .iter()
                .map(|v| FindingOutput {
                    kind: v.kind().to_string(),
                    rule: Some(v.rule.to_string()),
                    path: v.path.clone(),
                    message: v.message.clone(),
                })
                .collect(),
            other => vec![FindingOutput {
                kind: "schema".to_string(),
                rule: None,
                path: "$".to_string(),
                message: other.to_string(),
            }],
        };

        Self {
            contract: contract.label().to_string(),
            file: file.display().to_string(),
            valid: false,
            summary: format!("{} document has {} violation(s)", contract, findings.len()),
            findings,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<(), GuardError> {
        emit(self, format, |stdout| self.render_table(stdout))
    }

    fn render_table(&self, stdout: &mut io::Stdout) {
        header(stdout, "Contract Validation");
        writeln!(stdout, "  {} {}", "File:".dimmed(), self.file).ok();
        writeln!(stdout, "  {} {}", "Contract:".dimmed(), self.contract).ok();
        writeln!(stdout).ok();
        status_line(stdout, self.valid, &self.summary);

        if self.findings.is_empty() {
            return;
        }
        writeln!(stdout).ok();
        writeln!(stdout, "{}", "Violations:".cyan().bold()).ok();
        writeln!(stdout, "{}", "-".repeat(60)).ok();
        for finding in &self.findings {
            let label = match finding.kind.as_str() {
                "secret" => "SECRET".red().bold(),
                "schema" => "SCHEMA".yellow().bold(),
                "timestamp" => "TIMESTAMP".magenta().bold(),
                _ => "RULE".blue().bold(),
            };
            writeln!(stdout).ok();
            writeln!(stdout, "{} {} {}", "x".red(), label, finding.message).ok();
            writeln!(stdout, "  {} {}", "Path:".dimmed(), finding.path.cyan()).ok();
            if let Some(rule) = &finding.rule {
                writeln!(stdout, "  {} {}", "Rule:".dimmed(), rule.dimmed()).ok();
            }
        }
    }
}

/// A spend request and the decision reached for it
#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutput {
    pub task_id: String,
    pub estimated_cost: f64,
    pub spent_today: f64,
    pub projected_spend: f64,
    pub is_critical: bool,
    pub queue_depth: u64,
    pub decision: Decision,
}

impl DecisionOutput {
    pub fn new(request: &SpendRequest<'_>, decision: Decision) -> Self {
        Self {
            task_id: request.task_id.to_string(),
            estimated_cost: request.estimated_cost,
            spent_today: request.spent_today,
            projected_spend: request.projected(),
            is_critical: request.is_critical,
            queue_depth: request.queue_depth,
            decision,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<(), GuardError> {
        emit(self, format, |stdout| self.render_table(stdout))
    }

    fn render_table(&self, stdout: &mut io::Stdout) {
        header(stdout, "Spend Decision");
        writeln!(stdout, "  {} {}", "Task:".dimmed(), self.task_id).ok();
        writeln!(
            stdout,
            "  {} {} + {} = {}",
            "Spend:".dimmed(),
            self.spent_today,
            self.estimated_cost,
            self.projected_spend
        )
        .ok();
        if self.is_critical {
            writeln!(stdout, "  {} yes", "Critical:".dimmed()).ok();
        }
        writeln!(stdout).ok();

        let action = match self.decision.action {
            DecisionAction::Allow => "ALLOW".green().bold(),
            DecisionAction::Degrade => "DEGRADE".yellow().bold(),
            DecisionAction::Queue => "QUEUE".blue().bold(),
            DecisionAction::Block => "BLOCK".red().bold(),
        };
        writeln!(stdout, "{} {}", action, self.decision.reason).ok();
        if let Some(model) = &self.decision.degraded_model {
            writeln!(stdout, "  {} {}", "Model:".dimmed(), model.cyan()).ok();
        }
        let flags: Vec<&str> = [
            (self.decision.deferred, "deferred"),
            (self.decision.log, "log"),
            (self.decision.notify, "notify"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect();
        if !flags.is_empty() {
            writeln!(stdout, "  {} {}", "Flags:".dimmed(), flags.join(", ")).ok();
        }
    }
}

/// Ceiling check result for one file
#[derive(Debug, Clone, Serialize)]
pub struct CeilingOutput {
    pub file: String,
    pub passed: bool,
    #[serde(flatten)]
    pub report: CeilingReport,
}

impl CeilingOutput {
    pub fn new(file: &Path, report: CeilingReport) -> Self {
        Self {
            file: file.display().to_string(),
            passed: report.passed(),
            report,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<(), GuardError> {
        emit(self, format, |stdout| self.render_table(stdout))
    }

    fn render_table(&self, stdout: &mut io::Stdout) {
        header(stdout, "Policy Ceilings");
        writeln!(stdout, "  {} {}", "File:".dimmed(), self.file).ok();
        writeln!(stdout, "  {} {}", "Tier:".dimmed(), self.report.tier).ok();
        writeln!(stdout, "  {} {}", "Policy:".dimmed(), self.report.policy_digest.dimmed()).ok();
        writeln!(stdout).ok();

        if self.passed {
            status_line(stdout, true, &format!("caps are within {}", self.report.tier));
            return;
        }
        status_line(
            stdout,
            false,
            &format!("{} cap(s) exceed policy", self.report.violations.len()),
        );
        for violation in &self.report.violations {
            writeln!(stdout, "  {} {}", "-".red(), violation).ok();
        }
    }
}

/// Lint result for a policy table
#[derive(Debug, Clone, Serialize)]
pub struct LintOutput {
    pub rules: usize,
    pub policy_digest: String,
    pub clean: bool,
    #[serde(flatten)]
    pub lint: PolicyLint,
}

impl LintOutput {
    pub fn new(table: &PolicyTable) -> Self {
        let lint = table.lint();
        Self {
            rules: table.rules().len(),
            policy_digest: table.digest().to_string(),
            clean: lint.is_clean(),
            lint,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<(), GuardError> {
        emit(self, format, |stdout| self.render_table(stdout))
    }

    fn render_table(&self, stdout: &mut io::Stdout) {
        header(stdout, "Policy Lint");
        writeln!(stdout, "  {} {}", "Rules:".dimmed(), self.rules).ok();
        writeln!(stdout, "  {} {}", "Digest:".dimmed(), self.policy_digest.dimmed()).ok();
        writeln!(stdout).ok();

        if self.clean {
            status_line(stdout, true, "policy table is clean");
            return;
        }
        status_line(stdout, false, "policy table has problems");
        for problem in self.lint.problems() {
            writeln!(stdout, "  {} {}", "!".yellow(), problem).ok();
        }
    }
}
