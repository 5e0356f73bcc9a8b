//! CLI module for contract-guard
//!
//! Validates contract documents, evaluates spend requests against a cost
//! governor, and checks configured caps against the tier policy table.

pub mod commands;
pub mod output;

pub use commands::{GuardCli, GuardCommands};
pub use output::{OutputFormat, ValidationReport};

use crate::config::GuardConfig;
use crate::error::{GuardError, PolicyError};
use crate::guard::ContractGuard;
use crate::policy::PolicyTable;
use crate::schema::SchemaError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful execution, all checks passed
    Success = 0,
    /// The document was rejected or a check failed
    ValidationError = 1,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Schema could not be loaded or compiled
    SchemaError = 5,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Exit code for a passed/failed check
    pub fn from_outcome(passed: bool) -> Self {
        if passed {
            ExitCode::Success
        } else {
            ExitCode::ValidationError
        }
    }

    /// Exit code for an error that stopped a command
    pub fn from_error(err: &GuardError) -> Self {
        match err {
            _ if err.is_rejection() => ExitCode::ValidationError,
            GuardError::Schema(SchemaError::InvalidSchema { .. } | SchemaError::Load { .. }) => {
                ExitCode::SchemaError
            }
            GuardError::FileError(_) | GuardError::Policy(PolicyError::Read { .. }) => {
                ExitCode::FileError
            }
            _ if err.is_user_error() => ExitCode::InvalidInput,
            _ => ExitCode::InternalError,
        }
    }
}

/// Run a parsed command line against an already loaded configuration
pub fn run(cli: GuardCli, mut config: GuardConfig) -> Result<ExitCode, GuardError> {
    if let GuardCommands::Validate { strict_links: true, .. } = &cli.command {
        config.strict_embedded_routing = true;
    }
    let format = cli.format;

    match cli.command {
        GuardCommands::Validate { contract, file, .. } => {
            let guard = ContractGuard::from_config(&config)?;
            commands::execute_validate(&guard, contract, &file, format)
        }
        GuardCommands::Evaluate {
            governor,
            estimated_cost,
            spent_today,
            task_id,
            critical,
            queue_depth,
        } => {
            let guard = ContractGuard::from_config(&config)?;
            let request = commands::EvaluateArgs {
                estimated_cost,
                spent_today,
                task_id,
                critical,
                queue_depth,
            };
            commands::execute_evaluate(&guard, &governor, &request, format)
        }
        GuardCommands::Ceiling { file, tier, policy } => {
            let mut guard = ContractGuard::from_config(&config)?;
            if let Some(path) = policy {
                guard = guard.with_policy(PolicyTable::load(&path)?);
            }
            commands::execute_ceiling(&guard, &file, tier.as_deref(), format)
        }
        GuardCommands::PolicyLint { policy } => {
            let table = match policy.as_deref().or(config.policy_path.as_deref()) {
                Some(path) => PolicyTable::load(path)?,
                None => PolicyTable::embedded()?,
            };
            commands::execute_policy_lint(&table, format)
        }
    }
}
