//! contract-guard CLI
//!
//! # Usage
//!
//! ```bash
//! # Validate a log event, including its embedded routing decision
//! contract-guard validate --contract log-event --file event.json --strict-links
//!
//! # Decide what to do with one request
//! contract-guard evaluate --governor governor.yaml --estimated-cost 18 --spent-today 5 --task-id job-1
//!
//! # Check caps against the tier policy
//! contract-guard ceiling --file governor.yaml --tier tier2
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success - all checks passed
//! - 1: Document rejected or check failed
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 5: Schema could not be loaded
//! - 10: Internal error

use clap::Parser;
use contract_guard::{init_tracing, run_cli, ExitCode, GuardCli, GuardConfig};

fn main() {
    let cli = GuardCli::parse();

    let config = match GuardConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(ExitCode::from_error(&e).into());
        }
    };

    let log_format = cli.log_format.unwrap_or(config.log_format);
    if let Err(e) = init_tracing(&config.log_level, log_format) {
        eprintln!("Warning: {}", e);
    }

    let exit_code = run_cli(cli, config);
    std::process::exit(exit_code.into());
}
