//! CLI module for snipcheck
//!
//! This module provides the command-line interface for the harness.
//!
//! ## Commands
//!
//! - `verify [path]` - Extract, run and compare every snippet (pytest-style)
//! - `list [path]` - Show extracted snippets without running them
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `verify_interfaces` - Discovery and execution seams
//! - `verify_runner` - Orchestration and reporters
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod verify_interfaces;
pub mod verify_runner;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

use crate::version::SNIPCHECK_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Report rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ReportFormat {
    /// pytest-style console output
    #[default]
    Human,
    /// One JSON document
    Json,
}

/// Verify the code snippets in documentation against their documented output
#[derive(Parser, Debug)]
#[command(name = "snipcheck")]
#[command(version = SNIPCHECK_VERSION)]
#[command(about = "Verify the code snippets in documentation against their documented output", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract, compile, run and compare every snippet
    Verify {
        /// Document or directory of documents
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
        /// Stop on first failure
        #[arg(short = 'x', long = "exitfirst")]
        stop_on_fail: bool,
        /// Only verify snippets whose `file:line language` contains EXPR
        #[arg(short = 'k', value_name = "EXPR")]
        filter: Option<String>,
        /// Number of snippets to verify in parallel
        #[arg(short = 'j', long, value_name = "N")]
        jobs: Option<usize>,
        /// Report format
        #[arg(long, value_enum, default_value_t = ReportFormat::Human)]
        format: ReportFormat,
        /// Per-step timeout in seconds
        #[arg(long = "timeout", value_name = "SECS")]
        timeout_secs: Option<u64>,
        /// Config file (default: snipcheck.toml next to PATH, then in the working directory)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Fail error demonstrations the compiler accepts
        #[arg(long)]
        require_expected_errors: bool,
    },

    /// List extracted snippets without running them
    List {
        /// Document or directory of documents
        #[arg(value_name = "PATH", default_value = ".")]
        path: PathBuf,
        /// Listing format
        #[arg(long, value_enum, default_value_t = ReportFormat::Human)]
        format: ReportFormat,
        /// Config file (default: snipcheck.toml next to PATH, then in the working directory)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Verify {
            path,
            verbose,
            stop_on_fail,
            filter,
            jobs,
            format,
            timeout_secs,
            config,
            require_expected_errors,
        } => commands::verify(&commands::VerifyOptions {
            path,
            verbose,
            stop_on_fail,
            filter,
            jobs,
            format,
            timeout_secs,
            config,
            require_expected_errors,
        }),
        Command::List { path, format, config } => commands::list(&path, config.as_deref(), format),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_verify_defaults() {
        let cli = Cli::try_parse_from(["snipcheck", "verify"]).unwrap();
        if let Command::Verify {
            path,
            verbose,
            stop_on_fail,
            jobs,
            format,
            ..
        } = cli.command
        {
            assert_eq!(path, PathBuf::from("."));
            assert!(!verbose);
            assert!(!stop_on_fail);
            assert_eq!(jobs, None);
            assert_eq!(format, ReportFormat::Human);
        } else {
            panic!("Expected Verify command");
        }
    }

    #[test]
    fn test_cli_parse_verify_flags() {
        let cli = Cli::try_parse_from([
            "snipcheck",
            "verify",
            "docs/",
            "-v",
            "-x",
            "-k",
            "generics",
            "--jobs",
            "4",
            "--format",
            "json",
            "--timeout",
            "3",
            "--require-expected-errors",
        ])
        .unwrap();
        if let Command::Verify {
            path,
            verbose,
            stop_on_fail,
            filter,
            jobs,
            format,
            timeout_secs,
            require_expected_errors,
            ..
        } = cli.command
        {
            assert_eq!(path, PathBuf::from("docs/"));
            assert!(verbose);
            assert!(stop_on_fail);
            assert_eq!(filter.as_deref(), Some("generics"));
            assert_eq!(jobs, Some(4));
            assert_eq!(format, ReportFormat::Json);
            assert_eq!(timeout_secs, Some(3));
            assert!(require_expected_errors);
        } else {
            panic!("Expected Verify command");
        }
    }

    #[test]
    fn test_cli_parse_list() {
        let cli = Cli::try_parse_from(["snipcheck", "list", "guide.md", "--config", "ci.toml"]).unwrap();
        if let Command::List { path, config, format } = cli.command {
            assert_eq!(path, PathBuf::from("guide.md"));
            assert_eq!(config, Some(PathBuf::from("ci.toml")));
            assert_eq!(format, ReportFormat::Human);
        } else {
            panic!("Expected List command");
        }
    }

    #[test]
    fn test_cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["snipcheck", "verify", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["snipcheck"]).is_err());
    }
}
