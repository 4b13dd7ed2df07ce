// crates/sangati-cli/src/main.rs
// ============================================================================
// Module: Sangati CLI Entry Point
// Description: Command dispatcher for running and validating assertion suites.
// Purpose: Load a suite config, evaluate it against live databases, and report.
// Dependencies: clap, sangati-config, sangati-core, sangati-store-postgres, sangati-store-sqlite
// ============================================================================

//! ## Overview
//! `sangati run` loads a suite, builds one resolver over every configured
//! database, evaluates the tests, and prints per-test lines followed by the
//! totals. `sangati validate` checks a suite without connecting anywhere.
//!
//! Exit codes: `0` when every test passed, `1` when any test failed or
//! errored, `2` when the configuration or environment is unusable.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;
pub(crate) mod output;
pub(crate) mod sources;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::ArgAction;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use sangati_config::SangatiConfig;
use sangati_core::NoopObserver;
use sangati_core::RunnerConfig;
use sangati_core::TestRunner;
use sangati_core::TestSpec;
use sangati_core::runtime::MAX_WORKERS;
use sangati_core::runtime::resolve_operator;
use sangati_store_postgres::CredentialSource;
use thiserror::Error;

use crate::output::OutputFormat;
use crate::output::TextObserver;
use crate::output::render_json;
use crate::sources::SourceRegistry;

// ============================================================================
// SECTION: Exit Codes
// ============================================================================

/// Every test passed.
const EXIT_PASSED: u8 = 0;
/// At least one test failed or errored.
const EXIT_FAILED: u8 = 1;
/// The config or environment is unusable.
const EXIT_ENVIRONMENT: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "sangati", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every test in the suite and report the outcomes.
    Run(RunCommand),
    /// Check the suite configuration without connecting to any database.
    Validate(ValidateCommand),
}

/// Arguments for `sangati run`.
#[derive(clap::Args, Debug)]
struct RunCommand {
    /// Config file path (defaults to `SANGATI_CONFIG` or `sangati.toml`).
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Number of tests evaluated concurrently.
    #[arg(long, value_name = "N")]
    jobs: Option<usize>,
    /// Per-query timeout in milliseconds.
    #[arg(long = "timeout-ms", value_name = "N")]
    timeout_ms: Option<u64>,
    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Arguments for `sangati validate`.
#[derive(clap::Args, Debug)]
struct ValidateCommand {
    /// Config file path (defaults to `SANGATI_CONFIG` or `sangati.toml`).
    #[arg(short = 'c', long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failure reported on stderr with the environment exit code.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<u8> {
    let cli = Cli::parse();
    if cli.show_version {
        let mut stdout = std::io::stdout();
        write_line(&mut stdout, "stdout", &format!("sangati {}", env!("CARGO_PKG_VERSION")))?;
        return Ok(EXIT_PASSED);
    }
    match cli.command {
        None => {
            show_help()?;
            Ok(EXIT_PASSED)
        }
        Some(Commands::Run(command)) => {
            let mut stdout = std::io::stdout();
            command_run(&command, &CredentialSource::from_env(), &mut stdout)
        }
        Some(Commands::Validate(command)) => {
            let mut stdout = std::io::stdout();
            command_validate(&command, &mut stdout)
        }
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    let mut stdout = std::io::stdout();
    write_line(&mut stdout, "stdout", "")
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes `sangati run`, writing the report to `out`.
fn command_run<W: Write + Send>(
    command: &RunCommand,
    credentials: &CredentialSource,
    out: &mut W,
) -> CliResult<u8> {
    let config = load_config(command.config.as_deref())?;
    let runner_config = apply_overrides(config.runner_config(), command)?;
    let registry = SourceRegistry::from_config(&config, credentials)
        .map_err(|err| CliError::new(format!("failed to prepare data sources: {err}")))?;
    let runner = TestRunner::new(runner_config);

    let report = match command.format {
        OutputFormat::Text => {
            let observer = TextObserver::new(&mut *out);
            let report = runner.run(&config.tests, &registry, &observer);
            observer.finish().map_err(|err| CliError::new(output_error("stdout", &err)))?;
            report
        }
        OutputFormat::Json => {
            let report = runner.run(&config.tests, &registry, &NoopObserver);
            let rendered = render_json(&report)
                .map_err(|err| CliError::new(format!("failed to render report: {err}")))?;
            write_line(out, "stdout", &rendered)?;
            report
        }
    };

    Ok(if report.all_passed() { EXIT_PASSED } else { EXIT_FAILED })
}

/// Applies command-line overrides on top of the configured runner settings.
fn apply_overrides(mut runner: RunnerConfig, command: &RunCommand) -> CliResult<RunnerConfig> {
    if let Some(jobs) = command.jobs {
        if !(1 ..= MAX_WORKERS).contains(&jobs) {
            return Err(CliError::new(format!("--jobs must be between 1 and {MAX_WORKERS}")));
        }
        runner.max_workers = jobs;
    }
    if let Some(timeout_ms) = command.timeout_ms {
        if timeout_ms == 0 {
            return Err(CliError::new("--timeout-ms must be greater than zero".to_string()));
        }
        runner.query_timeout = Some(Duration::from_millis(timeout_ms));
    }
    Ok(runner)
}

// ============================================================================
// SECTION: Validate Command
// ============================================================================

/// Executes `sangati validate`, writing one line per test to `out`.
fn command_validate<W: Write>(command: &ValidateCommand, out: &mut W) -> CliResult<u8> {
    let config = load_config(command.config.as_deref())?;
    let mut invalid = 0_usize;
    for spec in &config.tests {
        let line = match check_spec(&config, spec) {
            Ok(()) => format!("Test '{}' OK", spec.name),
            Err(reason) => {
                invalid += 1;
                format!("Test '{}' INVALID: {reason}", spec.name)
            }
        };
        write_line(out, "stdout", &line)?;
    }
    let valid = config.tests.len() - invalid;
    write_line(out, "stdout", &format!("Total VALID: {valid}, Total INVALID: {invalid}"))?;
    Ok(if invalid == 0 { EXIT_PASSED } else { EXIT_FAILED })
}

/// Checks one test without touching any database.
fn check_spec(config: &SangatiConfig, spec: &TestSpec) -> Result<(), String> {
    spec.validate().map_err(|err| err.to_string())?;
    if spec.queries.len() == 1 {
        resolve_operator(&spec.operator).map_err(|err| err.to_string())?;
    }
    for (position, query) in spec.queries.iter().enumerate() {
        if config.database(query.db_index).is_none() {
            return Err(format!(
                "query {position} references unconfigured database index {}",
                query.db_index
            ));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates the suite config.
fn load_config(path: Option<&Path>) -> CliResult<SangatiConfig> {
    SangatiConfig::load(path).map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Writes one line to `out`, mapping I/O failures to CLI errors.
fn write_line<W: Write>(out: &mut W, stream: &str, message: &str) -> CliResult<()> {
    writeln!(out, "{message}").map_err(|err| CliError::new(output_error(stream, &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns the environment exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::from(EXIT_ENVIRONMENT)
}
