// crates/fluid-gate-cli/src/main.rs
// ============================================================================
// Module: Fluid Gate CLI Entry Point
// Description: Command dispatcher for the FluidX3D MCP gateway.
// Purpose: Start the gateway and preview engine invocations offline.
// Dependencies: clap, fluid-gate-config, fluid-gate-mcp, serde_json, thiserror, tokio.
// ============================================================================

//! ## Overview
//! `fluid-gate serve` runs the MCP gateway over the transport selected in the
//! gateway config. `fluid-gate translate` validates a simulation config file
//! and prints the FluidX3D argument list it maps to, without launching the
//! engine. Config files are untrusted input and are read with a size limit.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use fluid_gate_config::FluidGateConfig;
use fluid_gate_contract::operation::SIMULATION_REQUIRED_FIELDS;
use fluid_gate_mcp::McpServer;
use fluid_gate_mcp::translate;
use fluid_gate_mcp::validation::validate_config_object;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum simulation config file size accepted by `translate`.
const MAX_SIMULATION_CONFIG_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "fluid-gate", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the FluidX3D MCP gateway.
    Serve(ServeCommand),
    /// Print the FluidX3D arguments for a simulation config file.
    Translate(TranslateCommand),
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to fluid-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration for the `translate` command.
#[derive(Args, Debug)]
struct TranslateCommand {
    /// Simulation config JSON file (the `config` object of a run request).
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// Emit the arguments as a JSON array instead of a command line.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self { message }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors raised by bounded file reads.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// I/O failure while reading.
    #[error("{0}")]
    Io(std::io::Error),
    /// File exceeds the allowed size.
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Allowed size in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and dispatches the selected command.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Translate(command) => {
            let mut stdout = std::io::stdout();
            command_translate(&command, &mut stdout)
        }
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Loads gateway config and serves until the transport closes.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = FluidGateConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let server = tokio::task::spawn_blocking(move || McpServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Validates a simulation config file and writes its engine arguments.
fn command_translate(command: &TranslateCommand, out: &mut impl Write) -> CliResult<ExitCode> {
    let line = translate_file(&command.input, command.json)?;
    writeln!(out, "{line}")
        .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Reads, validates, and translates one simulation config file.
fn translate_file(path: &Path, as_json: bool) -> CliResult<String> {
    let display = path.display();
    let bytes = read_bytes_with_limit(path, MAX_SIMULATION_CONFIG_BYTES)
        .map_err(|err| CliError::new(format!("failed to read {display}: {err}")))?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid JSON in {display}: {err}")))?;
    let Some(object) = value.as_object() else {
        return Err(CliError::new(format!("{display} must contain a JSON object")));
    };
    let config = validate_config_object(object, SIMULATION_REQUIRED_FIELDS)
        .map_err(|err| CliError::new(err.to_string()))?;
    let args = translate(&config);
    if as_json {
        serde_json::to_string(args.as_slice())
            .map_err(|err| CliError::new(format!("failed to encode arguments: {err}")))
    } else {
        Ok(args.joined())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads a file, refusing anything larger than `max_bytes`.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge { size, limit: max_bytes });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge { size, limit: max_bytes });
    }
    Ok(bytes)
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
