// crates/fluid-gate-mcp/src/engine.rs
// ============================================================================
// Module: Engine Invocation Boundary
// Description: Synchronous engine calls normalized into tagged outcomes.
// Purpose: Run the FluidX3D engine without letting its termination escape.
// Dependencies: fluid-gate-config, thiserror
// ============================================================================

//! ## Overview
//! [`SimulationEngine`] is the seam toward the external engine. Every run
//! returns an [`EngineOutcome`] instead of unwinding or exiting.
//! [`EngineBoundary`] wraps an engine, measures elapsed time with an injected
//! [`Clock`], and converts a panic raised inside an in-process engine into
//! [`EngineOutcome::Failed`].
//!
//! [`ProcessEngine`] runs the configured FluidX3D binary as a child process.
//! Closing the engine's graphics window ends that child, which surfaces here
//! as [`EngineOutcome::Terminated`] rather than ending the gateway.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::io::Read;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use fluid_gate_config::EngineConfig;
use thiserror::Error;

use crate::translate::InvocationArgs;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Interval between child status polls when a timeout is set.
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Upper bound for the version probe.
const VERSION_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
/// Maximum bytes read from the version probe.
const VERSION_PROBE_MAX_BYTES: usize = 4096;
/// How long to wait for an output pipe to close once the child is gone.
///
/// Descendants of the engine may inherit the pipe and hold it open long
/// after the child itself has exited or been killed.
const PIPE_DRAIN_GRACE: Duration = Duration::from_millis(250);

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Monotonic time source used to measure engine runs.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

// ============================================================================
// SECTION: Engine Contract
// ============================================================================

/// Outcome of one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutcome {
    /// Engine returned normally.
    Completed,
    /// Engine ended the process, typically because its window was closed.
    Terminated {
        /// Exit code when one was reported.
        code: Option<i32>,
    },
    /// Engine raised an error; the text is passed through verbatim.
    Failed(String),
    /// Run exceeded the configured limit and was stopped.
    TimedOut {
        /// Limit that was exceeded in milliseconds.
        limit_ms: u64,
    },
}

/// Engine errors raised outside a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Engine could not be loaded at all.
    #[error("{0}")]
    Unavailable(String),
    /// Engine was loaded but failed to answer.
    #[error("{0}")]
    Runtime(String),
}

/// External simulation engine.
pub trait SimulationEngine: Send + Sync {
    /// Returns engine version metadata.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the engine is unavailable or cannot report.
    fn version(&self) -> Result<String, EngineError>;

    /// Checks that the engine can be invoked.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] when it cannot.
    fn ensure_available(&self) -> Result<(), EngineError>;

    /// Runs one simulation and blocks until it ends.
    fn run(&self, args: &InvocationArgs) -> EngineOutcome;

    /// Returns a label identifying the engine binary, when there is one.
    fn binary_label(&self) -> Option<String> {
        None
    }
}

// ============================================================================
// SECTION: Boundary
// ============================================================================

/// Result of a run observed at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRun {
    /// Normalized outcome.
    pub outcome: EngineOutcome,
    /// Wall-clock time spent inside the engine.
    pub elapsed: Duration,
}

/// Boundary that every engine call passes through.
#[derive(Clone)]
pub struct EngineBoundary {
    /// Wrapped engine.
    engine: Arc<dyn SimulationEngine>,
    /// Time source for elapsed measurements.
    clock: Arc<dyn Clock>,
}

impl EngineBoundary {
    /// Creates a boundary around an engine.
    #[must_use]
    pub fn new(engine: Arc<dyn SimulationEngine>, clock: Arc<dyn Clock>) -> Self {
        Self { engine, clock }
    }

    /// Returns the wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &dyn SimulationEngine {
        self.engine.as_ref()
    }

    /// Runs the engine and normalizes whatever happens into an [`EngineRun`].
    #[must_use]
    pub fn invoke(&self, args: &InvocationArgs) -> EngineRun {
        let start = self.clock.now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.engine.run(args)))
            .unwrap_or_else(|payload| EngineOutcome::Failed(panic_message(payload.as_ref())));
        let elapsed = self.clock.now().saturating_duration_since(start);
        EngineRun { outcome, elapsed }
    }
}

/// Extracts a message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "engine panicked".to_string())
}

// ============================================================================
// SECTION: Process Engine
// ============================================================================

/// Engine that runs the FluidX3D binary as a child process.
///
/// Stdout of the child is discarded, since the stdio transport owns the
/// gateway's stdout. Stderr is captured up to a limit and becomes the
/// failure text of a non-zero exit.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    /// Engine binary path.
    binary: Option<PathBuf>,
    /// Working directory for runs.
    working_dir: Option<PathBuf>,
    /// Optional run limit.
    timeout_ms: Option<u64>,
    /// Arguments for the version probe.
    version_args: Vec<String>,
    /// Fixed version override.
    version: Option<String>,
    /// Stderr capture limit in bytes.
    max_stderr_bytes: usize,
}

impl ProcessEngine {
    /// Builds a process engine from config.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            binary: config.binary_path(),
            working_dir: config.working_dir_path(),
            timeout_ms: config.timeout_ms,
            version_args: config.version_args.clone(),
            version: config.version.clone(),
            max_stderr_bytes: config.max_stderr_bytes,
        }
    }

    /// Returns the binary path once it is known to be invocable.
    fn available_binary(&self) -> Result<&Path, EngineError> {
        let binary = self.binary.as_deref().ok_or_else(|| {
            EngineError::Unavailable(
                "FluidX3D engine not available. Set engine.binary in the gateway config."
                    .to_string(),
            )
        })?;
        if binary.is_file() {
            Ok(binary)
        } else {
            Err(EngineError::Unavailable(format!(
                "FluidX3D engine not available: binary not found at {}",
                binary.display()
            )))
        }
    }

    /// Builds a command rooted in the working directory.
    fn command(&self, binary: &Path) -> Command {
        let mut command = Command::new(binary);
        command.stdin(Stdio::null());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl SimulationEngine for ProcessEngine {
    fn version(&self) -> Result<String, EngineError> {
        if let Some(version) = &self.version {
            return Ok(version.clone());
        }
        let binary = self.available_binary()?;
        let mut child = self
            .command(binary)
            .args(&self.version_args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| EngineError::Runtime(format!("failed to launch version probe: {err}")))?;
        let capture =
            child.stdout.take().map(|pipe| PipeCapture::spawn(pipe, VERSION_PROBE_MAX_BYTES));
        let waited = wait_with_limit(&mut child, Some(VERSION_PROBE_TIMEOUT))
            .map_err(|err| EngineError::Runtime(format!("failed to wait for version probe: {err}")))?;
        let output = capture.map(PipeCapture::collect).unwrap_or_default();
        if waited.is_none() {
            return Err(EngineError::Runtime("version probe timed out".to_string()));
        }
        output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| EngineError::Runtime("engine reported no version".to_string()))
    }

    fn ensure_available(&self) -> Result<(), EngineError> {
        self.available_binary().map(|_| ())
    }

    fn run(&self, args: &InvocationArgs) -> EngineOutcome {
        let binary = match self.available_binary() {
            Ok(binary) => binary,
            Err(err) => return EngineOutcome::Failed(err.to_string()),
        };
        let spawned = self
            .command(binary)
            .args(args.as_slice())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(err) => return EngineOutcome::Failed(format!("failed to launch engine: {err}")),
        };
        let capture =
            child.stderr.take().map(|pipe| PipeCapture::spawn(pipe, self.max_stderr_bytes));
        let waited = wait_with_limit(&mut child, self.timeout_ms.map(Duration::from_millis));
        let stderr = capture.map(PipeCapture::collect).unwrap_or_default();
        match waited {
            Ok(Some(status)) => classify_exit(status, &stderr),
            Ok(None) => EngineOutcome::TimedOut { limit_ms: self.timeout_ms.unwrap_or_default() },
            Err(err) => EngineOutcome::Failed(format!("failed to wait for engine: {err}")),
        }
    }

    fn binary_label(&self) -> Option<String> {
        self.binary.as_ref().map(|path| path.display().to_string())
    }
}

/// Maps a child exit status and its stderr to an outcome.
fn classify_exit(status: ExitStatus, stderr: &str) -> EngineOutcome {
    if status.success() {
        return EngineOutcome::Completed;
    }
    let message = stderr.trim();
    match status.code() {
        Some(_) if !message.is_empty() => EngineOutcome::Failed(message.to_string()),
        code => EngineOutcome::Terminated { code },
    }
}

/// Waits for the child, killing it once `limit` elapses.
///
/// Returns `Ok(None)` when the child was killed for exceeding the limit.
fn wait_with_limit(
    child: &mut Child,
    limit: Option<Duration>,
) -> std::io::Result<Option<ExitStatus>> {
    let Some(limit) = limit else {
        return child.wait().map(Some);
    };
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Output pipe drained on a background thread.
struct PipeCapture {
    /// Bytes kept so far.
    kept: Arc<Mutex<Vec<u8>>>,
    /// Disconnects once the pipe reaches end of file.
    closed: Receiver<()>,
}

impl PipeCapture {
    /// Starts draining `pipe`, keeping at most `limit` bytes.
    fn spawn(pipe: impl Read + Send + 'static, limit: usize) -> Self {
        let kept = Arc::new(Mutex::new(Vec::new()));
        let (done, closed) = mpsc::channel::<()>();
        let sink = Arc::clone(&kept);
        thread::spawn(move || {
            read_capped(pipe, limit, &sink);
            drop(done);
        });
        Self { kept, closed }
    }

    /// Returns the captured bytes as lossy UTF-8.
    ///
    /// Waits at most [`PIPE_DRAIN_GRACE`] for the pipe to close; a pipe held
    /// open by a surviving descendant is left to its reader thread.
    fn collect(self) -> String {
        let _ = self.closed.recv_timeout(PIPE_DRAIN_GRACE);
        let kept = self.kept.lock().map(|kept| kept.clone()).unwrap_or_default();
        String::from_utf8_lossy(&kept).into_owned()
    }
}

/// Drains a pipe into `kept`, stopping at `limit` bytes but reading to EOF.
fn read_capped(mut pipe: impl Read, limit: usize, kept: &Mutex<Vec<u8>>) {
    let mut buf = [0u8; 8192];
    loop {
        match pipe.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(read) => {
                if let Ok(mut kept) = kept.lock() {
                    let room = limit.saturating_sub(kept.len());
                    kept.extend_from_slice(&buf[.. read.min(room)]);
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only engine assertions."
    )]

    use std::io::Cursor;
    use std::sync::Mutex;

    use fluid_gate_config::EngineConfig;

    use super::EngineError;
    use super::ProcessEngine;
    use super::SimulationEngine;
    use super::read_capped;

    #[test]
    fn read_capped_keeps_prefix_and_drains() {
        let data = vec![b'a'; 20_000];
        let kept = Mutex::new(Vec::new());
        read_capped(Cursor::new(data), 10, &kept);
        assert_eq!(kept.into_inner().unwrap(), b"aaaaaaaaaa");
    }

    #[test]
    fn unconfigured_binary_is_unavailable() {
        let engine = ProcessEngine::from_config(&EngineConfig::default());
        assert!(matches!(engine.ensure_available(), Err(EngineError::Unavailable(_))));
        assert!(matches!(engine.version(), Err(EngineError::Unavailable(_))));
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            binary: Some(dir.path().join("FluidX3D").to_string_lossy().into_owned()),
            ..EngineConfig::default()
        };
        let engine = ProcessEngine::from_config(&config);
        let err = engine.ensure_available().unwrap_err();
        assert!(err.to_string().contains("binary not found"));
    }

    #[test]
    fn version_override_skips_probe() {
        let config = EngineConfig { version: Some("v3.2".to_string()), ..EngineConfig::default() };
        let engine = ProcessEngine::from_config(&config);
        assert_eq!(engine.version().unwrap(), "v3.2");
    }
}
