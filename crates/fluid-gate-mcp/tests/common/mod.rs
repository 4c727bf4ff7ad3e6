// crates/fluid-gate-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared stub engine, manual clock, and request fixtures.
// Purpose: Drive the tool router deterministically without a real engine.
// Dependencies: fluid-gate-mcp, tempfile
// ============================================================================

//! ## Overview
//! [`RecordingEngine`] records every invocation and returns a scripted
//! outcome, advancing a [`ManualClock`] to simulate run time. [`Harness`]
//! wires both into a [`ToolRouter`] rooted in a temporary directory.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use fluid_gate_mcp::Clock;
use fluid_gate_mcp::EngineError;
use fluid_gate_mcp::EngineOutcome;
use fluid_gate_mcp::GatewayLogEvent;
use fluid_gate_mcp::GatewayLogSink;
use fluid_gate_mcp::InvocationArgs;
use fluid_gate_mcp::RequestContext;
use fluid_gate_mcp::ResponseEnvelope;
use fluid_gate_mcp::SimulationEngine;
use fluid_gate_mcp::TokenGate;
use fluid_gate_mcp::ToolRouter;
use fluid_gate_mcp::ToolRouterConfig;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Clock that only moves when told to.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { base: Instant::now(), offset: Mutex::new(Duration::ZERO) }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap();
        *offset += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Scripted behavior of one run.
#[derive(Clone)]
pub enum Script {
    /// Return this outcome.
    Outcome(EngineOutcome),
    /// Panic with this message.
    Panic(&'static str),
}

/// Stub engine that records invocations.
pub struct RecordingEngine {
    clock: Arc<ManualClock>,
    script: Script,
    run_time: Duration,
    available: bool,
    calls: Mutex<Vec<Vec<String>>>,
}

impl RecordingEngine {
    pub fn new(clock: Arc<ManualClock>, script: Script, run_time: Duration) -> Self {
        Self { clock, script, run_time, available: true, calls: Mutex::new(Vec::new()) }
    }

    pub fn unavailable(clock: Arc<ManualClock>) -> Self {
        Self {
            available: false,
            ..Self::new(clock, Script::Outcome(EngineOutcome::Completed), Duration::ZERO)
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl SimulationEngine for RecordingEngine {
    fn version(&self) -> Result<String, EngineError> {
        self.ensure_available()?;
        Ok("FluidX3D stub 1.0".to_string())
    }

    fn ensure_available(&self) -> Result<(), EngineError> {
        if self.available {
            Ok(())
        } else {
            Err(EngineError::Unavailable("FluidX3D engine not available".to_string()))
        }
    }

    fn run(&self, args: &InvocationArgs) -> EngineOutcome {
        self.calls.lock().unwrap().push(args.as_slice().to_vec());
        self.clock.advance(self.run_time);
        match &self.script {
            Script::Outcome(outcome) => outcome.clone(),
            Script::Panic(message) => panic!("{message}"),
        }
    }

    fn binary_label(&self) -> Option<String> {
        Some("stub://fluidx3d".to_string())
    }
}

// ============================================================================
// SECTION: Log Sink
// ============================================================================

/// Sink that keeps events in memory.
#[derive(Default)]
pub struct RecordingLogSink {
    events: Mutex<Vec<GatewayLogEvent>>,
}

impl RecordingLogSink {
    pub fn events(&self) -> Vec<GatewayLogEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl GatewayLogSink for RecordingLogSink {
    fn record(&self, event: &GatewayLogEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Router wired to a stub engine inside a temporary working directory.
pub struct Harness {
    pub router: ToolRouter,
    pub engine: Arc<RecordingEngine>,
    pub log: Arc<RecordingLogSink>,
    pub token: String,
    pub dir: TempDir,
}

impl Harness {
    /// Dispatches a raw request.
    pub fn call(&self, request: &Value) -> ResponseEnvelope {
        self.router.dispatch(&RequestContext::stdio().with_request_id("1"), request)
    }

    /// Writes a mesh file into the working directory and returns its path.
    pub fn mesh(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, b"solid mesh\nendsolid mesh\n").unwrap();
        path
    }

    /// Number of engine runs so far.
    pub fn engine_calls(&self) -> usize {
        self.engine.calls().len()
    }
}

/// Builds a harness whose engine returns `script` after `run_time`.
pub fn harness(script: Script, run_time: Duration) -> Harness {
    let clock = Arc::new(ManualClock::new());
    let engine = Arc::new(RecordingEngine::new(Arc::clone(&clock), script, run_time));
    harness_with(clock, engine)
}

/// Builds a harness around an existing engine.
pub fn harness_with(clock: Arc<ManualClock>, engine: Arc<RecordingEngine>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let gate = TokenGate::from_installation_id(&dir.path().to_string_lossy());
    let token = gate.token().to_string();
    let log = Arc::new(RecordingLogSink::default());
    let router = ToolRouter::new(ToolRouterConfig {
        gate: Arc::new(gate),
        engine: Arc::clone(&engine) as Arc<dyn SimulationEngine>,
        clock,
        log: Arc::clone(&log) as Arc<dyn GatewayLogSink>,
        working_dir: Some(dir.path().to_path_buf()),
    });
    Harness { router, engine, log, token, dir }
}

/// Harness whose engine completes immediately.
pub fn completing_harness() -> Harness {
    harness(Script::Outcome(EngineOutcome::Completed), Duration::from_millis(1500))
}

// ============================================================================
// SECTION: Request Fixtures
// ============================================================================

/// Simulation config used throughout the scenarios.
pub fn simulation_config(stl_file: &str) -> Value {
    json!({
        "stl_file": stl_file,
        "velocity_set": "D3Q27",
        "resolution": 15400,
        "velocity": 7.0,
        "reynolds": 535_000_000,
        "simulation_time": 5.0,
        "collision_operator": "SRT",
    })
}

/// Builds a request with an optional token.
pub fn request(operation: &str, config: Option<Value>, token: Option<&str>) -> Value {
    let mut request = json!({ "operation": operation });
    if let Some(config) = config {
        request["config"] = config;
    }
    if let Some(token) = token {
        request["tool_unlock_token"] = Value::String(token.to_string());
    }
    request
}
