// crates/fluid-gate-mcp/src/tools.rs
// ============================================================================
// Module: Tool Router
// Description: Operation dispatch for the `fluidx3d` MCP tool.
// Purpose: Gate, validate, route, and normalize every tool call.
// Dependencies: fluid-gate-contract, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The [`ToolRouter`] owns the pipeline behind the single `fluidx3d` tool:
//! unwrap the request, check the unlock token unless the operation is
//! `readme`, validate against the schema registry, then route to one
//! operation handler. Every outcome, including failures, is returned as a
//! [`ResponseEnvelope`]; only an unknown tool name is a protocol error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use fluid_gate_contract::OperationName;
use fluid_gate_contract::TOOL_NAME;
use fluid_gate_contract::ToolDefinition;
use fluid_gate_contract::docs::readme_text;
use fluid_gate_contract::docs::tool_definition;
use fluid_gate_contract::schema::CONFIG_FIELD;
use fluid_gate_contract::schema::OPERATION_FIELD;
use fluid_gate_contract::schema::TOKEN_FIELD;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::audit::GatewayLogEvent;
use crate::audit::GatewayLogSink;
use crate::auth::RequestContext;
use crate::auth::TokenGate;
use crate::engine::Clock;
use crate::engine::EngineBoundary;
use crate::engine::EngineError;
use crate::engine::EngineOutcome;
use crate::engine::SimulationEngine;
use crate::envelope::ResponseEnvelope;
use crate::translate::translate;
use crate::validation::FieldValue;
use crate::validation::Scope;
use crate::validation::ValidatedConfig;
use crate::validation::ValidationError;
use crate::validation::unwrap_input;
use crate::validation::validate_request;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Resolution above which GPU memory warnings are emitted.
const HIGH_RESOLUTION_THRESHOLD: u64 = 10_000;
/// Warning for resolutions above the threshold.
const HIGH_RESOLUTION_WARNING: &str = "High resolution may require significant GPU memory (>8GB)";
/// Warning for D3Q27 above the threshold.
const D3Q27_WARNING: &str = "D3Q27 with high resolution may require >16GB GPU memory";
/// Warning when both duration fields are set.
const DURATION_CONFLICT_WARNING: &str = "time_steps is ignored because simulation_time is set";
/// Note attached to runs ended by the engine.
const EXITED_NOTE: &str = "User may have closed the graphics window";

// ============================================================================
// SECTION: Tool Router
// ============================================================================

/// Configuration inputs for building a tool router.
pub struct ToolRouterConfig {
    /// Unlock token gate shared by every request.
    pub gate: Arc<TokenGate>,
    /// Engine behind the invocation boundary.
    pub engine: Arc<dyn SimulationEngine>,
    /// Clock used to time engine runs.
    pub clock: Arc<dyn Clock>,
    /// Log sink for request events.
    pub log: Arc<dyn GatewayLogSink>,
    /// Directory relative mesh paths resolve against.
    pub working_dir: Option<PathBuf>,
}

/// Tool router for MCP requests.
#[derive(Clone)]
pub struct ToolRouter {
    /// Unlock token gate.
    gate: Arc<TokenGate>,
    /// Engine invocation boundary.
    boundary: EngineBoundary,
    /// Log sink for request events.
    log: Arc<dyn GatewayLogSink>,
    /// Directory relative mesh paths resolve against.
    working_dir: Option<PathBuf>,
}

impl ToolRouter {
    /// Creates a new tool router.
    #[must_use]
    pub fn new(config: ToolRouterConfig) -> Self {
        Self {
            gate: config.gate,
            boundary: EngineBoundary::new(config.engine, config.clock),
            log: config.log,
            working_dir: config.working_dir,
        }
    }

    /// Returns the unlock token gate.
    #[must_use]
    pub fn token_gate(&self) -> &TokenGate {
        &self.gate
    }

    /// Lists the MCP tools supported by this server.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        vec![tool_definition()]
    }

    /// Handles a tool call by name with JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] when the tool name is not `fluidx3d`.
    pub fn handle_tool_call(
        &self,
        context: &RequestContext,
        name: &str,
        arguments: &Value,
    ) -> Result<Value, ToolError> {
        if name != TOOL_NAME {
            return Err(ToolError::UnknownTool);
        }
        Ok(self.dispatch(context, arguments).to_tool_result())
    }

    /// Runs one raw request through the gateway pipeline.
    #[must_use]
    pub fn dispatch(&self, context: &RequestContext, raw: &Value) -> ResponseEnvelope {
        let request = match unwrap_input(raw) {
            Ok(request) => request,
            Err(err) => return self.reject(context, None, &err.to_string()),
        };
        let operation_name = request.get(OPERATION_FIELD).and_then(Value::as_str);
        let bypasses_token = operation_name
            .and_then(OperationName::parse)
            .is_some_and(OperationName::bypasses_token);
        if !bypasses_token && let Err(err) = self.gate.verify(request.get(TOKEN_FIELD)) {
            return self.reject(context, operation_name, &err.to_string());
        }
        let validated = match validate_request(request) {
            Ok(validated) => validated,
            Err(err) => return self.reject(context, operation_name, &err.to_string()),
        };

        let operation = validated.operation;
        self.record(context, "tool_call", Some(operation), "request accepted");
        let envelope = match (operation, validated.config.as_ref()) {
            (OperationName::Readme, _) => {
                ResponseEnvelope::ok(Value::String(readme_text(self.gate.token())))
            }
            (OperationName::GetVersion, _) => self.handle_get_version(),
            (OperationName::ListDevices, _) => Self::handle_list_devices(),
            (OperationName::ValidateConfig, Some(config)) => self.handle_validate_config(config),
            (OperationName::RunSimulation, Some(config)) => {
                self.handle_run_simulation(context, config)
            }
            (OperationName::ValidateConfig | OperationName::RunSimulation, None) => {
                let err = ValidationError::MissingRequired {
                    scope: Scope::Request,
                    names: vec![CONFIG_FIELD],
                    required: vec![CONFIG_FIELD],
                };
                return self.reject(context, Some(operation.as_str()), &err.to_string());
            }
        };
        if envelope.is_error {
            self.record(context, "tool_error", Some(operation), envelope.text());
        }
        envelope
    }

    /// Handles `get_version`.
    fn handle_get_version(&self) -> ResponseEnvelope {
        let engine = self.boundary.engine();
        match engine.version() {
            Ok(version) => ResponseEnvelope::ok(json!({
                "version": version,
                "module_available": true,
                "gateway_version": env!("CARGO_PKG_VERSION"),
                "engine_binary": engine.binary_label(),
            })),
            Err(EngineError::Unavailable(message)) => ResponseEnvelope::error(message),
            Err(EngineError::Runtime(message)) => {
                ResponseEnvelope::error(format!("Error getting version: {message}"))
            }
        }
    }

    /// Handles `list_devices`; device enumeration is left to the engine.
    fn handle_list_devices() -> ResponseEnvelope {
        ResponseEnvelope::ok(json!({
            "message": "Device detection not yet implemented. Run a simulation to see detected \
                        devices in output.",
            "note": "FluidX3D will automatically detect and use the best available OpenCL device",
        }))
    }

    /// Handles `validate_config` without touching the engine.
    fn handle_validate_config(&self, config: &ValidatedConfig) -> ResponseEnvelope {
        if let Some(path) = self.missing_mesh(config) {
            return ResponseEnvelope::error(format!("STL file not found: {path}"));
        }
        ResponseEnvelope::ok(json!({
            "valid": true,
            "config": config.to_json(),
            "warnings": config_warnings(config),
        }))
    }

    /// Handles `run_simulation` through the invocation boundary.
    fn handle_run_simulation(
        &self,
        context: &RequestContext,
        config: &ValidatedConfig,
    ) -> ResponseEnvelope {
        if let Err(err) = self.boundary.engine().ensure_available() {
            return ResponseEnvelope::error(err.to_string());
        }
        if let Some(path) = self.missing_mesh(config) {
            return ResponseEnvelope::error(format!(
                "STL file not found: {path}. Please provide full path or ensure file is in \
                 current directory."
            ));
        }
        let warnings = config_warnings(config);
        let args = translate(config);
        self.record(context, "engine_start", Some(OperationName::RunSimulation), args.joined());

        let run = self.boundary.invoke(&args);
        let seconds = run.elapsed.as_secs_f64();
        let elapsed_time = (seconds * 100.0).round() / 100.0;
        match run.outcome {
            EngineOutcome::Completed => ResponseEnvelope::ok(json!({
                "status": "completed",
                "elapsed_time": elapsed_time,
                "config": config.to_json(),
                "message": format!("Simulation completed successfully in {seconds:.1} seconds"),
                "warnings": warnings,
            })),
            EngineOutcome::Terminated { code } => {
                let code = code.map_or_else(|| "unknown".to_string(), |code| code.to_string());
                ResponseEnvelope::exited(json!({
                    "status": "exited",
                    "elapsed_time": elapsed_time,
                    "config": config.to_json(),
                    "message": format!(
                        "Simulation exited after {seconds:.1} seconds (exit code: {code})"
                    ),
                    "note": EXITED_NOTE,
                    "warnings": warnings,
                }))
            }
            EngineOutcome::Failed(message) => {
                ResponseEnvelope::error(format!("Error running simulation: {message}"))
            }
            EngineOutcome::TimedOut { limit_ms } => ResponseEnvelope::error(format!(
                "Error running simulation: timed out after {limit_ms} ms"
            )),
        }
    }

    /// Returns the mesh path as given when it does not exist.
    fn missing_mesh<'a>(&self, config: &'a ValidatedConfig) -> Option<&'a str> {
        let path = config.text("stl_file")?;
        if self.resolve_path(path).exists() { None } else { Some(path) }
    }

    /// Resolves a relative path against the engine working directory.
    fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match &self.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Rejects a request, appending the documentation to the message.
    fn reject(
        &self,
        context: &RequestContext,
        operation: Option<&str>,
        message: &str,
    ) -> ResponseEnvelope {
        self.log.record(
            &GatewayLogEvent::new("tool_rejected", operation, message).with_context(context),
        );
        ResponseEnvelope::validation_error(message, &readme_text(self.gate.token()))
    }

    /// Records a log event for an accepted request.
    fn record(
        &self,
        context: &RequestContext,
        event: &'static str,
        operation: Option<OperationName>,
        message: impl Into<String>,
    ) {
        self.log.record(
            &GatewayLogEvent::new(event, operation.map(OperationName::as_str), message)
                .with_context(context),
        );
    }
}

/// Returns advisory warnings for a config.
fn config_warnings(config: &ValidatedConfig) -> Vec<&'static str> {
    let mut warnings = Vec::new();
    let resolution = config.get("resolution").and_then(FieldValue::as_u64).unwrap_or_default();
    if resolution > HIGH_RESOLUTION_THRESHOLD {
        warnings.push(HIGH_RESOLUTION_WARNING);
        if config.text("velocity_set") == Some("D3Q27") {
            warnings.push(D3Q27_WARNING);
        }
    }
    if config.contains("simulation_time") && config.contains("time_steps") {
        warnings.push(DURATION_CONFLICT_WARNING);
    }
    warnings
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool routing errors surfaced as JSON-RPC errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// Tool name not recognized.
    #[error("unknown tool")]
    UnknownTool,
    /// Tool call parameters could not be decoded.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    /// Tool payload serialization failed.
    #[error("serialization failure")]
    Serialization,
}
