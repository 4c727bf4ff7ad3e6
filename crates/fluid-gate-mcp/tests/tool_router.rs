// crates/fluid-gate-mcp/tests/tool_router.rs
// ============================================================================
// Module: Tool Router Tests
// Description: End-to-end dispatch scenarios against a stub engine.
// Purpose: Pin token ordering, validation, and outcome normalization.
// Dependencies: fluid-gate-mcp, serde_json
// ============================================================================

//! Tool router dispatch tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions use unwrap for clarity."
)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Script;
use common::completing_harness;
use common::harness;
use common::harness_with;
use common::request;
use common::simulation_config;
use fluid_gate_config::ServerTransport;
use fluid_gate_mcp::EngineOutcome;
use fluid_gate_mcp::EnvelopeStatus;
use fluid_gate_mcp::RequestContext;
use fluid_gate_mcp::tools::ToolError;
use serde_json::Value;
use serde_json::json;

const TOKEN_ERROR: &str =
    "Invalid or missing tool_unlock_token. Please call readme operation first to get the token:";

// ============================================================================
// SECTION: Token Gate
// ============================================================================

#[test]
fn validate_without_token_fails_before_file_check() {
    let harness = completing_harness();
    let envelope =
        harness.call(&request("validate_config", Some(simulation_config("missing.stl")), None));
    assert_eq!(envelope.status, EnvelopeStatus::ValidationError);
    assert!(envelope.is_error);
    let text = envelope.text();
    assert!(text.starts_with(TOKEN_ERROR));
    assert!(!text.contains("STL file not found"));
    assert_eq!(harness.engine_calls(), 0);
}

#[test]
fn every_gated_operation_rejects_wrong_token() {
    let harness = completing_harness();
    let mesh = harness.mesh("wing.stl");
    let config = simulation_config(&mesh.to_string_lossy());
    for (operation, config) in [
        ("get_version", None),
        ("list_devices", None),
        ("validate_config", Some(config.clone())),
        ("run_simulation", Some(config)),
    ] {
        for token in [None, Some("0000"), Some("")] {
            let envelope = harness.call(&request(operation, config.clone(), token));
            assert_eq!(envelope.status, EnvelopeStatus::ValidationError, "{operation}");
            assert!(envelope.text().starts_with(TOKEN_ERROR), "{operation}");
        }
    }
    assert_eq!(harness.engine_calls(), 0);
}

#[test]
fn non_string_token_fails_like_missing_token() {
    let harness = completing_harness();
    let mut raw = request("list_devices", None, None);
    raw["tool_unlock_token"] = json!(12345);
    let numeric = harness.call(&raw);
    let missing = harness.call(&request("list_devices", None, None));
    assert_eq!(numeric, missing);
}

#[test]
fn readme_needs_no_token_and_reveals_it() {
    let harness = completing_harness();
    let envelope = harness.call(&request("readme", None, None));
    assert_eq!(envelope.status, EnvelopeStatus::Ok);
    assert!(!envelope.is_error);
    assert!(envelope.text().contains(&harness.token));
}

#[test]
fn gateways_do_not_share_tokens() {
    let first = completing_harness();
    let second = completing_harness();
    assert_ne!(first.token, second.token);
    let envelope = second.call(&request("list_devices", None, Some(&first.token)));
    assert_eq!(envelope.status, EnvelopeStatus::ValidationError);
}

// ============================================================================
// SECTION: Validation Failures
// ============================================================================

#[test]
fn validate_missing_mesh_reports_path_without_readme() {
    let harness = completing_harness();
    let envelope = harness.call(&request(
        "validate_config",
        Some(simulation_config("missing.stl")),
        Some(&harness.token),
    ));
    assert_eq!(envelope.status, EnvelopeStatus::Error);
    assert_eq!(envelope.text(), "STL file not found: missing.stl");
    assert_eq!(harness.engine_calls(), 0);
}

#[test]
fn run_missing_mesh_reports_path() {
    let harness = completing_harness();
    let envelope = harness.call(&request(
        "run_simulation",
        Some(simulation_config("missing.stl")),
        Some(&harness.token),
    ));
    assert_eq!(envelope.status, EnvelopeStatus::Error);
    assert!(envelope.text().starts_with("STL file not found: missing.stl."));
    assert_eq!(harness.engine_calls(), 0);
}

#[test]
fn run_without_mesh_lists_missing_fields_before_translation() {
    let harness = completing_harness();
    let config = json!({"velocity_set": "D3Q27", "collision_operator": "SRT", "resolution": 100});
    let envelope = harness.call(&request("run_simulation", Some(config), Some(&harness.token)));
    assert_eq!(envelope.status, EnvelopeStatus::ValidationError);
    let text = envelope.text();
    assert!(text.starts_with(
        "Missing required config parameters: reynolds, simulation_time, stl_file, velocity."
    ));
    assert!(text.contains("\n\n"));
    assert_eq!(harness.engine_calls(), 0);
    assert!(harness.log.events().iter().all(|event| event.event != "engine_start"));
}

#[test]
fn unexpected_key_is_named_exactly() {
    let harness = completing_harness();
    let mut raw = request("list_devices", None, Some(&harness.token));
    raw["verbose"] = json!(true);
    let envelope = harness.call(&raw);
    assert_eq!(envelope.status, EnvelopeStatus::ValidationError);
    assert!(envelope.text().starts_with("Unexpected parameters provided: verbose. Expected"));
}

#[test]
fn unknown_operation_lists_valid_names() {
    let harness = completing_harness();
    let envelope = harness.call(&request("simulate", None, Some(&harness.token)));
    assert_eq!(envelope.status, EnvelopeStatus::ValidationError);
    let text = envelope.text();
    assert!(text.starts_with("Unknown operation: 'simulate'. Available operations:"));
    assert!(text.contains("run_simulation"));
}

#[test]
fn non_object_request_is_invalid_input() {
    let harness = completing_harness();
    for raw in [json!("readme"), json!(["readme"]), json!({"input": 3})] {
        let envelope = harness.call(&raw);
        assert_eq!(envelope.status, EnvelopeStatus::ValidationError);
        assert!(envelope.text().starts_with("Invalid input format."));
    }
}

#[test]
fn input_wrapper_is_unwrapped() {
    let harness = completing_harness();
    let envelope = harness.call(&json!({"input": {"operation": "readme"}}));
    assert_eq!(envelope.status, EnvelopeStatus::Ok);
}

// ============================================================================
// SECTION: Operations
// ============================================================================

#[test]
fn validate_config_never_runs_engine_and_warns() {
    let harness = completing_harness();
    harness.mesh("wing.stl");
    let envelope = harness.call(&request(
        "validate_config",
        Some(simulation_config("wing.stl")),
        Some(&harness.token),
    ));
    assert_eq!(envelope.status, EnvelopeStatus::Ok);
    assert_eq!(envelope.body["valid"], true);
    assert_eq!(envelope.body["config"]["export_path"], "export/");
    assert_eq!(envelope.body["config"]["enable_graphics"], false);
    assert_eq!(
        envelope.body["warnings"],
        json!([
            "High resolution may require significant GPU memory (>8GB)",
            "D3Q27 with high resolution may require >16GB GPU memory",
        ])
    );
    assert_eq!(harness.engine_calls(), 0);
}

#[test]
fn completed_run_reports_elapsed_time_and_args() {
    let harness = completing_harness();
    let mesh = harness.mesh("wing.stl");
    let path = mesh.to_string_lossy().into_owned();
    let envelope = harness.call(&request(
        "run_simulation",
        Some(simulation_config(&path)),
        Some(&harness.token),
    ));
    assert_eq!(envelope.status, EnvelopeStatus::Ok);
    assert_eq!(envelope.body["status"], "completed");
    assert_eq!(envelope.body["elapsed_time"], 1.5);
    assert_eq!(envelope.body["message"], "Simulation completed successfully in 1.5 seconds");
    let calls = harness.engine.calls();
    assert_eq!(calls.len(), 1);
    let expected: Vec<String> = [
        "--D3Q27",
        "--SRT",
        "-f",
        path.as_str(),
        "-r",
        "15400",
        "-u",
        "7.0",
        "--re",
        "535000000",
        "--secs",
        "5.0",
        "--export",
        "export/",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    assert_eq!(calls[0], expected);
}

#[test]
fn engine_exit_after_three_seconds_is_not_an_error() {
    let harness =
        harness(Script::Outcome(EngineOutcome::Terminated { code: Some(0) }), Duration::from_secs(3));
    harness.mesh("wing.stl");
    let envelope = harness.call(&request(
        "run_simulation",
        Some(simulation_config("wing.stl")),
        Some(&harness.token),
    ));
    assert_eq!(envelope.status, EnvelopeStatus::Exited);
    assert!(!envelope.is_error);
    assert_eq!(envelope.body["status"], "exited");
    assert!((envelope.body["elapsed_time"].as_f64().unwrap() - 3.0).abs() < 0.01);
    assert_eq!(envelope.body["message"], "Simulation exited after 3.0 seconds (exit code: 0)");
    let result = envelope.to_tool_result();
    assert_eq!(result["isError"], false);
}

#[test]
fn engine_error_text_passes_through() {
    let message = "Error: File \"wing.stl\" could not be loaded!";
    let harness =
        harness(Script::Outcome(EngineOutcome::Failed(message.to_string())), Duration::ZERO);
    harness.mesh("wing.stl");
    let envelope = harness.call(&request(
        "run_simulation",
        Some(simulation_config("wing.stl")),
        Some(&harness.token),
    ));
    assert_eq!(envelope.status, EnvelopeStatus::Error);
    assert_eq!(envelope.text(), format!("Error running simulation: {message}"));
}

#[test]
fn engine_panic_is_contained() {
    let harness = harness(Script::Panic("lattice exploded"), Duration::ZERO);
    harness.mesh("wing.stl");
    let envelope = harness.call(&request(
        "run_simulation",
        Some(simulation_config("wing.stl")),
        Some(&harness.token),
    ));
    assert_eq!(envelope.status, EnvelopeStatus::Error);
    assert_eq!(envelope.text(), "Error running simulation: lattice exploded");
}

#[test]
fn engine_timeout_is_an_error() {
    let harness =
        harness(Script::Outcome(EngineOutcome::TimedOut { limit_ms: 250 }), Duration::ZERO);
    harness.mesh("wing.stl");
    let envelope = harness.call(&request(
        "run_simulation",
        Some(simulation_config("wing.stl")),
        Some(&harness.token),
    ));
    assert_eq!(envelope.status, EnvelopeStatus::Error);
    assert!(envelope.text().contains("timed out after 250 ms"));
}

#[test]
fn unavailable_engine_fails_without_invocation() {
    let clock = Arc::new(common::ManualClock::new());
    let engine = Arc::new(common::RecordingEngine::unavailable(Arc::clone(&clock)));
    let harness = harness_with(clock, engine);
    harness.mesh("wing.stl");
    let run = harness.call(&request(
        "run_simulation",
        Some(simulation_config("wing.stl")),
        Some(&harness.token),
    ));
    assert_eq!(run.status, EnvelopeStatus::Error);
    assert_eq!(run.text(), "FluidX3D engine not available");
    assert_eq!(harness.engine_calls(), 0);

    let version = harness.call(&request("get_version", None, Some(&harness.token)));
    assert_eq!(version.status, EnvelopeStatus::Error);
    assert!(!version.text().contains("\n\n"));
}

#[test]
fn get_version_reports_engine_and_gateway() {
    let harness = completing_harness();
    let envelope = harness.call(&request("get_version", None, Some(&harness.token)));
    assert_eq!(envelope.status, EnvelopeStatus::Ok);
    assert_eq!(envelope.body["version"], "FluidX3D stub 1.0");
    assert_eq!(envelope.body["module_available"], true);
    assert_eq!(envelope.body["engine_binary"], "stub://fluidx3d");
    assert!(envelope.body["gateway_version"].is_string());
}

#[test]
fn list_devices_is_a_placeholder() {
    let harness = completing_harness();
    let envelope = harness.call(&request("list_devices", None, Some(&harness.token)));
    assert_eq!(envelope.status, EnvelopeStatus::Ok);
    assert!(envelope.body["message"].as_str().unwrap().contains("not yet implemented"));
}

// ============================================================================
// SECTION: Tool Calls
// ============================================================================

#[test]
fn unknown_tool_name_is_rejected() {
    let harness = completing_harness();
    let result =
        harness.router.handle_tool_call(&RequestContext::stdio(), "fluidx4d", &json!({}));
    assert_eq!(result, Err(ToolError::UnknownTool));
}

#[test]
fn tool_call_wraps_envelope_as_text_content() {
    let harness = completing_harness();
    let arguments = json!({"input": {"operation": "list_devices", "tool_unlock_token": harness.token}});
    let result =
        harness.router.handle_tool_call(&RequestContext::stdio(), "fluidx3d", &arguments).unwrap();
    assert_eq!(result["isError"], false);
    let text = result["content"][0]["text"].as_str().unwrap();
    let parsed: Value = serde_json::from_str(text).unwrap();
    assert!(parsed.get("note").is_some());
}

#[test]
fn token_never_appears_in_logs() {
    let harness = completing_harness();
    harness.mesh("wing.stl");
    let _ = harness.call(&request(
        "run_simulation",
        Some(simulation_config("wing.stl")),
        Some(&harness.token),
    ));
    let events = harness.log.events();
    assert!(events.iter().any(|event| event.event == "engine_start"));
    assert!(events.iter().all(|event| !event.message.contains(&harness.token)));
}

#[test]
fn log_events_carry_caller_context() {
    let harness = completing_harness();
    let context = RequestContext::http(Some("10.0.0.9:5512".to_string())).with_request_id("42");
    let _ = harness.router.dispatch(&context, &request("list_devices", None, Some(&harness.token)));
    let _ = harness.router.dispatch(&context, &request("list_devices", None, None));
    let events = harness.log.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event, "tool_call");
    assert_eq!(events[1].event, "tool_rejected");
    for event in &events {
        assert_eq!(event.transport, Some(ServerTransport::Http));
        assert_eq!(event.peer.as_deref(), Some("10.0.0.9:5512"));
        assert_eq!(event.request_id.as_deref(), Some("42"));
    }
}
