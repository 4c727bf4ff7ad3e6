// crates/fluid-gate-mcp/src/lib.rs
// ============================================================================
// Module: Fluid Gate MCP
// Description: MCP server exposing the FluidX3D engine as a gated tool.
// Purpose: Validate, translate, and run simulation requests over JSON-RPC.
// Dependencies: fluid-gate-contract, fluid-gate-config, axum, tokio
// ============================================================================

//! ## Overview
//! Fluid Gate MCP serves a single `fluidx3d` tool. Every call flows through
//! the same pipeline: unlock token check, schema validation, operation
//! dispatch, and for simulations the config translator and the engine
//! invocation boundary. Every outcome is normalized into one
//! [`envelope::ResponseEnvelope`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod engine;
pub mod envelope;
pub mod server;
pub mod tools;
pub mod translate;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::GatewayFileLogSink;
pub use audit::GatewayLogEvent;
pub use audit::GatewayLogSink;
pub use audit::GatewayNoopLogSink;
pub use audit::GatewayStderrLogSink;
pub use auth::RequestContext;
pub use auth::TokenGate;
pub use engine::Clock;
pub use engine::EngineBoundary;
pub use engine::EngineError;
pub use engine::EngineOutcome;
pub use engine::ProcessEngine;
pub use engine::SimulationEngine;
pub use engine::SystemClock;
pub use envelope::EnvelopeStatus;
pub use envelope::ResponseEnvelope;
pub use server::McpServer;
pub use tools::ToolRouter;
pub use tools::ToolRouterConfig;
pub use translate::InvocationArgs;
pub use translate::translate;
pub use validation::ValidatedConfig;
pub use validation::ValidatedRequest;
pub use validation::ValidationError;
pub use validation::validate_request;
