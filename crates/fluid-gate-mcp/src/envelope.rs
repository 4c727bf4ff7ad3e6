// crates/fluid-gate-mcp/src/envelope.rs
// ============================================================================
// Module: Response Envelope
// Description: Single response shape for every tool call outcome.
// Purpose: Normalize handler results and failures into MCP tool results.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every tool call ends in one [`ResponseEnvelope`]. Structured bodies are
//! rendered as pretty JSON text and plain text bodies are passed through, then
//! wrapped in the MCP `{content: [{type: "text", text}], isError}` shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Envelope status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    /// Operation succeeded.
    Ok,
    /// Request failed validation or the token gate.
    ValidationError,
    /// Engine ended the run early; not an error.
    Exited,
    /// Operation failed.
    Error,
}

/// Normalized tool call response.
///
/// # Invariants
/// - `is_error` is true exactly for [`EnvelopeStatus::ValidationError`] and
///   [`EnvelopeStatus::Error`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    /// Outcome status.
    pub status: EnvelopeStatus,
    /// Structured payload or message text.
    pub body: Value,
    /// Whether the outcome is an error.
    pub is_error: bool,
}

impl ResponseEnvelope {
    /// Successful response.
    #[must_use]
    pub const fn ok(body: Value) -> Self {
        Self { status: EnvelopeStatus::Ok, body, is_error: false }
    }

    /// Run ended by the engine before completion.
    #[must_use]
    pub const fn exited(body: Value) -> Self {
        Self { status: EnvelopeStatus::Exited, body, is_error: false }
    }

    /// Validation failure with the documentation appended.
    #[must_use]
    pub fn validation_error(message: impl AsRef<str>, readme: &str) -> Self {
        Self {
            status: EnvelopeStatus::ValidationError,
            body: Value::String(format!("{}\n\n{readme}", message.as_ref())),
            is_error: true,
        }
    }

    /// Operational failure.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { status: EnvelopeStatus::Error, body: Value::String(message.into()), is_error: true }
    }

    /// Returns the text carried in the MCP content block.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.body {
            Value::String(text) => text.clone(),
            other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
        }
    }

    /// Renders the MCP `tools/call` result.
    #[must_use]
    pub fn to_tool_result(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text() }],
            "isError": self.is_error,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
