// crates/fluid-gate-mcp/src/audit.rs
// ============================================================================
// Module: Gateway Logging
// Description: Structured log events for tool request handling.
// Purpose: Emit line-oriented, tagged JSON logs without hard dependencies.
// Dependencies: fluid-gate-config, serde
// ============================================================================

//! ## Overview
//! Every log line is one serialized [`GatewayLogEvent`] tagged `FLUIDX3D`.
//! Sinks never write to stdout, since stdout carries the stdio transport.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use fluid_gate_config::AuditConfig;
use fluid_gate_config::AuditSinkKind;
use fluid_gate_config::ServerTransport;
use serde::Serialize;

use crate::auth::RequestContext;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Log tag carried by every event.
pub const LOG_TAG: &str = "FLUIDX3D";

/// Gateway log event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayLogEvent {
    /// Fixed log tag.
    pub tag: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Event identifier.
    pub event: &'static str,
    /// Operation name when known.
    pub operation: Option<String>,
    /// Transport the request arrived on.
    pub transport: Option<ServerTransport>,
    /// Peer address for HTTP requests.
    pub peer: Option<String>,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl GatewayLogEvent {
    /// Creates a new log event stamped with the current time.
    #[must_use]
    pub fn new(
        event: &'static str,
        operation: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            tag: LOG_TAG,
            timestamp_ms,
            event,
            operation: operation.map(str::to_string),
            transport: None,
            peer: None,
            request_id: None,
            message: message.into(),
        }
    }

    /// Attaches the caller's transport, peer, and request identifier.
    #[must_use]
    pub fn with_context(mut self, context: &RequestContext) -> Self {
        self.transport = Some(context.transport);
        self.peer.clone_from(&context.peer);
        self.request_id.clone_from(&context.request_id);
        self
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Sink receiving gateway log events.
pub trait GatewayLogSink: Send + Sync {
    /// Record a log event.
    fn record(&self, event: &GatewayLogEvent);
}

/// Sink that logs JSON lines to stderr.
pub struct GatewayStderrLogSink;

impl GatewayLogSink for GatewayStderrLogSink {
    fn record(&self, event: &GatewayLogEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Sink that appends JSON lines to a file.
pub struct GatewayFileLogSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl GatewayFileLogSink {
    /// Opens the log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }
}

impl GatewayLogSink for GatewayFileLogSink {
    fn record(&self, event: &GatewayLogEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op log sink.
pub struct GatewayNoopLogSink;

impl GatewayLogSink for GatewayNoopLogSink {
    fn record(&self, _event: &GatewayLogEvent) {}
}

/// Builds the configured log sink.
///
/// # Errors
///
/// Returns an error when the file sink cannot open its path.
pub fn sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn GatewayLogSink>> {
    match (config.sink, config.path.as_deref()) {
        (AuditSinkKind::File, Some(path)) => Ok(Arc::new(GatewayFileLogSink::new(Path::new(path))?)),
        (AuditSinkKind::File, None) => {
            Err(io::Error::new(io::ErrorKind::InvalidInput, "file log sink requires a path"))
        }
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(GatewayStderrLogSink)),
        (AuditSinkKind::None, _) => Ok(Arc::new(GatewayNoopLogSink)),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
