// crates/fluid-gate-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: MCP server implementations for stdio and HTTP transports.
// Purpose: Expose the `fluidx3d` tool via JSON-RPC 2.0.
// Dependencies: fluid-gate-config, axum, tokio
// ============================================================================

//! ## Overview
//! The MCP server exposes the `fluidx3d` tool using JSON-RPC 2.0 and always
//! routes calls through [`crate::tools::ToolRouter`]. The stdio transport
//! accepts both `Content-Length` framed messages and newline-delimited JSON
//! and answers each message in the framing it arrived in. The HTTP transport
//! serves `POST /rpc`. Requests without an `id` are notifications and receive
//! no response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use fluid_gate_config::FluidGateConfig;
use fluid_gate_config::ServerTransport;
use fluid_gate_contract::ToolDefinition;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::audit::GatewayLogEvent;
use crate::audit::GatewayLogSink;
use crate::audit::sink_from_config;
use crate::auth::RequestContext;
use crate::auth::TokenGate;
use crate::engine::ProcessEngine;
use crate::engine::SystemClock;
use crate::tools::ToolError;
use crate::tools::ToolRouter;
use crate::tools::ToolRouterConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// MCP protocol version announced when the client does not request one.
const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
/// Server name announced during initialization.
const SERVER_NAME: &str = "fluid-gate";
/// Longest stdio header line accepted, independent of the body limit.
const MAX_HEADER_LINE_BYTES: usize = 8192;

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: FluidGateConfig,
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Log sink for server lifecycle events.
    log: Arc<dyn GatewayLogSink>,
}

impl McpServer {
    /// Builds a new MCP server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when initialization fails.
    pub fn from_config(config: FluidGateConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let gate = TokenGate::from_config(&config.token)
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        let log =
            sink_from_config(&config.audit).map_err(|err| McpServerError::Init(err.to_string()))?;
        let router = ToolRouter::new(ToolRouterConfig {
            gate: Arc::new(gate),
            engine: Arc::new(ProcessEngine::from_config(&config.engine)),
            clock: Arc::new(SystemClock),
            log: Arc::clone(&log),
            working_dir: config.engine.working_dir_path(),
        });
        Ok(Self { config, router, log })
    }

    /// Returns the tool router.
    #[must_use]
    pub const fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the server fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        let transport = self.config.server.transport;
        let max_body_bytes = self.config.server.max_body_bytes;
        self.log.record(&GatewayLogEvent::new(
            "server_start",
            None,
            format!("serving over {}", transport_label(transport)),
        ));
        match transport {
            ServerTransport::Stdio => serve_stdio(&self.router, max_body_bytes),
            ServerTransport::Http => serve_http(self.config, self.router).await,
        }
    }
}

/// Returns a display label for a transport.
const fn transport_label(transport: ServerTransport) -> &'static str {
    match transport {
        ServerTransport::Stdio => "stdio",
        ServerTransport::Http => "http",
    }
}

// ============================================================================
// SECTION: Stdio Transport
// ============================================================================

/// Serves JSON-RPC requests over stdin/stdout until stdin closes.
fn serve_stdio(router: &ToolRouter, max_body_bytes: usize) -> Result<(), McpServerError> {
    let mut reader = BufReader::new(io::stdin().lock());
    let mut writer = io::stdout().lock();
    serve_stream(router, &mut reader, &mut writer, max_body_bytes)
}

/// Serves JSON-RPC requests from any reader/writer pair.
fn serve_stream(
    router: &ToolRouter,
    reader: &mut impl BufRead,
    writer: &mut impl Write,
    max_body_bytes: usize,
) -> Result<(), McpServerError> {
    while let Some(frame) = read_message(reader, max_body_bytes)? {
        let response = match frame.payload {
            Payload::Oversized => Some(JsonRpcResponse::failure(
                Value::Null,
                -32070,
                "request body too large".to_string(),
            )),
            Payload::Bytes(bytes) => match serde_json::from_slice::<JsonRpcRequest>(&bytes) {
                Ok(request) => {
                    handle_request(router, &RequestContext::stdio(), request).map(|pair| pair.1)
                }
                Err(_) => Some(JsonRpcResponse::failure(
                    Value::Null,
                    -32700,
                    "parse error".to_string(),
                )),
            },
        };
        if let Some(response) = response {
            let payload = serde_json::to_vec(&response).map_err(|_| {
                McpServerError::Transport("json-rpc serialization failed".to_string())
            })?;
            write_message(writer, frame.framing, &payload)?;
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Serves JSON-RPC requests over HTTP.
async fn serve_http(config: FluidGateConfig, router: ToolRouter) -> Result<(), McpServerError> {
    let bind = config
        .server
        .bind
        .as_ref()
        .ok_or_else(|| McpServerError::Config("bind address required".to_string()))?;
    let addr: SocketAddr =
        bind.parse().map_err(|_| McpServerError::Config("invalid bind address".to_string()))?;
    let state = Arc::new(ServerState { router, max_body_bytes: config.server.max_body_bytes });
    let app = Router::new().route("/rpc", post(handle_http)).with_state(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|_| McpServerError::Transport("http bind failed".to_string()))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|_| McpServerError::Transport("http server failed".to_string()))
}

/// Shared server state for HTTP handlers.
#[derive(Clone)]
struct ServerState {
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

/// Handles HTTP JSON-RPC requests.
async fn handle_http(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    bytes: Bytes,
) -> Response {
    let context = RequestContext::http(Some(peer.to_string()));
    match parse_request(&state, &context, &bytes) {
        Some((status, response)) => (status, axum::Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Parses and dispatches an HTTP JSON-RPC payload.
fn parse_request(
    state: &ServerState,
    context: &RequestContext,
    bytes: &Bytes,
) -> Option<(StatusCode, JsonRpcResponse)> {
    if bytes.len() > state.max_body_bytes {
        return Some((
            StatusCode::PAYLOAD_TOO_LARGE,
            JsonRpcResponse::failure(Value::Null, -32070, "request body too large".to_string()),
        ));
    }
    let request: Result<JsonRpcRequest, _> = serde_json::from_slice(bytes.as_ref());
    request.map_or_else(
        |_| {
            Some((
                StatusCode::BAD_REQUEST,
                JsonRpcResponse::failure(Value::Null, -32700, "parse error".to_string()),
            ))
        },
        |request| handle_request(&state.router, context, request),
    )
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; absent for notifications.
    #[serde(default)]
    id: Option<Value>,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a successful response.
    const fn success(id: Value, result: Value) -> Self {
        Self { jsonrpc: "2.0", id, result: Some(result), error: None }
    }

    /// Builds an error response.
    const fn failure(id: Value, code: i64, message: String) -> Self {
        Self { jsonrpc: "2.0", id, result: None, error: Some(JsonRpcError { code, message }) }
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
}

/// Tool call parameters for JSON-RPC requests.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Dispatches a JSON-RPC request to the tool router.
///
/// Returns `None` for notifications.
fn handle_request(
    router: &ToolRouter,
    base_context: &RequestContext,
    request: JsonRpcRequest,
) -> Option<(StatusCode, JsonRpcResponse)> {
    let id = request.id?;
    let context = base_context.clone().with_request_id(id.to_string());
    if request.jsonrpc != "2.0" {
        return Some((
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::failure(id, -32600, "invalid json-rpc version".to_string()),
        ));
    }
    let response = match request.method.as_str() {
        "initialize" => {
            let requested = request
                .params
                .as_ref()
                .and_then(|params| params.get("protocolVersion"))
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_PROTOCOL_VERSION);
            (
                StatusCode::OK,
                JsonRpcResponse::success(
                    id,
                    json!({
                        "protocolVersion": requested,
                        "capabilities": { "tools": {} },
                        "serverInfo": {
                            "name": SERVER_NAME,
                            "version": env!("CARGO_PKG_VERSION"),
                        },
                    }),
                ),
            )
        }
        "ping" => (StatusCode::OK, JsonRpcResponse::success(id, json!({}))),
        "tools/list" => match serde_json::to_value(ToolListResult { tools: router.list_tools() })
        {
            Ok(value) => (StatusCode::OK, JsonRpcResponse::success(id, value)),
            Err(_) => jsonrpc_error(id, &ToolError::Serialization),
        },
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            match serde_json::from_value::<ToolCallParams>(params) {
                Ok(call) => {
                    match call_tool_with_blocking(router, &context, &call.name, &call.arguments) {
                        Ok(result) => (StatusCode::OK, JsonRpcResponse::success(id, result)),
                        Err(err) => jsonrpc_error(id, &err),
                    }
                }
                Err(_) => jsonrpc_error(
                    id,
                    &ToolError::InvalidParams("invalid tool params".to_string()),
                ),
            }
        }
        _ => (
            StatusCode::BAD_REQUEST,
            JsonRpcResponse::failure(id, -32601, "method not found".to_string()),
        ),
    };
    Some(response)
}

/// Runs a tool call, shifting onto a blocking context on multi-thread runtimes.
fn call_tool_with_blocking(
    router: &ToolRouter,
    context: &RequestContext,
    name: &str,
    arguments: &Value,
) -> Result<Value, ToolError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| router.handle_tool_call(context, name, arguments))
        }
        _ => router.handle_tool_call(context, name, arguments),
    }
}

/// Builds a JSON-RPC error response for a tool failure.
fn jsonrpc_error(id: Value, error: &ToolError) -> (StatusCode, JsonRpcResponse) {
    let (status, code, message) = match error {
        ToolError::UnknownTool => (StatusCode::BAD_REQUEST, -32601, "unknown tool".to_string()),
        ToolError::InvalidParams(message) => (StatusCode::BAD_REQUEST, -32602, message.clone()),
        ToolError::Serialization => (StatusCode::OK, -32060, "serialization failed".to_string()),
    };
    (status, JsonRpcResponse::failure(id, code, message))
}

// ============================================================================
// SECTION: Framing Helpers
// ============================================================================

/// Framing a stdio message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// `Content-Length` header block followed by the body.
    ContentLength,
    /// One JSON document per line.
    Line,
}

/// Body of a stdio message.
#[derive(Debug, PartialEq, Eq)]
enum Payload {
    /// Message body within the size limit.
    Bytes(Vec<u8>),
    /// Message body over the size limit, already discarded.
    Oversized,
}

/// One stdio message.
#[derive(Debug, PartialEq, Eq)]
struct Frame {
    /// Framing used by the sender.
    framing: Framing,
    /// Message body.
    payload: Payload,
}

/// One input line read under a byte limit.
struct BoundedLine {
    /// Line bytes, empty when the line was discarded.
    bytes: Vec<u8>,
    /// Line exceeded the limit and was drained.
    oversized: bool,
}

/// Reads one line of at most `limit` bytes, returning `None` at end of input.
///
/// Longer lines are drained up to the next newline without being buffered.
fn read_bounded_line(
    reader: &mut impl BufRead,
    limit: usize,
) -> Result<Option<BoundedLine>, McpServerError> {
    let read_failed = |_| McpServerError::Transport("stdio read failed".to_string());
    let mut bytes = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let read = reader.by_ref().take(cap).read_until(b'\n', &mut bytes).map_err(read_failed)?;
    if read == 0 {
        return Ok(None);
    }
    if bytes.ends_with(b"\n") || bytes.len() <= limit {
        return Ok(Some(BoundedLine { bytes, oversized: false }));
    }
    reader.skip_until(b'\n').map_err(read_failed)?;
    Ok(Some(BoundedLine { bytes: Vec::new(), oversized: true }))
}

/// Reads the next stdio message, returning `None` once the input closes.
fn read_message(
    reader: &mut impl BufRead,
    max_body_bytes: usize,
) -> Result<Option<Frame>, McpServerError> {
    let line_limit = max_body_bytes.max(MAX_HEADER_LINE_BYTES);
    loop {
        let Some(line) = read_bounded_line(reader, line_limit)? else {
            return Ok(None);
        };
        if line.oversized {
            return Ok(Some(Frame { framing: Framing::Line, payload: Payload::Oversized }));
        }
        let trimmed = line.bytes.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(length) = content_length(trimmed)? {
            return read_framed_body(reader, length, max_body_bytes).map(Some);
        }
        let payload = if trimmed.len() > max_body_bytes {
            Payload::Oversized
        } else {
            Payload::Bytes(trimmed.to_vec())
        };
        return Ok(Some(Frame { framing: Framing::Line, payload }));
    }
}

/// Parses a `Content-Length` header line.
fn content_length(line: &[u8]) -> Result<Option<usize>, McpServerError> {
    let Ok(line) = std::str::from_utf8(line) else {
        return Ok(None);
    };
    let Some((name, value)) = line.split_once(':') else {
        return Ok(None);
    };
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return Ok(None);
    }
    value
        .trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|_| McpServerError::Transport("invalid content length".to_string()))
}

/// Reads the remaining header lines and the body of a framed message.
fn read_framed_body(
    reader: &mut impl BufRead,
    length: usize,
    max_body_bytes: usize,
) -> Result<Frame, McpServerError> {
    loop {
        let Some(line) = read_bounded_line(reader, MAX_HEADER_LINE_BYTES)? else {
            return Err(McpServerError::Transport("stdio closed mid-header".to_string()));
        };
        if line.oversized {
            return Err(McpServerError::Transport("header line too long".to_string()));
        }
        if line.bytes.trim_ascii().is_empty() {
            break;
        }
    }
    if length > max_body_bytes {
        let limit = u64::try_from(length).unwrap_or(u64::MAX);
        io::copy(&mut reader.by_ref().take(limit), &mut io::sink())
            .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
        return Ok(Frame { framing: Framing::ContentLength, payload: Payload::Oversized });
    }
    let mut buf = vec![0u8; length];
    reader
        .read_exact(&mut buf)
        .map_err(|_| McpServerError::Transport("stdio read failed".to_string()))?;
    Ok(Frame { framing: Framing::ContentLength, payload: Payload::Bytes(buf) })
}

/// Writes a stdio message in the given framing.
fn write_message(
    writer: &mut impl Write,
    framing: Framing,
    payload: &[u8],
) -> Result<(), McpServerError> {
    let write_failed = |_| McpServerError::Transport("stdio write failed".to_string());
    match framing {
        Framing::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", payload.len());
            writer.write_all(header.as_bytes()).map_err(write_failed)?;
            writer.write_all(payload).map_err(write_failed)?;
        }
        Framing::Line => {
            writer.write_all(payload).map_err(write_failed)?;
            writer.write_all(b"\n").map_err(write_failed)?;
        }
    }
    writer.flush().map_err(write_failed)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
