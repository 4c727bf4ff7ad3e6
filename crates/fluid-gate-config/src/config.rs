// crates/fluid-gate-config/src/config.rs
// ============================================================================
// Module: Fluid Gate Configuration
// Description: Configuration loading and validation for the gateway.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Unknown keys and invalid values fail closed. Every section is optional and
//! defaults to a local stdio gateway with no engine configured.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "fluid-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "FLUID_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum request body size accepted by the server.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Maximum captured engine stderr in bytes.
pub(crate) const MAX_STDERR_BYTES_LIMIT: usize = 4 * 1024 * 1024;
/// Maximum number of version probe arguments.
pub(crate) const MAX_VERSION_ARGS: usize = 16;
/// Maximum length of the installation identifier.
pub(crate) const MAX_INSTALLATION_ID_LENGTH: usize = 1024;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Fluid Gate configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FluidGateConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Engine binary configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Unlock token configuration.
    #[serde(default)]
    pub token: TokenConfig,
    /// Gateway log sink configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl FluidGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then `FLUID_GATE_CONFIG`, then
    /// `fluid-gate.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.engine.validate()?;
        self.token.validate()?;
        self.audit.validate()
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Supported MCP transport types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Use stdin/stdout transport.
    #[default]
    Stdio,
    /// Use HTTP JSON-RPC transport.
    Http,
}

/// Server configuration for MCP transports.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport type for MCP.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Permit binding HTTP to a non-loopback address.
    #[serde(default)]
    pub allow_non_loopback: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: default_max_body_bytes(),
            allow_non_loopback: false,
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid("max_body_bytes exceeds limit".to_string()));
        }
        match self.transport {
            ServerTransport::Http => {
                let bind = self.bind.as_deref().unwrap_or_default().trim();
                if bind.is_empty() {
                    return Err(ConfigError::Invalid(
                        "http transport requires bind address".to_string(),
                    ));
                }
                let addr: SocketAddr = bind
                    .parse()
                    .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))?;
                if !addr.ip().is_loopback() && !self.allow_non_loopback {
                    return Err(ConfigError::Invalid(
                        "non-loopback bind requires server.allow_non_loopback".to_string(),
                    ));
                }
            }
            ServerTransport::Stdio => {
                if self.bind.is_some() {
                    return Err(ConfigError::Invalid(
                        "stdio transport does not accept a bind address".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// FluidX3D engine binary configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Path to the engine binary. Unset means the engine is unavailable.
    #[serde(default)]
    pub binary: Option<String>,
    /// Working directory for engine runs and relative mesh paths.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Optional wall-clock limit for one run in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Arguments used to query the engine version.
    #[serde(default = "default_version_args")]
    pub version_args: Vec<String>,
    /// Fixed version string reported instead of probing the binary.
    #[serde(default)]
    pub version: Option<String>,
    /// Maximum engine stderr captured per run in bytes.
    #[serde(default = "default_max_stderr_bytes")]
    pub max_stderr_bytes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: None,
            working_dir: None,
            timeout_ms: None,
            version_args: default_version_args(),
            version: None,
            max_stderr_bytes: default_max_stderr_bytes(),
        }
    }
}

impl EngineConfig {
    /// Returns the engine binary path with surrounding whitespace removed.
    #[must_use]
    pub fn binary_path(&self) -> Option<PathBuf> {
        self.binary.as_deref().map(|path| PathBuf::from(path.trim()))
    }

    /// Returns the working directory with surrounding whitespace removed.
    ///
    /// Engine runs and relative mesh paths must both resolve against this.
    #[must_use]
    pub fn working_dir_path(&self) -> Option<PathBuf> {
        self.working_dir.as_deref().map(|path| PathBuf::from(path.trim()))
    }

    /// Validates engine configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(binary) = &self.binary {
            validate_path_string("engine.binary", binary)?;
        }
        if let Some(working_dir) = &self.working_dir {
            validate_path_string("engine.working_dir", working_dir)?;
        }
        if self.timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "engine.timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.version_args.len() > MAX_VERSION_ARGS {
            return Err(ConfigError::Invalid("engine.version_args exceeds limit".to_string()));
        }
        if let Some(version) = &self.version
            && version.trim().is_empty()
        {
            return Err(ConfigError::Invalid("engine.version must be non-empty".to_string()));
        }
        if self.max_stderr_bytes == 0 || self.max_stderr_bytes > MAX_STDERR_BYTES_LIMIT {
            return Err(ConfigError::Invalid(
                "engine.max_stderr_bytes must be between 1 and 4194304".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Token
// ============================================================================

/// Unlock token derivation settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    /// Stable installation identifier; defaults to the executable path.
    #[serde(default)]
    pub installation_id: Option<String>,
}

impl TokenConfig {
    /// Validates token configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(id) = &self.installation_id {
            if id.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "token.installation_id must be non-empty".to_string(),
                ));
            }
            if id.len() > MAX_INSTALLATION_ID_LENGTH {
                return Err(ConfigError::Invalid(
                    "token.installation_id exceeds max length".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Gateway log sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
    /// Discard all log events.
    None,
}

/// Gateway log configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink receiving log events.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Log file path (JSON lines) for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("audit.sink = \"file\" requires audit.path".to_string()))
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("audit.path is only valid with the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default maximum request body size in bytes.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default engine stderr capture limit in bytes.
pub(crate) const fn default_max_stderr_bytes() -> usize {
    64 * 1024
}

/// Default engine version probe arguments.
pub(crate) fn default_version_args() -> Vec<String> {
    vec!["--version".to_string()]
}
