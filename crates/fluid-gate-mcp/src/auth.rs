// crates/fluid-gate-mcp/src/auth.rs
// ============================================================================
// Module: Unlock Token Gate
// Description: Per-installation unlock token and request context.
// Purpose: Require the unlock token on every non-documentation operation.
// Dependencies: fluid-gate-config, sha2, subtle
// ============================================================================

//! ## Overview
//! The [`TokenGate`] derives one opaque token per gateway instance from a
//! stable installation identifier. It never changes after construction and is
//! shared by reference with every request. Verification is constant-time and
//! reports missing, malformed, and wrong tokens identically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;

use fluid_gate_config::ServerTransport;
use fluid_gate_config::TokenConfig;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Domain separator prefixed to the installation identifier before hashing.
const TOKEN_DOMAIN: &str = "fluid-gate/tool-unlock/";
/// Number of hex characters kept from the digest.
pub const TOKEN_HEX_LEN: usize = 32;

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request context used for logging.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Transport used by the caller.
    pub transport: ServerTransport,
    /// Peer address when available.
    pub peer: Option<String>,
    /// Optional request identifier for logging.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds a stdio request context.
    #[must_use]
    pub const fn stdio() -> Self {
        Self { transport: ServerTransport::Stdio, peer: None, request_id: None }
    }

    /// Builds an HTTP request context.
    #[must_use]
    pub const fn http(peer: Option<String>) -> Self {
        Self { transport: ServerTransport::Http, peer, request_id: None }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

// ============================================================================
// SECTION: Token Gate
// ============================================================================

/// Installation-scoped unlock token.
///
/// # Invariants
/// - `token` is exactly [`TOKEN_HEX_LEN`] lowercase hex characters.
/// - The token never changes for the lifetime of the gate.
#[derive(Clone)]
pub struct TokenGate {
    /// Derived token.
    token: String,
}

impl TokenGate {
    /// Derives the gate from an installation identifier.
    #[must_use]
    pub fn from_installation_id(installation_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(TOKEN_DOMAIN.as_bytes());
        hasher.update(installation_id.as_bytes());
        let mut token = hex_encode(&hasher.finalize());
        token.truncate(TOKEN_HEX_LEN);
        Self { token }
    }

    /// Builds the gate from config, falling back to the executable path.
    ///
    /// # Errors
    ///
    /// Returns [`TokenGateError`] when no installation identifier is configured
    /// and the executable path cannot be resolved.
    pub fn from_config(config: &TokenConfig) -> Result<Self, TokenGateError> {
        if let Some(id) = &config.installation_id {
            return Ok(Self::from_installation_id(id.trim()));
        }
        let exe = env::current_exe().map_err(|err| TokenGateError(err.to_string()))?;
        let canonical = fs::canonicalize(&exe).unwrap_or(exe);
        Ok(Self::from_installation_id(&canonical.to_string_lossy()))
    }

    /// Returns the token exposed by the `readme` operation.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Verifies a presented token value.
    ///
    /// # Errors
    ///
    /// Returns [`TokenMismatch`] when the value is absent, not a string, or
    /// not equal to the gate's token.
    pub fn verify(&self, presented: Option<&Value>) -> Result<(), TokenMismatch> {
        let candidate = presented.and_then(Value::as_str).unwrap_or_default();
        if bool::from(candidate.as_bytes().ct_eq(self.token.as_bytes())) {
            Ok(())
        } else {
            Err(TokenMismatch)
        }
    }
}

impl std::fmt::Debug for TokenGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGate").field("token", &"<redacted>").finish()
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Unlock token verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "Invalid or missing tool_unlock_token. Please call readme operation first to get the token:"
)]
pub struct TokenMismatch;

/// Token gate construction failure.
#[derive(Debug, Error)]
#[error("unable to derive installation identifier: {0}")]
pub struct TokenGateError(String);

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Encodes bytes as lowercase hex.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
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
        clippy::use_debug,
        clippy::missing_docs_in_private_items,
        reason = "Test-only token assertions."
    )]

    use serde_json::json;

    use super::TOKEN_HEX_LEN;
    use super::TokenGate;
    use super::TokenMismatch;

    #[test]
    fn token_is_stable_per_installation() {
        let first = TokenGate::from_installation_id("/opt/fluid-gate/bin/fluid-gate");
        let second = TokenGate::from_installation_id("/opt/fluid-gate/bin/fluid-gate");
        let other = TokenGate::from_installation_id("/home/lab/fluid-gate");
        assert_eq!(first.token(), second.token());
        assert_ne!(first.token(), other.token());
    }

    #[test]
    fn token_is_lowercase_hex_of_fixed_length() {
        let gate = TokenGate::from_installation_id("install");
        assert_eq!(gate.token().len(), TOKEN_HEX_LEN);
        assert!(gate.token().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn verify_accepts_exact_token_only() {
        let gate = TokenGate::from_installation_id("install");
        let token = gate.token().to_string();
        assert_eq!(gate.verify(Some(&json!(token))), Ok(()));
        let prefix = &token[.. TOKEN_HEX_LEN - 1];
        assert_eq!(gate.verify(Some(&json!(prefix))), Err(TokenMismatch));
        assert_eq!(gate.verify(Some(&json!(token.to_uppercase()))), Err(TokenMismatch));
    }

    #[test]
    fn missing_and_malformed_tokens_fail_identically() {
        let gate = TokenGate::from_installation_id("install");
        let missing = gate.verify(None).unwrap_err();
        let numeric = gate.verify(Some(&json!(42))).unwrap_err();
        let empty = gate.verify(Some(&json!(""))).unwrap_err();
        assert_eq!(missing.to_string(), numeric.to_string());
        assert_eq!(missing.to_string(), empty.to_string());
    }

    #[test]
    fn debug_output_redacts_token() {
        let gate = TokenGate::from_installation_id("install");
        let rendered = format!("{gate:?}");
        assert!(!rendered.contains(gate.token()));
    }
}
