// crates/fluid-gate-config/src/lib.rs
// ============================================================================
// Module: Fluid Gate Config Library
// Description: Canonical gateway config model and validation.
// Purpose: Single source of truth for fluid-gate.toml semantics.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! `fluid-gate-config` defines the configuration model for the FluidX3D
//! gateway: MCP transport settings, the engine binary and its limits, the
//! installation identifier behind the unlock token, and the log sink.
//! Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
