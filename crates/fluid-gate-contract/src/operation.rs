// crates/fluid-gate-contract/src/operation.rs
// ============================================================================
// Module: Operation Identifiers
// Description: Canonical operation names and per-operation requirements.
// Purpose: Shared operation naming across validation, dispatch, and docs.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Canonical operation identifiers accepted by the `fluidx3d` tool, and the
//! static [`OperationSpec`] table describing which request and config fields
//! each operation requires. These names are part of the external contract
//! surface.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::schema::CONFIG_FIELD;
use crate::schema::OPERATION_FIELD;
use crate::schema::TOKEN_FIELD;

// ============================================================================
// SECTION: Operation Names
// ============================================================================

/// Canonical operation names for the `fluidx3d` tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationName {
    /// Return documentation, parameter schema, and the unlock token.
    Readme,
    /// Run a simulation and block until the engine returns.
    RunSimulation,
    /// Report engine version metadata.
    GetVersion,
    /// Validate a configuration without invoking the engine.
    ValidateConfig,
    /// List compute devices (placeholder payload).
    ListDevices,
}

impl OperationName {
    /// Returns the canonical string name for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Readme => "readme",
            Self::RunSimulation => "run_simulation",
            Self::GetVersion => "get_version",
            Self::ValidateConfig => "validate_config",
            Self::ListDevices => "list_devices",
        }
    }

    /// Returns all operation names in canonical order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Readme, Self::RunSimulation, Self::GetVersion, Self::ValidateConfig, Self::ListDevices]
    }

    /// Parses an operation name from its string representation.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "readme" => Some(Self::Readme),
            "run_simulation" => Some(Self::RunSimulation),
            "get_version" => Some(Self::GetVersion),
            "validate_config" => Some(Self::ValidateConfig),
            "list_devices" => Some(Self::ListDevices),
            _ => None,
        }
    }

    /// Returns true when the operation is served without an unlock token.
    #[must_use]
    pub const fn bypasses_token(self) -> bool {
        matches!(self, Self::Readme)
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Operation Requirements
// ============================================================================

/// Required fields for a single operation.
///
/// # Invariants
/// - Every name in `required_request_fields` is a top-level request field.
/// - Every name in `required_config_fields` is a config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    /// Operation this entry describes.
    pub name: OperationName,
    /// Top-level request fields that must be present.
    pub required_request_fields: &'static [&'static str],
    /// Config fields that must be present inside `config`.
    pub required_config_fields: &'static [&'static str],
}

/// Config fields a simulation needs before it can be validated or run.
pub const SIMULATION_REQUIRED_FIELDS: &[&str] = &[
    "stl_file",
    "velocity_set",
    "resolution",
    "velocity",
    "reynolds",
    "simulation_time",
    "collision_operator",
];

/// Request fields required by every token-gated operation.
const GATED_REQUEST_FIELDS: &[&str] = &[OPERATION_FIELD, TOKEN_FIELD];

/// Request fields required by operations that carry a simulation config.
const CONFIGURED_REQUEST_FIELDS: &[&str] = &[OPERATION_FIELD, CONFIG_FIELD, TOKEN_FIELD];

/// Requirements for `readme`.
const README_SPEC: OperationSpec = OperationSpec {
    name: OperationName::Readme,
    required_request_fields: &[OPERATION_FIELD],
    required_config_fields: &[],
};

/// Requirements for `run_simulation`.
const RUN_SIMULATION_SPEC: OperationSpec = OperationSpec {
    name: OperationName::RunSimulation,
    required_request_fields: CONFIGURED_REQUEST_FIELDS,
    required_config_fields: SIMULATION_REQUIRED_FIELDS,
};

/// Requirements for `get_version`.
const GET_VERSION_SPEC: OperationSpec = OperationSpec {
    name: OperationName::GetVersion,
    required_request_fields: GATED_REQUEST_FIELDS,
    required_config_fields: &[],
};

/// Requirements for `validate_config`.
const VALIDATE_CONFIG_SPEC: OperationSpec = OperationSpec {
    name: OperationName::ValidateConfig,
    required_request_fields: CONFIGURED_REQUEST_FIELDS,
    required_config_fields: SIMULATION_REQUIRED_FIELDS,
};

/// Requirements for `list_devices`.
const LIST_DEVICES_SPEC: OperationSpec = OperationSpec {
    name: OperationName::ListDevices,
    required_request_fields: GATED_REQUEST_FIELDS,
    required_config_fields: &[],
};

/// Returns the requirements for an operation.
#[must_use]
pub const fn operation_spec(name: OperationName) -> &'static OperationSpec {
    match name {
        OperationName::Readme => &README_SPEC,
        OperationName::RunSimulation => &RUN_SIMULATION_SPEC,
        OperationName::GetVersion => &GET_VERSION_SPEC,
        OperationName::ValidateConfig => &VALIDATE_CONFIG_SPEC,
        OperationName::ListDevices => &LIST_DEVICES_SPEC,
    }
}

/// Looks up operation requirements by raw operation name.
#[must_use]
pub fn operation_spec_by_name(name: &str) -> Option<&'static OperationSpec> {
    OperationName::parse(name).map(operation_spec)
}

/// Returns the canonical operation names as strings.
#[must_use]
pub fn operation_names() -> Vec<&'static str> {
    OperationName::all().iter().map(|name| name.as_str()).collect()
}
