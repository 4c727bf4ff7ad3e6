// crates/fluid-gate-contract/src/schema.rs
// ============================================================================
// Module: Schema Registry
// Description: Static field descriptors for requests and simulation configs.
// Purpose: Single table driving validation, translation, and documentation.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The schema registry is a closed set of [`FieldSpec`] descriptors. The
//! top-level request fields live in [`REQUEST_FIELDS`]; simulation config
//! fields live in [`CONFIG_FIELDS`] together with the [`Encoding`] rule used
//! to render them as engine invocation tokens.
//!
//! Declaration order of [`CONFIG_FIELDS`] is the emission order of invocation
//! tokens. Adding a field means adding one row here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::operation::OperationName;
use crate::operation::SIMULATION_REQUIRED_FIELDS;

// ============================================================================
// SECTION: Field Names
// ============================================================================

/// Top-level key naming the requested operation.
pub const OPERATION_FIELD: &str = "operation";
/// Top-level key carrying the simulation configuration object.
pub const CONFIG_FIELD: &str = "config";
/// Top-level key carrying the unlock token.
pub const TOKEN_FIELD: &str = "tool_unlock_token";

// ============================================================================
// SECTION: Descriptor Types
// ============================================================================

/// Semantic value type declared by a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// JSON string.
    String,
    /// Integral JSON number.
    Integer,
    /// Any JSON number.
    Number,
    /// JSON boolean.
    Boolean,
    /// JSON object.
    Object,
}

impl SemanticType {
    /// Returns the JSON schema type keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
        }
    }
}

/// Default value filled in when a field is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// String default.
    Text(&'static str),
    /// Boolean default.
    Flag(bool),
}

impl FieldDefault {
    /// Returns the default as a JSON value.
    #[must_use]
    pub fn to_value(self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.to_string()),
            Self::Flag(flag) => Value::Bool(flag),
        }
    }
}

/// Descriptor for one named field.
///
/// # Invariants
/// - `allowed` is empty or lists every permitted string value.
/// - `default`, when set, matches `semantic_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field key.
    pub name: &'static str,
    /// Declared value type.
    pub semantic_type: SemanticType,
    /// Permitted values; empty when unconstrained.
    pub allowed: &'static [&'static str],
    /// Default filled in when absent.
    pub default: Option<FieldDefault>,
    /// Human-readable description for docs.
    pub description: &'static str,
}

/// Rule rendering one config field as invocation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Emits the flag followed by the value's text form.
    Valued(&'static str),
    /// Emits the flag alone when the value is `true`.
    Flag(&'static str),
    /// Emits `--<value>` as a single token.
    Mode,
    /// Emits like [`Encoding::Valued`] unless the named field is present.
    ValuedUnlessPresent {
        /// Flag token.
        flag: &'static str,
        /// Field whose presence suppresses this one.
        superseded_by: &'static str,
    },
}

/// Config field descriptor paired with its encoding rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigField {
    /// Field descriptor.
    pub spec: FieldSpec,
    /// Invocation token rule.
    pub encoding: Encoding,
}

// ============================================================================
// SECTION: Request Fields
// ============================================================================

/// Permitted velocity sets.
pub const VELOCITY_SETS: &[&str] = &["D2Q9", "D3Q15", "D3Q19", "D3Q27"];
/// Permitted collision operators.
pub const COLLISION_OPERATORS: &[&str] = &["SRT", "TRT"];
/// Permitted operation names, in canonical order.
const OPERATION_VALUES: &[&str] =
    &["readme", "run_simulation", "get_version", "validate_config", "list_devices"];

/// Top-level request fields.
pub const REQUEST_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: OPERATION_FIELD,
        semantic_type: SemanticType::String,
        allowed: OPERATION_VALUES,
        default: None,
        description: "Operation to perform",
    },
    FieldSpec {
        name: CONFIG_FIELD,
        semantic_type: SemanticType::Object,
        allowed: &[],
        default: None,
        description: "Simulation configuration parameters (required for run_simulation and \
                      validate_config operations)",
    },
    FieldSpec {
        name: TOKEN_FIELD,
        semantic_type: SemanticType::String,
        allowed: &[],
        default: None,
        description: "Security token obtained from the readme operation",
    },
];

// ============================================================================
// SECTION: Config Fields
// ============================================================================

/// Builds a config field with no enum and no default.
const fn field(
    name: &'static str,
    semantic_type: SemanticType,
    description: &'static str,
    encoding: Encoding,
) -> ConfigField {
    ConfigField {
        spec: FieldSpec { name, semantic_type, allowed: &[], default: None, description },
        encoding,
    }
}

/// Builds a valued numeric config field.
const fn number(name: &'static str, flag: &'static str, description: &'static str) -> ConfigField {
    field(name, SemanticType::Number, description, Encoding::Valued(flag))
}

/// Builds a valued integer config field.
const fn integer(name: &'static str, flag: &'static str, description: &'static str) -> ConfigField {
    field(name, SemanticType::Integer, description, Encoding::Valued(flag))
}

/// Builds a boolean flag config field defaulting to `false`.
const fn toggle(name: &'static str, flag: &'static str, description: &'static str) -> ConfigField {
    ConfigField {
        spec: FieldSpec {
            name,
            semantic_type: SemanticType::Boolean,
            allowed: &[],
            default: Some(FieldDefault::Flag(false)),
            description,
        },
        encoding: Encoding::Flag(flag),
    }
}

/// Simulation config fields in invocation token emission order.
pub const CONFIG_FIELDS: &[ConfigField] = &[
    ConfigField {
        spec: FieldSpec {
            name: "velocity_set",
            semantic_type: SemanticType::String,
            allowed: VELOCITY_SETS,
            default: None,
            description: "Lattice Boltzmann velocity set",
        },
        encoding: Encoding::Mode,
    },
    ConfigField {
        spec: FieldSpec {
            name: "collision_operator",
            semantic_type: SemanticType::String,
            allowed: COLLISION_OPERATORS,
            default: None,
            description: "LBM collision operator",
        },
        encoding: Encoding::Mode,
    },
    field("stl_file", SemanticType::String, "Path to .stl mesh file", Encoding::Valued("-f")),
    integer("resolution", "-r", "Grid resolution"),
    number("velocity", "-u", "Flow velocity in m/s"),
    number("reynolds", "--re", "Reynolds number"),
    number("simulation_time", "--secs", "Simulation time in seconds"),
    field(
        "time_steps",
        SemanticType::Integer,
        "Number of time steps (ignored when simulation_time is set)",
        Encoding::ValuedUnlessPresent { flag: "-t", superseded_by: "simulation_time" },
    ),
    number("rotation_x", "--rotx", "X-axis rotation in degrees"),
    number("rotation_y", "--roty", "Y-axis rotation in degrees"),
    number("rotation_z", "--rotz", "Z-axis rotation in degrees"),
    number("translate_x", "--trx", "X-axis translation"),
    number("translate_y", "--try", "Y-axis translation"),
    number("translate_z", "--trz", "Z-axis translation"),
    number("scale", "--scale", "Scale factor for mesh"),
    number("angle_of_attack", "--aoa", "Angle of attack in degrees"),
    number("box_width", "-x", "X width of sim box"),
    number("box_length", "-y", "Y length of sim box"),
    number("box_height", "-z", "Z height of sim box"),
    number("density", "--rho", "Fluid density (rho) in kg/m³"),
    number("chord_length", "-c", "Chord length of STL in meters"),
    number("camera_x", "--camx", "Camera X position"),
    number("camera_y", "--camy", "Camera Y position"),
    number("camera_z", "--camz", "Camera Z position"),
    number("camera_zoom", "--camzoom", "Camera zoom level"),
    number("camera_rotation_x", "--camrx", "Camera rotation X"),
    number("camera_rotation_y", "--camry", "Camera rotation Y"),
    number("camera_fov", "--camfov", "Camera field of view"),
    ConfigField {
        spec: FieldSpec {
            name: "export_path",
            semantic_type: SemanticType::String,
            allowed: &[],
            default: Some(FieldDefault::Text("export/")),
            description: "Folder name to save images and data",
        },
        encoding: Encoding::Valued("--export"),
    },
    number("fps", "--fps", "Frames per second for video output"),
    number("slomo", "--slomo", "Slow motion factor (1=realtime, 10=10x slower)"),
    integer("frame_width", "--FRAME_WIDTH", "Screen or window resolution width"),
    integer("frame_height", "--FRAME_HEIGHT", "Screen or window resolution height"),
    integer("background_color", "--BACKGROUND_COLOR", "Screen background color (hex)"),
    integer("streamline_sparse", "--STREAMLINE_SPARSE", "Streamlines spacing"),
    integer("streamline_length", "--STREAMLINE_LENGTH", "Streamline length"),
    field("display", SemanticType::String, "Display device selection", Encoding::Valued("-d")),
    toggle("window_mode", "--window", "Use windowed mode instead of fullscreen"),
    toggle("wait_on_exit", "--wait", "Wait for keypress before ending"),
    toggle("pause_on_start", "--pause", "Do not auto-start the simulation"),
    toggle("realtime_export", "--realtime", "Save every frame to video output"),
    toggle("transparency", "--TRANSPARENCY", "Enable transparency"),
    toggle("enable_graphics", "--GRAPHICS", "Enable interactive 3D graphics"),
    toggle("enable_graphics_ascii", "--GRAPHICS_ASCII", "Enable console ASCII graphics"),
    toggle("enable_subgrid", "--SUBGRID", "Enable SUBGRID model"),
    toggle("enable_volume_force", "--VOLUME_FORCE", "Enable VOLUME_FORCE"),
    toggle("enable_force_field", "--FORCE_FIELD", "Enable FORCE_FIELD"),
    toggle("enable_particles", "--PARTICLES", "Enable PARTICLES"),
    toggle("enable_temperature", "--TEMPERATURE", "Enable TEMPERATURE"),
    toggle("enable_update_fields", "--UPDATE_FIELDS", "Enable UPDATE_FIELDS"),
    toggle("enable_moving_boundaries", "--MOVING_BOUNDARIES", "Enable MOVING_BOUNDARIES"),
    toggle(
        "enable_equilibrium_boundaries",
        "--EQUILIBRIUM_BOUNDARIES",
        "Enable EQUILIBRIUM_BOUNDARIES",
    ),
    toggle("enable_surface", "--SURFACE", "Enable SURFACE"),
    toggle("enable_fp16s", "--FP16S", "Use FP16S half precision"),
    toggle("enable_fp16c", "--FP16C", "Use FP16C half precision"),
    toggle("enable_benchmark", "--BENCHMARK", "Run GPU benchmark"),
    toggle("enable_floor", "--floor", "Insert a solid floor"),
    toggle("allow_sleep", "--allowsleep", "Do not prevent PC from sleeping"),
];

// ============================================================================
// SECTION: Lookups
// ============================================================================

/// Looks up a top-level request field.
#[must_use]
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    REQUEST_FIELDS.iter().find(|spec| spec.name == name)
}

/// Looks up a config field with its encoding.
#[must_use]
pub fn config_field(name: &str) -> Option<&'static ConfigField> {
    CONFIG_FIELDS.iter().find(|field| field.spec.name == name)
}

/// Returns all top-level request field names.
#[must_use]
pub fn all_field_names() -> Vec<&'static str> {
    REQUEST_FIELDS.iter().map(|spec| spec.name).collect()
}

/// Returns all config field names in declaration order.
#[must_use]
pub fn config_field_names() -> Vec<&'static str> {
    CONFIG_FIELDS.iter().map(|field| field.spec.name).collect()
}

// ============================================================================
// SECTION: JSON Schema
// ============================================================================

/// Renders one descriptor as a JSON schema property.
fn property_schema(spec: &FieldSpec) -> Value {
    let mut property = Map::new();
    property.insert("type".to_string(), json!(spec.semantic_type.as_str()));
    if !spec.allowed.is_empty() {
        property.insert("enum".to_string(), json!(spec.allowed));
    }
    if let Some(default) = spec.default {
        property.insert("default".to_string(), default.to_value());
    }
    property.insert("description".to_string(), json!(spec.description));
    Value::Object(property)
}

/// Returns the JSON schema for the `config` object.
#[must_use]
pub fn config_json_schema() -> Value {
    let properties: Map<String, Value> = CONFIG_FIELDS
        .iter()
        .map(|field| (field.spec.name.to_string(), property_schema(&field.spec)))
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false
    })
}

/// Returns the JSON schema for a full tool request.
///
/// Operation-specific requirements are expressed as `if`/`then` clauses so
/// the schema rejects the same missing fields the validator does.
#[must_use]
pub fn request_json_schema() -> Value {
    let mut properties = Map::new();
    for spec in REQUEST_FIELDS {
        let schema = if spec.name == CONFIG_FIELD {
            let mut config = config_json_schema();
            if let Value::Object(map) = &mut config {
                map.insert("description".to_string(), json!(spec.description));
            }
            config
        } else {
            property_schema(spec)
        };
        properties.insert(spec.name.to_string(), schema);
    }
    let gated: Vec<&str> = OperationName::all()
        .iter()
        .filter(|name| !name.bypasses_token())
        .map(|name| name.as_str())
        .collect();
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "FluidX3D tool request",
        "type": "object",
        "required": [OPERATION_FIELD],
        "properties": properties,
        "additionalProperties": false,
        "allOf": [
            {
                "if": { "properties": { OPERATION_FIELD: { "enum": gated } } },
                "then": { "required": [TOKEN_FIELD] }
            },
            {
                "if": {
                    "properties": {
                        OPERATION_FIELD: {
                            "enum": [
                                OperationName::RunSimulation.as_str(),
                                OperationName::ValidateConfig.as_str()
                            ]
                        }
                    }
                },
                "then": {
                    "required": [CONFIG_FIELD],
                    "properties": {
                        CONFIG_FIELD: { "required": SIMULATION_REQUIRED_FIELDS }
                    }
                }
            }
        ]
    })
}
