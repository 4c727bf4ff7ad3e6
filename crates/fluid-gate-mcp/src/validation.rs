// crates/fluid-gate-mcp/src/validation.rs
// ============================================================================
// Module: Parameter Validation
// Description: Table-driven validation of untyped tool requests.
// Purpose: Turn raw JSON into a typed request or the first violation found.
// Dependencies: fluid-gate-contract, serde_json
// ============================================================================

//! ## Overview
//! Validation is fail-fast and evaluated generically over the schema registry
//! tables. Checks run in a fixed order: unexpected keys, missing required
//! keys, value types, enum membership, then default fill. The order is applied
//! to the top-level request first and then to the `config` object, so error
//! precedence is deterministic.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use fluid_gate_contract::FieldSpec;
use fluid_gate_contract::OperationName;
use fluid_gate_contract::OperationSpec;
use fluid_gate_contract::SemanticType;
use fluid_gate_contract::operation::operation_names;
use fluid_gate_contract::operation::operation_spec_by_name;
use fluid_gate_contract::schema::CONFIG_FIELD;
use fluid_gate_contract::schema::CONFIG_FIELDS;
use fluid_gate_contract::schema::OPERATION_FIELD;
use fluid_gate_contract::schema::REQUEST_FIELDS;
use fluid_gate_contract::schema::TOKEN_FIELD;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Key of the MCP-style wrapper object.
const INPUT_WRAPPER: &str = "input";

/// Required top-level fields when the operation cannot be resolved yet.
const BASELINE_REQUEST_FIELDS: &[&str] = &[OPERATION_FIELD, TOKEN_FIELD];

// ============================================================================
// SECTION: Typed Values
// ============================================================================

/// Typed config value produced by validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// String value.
    Text(String),
    /// Integral number.
    Integer(Number),
    /// Any number, integral or not.
    Number(Number),
    /// Boolean value.
    Flag(bool),
}

impl FieldValue {
    /// Returns the string form passed to the engine.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Integer(number) | Self::Number(number) => number.to_string(),
            Self::Flag(flag) => flag.to_string(),
        }
    }

    /// Returns the value as a non-negative integer when it is one.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Integer(number) => number.as_u64(),
            _ => None,
        }
    }

    /// Returns the value as text when it is a string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the boolean value when it is a flag.
    #[must_use]
    pub const fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Converts back to JSON.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Integer(number) | Self::Number(number) => Value::Number(number.clone()),
            Self::Flag(flag) => Value::Bool(*flag),
        }
    }
}

/// Validated simulation config with defaults filled.
///
/// # Invariants
/// - Every key names a config field in the schema registry.
/// - Every value matches its field's declared type and enum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedConfig {
    /// Field values keyed by registry name.
    values: BTreeMap<&'static str, FieldValue>,
}

impl ValidatedConfig {
    /// Returns the value of a field when present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Returns true when the field is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the string value of a field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    /// Returns the number of fields present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no fields are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Renders the config as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> =
            self.values.iter().map(|(name, value)| ((*name).to_string(), value.to_json())).collect();
        Value::Object(map)
    }
}

/// Fully validated tool request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Requested operation.
    pub operation: OperationName,
    /// Validated config when one was supplied.
    pub config: Option<ValidatedConfig>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Validation scope used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Top-level request keys.
    Request,
    /// Keys inside `config`.
    Config,
}

impl Scope {
    /// Returns the noun used in messages.
    const fn noun(self) -> &'static str {
        match self {
            Self::Request => "parameters",
            Self::Config => "config parameters",
        }
    }
}

/// First validation failure encountered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Request is not a JSON object.
    #[error("Invalid input format. Expected dictionary with tool parameters.")]
    InvalidInput,
    /// Keys outside the schema were supplied.
    #[error(
        "Unexpected {} provided: {}. Expected {} are: {}. Please consult the readme.",
        .scope.noun(),
        .names.join(", "),
        .scope.noun(),
        .expected.join(", ")
    )]
    UnexpectedParameter {
        /// Scope of the offending keys.
        scope: Scope,
        /// Offending keys, sorted.
        names: Vec<String>,
        /// Valid keys, sorted.
        expected: Vec<&'static str>,
    },
    /// Required keys are absent.
    #[error(
        "Missing required {}: {}. Required {} are: {}",
        .scope.noun(),
        .names.join(", "),
        .scope.noun(),
        .required.join(", ")
    )]
    MissingRequired {
        /// Scope of the missing keys.
        scope: Scope,
        /// Missing keys, sorted.
        names: Vec<&'static str>,
        /// Every required key, sorted.
        required: Vec<&'static str>,
    },
    /// A value has the wrong JSON type.
    #[error("Parameter '{field}' must be {}, got {actual}", type_phrase(.expected))]
    TypeMismatch {
        /// Field name.
        field: &'static str,
        /// Declared type.
        expected: SemanticType,
        /// Observed JSON type name.
        actual: &'static str,
    },
    /// A value is outside its enum.
    #[error("Parameter '{field}' must be one of [{}], got '{actual}'", .allowed.join(", "))]
    EnumViolation {
        /// Field name.
        field: &'static str,
        /// Permitted values.
        allowed: Vec<&'static str>,
        /// Rejected value.
        actual: String,
    },
    /// The operation name does not resolve.
    #[error("Unknown operation: '{name}'. Available operations: {}", .valid.join(", "))]
    UnknownOperation {
        /// Requested operation name.
        name: String,
        /// Valid operation names.
        valid: Vec<&'static str>,
    },
}

/// Returns the type phrase with its article.
const fn type_phrase(semantic_type: &SemanticType) -> &'static str {
    match semantic_type {
        SemanticType::String => "a string",
        SemanticType::Integer => "an integer",
        SemanticType::Number => "a number",
        SemanticType::Boolean => "a boolean",
        SemanticType::Object => "an object/dictionary",
    }
}

// ============================================================================
// SECTION: Request Validation
// ============================================================================

/// Unwraps an optional `{"input": {...}}` wrapper.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidInput`] when the request or the wrapped
/// value is not an object.
pub fn unwrap_input(raw: &Value) -> Result<&Map<String, Value>, ValidationError> {
    let object = raw.as_object().ok_or(ValidationError::InvalidInput)?;
    match object.get(INPUT_WRAPPER) {
        Some(inner) => inner.as_object().ok_or(ValidationError::InvalidInput),
        None => Ok(object),
    }
}

/// Validates an unwrapped request object.
///
/// # Errors
///
/// Returns the first [`ValidationError`] in check order.
pub fn validate_request(request: &Map<String, Value>) -> Result<ValidatedRequest, ValidationError> {
    let request_specs: Vec<&'static FieldSpec> = REQUEST_FIELDS.iter().collect();
    check_unexpected(Scope::Request, request, &request_specs)?;

    let spec = resolve_operation(request)?;
    let required = spec.map_or(BASELINE_REQUEST_FIELDS, |spec| spec.required_request_fields);
    check_missing(Scope::Request, request, required)?;
    check_types(request, &request_specs)?;
    check_enums(request, &request_specs)?;

    // Type and enum checks accept only resolvable operation strings.
    let Some(spec) = spec else {
        return Err(unknown_operation(request.get(OPERATION_FIELD)));
    };
    let config = match request.get(CONFIG_FIELD).and_then(Value::as_object) {
        Some(config) => Some(validate_config_object(config, spec.required_config_fields)?),
        None => None,
    };
    Ok(ValidatedRequest { operation: spec.name, config })
}

/// Validates a `config` object against the config field table.
///
/// # Errors
///
/// Returns the first [`ValidationError`] in check order.
pub fn validate_config_object(
    config: &Map<String, Value>,
    required: &[&'static str],
) -> Result<ValidatedConfig, ValidationError> {
    let config_specs: Vec<&'static FieldSpec> =
        CONFIG_FIELDS.iter().map(|field| &field.spec).collect();
    check_unexpected(Scope::Config, config, &config_specs)?;
    check_missing(Scope::Config, config, required)?;
    check_types(config, &config_specs)?;
    check_enums(config, &config_specs)?;

    let mut values = BTreeMap::new();
    for spec in config_specs {
        match config.get(spec.name) {
            Some(value) => {
                values.insert(spec.name, typed_value(spec, value)?);
            }
            None => {
                if let Some(default) = spec.default {
                    values.insert(spec.name, typed_value(spec, &default.to_value())?);
                }
            }
        }
    }
    Ok(ValidatedConfig { values })
}

/// Resolves the operation spec when `operation` is a string.
fn resolve_operation(
    request: &Map<String, Value>,
) -> Result<Option<&'static OperationSpec>, ValidationError> {
    match request.get(OPERATION_FIELD) {
        Some(Value::String(name)) => operation_spec_by_name(name)
            .map(Some)
            .ok_or_else(|| ValidationError::UnknownOperation {
                name: name.clone(),
                valid: operation_names(),
            }),
        _ => Ok(None),
    }
}

/// Builds an unknown operation error for a raw value.
fn unknown_operation(value: Option<&Value>) -> ValidationError {
    let name = match value {
        Some(Value::String(name)) => name.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    ValidationError::UnknownOperation { name, valid: operation_names() }
}

// ============================================================================
// SECTION: Generic Checks
// ============================================================================

/// Step 1: rejects keys without a descriptor.
fn check_unexpected(
    scope: Scope,
    object: &Map<String, Value>,
    specs: &[&'static FieldSpec],
) -> Result<(), ValidationError> {
    let known: BTreeSet<&str> = specs.iter().map(|spec| spec.name).collect();
    let unexpected: Vec<String> =
        object.keys().filter(|key| !known.contains(key.as_str())).cloned().collect();
    if unexpected.is_empty() {
        return Ok(());
    }
    let mut names = unexpected;
    names.sort();
    Err(ValidationError::UnexpectedParameter {
        scope,
        names,
        expected: known.into_iter().collect(),
    })
}

/// Step 3: rejects absent required keys.
fn check_missing(
    scope: Scope,
    object: &Map<String, Value>,
    required: &[&'static str],
) -> Result<(), ValidationError> {
    let mut missing: Vec<&'static str> =
        required.iter().copied().filter(|name| !object.contains_key(*name)).collect();
    if missing.is_empty() {
        return Ok(());
    }
    missing.sort_unstable();
    let mut all: Vec<&'static str> = required.to_vec();
    all.sort_unstable();
    Err(ValidationError::MissingRequired { scope, names: missing, required: all })
}

/// Step 4: rejects values whose JSON type does not match the descriptor.
fn check_types(
    object: &Map<String, Value>,
    specs: &[&'static FieldSpec],
) -> Result<(), ValidationError> {
    for spec in specs {
        if let Some(value) = object.get(spec.name)
            && !type_matches(spec.semantic_type, value)
        {
            return Err(ValidationError::TypeMismatch {
                field: spec.name,
                expected: spec.semantic_type,
                actual: json_type_name(value),
            });
        }
    }
    Ok(())
}

/// Step 5: rejects string values outside the descriptor's enum.
fn check_enums(
    object: &Map<String, Value>,
    specs: &[&'static FieldSpec],
) -> Result<(), ValidationError> {
    for spec in specs.iter().filter(|spec| !spec.allowed.is_empty()) {
        if let Some(value) = object.get(spec.name) {
            let text = value.as_str().unwrap_or_default();
            if !spec.allowed.contains(&text) {
                let actual = value.as_str().map_or_else(|| value.to_string(), str::to_string);
                return Err(ValidationError::EnumViolation {
                    field: spec.name,
                    allowed: spec.allowed.to_vec(),
                    actual,
                });
            }
        }
    }
    Ok(())
}

/// Returns true when a JSON value satisfies a semantic type.
fn type_matches(semantic_type: SemanticType, value: &Value) -> bool {
    match semantic_type {
        SemanticType::String => value.is_string(),
        SemanticType::Integer => value.is_i64() || value.is_u64(),
        SemanticType::Number => value.is_number(),
        SemanticType::Boolean => value.is_boolean(),
        SemanticType::Object => value.is_object(),
    }
}

/// Returns the JSON type name used in messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) => {
            if number.is_f64() {
                "number"
            } else {
                "integer"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Converts a type-checked JSON value into a [`FieldValue`].
fn typed_value(spec: &'static FieldSpec, value: &Value) -> Result<FieldValue, ValidationError> {
    let mismatch = || ValidationError::TypeMismatch {
        field: spec.name,
        expected: spec.semantic_type,
        actual: json_type_name(value),
    };
    match (spec.semantic_type, value) {
        (SemanticType::String, Value::String(text)) => Ok(FieldValue::Text(text.clone())),
        (SemanticType::Integer, Value::Number(number)) if !number.is_f64() => {
            Ok(FieldValue::Integer(number.clone()))
        }
        (SemanticType::Number, Value::Number(number)) => Ok(FieldValue::Number(number.clone())),
        (SemanticType::Boolean, Value::Bool(flag)) => Ok(FieldValue::Flag(*flag)),
        _ => Err(mismatch()),
    }
}
