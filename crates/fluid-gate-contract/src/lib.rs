// crates/fluid-gate-contract/src/lib.rs
// ============================================================================
// Module: Fluid Gate Contract Library
// Description: Schema registry and tool documentation for the FluidX3D tool.
// Purpose: Single source of truth for field descriptors and operation names.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The contract library holds the static, read-only description of the
//! `fluidx3d` tool surface: operation names and their required fields, the
//! config field table with invocation encodings, and the documentation served
//! by the `readme` operation. Validation, translation, and MCP listing are all
//! driven from these tables.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod docs;
pub mod operation;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use docs::TOOL_NAME;
pub use docs::ToolDefinition;
pub use operation::OperationName;
pub use operation::OperationSpec;
pub use operation::operation_spec;
pub use schema::ConfigField;
pub use schema::Encoding;
pub use schema::FieldDefault;
pub use schema::FieldSpec;
pub use schema::SemanticType;
pub use schema::config_field;
pub use schema::field_spec;
