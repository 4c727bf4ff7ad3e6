// crates/fluid-gate-contract/src/docs.rs
// ============================================================================
// Module: Tool Documentation
// Description: MCP tool definition, readme text, and request examples.
// Purpose: Render the documentation served by the `readme` operation.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Builds the single MCP tool definition (`fluidx3d`) advertised by
//! `tools/list`, and the readme document returned by the `readme` operation
//! and re-attached to validation failures. The readme embeds the unlock token
//! of the running gateway, so it is rendered per gateway instance.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::operation::OperationName;
use crate::operation::SIMULATION_REQUIRED_FIELDS;
use crate::schema::CONFIG_FIELD;
use crate::schema::OPERATION_FIELD;
use crate::schema::TOKEN_FIELD;
use crate::schema::config_field;
use crate::schema::request_json_schema;

// ============================================================================
// SECTION: Types
// ============================================================================

/// MCP tool name exposed by the gateway.
pub const TOOL_NAME: &str = "fluidx3d";

/// Tool definition used by MCP tool listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// MCP tool name.
    pub name: String,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Documented request example.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolExample {
    /// Heading shown in the readme.
    pub title: &'static str,
    /// Request body, already wrapped in `{"input": ...}`.
    pub request: Value,
}

// ============================================================================
// SECTION: Tool Definition
// ============================================================================

/// Returns the MCP tool definition for `tools/list`.
#[must_use]
pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: "Run GPU-accelerated Computational Fluid Dynamics (CFD) simulations using \
                      FluidX3D.\n- Use this tool when you need to perform real-time interactive \
                      CFD simulations with GPU acceleration\n- Supports loading 3D models (.stl \
                      files), configuring simulation parameters, and interactive visualization\n"
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "object",
                    "description": "All tool parameters are passed in this single dict. Use \
                                    {\"input\":{\"operation\":\"readme\"}} to get full \
                                    documentation, parameters, and an unlock token."
                }
            },
            "required": []
        }),
    }
}

// ============================================================================
// SECTION: Examples
// ============================================================================

/// Returns the documented request examples bound to `token`.
#[must_use]
pub fn examples(token: &str) -> Vec<ToolExample> {
    vec![
        ToolExample {
            title: "Get Documentation (readme)",
            request: json!({ "input": { OPERATION_FIELD: OperationName::Readme.as_str() } }),
        },
        ToolExample {
            title: "Get Version Info",
            request: json!({ "input": {
                OPERATION_FIELD: OperationName::GetVersion.as_str(),
                TOKEN_FIELD: token
            } }),
        },
        ToolExample {
            title: "List Available OpenCL Devices",
            request: json!({ "input": {
                OPERATION_FIELD: OperationName::ListDevices.as_str(),
                TOKEN_FIELD: token
            } }),
        },
        ToolExample {
            title: "Validate Configuration (without running)",
            request: json!({ "input": {
                OPERATION_FIELD: OperationName::ValidateConfig.as_str(),
                CONFIG_FIELD: {
                    "stl_file": "LZ_129_Hindenburg.stl",
                    "velocity_set": "D3Q27",
                    "resolution": 15400,
                    "velocity": 7.0,
                    "reynolds": 535_000_000,
                    "simulation_time": 5.0,
                    "collision_operator": "SRT"
                },
                TOKEN_FIELD: token
            } }),
        },
        ToolExample {
            title: "Simple Wing Simulation",
            request: json!({ "input": {
                OPERATION_FIELD: OperationName::RunSimulation.as_str(),
                CONFIG_FIELD: {
                    "stl_file": "wing.stl",
                    "velocity_set": "D3Q19",
                    "resolution": 4096,
                    "velocity": 25.0,
                    "reynolds": 1_000_000,
                    "simulation_time": 5.0,
                    "collision_operator": "SRT",
                    "enable_graphics": false
                },
                TOKEN_FIELD: token
            } }),
        },
        ToolExample {
            title: "Hindenburg Airship with Interactive Graphics",
            request: json!({ "input": {
                OPERATION_FIELD: OperationName::RunSimulation.as_str(),
                CONFIG_FIELD: {
                    "stl_file": "LZ_129_Hindenburg.stl",
                    "velocity_set": "D3Q27",
                    "resolution": 15400,
                    "velocity": 7.0,
                    "reynolds": 535_000_000,
                    "simulation_time": 10.0,
                    "enable_graphics": true,
                    "window_mode": true,
                    "enable_subgrid": true,
                    "enable_fp16s": true,
                    "collision_operator": "SRT",
                    "export_path": "output/",
                    "angle_of_attack": 0.0
                },
                TOKEN_FIELD: token
            } }),
        },
        ToolExample {
            title: "Quick Benchmark Test",
            request: json!({ "input": {
                OPERATION_FIELD: OperationName::RunSimulation.as_str(),
                CONFIG_FIELD: {
                    "stl_file": "sphere.stl",
                    "velocity_set": "D3Q19",
                    "resolution": 256,
                    "velocity": 1.0,
                    "reynolds": 100,
                    "simulation_time": 1.0,
                    "collision_operator": "SRT",
                    "enable_graphics": false
                },
                TOKEN_FIELD: token
            } }),
        },
    ]
}

// ============================================================================
// SECTION: Readme
// ============================================================================

/// Static readme sections following the generated examples.
const README_FOOTER: &str = "\
## Optional Parameters
Every other config field is optional. Boolean feature flags default to false
and are only passed to the engine when true. export_path defaults to \"export/\".
time_steps is ignored when simulation_time is set.

## Interactive Controls (when graphics enabled)
- **Mouse**: Rotate view
- **WASD**: Move camera
- **Q/E**: Move up/down
- **Space**: Pause/resume simulation
- **R**: Reset camera
- **F1-F12**: Toggle visualization modes
- **ESC**: Exit simulation

## Notes
1. Relative stl_file paths resolve against the engine working directory
2. Higher resolution requires more GPU memory (D3Q27 @ 15400 needs ~16GB VRAM)
3. Simulations block until the engine returns
4. Results are exported to export_path
5. Closing the graphics window ends the engine process; the gateway reports it
   as status \"exited\" rather than an error
6. Device enumeration is not implemented; list_devices returns a placeholder

## Velocity Set Comparison
- **D2Q9**: 2D simulations only
- **D3Q15**: Fast, less accurate, low memory
- **D3Q19**: Good balance (standard)
- **D3Q27**: Most accurate, highest memory usage (recommended for research)

## Typical Reynolds Numbers
- **Sphere/cylinder**: 100-1000 (laminar), 10000+ (turbulent)
- **Aircraft/vehicles**: 1,000,000 - 100,000,000
- **Large airships**: 100,000,000 - 1,000,000,000
";

/// Renders the readme markdown bound to `token`.
#[must_use]
pub fn readme_markdown(token: &str) -> String {
    let mut out = String::new();
    out.push_str("FluidX3D - GPU-Accelerated Computational Fluid Dynamics\n\n");
    out.push_str(
        "Real-time interactive Lattice Boltzmann CFD simulations with full GPU acceleration.\nThis \
         tool validates a simulation config and runs the FluidX3D engine binary with it.\n\n",
    );
    out.push_str("## Requirements\n");
    out.push_str("- OpenCL-capable GPU (NVIDIA, AMD, or Intel)\n");
    out.push_str("- OpenCL runtime (GPU drivers or Intel CPU Runtime)\n");
    out.push_str("- FluidX3D engine binary configured under [engine] in the gateway config\n\n");
    out.push_str("## Usage-Safety Token System\n");
    let _ = writeln!(out, "Your {TOKEN_FIELD} for this installation is: {token}\n");
    let _ = writeln!(
        out,
        "You MUST include {TOKEN_FIELD} in the input dict for all operations except readme.\n"
    );
    out.push_str("## Operations\n\n");
    for (index, example) in examples(token).iter().enumerate() {
        let rendered = serde_json::to_string_pretty(&example.request).unwrap_or_default();
        let _ = writeln!(out, "### {}. {}\n{rendered}\n", index + 1, example.title);
    }
    out.push_str("## Required Parameters\n");
    for name in SIMULATION_REQUIRED_FIELDS {
        if let Some(field) = config_field(name) {
            let _ = writeln!(out, "- **{name}**: {}", field.spec.description);
        }
    }
    out.push('\n');
    out.push_str(README_FOOTER);
    out
}

/// Returns the readme document as `{description, parameters}`.
#[must_use]
pub fn readme_document(token: &str) -> Value {
    json!({
        "description": readme_markdown(token),
        "parameters": request_json_schema(),
    })
}

/// Renders the readme document as pretty JSON text.
#[must_use]
pub fn readme_text(token: &str) -> String {
    serde_json::to_string_pretty(&readme_document(token)).unwrap_or_default()
}
