// crates/fluid-gate-mcp/src/translate.rs
// ============================================================================
// Module: Config Translator
// Description: Maps a validated config to engine invocation tokens.
// Purpose: Deterministic, table-driven argv construction.
// Dependencies: fluid-gate-contract
// ============================================================================

//! ## Overview
//! The translator walks the config field table in declaration order and
//! applies each field's [`Encoding`] uniformly. Output depends only on the
//! [`ValidatedConfig`], so the same config always yields identical tokens.

// ============================================================================
// SECTION: Imports
// ============================================================================

use fluid_gate_contract::Encoding;
use fluid_gate_contract::schema::CONFIG_FIELDS;

use crate::validation::ValidatedConfig;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Ordered engine invocation tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationArgs(Vec<String>);

impl InvocationArgs {
    /// Returns the tokens in emission order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Consumes the args and returns the tokens.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    /// Returns the tokens joined by spaces for logging.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0.join(" ")
    }
}

impl From<Vec<String>> for InvocationArgs {
    fn from(tokens: Vec<String>) -> Self {
        Self(tokens)
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates a validated config into invocation tokens.
#[must_use]
pub fn translate(config: &ValidatedConfig) -> InvocationArgs {
    let mut tokens = Vec::new();
    for field in CONFIG_FIELDS {
        let Some(value) = config.get(field.spec.name) else {
            continue;
        };
        match field.encoding {
            Encoding::Valued(flag) => {
                tokens.push(flag.to_string());
                tokens.push(value.render());
            }
            Encoding::Flag(flag) => {
                if value.as_flag() == Some(true) {
                    tokens.push(flag.to_string());
                }
            }
            Encoding::Mode => tokens.push(format!("--{}", value.render())),
            Encoding::ValuedUnlessPresent { flag, superseded_by } => {
                if !config.contains(superseded_by) {
                    tokens.push(flag.to_string());
                    tokens.push(value.render());
                }
            }
        }
    }
    InvocationArgs(tokens)
}
