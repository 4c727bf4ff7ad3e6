// crates/fluid-gate-mcp/tests/translate.rs
// ============================================================================
// Module: Config Translator Tests
// Description: Golden token output and flag properties.
// Purpose: Keep invocation tokens deterministic and field-local.
// Dependencies: fluid-gate-mcp, proptest
// ============================================================================

//! Config translator golden and property tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions use unwrap for clarity."
)]

use fluid_gate_contract::Encoding;
use fluid_gate_contract::operation::SIMULATION_REQUIRED_FIELDS;
use fluid_gate_contract::schema::CONFIG_FIELDS;
use fluid_gate_mcp::ValidatedConfig;
use fluid_gate_mcp::translate;
use fluid_gate_mcp::validation::validate_config_object;
use proptest::prelude::*;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

fn config(raw: &Value, required: &[&'static str]) -> ValidatedConfig {
    validate_config_object(raw.as_object().unwrap(), required).unwrap()
}

fn base() -> Value {
    json!({
        "stl_file": "/meshes/wing.stl",
        "velocity_set": "D3Q27",
        "resolution": 15400,
        "velocity": 7.0,
        "reynolds": 535_000_000,
        "simulation_time": 5.0,
        "collision_operator": "SRT",
    })
}

fn tokens(raw: &Value) -> Vec<String> {
    translate(&config(raw, &[])).into_vec()
}

/// Boolean flag fields with their tokens.
fn flag_fields() -> Vec<(&'static str, &'static str)> {
    CONFIG_FIELDS
        .iter()
        .filter_map(|field| match field.encoding {
            Encoding::Flag(flag) => Some((field.spec.name, flag)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// SECTION: Golden Output
// ============================================================================

#[test]
fn required_config_translates_in_declaration_order() {
    let args = translate(&config(&base(), SIMULATION_REQUIRED_FIELDS));
    assert_eq!(
        args.joined(),
        "--D3Q27 --SRT -f /meshes/wing.stl -r 15400 -u 7.0 --re 535000000 --secs 5.0 --export \
         export/"
    );
}

#[test]
fn optional_values_and_flags_are_encoded() {
    let mut raw = base();
    raw["rotation_z"] = json!(-90);
    raw["density"] = json!(1.225);
    raw["export_path"] = json!("runs/wing");
    raw["frame_width"] = json!(1920);
    raw["display"] = json!("0");
    raw["enable_graphics"] = json!(true);
    raw["enable_fp16s"] = json!(true);
    raw["allow_sleep"] = json!(false);
    let args = tokens(&raw);
    let joined = args.join(" ");
    assert!(joined.contains("--rotz -90"));
    assert!(joined.contains("--rho 1.225"));
    assert!(joined.contains("--export runs/wing"));
    assert!(joined.contains("--FRAME_WIDTH 1920"));
    assert!(joined.contains("-d 0"));
    assert!(joined.ends_with("--GRAPHICS --FP16S"));
    assert!(!joined.contains("--allowsleep"));
}

#[test]
fn time_steps_emitted_only_without_simulation_time() {
    let mut raw = base();
    raw["time_steps"] = json!(20_000);
    assert!(!tokens(&raw).contains(&"-t".to_string()));

    raw.as_object_mut().unwrap().remove("simulation_time");
    let args = tokens(&raw);
    let position = args.iter().position(|token| token == "-t").unwrap();
    assert_eq!(args[position + 1], "20000");
    assert!(!args.contains(&"--secs".to_string()));
}

#[test]
fn absent_fields_emit_nothing() {
    let args = tokens(&json!({"velocity_set": "D2Q9"}));
    assert_eq!(args, vec!["--D2Q9", "--export", "export/"]);
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn flags_appear_once_when_true_and_never_otherwise(
        choices in proptest::collection::vec(
            prop_oneof![Just(None), Just(Some(false)), Just(Some(true))],
            flag_fields().len(),
        )
    ) {
        let flags = flag_fields();
        let mut raw = base();
        let object: &mut Map<String, Value> = raw.as_object_mut().unwrap();
        for ((name, _), choice) in flags.iter().zip(&choices) {
            if let Some(value) = choice {
                object.insert((*name).to_string(), Value::Bool(*value));
            }
        }
        let args = tokens(&raw);
        for ((_, flag), choice) in flags.iter().zip(&choices) {
            let count = args.iter().filter(|token| token.as_str() == *flag).count();
            let expected = usize::from(*choice == Some(true));
            prop_assert_eq!(count, expected, "{}", flag);
        }
    }

    #[test]
    fn translation_is_deterministic(
        resolution in 1u64..100_000,
        velocity in 0.0f64..500.0,
        graphics in any::<bool>()
    ) {
        let mut raw = base();
        raw["resolution"] = json!(resolution);
        raw["velocity"] = json!(velocity);
        raw["enable_graphics"] = json!(graphics);
        let validated = config(&raw, SIMULATION_REQUIRED_FIELDS);
        let first = translate(&validated);
        let second = translate(&validated.clone());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.into_vec(), tokens(&raw));
    }
}
