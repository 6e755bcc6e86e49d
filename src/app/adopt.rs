//! Device adoption description.
//!
//! Published on `stat/<id>/adopt` whenever the broker connection comes up so
//! a controller can discover what this device accepts.  Carries firmware
//! identity plus JSON-schema descriptions of the config and command payloads,
//! with index bounds taken from the discovered hardware.

use serde_json::{json, Value};

use crate::io::taxonomy::InputType;

pub const FW_NAME: &str = "OXRS-AC-StateIO-ESP32-FW";
pub const FW_SHORT_NAME: &str = "StateIO";
pub const FW_MAKER: &str = "Austin's Creations";
pub const FW_VERSION: &str = env!("CARGO_PKG_VERSION");

const JSON_SCHEMA_VERSION: &str = "http://json-schema.org/draft-07/schema#";

/// Index bounds advertised in the schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub max_output_index: u16,
    pub max_input_index: u16,
}

pub fn firmware_json() -> Value {
    json!({
        "name": FW_NAME,
        "shortName": FW_SHORT_NAME,
        "maker": FW_MAKER,
        "version": FW_VERSION,
    })
}

pub fn config_schema(cap: Capacity) -> Value {
    let input_types: Vec<&str> = InputType::ALL.iter().map(|t| t.as_str()).collect();
    json!({
        "$schema": JSON_SCHEMA_VERSION,
        "title": FW_SHORT_NAME,
        "type": "object",
        "properties": {
            "outputsPerMcp": {
                "title": "Outputs per expander",
                "type": "integer",
                "minimum": 1,
                "maximum": 16,
            },
            "defaultOutputType": {
                "title": "Default output type",
                "enum": ["relay", "motor", "timer"],
            },
            "outputs": {
                "title": "Output configuration",
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "index": { "type": "integer", "minimum": 1, "maximum": cap.max_output_index },
                        "type": { "enum": ["relay", "motor", "timer"] },
                        "timerSeconds": { "type": ["integer", "null"], "minimum": 0 },
                        "interlockIndex": { "type": ["integer", "null"], "minimum": 1, "maximum": cap.max_output_index },
                    },
                    "required": ["index"],
                },
            },
            "defaultInputType": {
                "title": "Default input type",
                "enum": input_types,
            },
            "inputs": {
                "title": "Input configuration",
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "index": { "type": "integer", "minimum": 1, "maximum": cap.max_input_index },
                        "type": { "enum": input_types },
                        "invert": { "type": "boolean" },
                        "disabled": { "type": "boolean" },
                    },
                    "required": ["index"],
                },
            },
        },
    })
}

pub fn command_schema(cap: Capacity) -> Value {
    json!({
        "$schema": JSON_SCHEMA_VERSION,
        "title": FW_SHORT_NAME,
        "type": "object",
        "properties": {
            "outputs": {
                "title": "Output commands",
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "index": { "type": "integer", "minimum": 1, "maximum": cap.max_output_index },
                        "type": { "enum": ["relay", "motor", "timer"] },
                        "command": { "type": ["string", "null"], "enum": ["query", "on", "off", null] },
                    },
                    "required": ["index"],
                },
            },
        },
    })
}

/// Full adoption document.  `extra` lets the device binary attach its
/// `system` / `network` sections.
pub fn adoption(cap: Capacity, extra: Option<Value>) -> Value {
    let mut doc = json!({
        "firmware": firmware_json(),
        "configSchema": config_schema(cap),
        "commandSchema": command_schema(cap),
    });
    if let (Some(Value::Object(extra)), Value::Object(doc)) = (extra, &mut doc) {
        doc.extend(extra);
    }
    doc
}
