//! Inbound payloads on the config and command topics.
//!
//! Every top-level field of a config payload is decoded on its own, and the
//! `outputs` / `inputs` lists stay raw [`serde_json::Value`]s so each entry
//! can be decoded on its own too.  One malformed field or entry never
//! discards its siblings.

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Configuration payload (`conf/<id>`).  Also the persisted snapshot shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs_per_mcp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_output_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_input_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<serde_json::Value>,
    /// Top-level fields dropped for having the wrong type.
    #[serde(skip)]
    pub rejected: u16,
}

/// One element of `outputs` in a [`ConfigPayload`].
///
/// `timerSeconds` and `interlockIndex` distinguish absent (leave alone) from
/// `null` (reset).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub timer_seconds: Option<Option<u32>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub interlock_index: Option<Option<i64>>,
}

/// One element of `inputs` in a [`ConfigPayload`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invert: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

/// Command payload (`cmnd/<id>`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommandPayload {
    #[serde(default)]
    pub outputs: Vec<serde_json::Value>,
}

/// One element of `outputs` in a [`CommandPayload`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutputCommand {
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Absent and `null` both mean `query`.
    #[serde(default)]
    pub command: Option<String>,
}

/// Present-but-null becomes `Some(None)`; `#[serde(default)]` covers absent.
fn nullable<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

/// Decode one list entry.
pub fn decode_entry<'a, T: Deserialize<'a>>(raw: &'a serde_json::Value) -> Result<T, ValidationError> {
    T::deserialize(raw).map_err(|_| ValidationError::MalformedPayload)
}

impl ConfigPayload {
    /// Only a payload that is not a JSON object fails as a whole.  A `null`
    /// field counts as absent.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        let map: Map<String, Value> =
            serde_json::from_slice(bytes).map_err(|_| ValidationError::MalformedPayload)?;

        let mut payload = Self::default();
        payload.outputs_per_mcp = payload.field(&map, "outputsPerMcp");
        payload.default_output_type = payload.field(&map, "defaultOutputType");
        payload.outputs = payload.field(&map, "outputs").unwrap_or_default();
        payload.default_input_type = payload.field(&map, "defaultInputType");
        payload.inputs = payload.field(&map, "inputs").unwrap_or_default();
        Ok(payload)
    }

    fn field<'a, T: Deserialize<'a>>(&mut self, map: &'a Map<String, Value>, key: &str) -> Option<T> {
        match map.get(key) {
            None | Some(Value::Null) => None,
            Some(raw) => match T::deserialize(raw) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("config: {} has the wrong type, skipped", key);
                    self.rejected += 1;
                    None
                }
            },
        }
    }
}

impl CommandPayload {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(bytes).map_err(|_| ValidationError::MalformedPayload)
    }
}
