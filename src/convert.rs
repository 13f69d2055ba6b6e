//! Conversion utilities between tool arguments and typed values.
//!
//! Tool arguments arrive as a JSON object; these helpers pull individual
//! arguments out of it and turn typed results back into JSON for MCP
//! responses.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::{McpError, Result};

/// Convert any serializable result to JSON for an MCP response.
pub fn to_json<T: Serialize>(value: &T) -> Result<JsonValue> {
    serde_json::to_value(value).map_err(|e| McpError::Internal(e.to_string()))
}

/// Deserialize a required argument into `T`.
pub fn get_typed_arg<T: DeserializeOwned>(args: &Map<String, JsonValue>, name: &str) -> Result<T> {
    let raw = args
        .get(name)
        .cloned()
        .ok_or_else(|| McpError::MissingArg(name.to_string()))?;
    serde_json::from_value(raw).map_err(|e| McpError::InvalidArg {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Deserialize the whole argument object into `T`. Keys `T` does not know
/// are ignored unless `T` denies them.
pub fn from_args<T: DeserializeOwned>(args: &Map<String, JsonValue>) -> Result<T> {
    serde_json::from_value(JsonValue::Object(args.clone())).map_err(|e| McpError::InvalidArg {
        name: "arguments".to_string(),
        reason: e.to_string(),
    })
}

/// Helper to get a required string argument from JSON arguments.
pub fn get_string_arg(args: &Map<String, JsonValue>, name: &str) -> Result<String> {
    args.get(name)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| McpError::MissingArg(name.to_string()))
}

/// Helper to get an optional string argument from JSON arguments.
pub fn get_optional_string(args: &Map<String, JsonValue>, name: &str) -> Option<String> {
    args.get(name).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Helper to get a required value argument.
pub fn get_value_arg(args: &Map<String, JsonValue>, name: &str) -> Result<JsonValue> {
    args.get(name)
        .cloned()
        .ok_or_else(|| McpError::MissingArg(name.to_string()))
}

/// Helper to get an optional object argument; a missing or null argument is
/// an empty object.
pub fn get_optional_object(
    args: &Map<String, JsonValue>,
    name: &str,
) -> Result<Map<String, JsonValue>> {
    match args.get(name) {
        None | Some(JsonValue::Null) => Ok(Map::new()),
        Some(JsonValue::Object(map)) => Ok(map.clone()),
        Some(_) => Err(McpError::InvalidArg {
            name: name.to_string(),
            reason: "Expected an object".to_string(),
        }),
    }
}
