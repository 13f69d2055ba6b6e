//! Path tools.
//!
//! Tools: content_path_parse, content_path_serialize

use serde_json::{Map, Value as JsonValue};

use crate::convert::{get_string_arg, get_typed_arg, to_json};
use crate::error::{McpError, Result};
use crate::path::{PathAddress, PathSegment};
use crate::schema;
use crate::tools::ToolDef;

/// Get all path tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "content_path_parse",
            "Parse a field path such as body[_key==\"a1\"].children[0].text into segments. \
             Returns {path, segments} where path is the canonical form. Each segment is \
             {property}, {index}, {indexRange: [from, to]} or {keyMatch}.",
            schema!(object {
                required: { "path": string }
            }),
        ),
        ToolDef::new(
            "content_path_serialize",
            "Render a list of path segments (as returned by content_path_parse) into the \
             canonical path string.",
            schema!(object {
                required: { "segments": array_object }
            }),
        ),
    ]
}

/// Dispatch a path tool call.
pub fn dispatch(name: &str, args: Map<String, JsonValue>) -> Result<JsonValue> {
    match name {
        "content_path_parse" => {
            let raw = get_string_arg(&args, "path")?;
            let path = PathAddress::parse(&raw)?;
            describe(&path)
        }
        "content_path_serialize" => {
            let segments: Vec<PathSegment> = get_typed_arg(&args, "segments")?;
            let path = PathAddress::from_segments(segments)?;
            describe(&path)
        }
        _ => Err(McpError::UnknownTool(name.to_string())),
    }
}

fn describe(path: &PathAddress) -> Result<JsonValue> {
    Ok(serde_json::json!({
        "path": path.to_string(),
        "segments": to_json(&path.segments())?,
    }))
}
