//! Dataset context tools.
//!
//! Tools: content_dataset_current, content_dataset_switch

use serde_json::{Map, Value as JsonValue};

use crate::convert::get_string_arg;
use crate::error::{McpError, Result};
use crate::schema;
use crate::session::McpSession;
use crate::tools::ToolDef;

/// Get all dataset tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "content_dataset_current",
            "Get the current project and dataset. All document, query and schema tools \
             operate on this dataset.",
            schema!(object {}),
        ),
        ToolDef::new(
            "content_dataset_switch",
            "Switch to another dataset of the same project. Its schema is compiled on \
             first use and cached.",
            schema!(object {
                required: { "dataset": string }
            }),
        ),
    ]
}

/// Dispatch a dataset tool call.
pub fn dispatch(
    session: &mut McpSession,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "content_dataset_current" => Ok(current(session)),
        "content_dataset_switch" => {
            let dataset = get_string_arg(&args, "dataset")?;
            session.switch_dataset(&dataset)?;
            Ok(current(session))
        }
        _ => Err(McpError::UnknownTool(name.to_string())),
    }
}

fn current(session: &McpSession) -> JsonValue {
    serde_json::json!({
        "project": session.dataset().project,
        "dataset": session.dataset().dataset,
        "readOnly": session.is_read_only(),
    })
}
