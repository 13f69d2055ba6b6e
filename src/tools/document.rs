//! Document read tools.
//!
//! Tools: content_document_get, content_query

use serde_json::{json, Map, Value as JsonValue};

use crate::convert::{get_optional_object, get_string_arg};
use crate::error::{McpError, Result};
use crate::schema;
use crate::session::McpSession;
use crate::tools::ToolDef;

/// Get all document read tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "content_document_get",
            "Get a document by id from the current dataset. Returns null if it doesn't exist. \
             The _rev attribute can be passed as ifRevisionID to content_patch.",
            schema!(object {
                required: { "id": string }
            }),
        ),
        ToolDef::new(
            "content_query",
            "Run a filter query against the current dataset, e.g. *[_type == \"post\" && \
             slug.current == $slug]. Conditions are path == value or path != value joined \
             with &&; $name values come from params. Returns {count, documents}.",
            schema!(object {
                required: { "query": string },
                optional: { "params": object }
            }),
        ),
    ]
}

/// Dispatch a document read tool call.
pub async fn dispatch(
    session: &mut McpSession,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "content_document_get" => {
            let id = get_string_arg(&args, "id")?;
            let doc = session
                .store()
                .fetch_document(session.dataset(), &id)
                .await
                .map_err(|e| McpError::store("fetch document", e))?;
            Ok(doc.unwrap_or(JsonValue::Null))
        }
        "content_query" => {
            let query = get_string_arg(&args, "query")?;
            let params = get_optional_object(&args, "params")?;
            let documents = session
                .store()
                .run_query(session.dataset(), &query, &params)
                .await
                .map_err(|e| McpError::store("run query", e))?;
            Ok(json!({
                "count": documents.len(),
                "documents": documents,
            }))
        }
        _ => Err(McpError::UnknownTool(name.to_string())),
    }
}
