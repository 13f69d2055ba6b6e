//! Schema tools.
//!
//! Tools: content_schema_list, content_schema_get, content_schema_validate,
//!        content_schema_reload, content_schema_compile

use serde_json::{json, Map, Value as JsonValue};

use crate::convert::{get_optional_string, get_string_arg, get_typed_arg, get_value_arg, to_json};
use crate::error::{McpError, Result};
use crate::schema;
use crate::schema::{CompiledSchema, TypeManifest};
use crate::session::McpSession;
use crate::tools::ToolDef;

/// Get all schema tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "content_schema_list",
            "List the types of the current dataset's schema with their kinds and field names.",
            schema!(object {}),
        ),
        ToolDef::new(
            "content_schema_get",
            "Get the manifest of one type in the current dataset's schema.",
            schema!(object {
                required: { "type": string }
            }),
        ),
        ToolDef::new(
            "content_schema_validate",
            "Validate a document against its type without writing it. The type defaults to \
             the document's _type. Returns {valid, document} with reference ids normalized, \
             or {valid: false, path, expected, actual}.",
            schema!(object {
                required: { "document": object },
                optional: { "type": string }
            }),
        ),
        ToolDef::new(
            "content_schema_reload",
            "Recompile the current dataset's schema from its manifests, discarding the \
             cached copy. Use after deploying schema changes.",
            schema!(object {}),
        ),
        ToolDef::new(
            "content_schema_compile",
            "Compile a list of type manifests without caching them, to check a schema \
             before deploying it. Optionally validates a document against the result.",
            schema!(object {
                required: { "manifests": array_object },
                optional: { "document": object, "type": string }
            }),
        ),
    ]
}

/// Dispatch a schema tool call.
pub async fn dispatch(
    session: &mut McpSession,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    match name {
        "content_schema_list" => {
            let schema = session.schema().await?;
            Ok(json!({
                "dataset": session.dataset().to_string(),
                "types": to_json(&schema.summaries())?,
            }))
        }
        "content_schema_get" => {
            let type_name = get_string_arg(&args, "type")?;
            let schema = session.schema().await?;
            let manifest = schema.describe(&type_name).ok_or_else(|| unknown_type(&type_name))?;
            to_json(manifest)
        }
        "content_schema_validate" => {
            let schema = session.schema().await?;
            validate(&schema, &args)
        }
        "content_schema_reload" => {
            let schema = session.reload_schema().await?;
            Ok(json!({
                "dataset": session.dataset().to_string(),
                "types": schema.len(),
            }))
        }
        "content_schema_compile" => {
            let manifests: Vec<TypeManifest> = get_typed_arg(&args, "manifests")?;
            let schema = CompiledSchema::compile(manifests)?;
            if args.contains_key("document") {
                validate(&schema, &args)
            } else {
                Ok(json!({ "types": to_json(&schema.summaries())? }))
            }
        }
        _ => Err(McpError::UnknownTool(name.to_string())),
    }
}

fn validate(schema: &CompiledSchema, args: &Map<String, JsonValue>) -> Result<JsonValue> {
    let document = get_value_arg(args, "document")?;
    let type_name = get_optional_string(args, "type")
        .or_else(|| document.get("_type").and_then(JsonValue::as_str).map(str::to_string))
        .ok_or_else(|| McpError::MissingArg("type".to_string()))?;
    let validator = schema
        .validator(&type_name)
        .ok_or_else(|| unknown_type(&type_name))?;

    Ok(match validator.validate(&document) {
        Ok(coerced) => json!({ "valid": true, "document": coerced }),
        Err(err) => json!({
            "valid": false,
            "path": err.path_string(),
            "expected": err.expected,
            "actual": err.actual,
        }),
    })
}

fn unknown_type(type_name: &str) -> McpError {
    McpError::InvalidArg {
        name: "type".to_string(),
        reason: format!("type '{type_name}' is not defined in the schema"),
    }
}
