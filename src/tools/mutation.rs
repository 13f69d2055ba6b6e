//! Patch and transaction tools.
//!
//! Tools: content_patch_build, content_patch, content_document_create,
//!        content_document_delete, content_mutate
//!
//! Every write tool takes the transaction options returnDocuments,
//! visibility, dryRun and transactionId.

use serde_json::{Map, Value as JsonValue};

use crate::convert::{
    from_args, get_optional_object, get_optional_string, get_typed_arg, get_value_arg, to_json,
};
use crate::error::{McpError, Result};
use crate::mutation::{DeleteSpec, MutationSpec, Transaction, TransactionOptions};
use crate::patch::PatchSpec;
use crate::schema;
use crate::session::McpSession;
use crate::tools::ToolDef;

/// Get all patch and transaction tool definitions.
pub fn tools() -> Vec<ToolDef> {
    vec![
        ToolDef::new(
            "content_patch_build",
            "Build a patch without submitting it, to preview the operations that would be \
             sent. The patch object has id (or query + params), optional ifRevisionID, and \
             any of set, setIfMissing, unset, inc, dec, insert, diffMatchPatch keyed by \
             field path. Operations are always ordered set, setIfMissing, unset, inc, dec, \
             insert, diffMatchPatch.",
            schema!(object {
                required: { "patch": object }
            }),
        ),
        ToolDef::new(
            "content_patch",
            "Patch a document (or every document matching a query) in one transaction. \
             Takes the same patch object as content_patch_build. With ifRevisionID the \
             patch fails with a revision conflict if the document changed; re-read and retry. \
             insert takes items plus one of before/after/replace naming an array element \
             path like tags[-1] or body[_key==\"k\"].",
            schema!(object {
                required: { "patch": object },
                optional: {
                    "returnDocuments": boolean,
                    "visibility": visibility,
                    "dryRun": boolean,
                    "transactionId": string
                }
            }),
        ),
        ToolDef::new(
            "content_document_create",
            "Create a document. The document needs a _type; _id is generated for create \
             if absent and required for createOrReplace and createIfMissing. The document \
             is validated against its type before anything is written.",
            schema!(object {
                required: { "document": object },
                optional: {
                    "mode": create_mode,
                    "returnDocuments": boolean,
                    "visibility": visibility,
                    "dryRun": boolean,
                    "transactionId": string
                }
            }),
        ),
        ToolDef::new(
            "content_document_delete",
            "Delete a document by id, or every document matching a query. Deleting a \
             missing id is not an error.",
            schema!(object {
                optional: {
                    "id": string,
                    "query": string,
                    "params": object,
                    "visibility": visibility,
                    "dryRun": boolean,
                    "transactionId": string
                }
            }),
        ),
        ToolDef::new(
            "content_mutate",
            "Submit several mutations as one atomic transaction: either all apply or none \
             do. Each entry is one of {create: doc}, {createOrReplace: doc}, \
             {createIfMissing: doc}, {delete: {id} or {query, params}}, {patch: patch}. \
             All entries are validated before anything is sent.",
            schema!(object {
                required: { "mutations": array_object },
                optional: {
                    "returnDocuments": boolean,
                    "visibility": visibility,
                    "dryRun": boolean,
                    "transactionId": string
                }
            }),
        ),
    ]
}

/// Dispatch a patch or transaction tool call.
pub async fn dispatch(
    session: &mut McpSession,
    name: &str,
    args: Map<String, JsonValue>,
) -> Result<JsonValue> {
    if name == "content_patch_build" {
        let spec: PatchSpec = get_typed_arg(&args, "patch")?;
        return to_json(&spec.build()?);
    }

    let transaction = match name {
        "content_patch" => {
            let spec: PatchSpec = get_typed_arg(&args, "patch")?;
            Transaction::new().patch(spec.build()?)
        }
        "content_document_create" => {
            let document = get_value_arg(&args, "document")?;
            let mode = get_optional_string(&args, "mode").unwrap_or_else(|| "create".to_string());
            match mode.as_str() {
                "create" => Transaction::new().create(document),
                "createOrReplace" => Transaction::new().create_or_replace(document),
                "createIfMissing" => Transaction::new().create_if_missing(document),
                other => {
                    return Err(McpError::InvalidArg {
                        name: "mode".to_string(),
                        reason: format!(
                            "'{other}' is not one of create, createOrReplace, createIfMissing"
                        ),
                    })
                }
            }
        }
        "content_document_delete" => {
            let target = DeleteSpec {
                id: get_optional_string(&args, "id"),
                query: get_optional_string(&args, "query"),
                params: get_optional_object(&args, "params")?,
            }
            .build()?;
            Transaction::new().delete(target)
        }
        "content_mutate" => {
            let specs: Vec<MutationSpec> = get_typed_arg(&args, "mutations")?;
            Transaction::from_specs(specs)?
        }
        _ => return Err(McpError::UnknownTool(name.to_string())),
    };

    session.ensure_writable(name)?;
    let options: TransactionOptions = from_args(&args)?;
    let result = session.submit(transaction, &options).await?;
    to_json(&result)
}
