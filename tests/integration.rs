//! Integration tests for the MCP server.

use std::sync::Arc;

use contentlake_mcp::store::Seed;
use contentlake_mcp::{DatasetRef, McpError, McpSession, MemoryStore, ToolRegistry};
use serde_json::{json, Map, Value as JsonValue};

fn dataset() -> DatasetRef {
    DatasetRef::new("test", "production")
}

fn seed() -> Seed {
    serde_json::from_value(json!({
        "schema": [
            {"name": "person", "type": "document", "fields": [{"name": "name", "type": "string"}]},
            {"name": "article", "type": "document", "fields": [
                {"name": "title", "type": "string"},
                {"name": "slug", "type": "slug"},
                {"name": "author", "type": "reference", "to": [{"type": "person"}]},
                {"name": "tags", "type": "array", "of": [{"type": "string"}]},
                {"name": "views", "type": "number"},
                {"name": "body", "type": "array", "of": [{"type": "block"}]}
            ]}
        ],
        "documents": [
            {"_id": "person-1", "_type": "person", "name": "Ada"},
            {
                "_id": "article-1",
                "_type": "article",
                "title": "Hello",
                "tags": ["news"],
                "views": 1,
                "body": [{
                    "_key": "b1",
                    "_type": "block",
                    "style": "normal",
                    "children": [{"_type": "span", "text": "hello world", "marks": []}]
                }]
            }
        ]
    }))
    .expect("valid seed")
}

/// Create a test session over a seeded in-memory store.
fn test_session() -> (McpSession, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.load_seed(&dataset(), seed()).expect("Failed to seed store");
    (McpSession::in_memory(store.clone(), dataset()), store)
}

/// Create a read-only test session.
fn read_only_session() -> McpSession {
    test_session().0.read_only(true)
}

fn to_args(args: JsonValue) -> Map<String, JsonValue> {
    match args {
        JsonValue::Object(m) => m,
        _ => Map::new(),
    }
}

/// Helper to dispatch a tool call.
async fn call_tool(
    session: &mut McpSession,
    registry: &ToolRegistry,
    name: &str,
    args: JsonValue,
) -> JsonValue {
    registry
        .dispatch(session, name, to_args(args))
        .await
        .unwrap_or_else(|e| panic!("Tool {} failed: {}", name, e))
}

/// Helper to dispatch a tool call and expect an error.
async fn call_tool_err(
    session: &mut McpSession,
    registry: &ToolRegistry,
    name: &str,
    args: JsonValue,
) -> McpError {
    match registry.dispatch(session, name, to_args(args)).await {
        Ok(result) => panic!("Expected tool {} to fail, got {}", name, result),
        Err(e) => e,
    }
}

// =============================================================================
// Path Tools
// =============================================================================

#[tokio::test]
async fn test_path_parse_key_match() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(
        &mut session,
        &registry,
        "content_path_parse",
        json!({"path": "items[_key==\"a1\"].title"}),
    )
    .await;
    assert_eq!(
        result["segments"],
        json!([{"property": "items"}, {"keyMatch": "a1"}, {"property": "title"}])
    );
    assert_eq!(result["path"], "items[_key==\"a1\"].title");
}

#[tokio::test]
async fn test_path_serialize_round_trip() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    for raw in ["body[_key=='k'].children[0].text", "rows[1:].n", "['odd-name'].x", "tags.[-1]"] {
        let parsed = call_tool(&mut session, &registry, "content_path_parse", json!({"path": raw})).await;
        let serialized = call_tool(
            &mut session,
            &registry,
            "content_path_serialize",
            json!({"segments": parsed["segments"]}),
        )
        .await;
        assert_eq!(serialized["path"], parsed["path"]);

        let reparsed = call_tool(
            &mut session,
            &registry,
            "content_path_parse",
            json!({"path": serialized["path"]}),
        )
        .await;
        assert_eq!(reparsed["segments"], parsed["segments"]);
    }
}

#[tokio::test]
async fn test_path_rejections() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    for raw in ["items[", "", "items[_key==]"] {
        let err = call_tool_err(&mut session, &registry, "content_path_parse", json!({"path": raw})).await;
        match err {
            McpError::PathSyntax(e) => assert_eq!(e.input, raw),
            other => panic!("expected a path error for '{raw}', got {other:?}"),
        }
    }

    let err = call_tool_err(&mut session, &registry, "content_path_serialize", json!({"segments": []})).await;
    assert!(matches!(err, McpError::PathSyntax(_)));
}

// =============================================================================
// Schema Tools
// =============================================================================

#[tokio::test]
async fn test_schema_list_and_get() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(&mut session, &registry, "content_schema_list", json!({})).await;
    assert_eq!(result["dataset"], "test/production");
    let names: Vec<&str> = result["types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["person", "article"]);
    assert_eq!(result["types"][0]["kind"], "document");
    assert_eq!(
        result["types"][1]["fields"],
        json!(["title", "slug", "author", "tags", "views", "body"])
    );

    let manifest = call_tool(&mut session, &registry, "content_schema_get", json!({"type": "article"})).await;
    assert_eq!(manifest["type"], "document");
    assert_eq!(manifest["fields"][2]["name"], "author");

    let err = call_tool_err(&mut session, &registry, "content_schema_get", json!({"type": "video"})).await;
    assert!(matches!(err, McpError::InvalidArg { .. }));
}

#[tokio::test]
async fn test_schema_validate_article() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(
        &mut session,
        &registry,
        "content_schema_validate",
        json!({"document": {
            "_id": "article-2",
            "_type": "article",
            "author": {"_type": "reference", "_ref": "drafts.person-1"},
            "slug": {"_type": "slug", "current": "hello"}
        }}),
    )
    .await;
    assert_eq!(result["valid"], true);
    assert_eq!(result["document"]["author"]["_ref"], "person-1");

    let result = call_tool(
        &mut session,
        &registry,
        "content_schema_validate",
        json!({"document": {"_type": "article", "author": "person-1"}}),
    )
    .await;
    assert_eq!(result["valid"], false);
    assert_eq!(result["path"], "author");

    let result = call_tool(
        &mut session,
        &registry,
        "content_schema_validate",
        json!({"document": {"_type": "article", "tags": ["a", 2]}}),
    )
    .await;
    assert_eq!(result["path"], "tags[1]");
}

#[tokio::test]
async fn test_schema_compile_cyclic_manifests() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let manifests = json!([
        {"name": "A", "type": "object", "fields": [{"name": "b", "type": "B"}]},
        {"name": "B", "type": "object", "fields": [{"name": "a", "type": "A"}]},
        {"name": "C", "type": "object", "fields": [{"name": "self", "type": "C"}]}
    ]);

    let result = call_tool(
        &mut session,
        &registry,
        "content_schema_compile",
        json!({"manifests": manifests}),
    )
    .await;
    assert_eq!(result["types"].as_array().unwrap().len(), 3);

    let result = call_tool(
        &mut session,
        &registry,
        "content_schema_compile",
        json!({
            "manifests": manifests,
            "document": {"_type": "A", "b": {"_type": "B", "a": {"_type": "A"}}}
        }),
    )
    .await;
    assert_eq!(result["valid"], true);

    let result = call_tool(
        &mut session,
        &registry,
        "content_schema_compile",
        json!({
            "manifests": manifests,
            "document": {"_type": "C", "self": {"_type": "C", "self": {"_type": "A"}}}
        }),
    )
    .await;
    assert_eq!(result["valid"], false);
    assert_eq!(result["path"], "self.self._type");
}

#[tokio::test]
async fn test_schema_compile_config_errors() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_schema_compile",
        json!({"manifests": [
            {"name": "post", "type": "document"},
            {"name": "post", "type": "object"}
        ]}),
    )
    .await;
    assert!(matches!(err, McpError::SchemaConfig(_)));

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_schema_compile",
        json!({"manifests": [
            {"name": "post", "type": "document", "fields": [{"name": "x", "type": "ghost"}]}
        ]}),
    )
    .await;
    assert!(matches!(err, McpError::SchemaConfig(_)));
}

#[tokio::test]
async fn test_schema_reload_picks_up_changes() {
    let (mut session, store) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(&mut session, &registry, "content_schema_list", json!({})).await;
    assert_eq!(result["types"].as_array().unwrap().len(), 2);

    store.set_schema(&dataset(), Vec::new());
    // Still cached
    let result = call_tool(&mut session, &registry, "content_schema_list", json!({})).await;
    assert_eq!(result["types"].as_array().unwrap().len(), 2);

    let result = call_tool(&mut session, &registry, "content_schema_reload", json!({})).await;
    assert_eq!(result["types"], 0);
}

// =============================================================================
// Document Tools
// =============================================================================

#[tokio::test]
async fn test_document_get_and_query() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let doc = call_tool(&mut session, &registry, "content_document_get", json!({"id": "article-1"})).await;
    assert_eq!(doc["title"], "Hello");
    assert!(doc["_rev"].is_string());

    let missing = call_tool(&mut session, &registry, "content_document_get", json!({"id": "nope"})).await;
    assert_eq!(missing, JsonValue::Null);

    let result = call_tool(
        &mut session,
        &registry,
        "content_query",
        json!({"query": "*[_type == $type]", "params": {"type": "person"}}),
    )
    .await;
    assert_eq!(result["count"], 1);
    assert_eq!(result["documents"][0]["name"], "Ada");

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_query",
        json!({"query": "*[_type == 'person'] | order(name)"}),
    )
    .await;
    assert!(matches!(err, McpError::Store { .. }));
}

// =============================================================================
// Patch Tools
// =============================================================================

#[tokio::test]
async fn test_patch_build_orders_operations() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(
        &mut session,
        &registry,
        "content_patch_build",
        json!({"patch": {
            "id": "article-1",
            "unset": ["title"],
            "insert": {"items": ["x"], "position": "after", "after": "tags[-1]"},
            "set": {"title": "New"}
        }}),
    )
    .await;
    let verbs: Vec<&str> = result["operations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|op| op.as_object().unwrap().keys().next().unwrap().as_str())
        .collect();
    assert_eq!(verbs, vec!["set", "unset", "insert"]);
    assert_eq!(result["operations"][2]["insert"]["after"], "tags[-1]");
}

#[tokio::test]
async fn test_patch_build_drops_unresolvable_insert() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(
        &mut session,
        &registry,
        "content_patch_build",
        json!({"patch": {"id": "article-1", "insert": {"items": ["x"]}}}),
    )
    .await;
    assert_eq!(result["operations"], json!([]));
}

#[tokio::test]
async fn test_patch_applies_all_verbs() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(
        &mut session,
        &registry,
        "content_patch",
        json!({
            "patch": {
                "id": "article-1",
                "set": {"title": "Hello again"},
                "setIfMissing": {"slug": {"_type": "slug", "current": "hello"}},
                "inc": {"views": 2},
                "insert": {"items": ["tech"], "before": "tags[0]"},
                "diffMatchPatch": {
                    "body[_key==\"b1\"].children[0].text": "@@ -1,11 +1,11 @@\n hello \n-world\n+there\n"
                }
            },
            "returnDocuments": true
        }),
    )
    .await;

    assert_eq!(result["results"][0]["operation"], "update");
    let doc = &result["documents"][0];
    assert_eq!(doc["title"], "Hello again");
    assert_eq!(doc["slug"]["current"], "hello");
    assert_eq!(doc["views"], 3);
    assert_eq!(doc["tags"], json!(["tech", "news"]));
    assert_eq!(doc["body"][0]["children"][0]["text"], "hello there");
    assert_eq!(doc["_rev"], result["transactionId"]);
}

#[tokio::test]
async fn test_patch_revision_guard() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let doc = call_tool(&mut session, &registry, "content_document_get", json!({"id": "article-1"})).await;
    let rev = doc["_rev"].as_str().unwrap().to_string();

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_patch",
        json!({"patch": {"id": "article-1", "ifRevisionID": "stale", "set": {"title": "x"}}}),
    )
    .await;
    match err {
        McpError::ConcurrencyConflict { id, expected, actual } => {
            assert_eq!(id, "article-1");
            assert_eq!(expected, "stale");
            assert_eq!(actual.as_deref(), Some(rev.as_str()));
        }
        other => panic!("expected a conflict, got {other:?}"),
    }

    call_tool(
        &mut session,
        &registry,
        "content_patch",
        json!({"patch": {"id": "article-1", "ifRevisionID": rev, "set": {"title": "x"}}}),
    )
    .await;

    // The old revision is now stale too.
    let err = call_tool_err(
        &mut session,
        &registry,
        "content_patch",
        json!({"patch": {"id": "article-1", "ifRevisionID": rev, "set": {"title": "y"}}}),
    )
    .await;
    assert!(matches!(err, McpError::ConcurrencyConflict { .. }));
}

#[tokio::test]
async fn test_patch_missing_document_is_store_error() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_patch",
        json!({"patch": {"id": "ghost", "set": {"title": "x"}}}),
    )
    .await;
    match err {
        McpError::Store { operation, code, .. } => {
            assert_eq!(operation, "commit transaction");
            assert_eq!(code, "NOT_FOUND");
        }
        other => panic!("expected a store error, got {other:?}"),
    }
}

// =============================================================================
// Create / Delete Tools
// =============================================================================

#[tokio::test]
async fn test_create_validates_before_writing() {
    let (mut session, store) = test_session();
    let registry = ToolRegistry::new();

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_document_create",
        json!({"document": {"_id": "article-2", "_type": "article", "views": "lots"}}),
    )
    .await;
    match err {
        McpError::Validation(e) => assert_eq!(e.path_string(), "views"),
        other => panic!("expected a validation error, got {other:?}"),
    }

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_document_create",
        json!({"document": {"_id": "article-2", "title": "untyped"}}),
    )
    .await;
    assert!(matches!(err, McpError::Validation(_)));
    assert_eq!(store.document_count(&dataset()), 2);
}

#[tokio::test]
async fn test_create_modes() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(
        &mut session,
        &registry,
        "content_document_create",
        json!({
            "document": {"_type": "article", "author": {"_type": "reference", "_ref": "drafts.person-1"}},
            "returnDocuments": true
        }),
    )
    .await;
    let created = &result["documents"][0];
    assert_eq!(created["author"]["_ref"], "person-1");
    assert!(created["_id"].as_str().is_some_and(|id| !id.is_empty()));

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_document_create",
        json!({"document": {"_id": "person-1", "_type": "person"}}),
    )
    .await;
    assert!(matches!(err, McpError::Store { .. }));

    let result = call_tool(
        &mut session,
        &registry,
        "content_document_create",
        json!({"document": {"_id": "person-1", "_type": "person", "name": "Grace"}, "mode": "createIfMissing"}),
    )
    .await;
    assert_eq!(result["results"][0]["operation"], "none");

    call_tool(
        &mut session,
        &registry,
        "content_document_create",
        json!({"document": {"_id": "person-1", "_type": "person", "name": "Grace"}, "mode": "createOrReplace"}),
    )
    .await;
    let doc = call_tool(&mut session, &registry, "content_document_get", json!({"id": "person-1"})).await;
    assert_eq!(doc["name"], "Grace");

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_document_create",
        json!({"document": {"_type": "person"}, "mode": "upsert"}),
    )
    .await;
    assert!(matches!(err, McpError::InvalidArg { .. }));
}

#[tokio::test]
async fn test_delete_by_id_and_query() {
    let (mut session, store) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(&mut session, &registry, "content_document_delete", json!({"id": "nope"})).await;
    assert_eq!(result["results"][0]["operation"], "none");

    let result = call_tool(
        &mut session,
        &registry,
        "content_document_delete",
        json!({"query": "*[_type == 'article']"}),
    )
    .await;
    assert_eq!(result["results"][0]["id"], "article-1");
    assert_eq!(store.document_count(&dataset()), 1);

    let err = call_tool_err(&mut session, &registry, "content_document_delete", json!({})).await;
    assert!(matches!(err, McpError::MissingArg(_)));
}

// =============================================================================
// Transactions
// =============================================================================

#[tokio::test]
async fn test_mutate_is_atomic_on_local_rejection() {
    let (mut session, store) = test_session();
    let registry = ToolRegistry::new();

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_mutate",
        json!({"mutations": [
            {"create": {"_id": "person-2", "_type": "person"}},
            {"delete": {"id": "person-1", "query": "*"}}
        ]}),
    )
    .await;
    assert!(matches!(err, McpError::InvalidArg { .. }));
    assert_eq!(store.document_count(&dataset()), 2);
}

#[tokio::test]
async fn test_mutate_is_atomic_on_store_rejection() {
    let (mut session, store) = test_session();
    let registry = ToolRegistry::new();

    call_tool_err(
        &mut session,
        &registry,
        "content_mutate",
        json!({"mutations": [
            {"create": {"_id": "person-2", "_type": "person"}},
            {"patch": {"id": "article-1", "set": {"title": "changed"}}},
            {"patch": {"id": "ghost", "set": {"title": "x"}}}
        ]}),
    )
    .await;

    assert_eq!(store.document_count(&dataset()), 2);
    let doc = call_tool(&mut session, &registry, "content_document_get", json!({"id": "article-1"})).await;
    assert_eq!(doc["title"], "Hello");
}

#[tokio::test]
async fn test_mutate_returns_resolvable_documents() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(
        &mut session,
        &registry,
        "content_mutate",
        json!({
            "mutations": [
                {"create": {"_id": "person-2", "_type": "person", "name": "Lin"}},
                {"patch": {"query": "*[_type == 'person']", "set": {"active": true}}},
                {"patch": {"id": "article-1", "unset": "tags[0]"}},
                {"delete": {"id": "person-1"}}
            ],
            "returnDocuments": true,
            "visibility": "async",
            "transactionId": "tx-42"
        }),
    )
    .await;

    assert_eq!(result["transactionId"], "tx-42");
    let ids: Vec<&str> = result["documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["person-2", "article-1"]);
    assert_eq!(result["documents"][0]["active"], true);
    assert_eq!(result["documents"][1]["tags"], json!([]));
    assert!(result.get("missingDocuments").is_none());
}

#[tokio::test]
async fn test_mutate_dry_run_writes_nothing() {
    let (mut session, store) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(
        &mut session,
        &registry,
        "content_mutate",
        json!({
            "mutations": [{"create": {"_id": "person-2", "_type": "person"}}],
            "dryRun": true
        }),
    )
    .await;
    assert_eq!(result["results"][0]["operation"], "create");
    assert_eq!(store.document_count(&dataset()), 2);
}

#[tokio::test]
async fn test_mutate_rejects_bad_options() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_mutate",
        json!({"mutations": [{"delete": {"id": "person-1"}}], "visibility": "eventually"}),
    )
    .await;
    assert!(matches!(err, McpError::InvalidArg { .. }));

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_mutate",
        json!({"mutations": [{"upsert": {"_id": "x"}}]}),
    )
    .await;
    assert!(matches!(err, McpError::InvalidArg { .. }));

    let err = call_tool_err(&mut session, &registry, "content_mutate", json!({"mutations": []})).await;
    assert!(matches!(err, McpError::InvalidArg { .. }));
}

// =============================================================================
// Session / Dataset Tools
// =============================================================================

#[tokio::test]
async fn test_dataset_switch_isolates_documents() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let result = call_tool(&mut session, &registry, "content_dataset_current", json!({})).await;
    assert_eq!(result, json!({"project": "test", "dataset": "production", "readOnly": false}));

    call_tool(&mut session, &registry, "content_dataset_switch", json!({"dataset": "staging"})).await;
    let missing = call_tool(&mut session, &registry, "content_document_get", json!({"id": "article-1"})).await;
    assert_eq!(missing, JsonValue::Null);

    // No schema in staging: documents are admitted without type validation.
    call_tool(
        &mut session,
        &registry,
        "content_document_create",
        json!({"document": {"_id": "x", "_type": "article", "views": "lots"}}),
    )
    .await;

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_dataset_switch",
        json!({"dataset": "Bad Name"}),
    )
    .await;
    assert!(matches!(err, McpError::InvalidArg { .. }));

    call_tool(&mut session, &registry, "content_dataset_switch", json!({"dataset": "production"})).await;
    let doc = call_tool(&mut session, &registry, "content_document_get", json!({"id": "article-1"})).await;
    assert_eq!(doc["title"], "Hello");
}

#[tokio::test]
async fn test_read_only_session_rejects_writes() {
    let mut session = read_only_session();
    let registry = ToolRegistry::new();

    for (tool, args) in [
        ("content_patch", json!({"patch": {"id": "article-1", "set": {"title": "x"}}})),
        ("content_document_create", json!({"document": {"_type": "person"}})),
        ("content_document_delete", json!({"id": "article-1"})),
        ("content_mutate", json!({"mutations": [{"delete": {"id": "article-1"}}]})),
    ] {
        let err = call_tool_err(&mut session, &registry, tool, args).await;
        assert!(matches!(err, McpError::ReadOnly(_)), "{tool}: {err:?}");
    }

    // Reads and previews still work.
    call_tool(&mut session, &registry, "content_document_get", json!({"id": "article-1"})).await;
    call_tool(
        &mut session,
        &registry,
        "content_patch_build",
        json!({"patch": {"id": "article-1", "set": {"title": "x"}}}),
    )
    .await;
}

#[tokio::test]
async fn test_unknown_tool() {
    let (mut session, _) = test_session();
    let registry = ToolRegistry::new();

    let err = call_tool_err(&mut session, &registry, "content_nonexistent", json!({})).await;
    assert!(matches!(err, McpError::UnknownTool(_)));
}

// =============================================================================
// Seed Files
// =============================================================================

#[tokio::test]
async fn test_session_from_seed_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("seed.json");
    std::fs::write(
        &path,
        serde_json::to_string(&json!({
            "schema": [{"name": "note", "type": "document", "fields": [{"name": "body", "type": "text"}]}],
            "documents": [{"_id": "n1", "_type": "note", "body": "hi"}]
        }))
        .unwrap(),
    )
    .unwrap();

    let store = Arc::new(MemoryStore::from_seed_file(&path, &dataset()).expect("Failed to load seed"));
    let mut session = McpSession::in_memory(store, dataset());
    let registry = ToolRegistry::new();

    let doc = call_tool(&mut session, &registry, "content_document_get", json!({"id": "n1"})).await;
    assert_eq!(doc["body"], "hi");

    let err = call_tool_err(
        &mut session,
        &registry,
        "content_document_create",
        json!({"document": {"_type": "note", "body": 5}}),
    )
    .await;
    assert!(matches!(err, McpError::Validation(_)));
}
