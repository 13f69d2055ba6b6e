//! Transactions.
//!
//! A [`Transaction`] collects create, replace, delete and patch entries,
//! validates each one locally, and commits them to the store as one atomic
//! unit. Nothing reaches the store unless every entry passes validation.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, warn};

use crate::error::{McpError, Result};
use crate::patch::{PatchSpec, PatchUnit};
use crate::path::PathSegment;
use crate::schema::{describe_value, CompiledSchema, ValidationError};
use crate::store::{CommitOptions, DatasetRef, MutationOutcome, StoreClient};

/// Documents a delete applies to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeleteTarget {
    /// A single document.
    Id {
        /// Document id.
        id: String,
    },
    /// Every document matched by a query.
    Query {
        /// Filter query.
        query: String,
        /// Query parameters.
        #[serde(skip_serializing_if = "Map::is_empty")]
        params: Map<String, JsonValue>,
    },
}

/// One transaction entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Mutation {
    /// Create a document; fails if the id is taken.
    Create(JsonValue),
    /// Create a document or replace it wholesale.
    CreateOrReplace(JsonValue),
    /// Create a document unless one with the id exists.
    CreateIfMissing(JsonValue),
    /// Delete documents.
    Delete(DeleteTarget),
    /// Patch documents.
    Patch(PatchUnit),
}

impl Mutation {
    /// Wire name of the entry kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::Create(_) => "create",
            Mutation::CreateOrReplace(_) => "createOrReplace",
            Mutation::CreateIfMissing(_) => "createIfMissing",
            Mutation::Delete(_) => "delete",
            Mutation::Patch(_) => "patch",
        }
    }

    /// The single document this entry leaves behind, when there is one.
    fn resolved_id<'a>(&'a self, outcomes: &'a [&'a MutationOutcome]) -> Option<&'a str> {
        match self {
            Mutation::Create(_) | Mutation::CreateOrReplace(_) | Mutation::CreateIfMissing(_) => {
                outcomes.first().map(|o| o.id.as_str())
            }
            Mutation::Patch(patch) => patch.document_id(),
            Mutation::Delete(_) => None,
        }
    }
}

/// Delete target as supplied by a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteSpec {
    /// Document id.
    pub id: Option<String>,
    /// Filter query.
    pub query: Option<String>,
    /// Query parameters.
    #[serde(default)]
    pub params: Map<String, JsonValue>,
}

impl DeleteSpec {
    /// Resolve to a delete target.
    pub fn build(self) -> Result<DeleteTarget> {
        let invalid = |name: &str, reason: &str| McpError::InvalidArg {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        match (self.id, self.query) {
            (Some(_), Some(_)) => Err(invalid("delete", "give either 'id' or 'query', not both")),
            (Some(id), None) if id.trim().is_empty() => {
                Err(invalid("delete.id", "document id is empty"))
            }
            (Some(id), None) => Ok(DeleteTarget::Id { id }),
            (None, Some(query)) if query.trim().is_empty() => {
                Err(invalid("delete.query", "query is empty"))
            }
            (None, Some(query)) => Ok(DeleteTarget::Query {
                query,
                params: self.params,
            }),
            (None, None) => Err(McpError::MissingArg("delete.id or delete.query".to_string())),
        }
    }
}

/// Transaction entry as supplied by a caller, e.g. `{"create": {...}}` or
/// `{"patch": {"id": "...", "set": {...}}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub enum MutationSpec {
    /// `create` entry.
    Create(JsonValue),
    /// `createOrReplace` entry.
    CreateOrReplace(JsonValue),
    /// `createIfMissing` entry.
    CreateIfMissing(JsonValue),
    /// `delete` entry.
    Delete(DeleteSpec),
    /// `patch` entry.
    Patch(PatchSpec),
}

impl MutationSpec {
    /// Parse paths and targets into a transaction entry.
    pub fn build(self) -> Result<Mutation> {
        Ok(match self {
            MutationSpec::Create(doc) => Mutation::Create(doc),
            MutationSpec::CreateOrReplace(doc) => Mutation::CreateOrReplace(doc),
            MutationSpec::CreateIfMissing(doc) => Mutation::CreateIfMissing(doc),
            MutationSpec::Delete(spec) => Mutation::Delete(spec.build()?),
            MutationSpec::Patch(spec) => Mutation::Patch(spec.build()?),
        })
    }
}

/// When a commit becomes visible to queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to reads before the commit returns.
    #[default]
    Sync,
    /// Visible shortly after the commit returns.
    Async,
    /// Visible eventually; fastest for bulk writes.
    Deferred,
}

/// Per-submit settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOptions {
    /// Fetch the resulting state of created and patched documents.
    #[serde(default)]
    pub return_documents: bool,
    /// Visibility forwarded to the store.
    #[serde(default)]
    pub visibility: Visibility,
    /// Evaluate without persisting.
    #[serde(default)]
    pub dry_run: bool,
    /// Caller-chosen transaction id.
    pub transaction_id: Option<String>,
}

impl TransactionOptions {
    fn commit_options(&self) -> CommitOptions {
        CommitOptions {
            visibility: self.visibility,
            dry_run: self.dry_run,
            transaction_id: self.transaction_id.clone(),
        }
    }
}

/// Outcome of a successful submit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    /// Transaction id assigned by the store.
    pub transaction_id: String,
    /// Per-document outcomes.
    pub results: Vec<MutationOutcome>,
    /// Resulting documents, when requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub documents: Vec<JsonValue>,
    /// Ids whose resulting state could not be fetched.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_documents: Vec<String>,
}

/// Ordered transaction entries.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    entries: Vec<Mutation>,
}

impl Transaction {
    /// Create an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from caller-supplied entries.
    pub fn from_specs(specs: Vec<MutationSpec>) -> Result<Self> {
        let entries = specs
            .into_iter()
            .map(MutationSpec::build)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Append an entry.
    pub fn push(mut self, mutation: Mutation) -> Self {
        self.entries.push(mutation);
        self
    }

    /// Append a `create`.
    pub fn create(self, doc: JsonValue) -> Self {
        self.push(Mutation::Create(doc))
    }

    /// Append a `createOrReplace`.
    pub fn create_or_replace(self, doc: JsonValue) -> Self {
        self.push(Mutation::CreateOrReplace(doc))
    }

    /// Append a `createIfMissing`.
    pub fn create_if_missing(self, doc: JsonValue) -> Self {
        self.push(Mutation::CreateIfMissing(doc))
    }

    /// Append a `delete`.
    pub fn delete(self, target: DeleteTarget) -> Self {
        self.push(Mutation::Delete(target))
    }

    /// Append a `patch`.
    pub fn patch(self, patch: PatchUnit) -> Self {
        self.push(Mutation::Patch(patch))
    }

    /// Entries in order.
    pub fn entries(&self) -> &[Mutation] {
        &self.entries
    }

    /// Validate every entry, returning the entries as they will be committed.
    pub fn admit(self, schema: Option<&CompiledSchema>) -> Result<Vec<Mutation>> {
        if self.entries.is_empty() {
            return Err(McpError::InvalidArg {
                name: "mutations".to_string(),
                reason: "transaction has no entries".to_string(),
            });
        }
        self.entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                admit_entry(entry, schema).inspect_err(|e| {
                    debug!(entry = index, error = %e, "transaction entry rejected");
                })
            })
            .collect()
    }

    /// Validate, commit atomically, and optionally fetch the resulting
    /// documents.
    pub async fn submit(
        self,
        store: &dyn StoreClient,
        dataset: &DatasetRef,
        schema: Option<&CompiledSchema>,
        options: &TransactionOptions,
    ) -> Result<TransactionResult> {
        let entries = self.admit(schema)?;
        let commit = store
            .commit(dataset, &entries, &options.commit_options())
            .await
            .map_err(|e| McpError::store("commit transaction", e))?;
        debug!(
            %dataset,
            transaction = %commit.transaction_id,
            entries = entries.len(),
            "transaction committed"
        );

        let mut result = TransactionResult {
            transaction_id: commit.transaction_id,
            results: commit.results,
            documents: Vec::new(),
            missing_documents: Vec::new(),
        };
        if options.return_documents && !options.dry_run {
            let ids = resolved_ids(&entries, &result.results);
            let (documents, missing) = fetch_all(store, dataset, ids).await;
            result.documents = documents;
            result.missing_documents = missing;
        }
        Ok(result)
    }
}

fn admit_entry(entry: Mutation, schema: Option<&CompiledSchema>) -> Result<Mutation> {
    match entry {
        Mutation::Create(doc) => Ok(Mutation::Create(admit_document(doc, schema, false)?)),
        Mutation::CreateOrReplace(doc) => {
            Ok(Mutation::CreateOrReplace(admit_document(doc, schema, true)?))
        }
        Mutation::CreateIfMissing(doc) => {
            Ok(Mutation::CreateIfMissing(admit_document(doc, schema, true)?))
        }
        other => Ok(other),
    }
}

/// Check the identity attributes of a document and run its type's validator
/// when the schema knows the type.
fn admit_document(
    doc: JsonValue,
    schema: Option<&CompiledSchema>,
    require_id: bool,
) -> Result<JsonValue> {
    let Some(map) = doc.as_object() else {
        return Err(ValidationError::new("a document object", &doc).into());
    };
    let type_name = match map.get("_type") {
        Some(JsonValue::String(name)) if !name.is_empty() => name.clone(),
        Some(other) => {
            return Err(ValidationError::new("a type name", other)
                .within(PathSegment::property("_type"))
                .into())
        }
        None => return Err(ValidationError::missing("_type", "a type name").into()),
    };
    match map.get("_id") {
        Some(JsonValue::String(id)) if !id.is_empty() => {}
        None if !require_id => {}
        None => return Err(ValidationError::missing("_id", "a document id").into()),
        Some(other) => {
            return Err(ValidationError::new("a document id", other)
                .within(PathSegment::property("_id"))
                .into())
        }
    }

    match schema.and_then(|s| s.validate(&type_name, &doc)) {
        Some(outcome) => Ok(outcome?),
        None => {
            debug!(
                type_name = %type_name,
                shape = %describe_value(&doc),
                "no validator for type, admitting as-is"
            );
            Ok(doc)
        }
    }
}

fn resolved_ids(entries: &[Mutation], outcomes: &[MutationOutcome]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let own: Vec<&MutationOutcome> = outcomes.iter().filter(|o| o.entry == index).collect();
        if let Some(id) = entry.resolved_id(&own) {
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
    }
    ids
}

async fn fetch_all(
    store: &dyn StoreClient,
    dataset: &DatasetRef,
    ids: Vec<String>,
) -> (Vec<JsonValue>, Vec<String>) {
    let fetches = ids.into_iter().map(|id| async move {
        let outcome = store.fetch_document(dataset, &id).await;
        (id, outcome)
    });

    let mut documents = Vec::new();
    let mut missing = Vec::new();
    for (id, outcome) in join_all(fetches).await {
        match outcome {
            Ok(Some(doc)) => documents.push(doc),
            Ok(None) => {
                warn!(%dataset, id = %id, "committed document not found on fetch");
                missing.push(id);
            }
            Err(e) => {
                warn!(%dataset, id = %id, error = %e, "failed to fetch committed document");
                missing.push(id);
            }
        }
    }
    (documents, missing)
}
