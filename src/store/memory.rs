//! In-memory reference store.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, info};
use uuid::Uuid;

use super::apply::apply_patch;
use super::query::Filter;
use super::{
    CommitOptions, CommitResult, DatasetRef, ManifestSource, MutationOperation, MutationOutcome,
    StoreClient, StoreError, StoreResult,
};
use crate::error::{McpError, Result};
use crate::mutation::{DeleteTarget, Mutation};
use crate::patch::{PatchTarget, PatchUnit};
use crate::schema::TypeManifest;

/// Contents of a seed file: manifests plus documents for one dataset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    /// Type manifests.
    #[serde(default)]
    pub schema: Vec<TypeManifest>,
    /// Documents; each needs an `_id`.
    #[serde(default)]
    pub documents: Vec<JsonValue>,
}

#[derive(Debug, Clone, Default)]
struct DatasetState {
    documents: BTreeMap<String, JsonValue>,
    schema: Vec<TypeManifest>,
}

/// Documents and manifests held in process memory.
///
/// Commits run against a copy of the dataset and replace it only when every
/// mutation applied, so a failed transaction leaves no trace.
#[derive(Debug, Default)]
pub struct MemoryStore {
    datasets: RwLock<HashMap<DatasetRef, DatasetState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a seed file into `dataset`.
    pub fn from_seed_file(path: impl AsRef<Path>, dataset: &DatasetRef) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let seed: Seed = serde_json::from_str(&raw).map_err(|e| McpError::InvalidArg {
            name: "seed".to_string(),
            reason: format!("{}: {e}", path.display()),
        })?;
        let store = Self::new();
        store.load_seed(dataset, seed)?;
        info!(%dataset, path = %path.display(), "loaded seed file");
        Ok(store)
    }

    /// Replace the manifests of a dataset and add its documents.
    pub fn load_seed(&self, dataset: &DatasetRef, seed: Seed) -> Result<()> {
        self.set_schema(dataset, seed.schema);
        for doc in seed.documents {
            self.insert_document(dataset, doc)?;
        }
        Ok(())
    }

    /// Replace the manifests of a dataset.
    pub fn set_schema(&self, dataset: &DatasetRef, manifests: Vec<TypeManifest>) {
        self.write().entry(dataset.clone()).or_default().schema = manifests;
    }

    /// Store a document as-is, outside any transaction. It needs a string
    /// `_id`; a missing `_rev` is filled in.
    pub fn insert_document(&self, dataset: &DatasetRef, mut doc: JsonValue) -> Result<()> {
        let id = doc
            .get("_id")
            .and_then(JsonValue::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| McpError::InvalidArg {
                name: "document".to_string(),
                reason: "seed documents need a string '_id'".to_string(),
            })?
            .to_string();
        if let Some(map) = doc.as_object_mut() {
            map.entry("_rev")
                .or_insert_with(|| JsonValue::String(new_transaction_id()));
        }
        self.write()
            .entry(dataset.clone())
            .or_default()
            .documents
            .insert(id, doc);
        Ok(())
    }

    /// Number of documents in a dataset.
    pub fn document_count(&self, dataset: &DatasetRef) -> usize {
        self.read().get(dataset).map_or(0, |state| state.documents.len())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<DatasetRef, DatasetState>> {
        self.datasets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<DatasetRef, DatasetState>> {
        self.datasets.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn fetch_document(
        &self,
        dataset: &DatasetRef,
        id: &str,
    ) -> StoreResult<Option<JsonValue>> {
        Ok(self
            .read()
            .get(dataset)
            .and_then(|state| state.documents.get(id))
            .cloned())
    }

    async fn run_query(
        &self,
        dataset: &DatasetRef,
        query: &str,
        params: &Map<String, JsonValue>,
    ) -> StoreResult<Vec<JsonValue>> {
        let filter = Filter::parse(query)?;
        let datasets = self.read();
        let Some(state) = datasets.get(dataset) else {
            return Ok(Vec::new());
        };
        let mut hits = Vec::new();
        for doc in state.documents.values() {
            if filter.matches(doc, params)? {
                hits.push(doc.clone());
            }
        }
        Ok(hits)
    }

    async fn commit(
        &self,
        dataset: &DatasetRef,
        mutations: &[Mutation],
        options: &CommitOptions,
    ) -> StoreResult<CommitResult> {
        let transaction_id = options
            .transaction_id
            .clone()
            .unwrap_or_else(new_transaction_id);
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        let mut datasets = self.write();
        let state = datasets.entry(dataset.clone()).or_default();
        let mut commit = PendingCommit {
            documents: state.documents.clone(),
            revision: &transaction_id,
            now: &now,
            results: Vec::new(),
        };
        for (entry, mutation) in mutations.iter().enumerate() {
            commit.apply(entry, mutation)?;
        }

        let PendingCommit {
            documents, results, ..
        } = commit;
        if options.dry_run {
            debug!(%dataset, transaction = %transaction_id, "dry run, discarding changes");
        } else {
            state.documents = documents;
        }
        debug!(
            %dataset,
            transaction = %transaction_id,
            mutations = mutations.len(),
            visibility = ?options.visibility,
            "committed"
        );
        Ok(CommitResult {
            transaction_id,
            results,
        })
    }
}

#[async_trait]
impl ManifestSource for MemoryStore {
    async fn manifests(&self, dataset: &DatasetRef) -> StoreResult<Vec<TypeManifest>> {
        Ok(self
            .read()
            .get(dataset)
            .map(|state| state.schema.clone())
            .unwrap_or_default())
    }
}

fn new_transaction_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Working copy of a dataset during one commit.
struct PendingCommit<'a> {
    documents: BTreeMap<String, JsonValue>,
    revision: &'a str,
    now: &'a str,
    results: Vec<MutationOutcome>,
}

impl PendingCommit<'_> {
    fn apply(&mut self, entry: usize, mutation: &Mutation) -> StoreResult<()> {
        match mutation {
            Mutation::Create(doc) => {
                let id = match doc.get("_id").and_then(JsonValue::as_str) {
                    Some(id) => id.to_string(),
                    None => Uuid::new_v4().to_string(),
                };
                if self.documents.contains_key(&id) {
                    return Err(StoreError::AlreadyExists { id });
                }
                self.write(entry, id, doc.clone(), None, MutationOperation::Create);
            }
            Mutation::CreateIfMissing(doc) => {
                let id = required_id(doc)?;
                if self.documents.contains_key(&id) {
                    self.record(entry, id, MutationOperation::None);
                } else {
                    self.write(entry, id, doc.clone(), None, MutationOperation::Create);
                }
            }
            Mutation::CreateOrReplace(doc) => {
                let id = required_id(doc)?;
                let existing = self.documents.get(&id);
                let created_at = existing.and_then(|d| d.get("_createdAt")).cloned();
                let operation = match existing {
                    Some(_) => MutationOperation::Update,
                    None => MutationOperation::Create,
                };
                self.write(entry, id, doc.clone(), created_at, operation);
            }
            Mutation::Delete(DeleteTarget::Id { id }) => {
                let operation = match self.documents.remove(id) {
                    Some(_) => MutationOperation::Delete,
                    None => MutationOperation::None,
                };
                self.record(entry, id.clone(), operation);
            }
            Mutation::Delete(DeleteTarget::Query { query, params }) => {
                for id in self.matching(query, params)? {
                    self.documents.remove(&id);
                    self.record(entry, id, MutationOperation::Delete);
                }
            }
            Mutation::Patch(patch) => self.patch(entry, patch)?,
        }
        Ok(())
    }

    fn patch(&mut self, entry: usize, patch: &PatchUnit) -> StoreResult<()> {
        let ids = match &patch.target {
            PatchTarget::Id { id, if_revision } => {
                let current = self
                    .documents
                    .get(id)
                    .ok_or_else(|| StoreError::NotFound { id: id.clone() })?;
                if let Some(expected) = if_revision {
                    let actual = current.get("_rev").and_then(JsonValue::as_str);
                    if actual != Some(expected.as_str()) {
                        return Err(StoreError::RevisionMismatch {
                            id: id.clone(),
                            expected: expected.clone(),
                            actual: actual.map(str::to_string),
                        });
                    }
                }
                vec![id.clone()]
            }
            PatchTarget::Query { query, params } => self.matching(query, params)?,
        };

        for id in ids {
            let Some(mut doc) = self.documents.get(&id).cloned() else {
                continue;
            };
            let created_at = doc.get("_createdAt").cloned();
            apply_patch(&mut doc, &patch.operations)
                .map_err(|reason| StoreError::Rejected(format!("patch of '{id}': {reason}")))?;
            self.write(entry, id, doc, created_at, MutationOperation::Update);
        }
        Ok(())
    }

    fn matching(&self, query: &str, params: &Map<String, JsonValue>) -> StoreResult<Vec<String>> {
        let filter = Filter::parse(query)?;
        let mut ids = Vec::new();
        for (id, doc) in &self.documents {
            if filter.matches(doc, params)? {
                ids.push(id.clone());
            }
        }
        Ok(ids)
    }

    /// Stamp system attributes and store the document.
    fn write(
        &mut self,
        entry: usize,
        id: String,
        doc: JsonValue,
        created_at: Option<JsonValue>,
        operation: MutationOperation,
    ) {
        let mut doc = match doc {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        doc.insert("_id".to_string(), JsonValue::String(id.clone()));
        doc.insert("_rev".to_string(), JsonValue::String(self.revision.to_string()));
        doc.insert(
            "_createdAt".to_string(),
            created_at.unwrap_or_else(|| JsonValue::String(self.now.to_string())),
        );
        doc.insert("_updatedAt".to_string(), JsonValue::String(self.now.to_string()));
        self.documents.insert(id.clone(), JsonValue::Object(doc));
        self.record(entry, id, operation);
    }

    fn record(&mut self, entry: usize, id: String, operation: MutationOperation) {
        self.results.push(MutationOutcome {
            entry,
            id,
            operation,
        });
    }
}

fn required_id(doc: &JsonValue) -> StoreResult<String> {
    doc.get("_id")
        .and_then(JsonValue::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StoreError::Rejected("document is missing '_id'".to_string()))
}
