//! Document store collaborators.
//!
//! The server talks to a content store through two traits: [`StoreClient`]
//! for documents and transactions, and [`ManifestSource`] for a dataset's
//! type manifests. [`MemoryStore`] implements both.

mod apply;
mod dmp;
mod memory;
mod query;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::mutation::{Mutation, Visibility};
use crate::schema::TypeManifest;

pub use apply::apply_patch;
pub use dmp::apply_patch_text;
pub use memory::{MemoryStore, Seed};
pub use query::Filter;

/// Project plus dataset: the unit of schema and document scoping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    /// Project id.
    pub project: String,
    /// Dataset name.
    pub dataset: String,
}

impl DatasetRef {
    /// Create a dataset reference.
    pub fn new(project: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
        }
    }

    /// Same project, another dataset.
    pub fn with_dataset(&self, dataset: impl Into<String>) -> Self {
        Self::new(self.project.clone(), dataset)
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.dataset)
    }
}

/// Failures reported by a store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The document does not exist.
    #[error("document '{id}' not found")]
    NotFound {
        /// Document id
        id: String,
    },

    /// A create collided with an existing document.
    #[error("document '{id}' already exists")]
    AlreadyExists {
        /// Document id
        id: String,
    },

    /// The document is not at the expected revision.
    #[error("document '{id}' is not at revision '{expected}'")]
    RevisionMismatch {
        /// Document id
        id: String,
        /// Expected revision
        expected: String,
        /// Current revision, if the document exists
        actual: Option<String>,
    },

    /// The query could not be parsed or evaluated.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The store refused a mutation.
    #[error("mutation rejected: {0}")]
    Rejected(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "NOT_FOUND",
            StoreError::AlreadyExists { .. } => "ALREADY_EXISTS",
            StoreError::RevisionMismatch { .. } => "REVISION_MISMATCH",
            StoreError::InvalidQuery(_) => "INVALID_QUERY",
            StoreError::Rejected(_) => "REJECTED",
            StoreError::Unavailable(_) => "UNAVAILABLE",
        }
    }
}

/// Result type for store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Commit settings forwarded to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOptions {
    /// When the commit should become visible to queries.
    pub visibility: Visibility,
    /// Evaluate without persisting.
    pub dry_run: bool,
    /// Caller-chosen transaction id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

/// What a commit did to one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOperation {
    /// The document was created.
    Create,
    /// The document was replaced or patched.
    Update,
    /// The document was deleted.
    Delete,
    /// Nothing changed.
    None,
}

/// Per-document commit outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    /// Index of the transaction entry that produced this outcome.
    #[serde(skip)]
    pub entry: usize,
    /// Affected document id.
    pub id: String,
    /// What happened.
    pub operation: MutationOperation,
}

/// Result of an accepted commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    /// Transaction id; also the new revision of every written document.
    pub transaction_id: String,
    /// Per-document outcomes, in entry order.
    pub results: Vec<MutationOutcome>,
}

/// Document and transaction access.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Fetch a document by id. `Ok(None)` when it does not exist.
    async fn fetch_document(&self, dataset: &DatasetRef, id: &str)
        -> StoreResult<Option<JsonValue>>;

    /// Run a filter query and return the matching documents.
    async fn run_query(
        &self,
        dataset: &DatasetRef,
        query: &str,
        params: &Map<String, JsonValue>,
    ) -> StoreResult<Vec<JsonValue>>;

    /// Apply every mutation atomically: all of them take effect, or none.
    async fn commit(
        &self,
        dataset: &DatasetRef,
        mutations: &[Mutation],
        options: &CommitOptions,
    ) -> StoreResult<CommitResult>;
}

/// Supplier of a dataset's type manifests.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Every type manifest deployed to the dataset.
    async fn manifests(&self, dataset: &DatasetRef) -> StoreResult<Vec<TypeManifest>>;
}
