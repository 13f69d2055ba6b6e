//! MCP session management.
//!
//! Holds the store collaborators, the current project/dataset context and the
//! per-dataset schema cache.

use std::sync::Arc;

use tracing::info;

use crate::error::{McpError, Result};
use crate::mutation::{Transaction, TransactionOptions, TransactionResult};
use crate::schema::{CompiledSchema, SchemaCache};
use crate::store::{DatasetRef, ManifestSource, MemoryStore, StoreClient};

/// MCP session state.
///
/// Tracks the current dataset. Compiled schemas are cached per dataset, so
/// switching back and forth does not recompile.
pub struct McpSession {
    /// Document and transaction access
    store: Arc<dyn StoreClient>,
    /// Type manifests per dataset
    manifests: Arc<dyn ManifestSource>,
    /// Compiled schemas per dataset
    schemas: SchemaCache,
    /// Current dataset context
    dataset: DatasetRef,
    /// Whether writes are refused
    read_only: bool,
}

impl McpSession {
    /// Create a new MCP session over the given collaborators.
    pub fn new(
        store: Arc<dyn StoreClient>,
        manifests: Arc<dyn ManifestSource>,
        dataset: DatasetRef,
    ) -> Self {
        Self {
            store,
            manifests,
            schemas: SchemaCache::new(),
            dataset,
            read_only: false,
        }
    }

    /// Create a session whose store also supplies the manifests.
    pub fn in_memory(store: Arc<MemoryStore>, dataset: DatasetRef) -> Self {
        Self::new(store.clone(), store, dataset)
    }

    /// Refuse every write through this session.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Whether writes are refused.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Fail with [`McpError::ReadOnly`] if writes are refused.
    pub fn ensure_writable(&self, tool: &str) -> Result<()> {
        if self.read_only {
            return Err(McpError::ReadOnly(tool.to_string()));
        }
        Ok(())
    }

    /// Get the current dataset.
    pub fn dataset(&self) -> &DatasetRef {
        &self.dataset
    }

    /// Switch to another dataset of the same project.
    ///
    /// Dataset names are lowercase alphanumerics, `_` and `-`, starting with
    /// a letter or digit, at most 64 characters.
    pub fn switch_dataset(&mut self, name: &str) -> Result<()> {
        let valid = !name.is_empty()
            && name.len() <= 64
            && name.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
        if !valid {
            return Err(McpError::InvalidArg {
                name: "dataset".to_string(),
                reason: format!("'{name}' is not a valid dataset name"),
            });
        }

        self.dataset = self.dataset.with_dataset(name);
        info!(dataset = %self.dataset, "switched dataset");
        Ok(())
    }

    /// Get the store client.
    pub fn store(&self) -> &dyn StoreClient {
        self.store.as_ref()
    }

    /// Compiled schema of the current dataset, compiling on first use.
    pub async fn schema(&self) -> Result<Arc<CompiledSchema>> {
        self.schemas.load(self.manifests.as_ref(), &self.dataset).await
    }

    /// Drop the cached schema of the current dataset and compile it afresh.
    pub async fn reload_schema(&self) -> Result<Arc<CompiledSchema>> {
        self.schemas.invalidate(&self.dataset);
        self.schema().await
    }

    /// Submit a transaction against the current dataset, validating against
    /// its schema.
    pub async fn submit(
        &self,
        transaction: Transaction,
        options: &TransactionOptions,
    ) -> Result<TransactionResult> {
        let schema = self.schema().await?;
        transaction
            .submit(self.store(), &self.dataset, Some(&schema), options)
            .await
    }
}
