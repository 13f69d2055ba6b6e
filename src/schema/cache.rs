//! Per-dataset validator cache.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::CompiledSchema;
use crate::error::{McpError, Result};
use crate::store::{DatasetRef, ManifestSource};

/// Compiled schemas keyed by dataset.
///
/// Entries are written once per dataset and read-only afterwards. Two callers
/// compiling the same dataset concurrently both succeed; the later insert wins.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<DatasetRef, Arc<CompiledSchema>>>,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached schema for a dataset.
    pub fn get(&self, dataset: &DatasetRef) -> Option<Arc<CompiledSchema>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dataset)
            .cloned()
    }

    /// Store a compiled schema, replacing any previous entry.
    pub fn insert(&self, dataset: DatasetRef, schema: CompiledSchema) -> Arc<CompiledSchema> {
        let schema = Arc::new(schema);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(dataset, Arc::clone(&schema));
        schema
    }

    /// Cached schema for a dataset, compiling it from `source` on first use.
    pub async fn load(
        &self,
        source: &dyn ManifestSource,
        dataset: &DatasetRef,
    ) -> Result<Arc<CompiledSchema>> {
        if let Some(schema) = self.get(dataset) {
            return Ok(schema);
        }

        let manifests = source
            .manifests(dataset)
            .await
            .map_err(|e| McpError::store("load schema", e))?;
        debug!(%dataset, types = manifests.len(), "compiling schema");
        let schema = CompiledSchema::compile(manifests)?;
        Ok(self.insert(dataset.clone(), schema))
    }

    /// Drop the cached schema of a dataset. Returns whether one was cached.
    pub fn invalidate(&self, dataset: &DatasetRef) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(dataset)
            .is_some()
    }
}
