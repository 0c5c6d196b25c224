// Copyright 2025 Silica Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Storage engine registry
//!
//! Maps engine names to their capability set and a builder that constructs
//! a storage from a CREATE query. Engines register themselves here; DDL
//! resolves them by name.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::{Error, Result};
use crate::storage::context::ExecutionContext;
use crate::storage::ddl::{CreateTableQuery, TableKind};
use crate::storage::traits::Table;

/// Capability set of a storage engine
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageFeatures {
    /// Whether data can be moved wholesale between two tables of this engine
    pub supports_moving_data_between_tables: bool,

    /// Whether the engine replicates data across servers
    pub supports_replication: bool,

    /// Whether the engine supports PARTITION BY
    pub supports_partition_by: bool,
}

/// Constructs a storage from its CREATE query
pub type StorageBuilder =
    dyn Fn(&CreateTableQuery, &ExecutionContext) -> Result<Arc<dyn Table>> + Send + Sync;

struct EngineEntry {
    features: StorageFeatures,
    builder: Arc<StorageBuilder>,
}

/// Registry of storage engines, keyed by engine name
#[derive(Default)]
pub struct StorageRegistry {
    engines: RwLock<FxHashMap<String, EngineEntry>>,
}

impl StorageRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under the given name, replacing any previous entry
    pub fn register(
        &self,
        name: impl Into<String>,
        features: StorageFeatures,
        builder: impl Fn(&CreateTableQuery, &ExecutionContext) -> Result<Arc<dyn Table>>
            + Send
            + Sync
            + 'static,
    ) {
        self.engines.write().insert(
            name.into(),
            EngineEntry {
                features,
                builder: Arc::new(builder),
            },
        );
    }

    /// The capability set of an engine, if registered
    pub fn try_get_features(&self, name: &str) -> Option<StorageFeatures> {
        self.engines.read().get(name).map(|e| e.features)
    }

    /// Whether an engine is registered
    pub fn has_engine(&self, name: &str) -> bool {
        self.engines.read().contains_key(name)
    }

    /// Names of all engines whose features match the predicate, sorted
    pub fn names_with(&self, pred: impl Fn(&StorageFeatures) -> bool) -> Vec<String> {
        let mut names: Vec<String> = self
            .engines
            .read()
            .iter()
            .filter(|(_, e)| pred(&e.features))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Build a storage for the CREATE query
    ///
    /// Materialized views resolve to the MaterializedView engine; their
    /// storage clause names the engine of the inner target table instead.
    pub fn create(
        &self,
        query: &CreateTableQuery,
        ctx: &ExecutionContext,
    ) -> Result<Arc<dyn Table>> {
        let engine = match query.kind {
            TableKind::MaterializedView => "MaterializedView".to_string(),
            _ => query
                .storage
                .as_ref()
                .map(|s| s.engine.clone())
                .ok_or_else(|| Error::incorrect_query("CREATE query has no ENGINE"))?,
        };
        let builder = {
            let engines = self.engines.read();
            let entry = engines
                .get(&engine)
                .ok_or_else(|| Error::UnknownStorageEngine(engine.clone()))?;
            Arc::clone(&entry.builder)
        };
        builder(query, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_features() {
        let registry = StorageRegistry::new();
        assert!(registry.try_get_features("Memory").is_none());
        assert!(!registry.has_engine("Memory"));

        registry.register(
            "Memory",
            StorageFeatures {
                supports_moving_data_between_tables: true,
                ..Default::default()
            },
            |_, _| Err(Error::internal("unused")),
        );

        assert!(registry.has_engine("Memory"));
        let features = registry.try_get_features("Memory").unwrap();
        assert!(features.supports_moving_data_between_tables);
        assert!(!features.supports_replication);
    }

    #[test]
    fn test_registry_names_with() {
        let registry = StorageRegistry::new();
        registry.register(
            "Memory",
            StorageFeatures {
                supports_moving_data_between_tables: true,
                ..Default::default()
            },
            |_, _| Err(Error::internal("unused")),
        );
        registry.register(
            "ReplicatedLog",
            StorageFeatures {
                supports_replication: true,
                ..Default::default()
            },
            |_, _| Err(Error::internal("unused")),
        );

        assert_eq!(
            registry.names_with(|f| f.supports_moving_data_between_tables),
            vec!["Memory".to_string()]
        );
        assert_eq!(
            registry.names_with(|f| f.supports_replication),
            vec!["ReplicatedLog".to_string()]
        );
    }
}
