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

//! Database catalog
//!
//! Resolves qualified names to storages, stores CREATE metadata, and keeps
//! the source-table → view dependency graph. Dependency mutations are
//! serialized by the catalog; add/remove are idempotent.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::core::{Error, Result};
use crate::storage::ddl::CreateTableQuery;
use crate::storage::traits::{QualifiedName, StorageId, Table};

/// A database: a namespace of tables with their CREATE metadata
pub trait Database: Send + Sync {
    /// Name of the database
    fn name(&self) -> &str;

    /// Whether a table with this name exists
    fn has_table(&self, table: &str) -> bool;

    /// Get a table by name
    fn try_get_table(&self, table: &str) -> Option<Arc<dyn Table>>;

    /// The stored CREATE query of a table
    fn get_create_table_query(&self, table: &str) -> Result<CreateTableQuery>;

    /// Replace the stored CREATE metadata of a table
    fn alter_table(&self, table: &str, create: CreateTableQuery) -> Result<()>;

    /// Names of all tables, sorted
    fn table_names(&self) -> Vec<String>;
}

/// The catalog: databases, storages, and the view dependency graph
pub trait Catalog: Send + Sync {
    /// Get a database by name
    fn get_database(&self, name: &str) -> Result<Arc<dyn Database>>;

    /// Create a database
    fn create_database(&self, name: &str) -> Result<Arc<dyn Database>>;

    /// Resolve a storage, failing when absent
    fn get_table(&self, id: &StorageId) -> Result<Arc<dyn Table>>;

    /// Resolve a storage, returning None when absent
    fn try_get_table(&self, id: &StorageId) -> Option<Arc<dyn Table>>;

    /// Register a storage with its CREATE metadata
    fn attach_table(
        &self,
        database: &str,
        create: CreateTableQuery,
        storage: Arc<dyn Table>,
    ) -> Result<()>;

    /// Unregister a storage, returning it with its CREATE metadata
    fn detach_table(&self, id: &StorageId) -> Result<(Arc<dyn Table>, CreateTableQuery)>;

    /// Record that `view` depends on `source`; idempotent
    fn add_view_dependency(&self, source: &StorageId, view: &StorageId);

    /// Remove a recorded dependency; idempotent
    fn remove_view_dependency(&self, source: &StorageId, view: &StorageId);

    /// Move a dependency edge from (old_source, old_view) to
    /// (new_source, new_view)
    fn update_view_dependency(
        &self,
        old_source: &StorageId,
        old_view: &StorageId,
        new_source: &StorageId,
        new_view: &StorageId,
    );

    /// All views currently depending on `source`
    fn get_dependent_views(&self, source: &StorageId) -> Vec<StorageId>;
}

struct TableEntry {
    storage: Arc<dyn Table>,
    create: CreateTableQuery,
}

/// In-memory database implementation
pub struct MemoryDatabase {
    name: String,
    tables: RwLock<FxHashMap<String, TableEntry>>,
}

impl MemoryDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: RwLock::new(FxHashMap::default()),
        }
    }

    fn attach(&self, create: CreateTableQuery, storage: Arc<dyn Table>) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(&create.table) {
            return Err(Error::TableAlreadyExists(format!(
                "{}.{}",
                self.name, create.table
            )));
        }
        tables.insert(create.table.clone(), TableEntry { storage, create });
        Ok(())
    }

    fn detach(&self, table: &str) -> Result<(Arc<dyn Table>, CreateTableQuery)> {
        let mut tables = self.tables.write();
        let entry = tables
            .remove(table)
            .ok_or_else(|| Error::TableNotFound(format!("{}.{}", self.name, table)))?;
        Ok((entry.storage, entry.create))
    }
}

impl Database for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_table(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }

    fn try_get_table(&self, table: &str) -> Option<Arc<dyn Table>> {
        self.tables
            .read()
            .get(table)
            .map(|e| Arc::clone(&e.storage))
    }

    fn get_create_table_query(&self, table: &str) -> Result<CreateTableQuery> {
        self.tables
            .read()
            .get(table)
            .map(|e| e.create.clone())
            .ok_or_else(|| Error::TableNotFound(format!("{}.{}", self.name, table)))
    }

    fn alter_table(&self, table: &str, create: CreateTableQuery) -> Result<()> {
        let mut tables = self.tables.write();
        match tables.get_mut(table) {
            Some(entry) => {
                entry.create = create;
                Ok(())
            }
            None => Err(Error::TableNotFound(format!("{}.{}", self.name, table))),
        }
    }

    fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// In-memory catalog implementation
///
/// Created with a `default` database, mirroring a fresh server.
pub struct MemoryCatalog {
    databases: RwLock<FxHashMap<String, Arc<MemoryDatabase>>>,
    dependencies: Mutex<FxHashMap<QualifiedName, Vec<StorageId>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        let catalog = Self {
            databases: RwLock::new(FxHashMap::default()),
            dependencies: Mutex::new(FxHashMap::default()),
        };
        catalog
            .databases
            .write()
            .insert("default".to_string(), Arc::new(MemoryDatabase::new("default")));
        catalog
    }

    fn get_memory_database(&self, name: &str) -> Result<Arc<MemoryDatabase>> {
        self.databases
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::DatabaseNotFound(name.to_string()))
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for MemoryCatalog {
    fn get_database(&self, name: &str) -> Result<Arc<dyn Database>> {
        Ok(self.get_memory_database(name)?)
    }

    fn create_database(&self, name: &str) -> Result<Arc<dyn Database>> {
        let mut databases = self.databases.write();
        if databases.contains_key(name) {
            return Err(Error::internal(format!("database '{}' already exists", name)));
        }
        let database = Arc::new(MemoryDatabase::new(name));
        databases.insert(name.to_string(), Arc::clone(&database));
        Ok(database)
    }

    fn get_table(&self, id: &StorageId) -> Result<Arc<dyn Table>> {
        self.try_get_table(id)
            .ok_or_else(|| Error::TableNotFound(id.full_name()))
    }

    fn try_get_table(&self, id: &StorageId) -> Option<Arc<dyn Table>> {
        self.get_memory_database(&id.database)
            .ok()?
            .try_get_table(&id.table)
    }

    fn attach_table(
        &self,
        database: &str,
        create: CreateTableQuery,
        storage: Arc<dyn Table>,
    ) -> Result<()> {
        self.get_memory_database(database)?.attach(create, storage)
    }

    fn detach_table(&self, id: &StorageId) -> Result<(Arc<dyn Table>, CreateTableQuery)> {
        self.get_memory_database(&id.database)?.detach(&id.table)
    }

    fn add_view_dependency(&self, source: &StorageId, view: &StorageId) {
        let mut dependencies = self.dependencies.lock();
        let views = dependencies.entry(source.qualified_name()).or_default();
        if !views
            .iter()
            .any(|v| v.qualified_name() == view.qualified_name())
        {
            views.push(view.clone());
        }
    }

    fn remove_view_dependency(&self, source: &StorageId, view: &StorageId) {
        let mut dependencies = self.dependencies.lock();
        if let Some(views) = dependencies.get_mut(&source.qualified_name()) {
            views.retain(|v| v.qualified_name() != view.qualified_name());
            if views.is_empty() {
                dependencies.remove(&source.qualified_name());
            }
        }
    }

    fn update_view_dependency(
        &self,
        old_source: &StorageId,
        old_view: &StorageId,
        new_source: &StorageId,
        new_view: &StorageId,
    ) {
        self.remove_view_dependency(old_source, old_view);
        self.add_view_dependency(new_source, new_view);
    }

    fn get_dependent_views(&self, source: &StorageId) -> Vec<StorageId> {
        self.dependencies
            .lock()
            .get(&source.qualified_name())
            .cloned()
            .unwrap_or_default()
    }
}
