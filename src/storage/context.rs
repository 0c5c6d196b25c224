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

//! Execution context
//!
//! A context bundles the process-wide collaborators (catalog, storage
//! registry, DDL executor, query runner) with per-query state (settings,
//! query id). Tests supply fakes by assembling a context around them.

use std::sync::Arc;

use uuid::Uuid;

use crate::core::Result;
use crate::storage::catalog::{Catalog, MemoryCatalog};
use crate::storage::config::Settings;
use crate::storage::ddl::{CatalogDdlExecutor, DdlExecutor};
use crate::storage::registry::StorageRegistry;
use crate::storage::traits::{ConvertingActions, RowSink, Table};
use crate::storage::view::refresh::InsertQuery;

/// Executes DML produced by the storage layer
pub trait QueryRunner: Send + Sync {
    /// Run an INSERT ... SELECT to completion
    fn execute_insert(&self, query: &InsertQuery, ctx: &ExecutionContext) -> Result<()>;
}

/// Query runner evaluating SELECTs directly against catalog storages
///
/// Covers the SELECT shapes a materialized view stores: a projection of one
/// source table's columns.
#[derive(Default)]
pub struct CatalogQueryRunner;

impl CatalogQueryRunner {
    pub fn new() -> Self {
        Self
    }
}

impl QueryRunner for CatalogQueryRunner {
    fn execute_insert(&self, query: &InsertQuery, ctx: &ExecutionContext) -> Result<()> {
        let destination = ctx.catalog().get_table(&query.table)?;

        let header = query.select.sample_header(ctx)?;
        let source = ctx
            .catalog()
            .get_table(query.select.require_source_table()?)?;
        let plan = source.read(&header.column_names_owned(), ctx)?;
        let rows = plan.execute()?;

        let destination_schema = destination.schema();
        let actions = ConvertingActions::make_converting(&header, &destination_schema)?;
        let converted = actions.apply_all(&rows)?;

        let mut sink = destination.write(ctx)?;
        sink.write_rows(converted)?;
        sink.finish()
    }
}

/// Per-query execution state plus handles to process-wide collaborators
#[derive(Clone)]
pub struct ExecutionContext {
    catalog: Arc<dyn Catalog>,
    registry: Arc<StorageRegistry>,
    ddl: Arc<dyn DdlExecutor>,
    query_runner: Arc<dyn QueryRunner>,
    settings: Settings,
    query_id: String,
    internal: bool,
}

impl ExecutionContext {
    /// Assemble a context from explicit collaborators
    pub fn new(
        catalog: Arc<dyn Catalog>,
        registry: Arc<StorageRegistry>,
        ddl: Arc<dyn DdlExecutor>,
        query_runner: Arc<dyn QueryRunner>,
        settings: Settings,
    ) -> Self {
        Self {
            catalog,
            registry,
            ddl,
            query_runner,
            settings,
            query_id: Uuid::new_v4().to_string(),
            internal: false,
        }
    }

    /// Assemble a fully in-memory stack: memory catalog, default engines,
    /// catalog-backed DDL executor and query runner
    pub fn in_memory(settings: Settings) -> Self {
        let registry = StorageRegistry::new();
        crate::storage::memory::register_memory_engine(&registry);
        crate::storage::view::register_materialized_view(&registry);
        Self::new(
            Arc::new(MemoryCatalog::new()),
            Arc::new(registry),
            Arc::new(CatalogDdlExecutor::new()),
            Arc::new(CatalogQueryRunner::new()),
            settings,
        )
    }

    /// Copy this context for a nested execution
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Replace the query id with a freshly generated one
    pub fn with_fresh_query_id(mut self) -> Self {
        self.query_id = Uuid::new_v4().to_string();
        self
    }

    /// Mark this context as driving an internal statement
    pub fn as_internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Replace the settings
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<StorageRegistry> {
        &self.registry
    }

    pub fn ddl(&self) -> &Arc<dyn DdlExecutor> {
        &self.ddl
    }

    pub fn query_runner(&self) -> &Arc<dyn QueryRunner> {
        &self.query_runner
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_copy_and_query_id() {
        let ctx = ExecutionContext::in_memory(Settings::default());
        assert!(!ctx.query_id().is_empty());
        assert!(!ctx.is_internal());

        let copy = ctx.copy();
        assert_eq!(copy.query_id(), ctx.query_id());

        let fresh = ctx.copy().with_fresh_query_id().as_internal();
        assert_ne!(fresh.query_id(), ctx.query_id());
        assert!(fresh.is_internal());
    }

    #[test]
    fn test_in_memory_stack_has_default_engines() {
        let ctx = ExecutionContext::in_memory(Settings::default());
        assert!(ctx.registry().has_engine("Memory"));
        assert!(ctx.registry().has_engine("MaterializedView"));
        assert!(ctx.catalog().get_database("default").is_ok());
    }
}
