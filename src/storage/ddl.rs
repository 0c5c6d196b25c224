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

//! DDL statements and their execution
//!
//! CREATE / DROP / RENAME are executed against the catalog through
//! [`DdlExecutor`]. Executions are serialized per table name by DDL guards;
//! guards must be acquired in lexicographical order of qualified names.

use std::sync::Arc;

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use rustc_hash::FxHashMap;
use uuid::Uuid;

use crate::core::{Error, Result, Schema, SchemaColumn, Value};
use crate::storage::catalog::{Catalog, Database};
use crate::storage::context::ExecutionContext;
use crate::storage::traits::{QualifiedName, StorageId, Table};
use crate::storage::view::refresh::RefreshStrategy;
use crate::storage::view::select::SelectQueryDescription;

/// What kind of object a CREATE query declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableKind {
    /// A regular table
    #[default]
    Table,
    /// An ordinary (non-materialized) view
    View,
    /// A materialized view
    MaterializedView,
    /// A dictionary
    Dictionary,
}

impl TableKind {
    /// Whether this kind is a view or dictionary rather than a regular table
    pub fn is_view_or_dictionary(&self) -> bool {
        !matches!(self, TableKind::Table)
    }
}

/// The storage clause of a CREATE query: engine plus layout options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageClause {
    /// Engine name, resolved through the storage registry
    pub engine: String,
    /// PARTITION BY expression, if any
    pub partition_by: Option<String>,
}

impl StorageClause {
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            partition_by: None,
        }
    }
}

/// A parsed CREATE query
///
/// Carries everything construction needs: declared columns, the storage
/// clause, and for materialized views the SELECT description, refresh
/// strategy, TO target, and inner-table UUIDs.
#[derive(Debug, Clone)]
pub struct CreateTableQuery {
    pub database: String,
    pub table: String,
    pub uuid: Option<Uuid>,
    pub kind: TableKind,
    pub columns: Vec<SchemaColumn>,
    pub storage: Option<StorageClause>,
    pub select: Option<SelectQueryDescription>,
    pub refresh: Option<RefreshStrategy>,
    /// Pre-existing destination table of a TO clause
    pub to_table: Option<StorageId>,
    /// UUIDs to re-bind inner tables with; target first, scratch last
    pub to_inner_uuids: Vec<Uuid>,
    /// Reattaching an existing object rather than creating a fresh one
    pub attach: bool,
    /// CREATE ... EMPTY: skip the initial refresh
    pub is_create_empty: bool,
    pub comment: Option<String>,
}

impl CreateTableQuery {
    /// Start a CREATE TABLE query
    pub fn table(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            uuid: None,
            kind: TableKind::Table,
            columns: Vec::new(),
            storage: None,
            select: None,
            refresh: None,
            to_table: None,
            to_inner_uuids: Vec::new(),
            attach: false,
            is_create_empty: false,
            comment: None,
        }
    }

    /// Start a CREATE MATERIALIZED VIEW query
    pub fn materialized_view(database: impl Into<String>, table: impl Into<String>) -> Self {
        let mut query = Self::table(database, table);
        query.kind = TableKind::MaterializedView;
        query
    }

    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn with_columns(mut self, columns: Vec<SchemaColumn>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.storage = Some(StorageClause::new(engine));
        self
    }

    pub fn with_storage(mut self, storage: StorageClause) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_select(mut self, select: SelectQueryDescription) -> Self {
        self.select = Some(select);
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshStrategy) -> Self {
        self.refresh = Some(refresh);
        self
    }

    pub fn with_to_table(mut self, to_table: StorageId) -> Self {
        self.to_table = Some(to_table);
        self
    }

    pub fn with_to_inner_uuids(mut self, uuids: Vec<Uuid>) -> Self {
        self.to_inner_uuids = uuids;
        self
    }

    pub fn with_attach(mut self, attach: bool) -> Self {
        self.attach = attach;
        self
    }

    pub fn with_create_empty(mut self, empty: bool) -> Self {
        self.is_create_empty = empty;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// The identity this query creates
    pub fn storage_id(&self) -> StorageId {
        StorageId {
            database: self.database.clone(),
            table: self.table.clone(),
            uuid: self.uuid,
        }
    }

    /// Point this query at a different identity
    pub fn set_storage_id(&mut self, id: &StorageId) {
        self.database = id.database.clone();
        self.table = id.table.clone();
        self.uuid = id.uuid;
    }

    /// The declared columns as a schema
    pub fn schema(&self) -> Schema {
        Schema::new(self.table.clone(), self.columns.clone())
    }

    /// Whether the view materializes into a table it creates itself
    /// (no TO clause)
    pub fn needs_inner_target_table(&self) -> bool {
        self.kind == TableKind::MaterializedView && self.to_table.is_none()
    }

    /// Whether the view needs a scratch table (refreshable without APPEND)
    pub fn needs_scratch_table(&self) -> bool {
        self.refresh.as_ref().is_some_and(|r| !r.append)
    }

    /// How many inner tables the view owns
    pub fn needs_inner_tables(&self) -> usize {
        usize::from(self.needs_inner_target_table()) + usize::from(self.needs_scratch_table())
    }
}

/// DROP statement kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    /// Remove the table and its data
    Drop,
    /// Remove all rows, keep the table
    Truncate,
}

/// Knobs of a DROP execution
#[derive(Debug, Clone, Copy)]
pub struct DropOptions {
    /// Wait for data removal to finish
    pub sync: bool,
    /// Ignore the session's synchronous-drop setting
    pub ignore_sync_setting: bool,
    /// Whether the executor may take the DDL guard for the dropped name.
    /// Callers already holding a guard for a lexicographically later name
    /// must pass false to keep guard acquisition ordered.
    pub may_lock_ddl_guard: bool,
}

impl Default for DropOptions {
    fn default() -> Self {
        Self {
            sync: true,
            ignore_sync_setting: false,
            may_lock_ddl_guard: true,
        }
    }
}

/// One table rename
#[derive(Debug, Clone)]
pub struct RenameElement {
    pub from: StorageId,
    pub to: StorageId,
}

/// A RENAME query covering one or more tables
#[derive(Debug, Clone, Default)]
pub struct RenameQuery {
    pub elements: Vec<RenameElement>,
}

impl RenameQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&mut self, from: StorageId, to: StorageId) {
        self.elements.push(RenameElement { from, to });
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// One ALTER command
#[derive(Debug, Clone)]
pub enum AlterCommand {
    /// MODIFY COMMENT
    ModifyComment { comment: Option<String> },
    /// MODIFY QUERY: replace the SELECT of a materialized view
    ModifyQuery { select: SelectQueryDescription },
    /// MODIFY REFRESH: replace the refresh strategy
    ModifyRefresh { strategy: RefreshStrategy },
    /// ADD COLUMN
    AddColumn { column: SchemaColumn },
    /// DROP COLUMN
    DropColumn { name: String },
}

impl AlterCommand {
    /// Whether this command only changes the comment
    pub fn is_comment_alter(&self) -> bool {
        matches!(self, AlterCommand::ModifyComment { .. })
    }

    /// Short name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            AlterCommand::ModifyComment { .. } => "MODIFY COMMENT",
            AlterCommand::ModifyQuery { .. } => "MODIFY QUERY",
            AlterCommand::ModifyRefresh { .. } => "MODIFY REFRESH",
            AlterCommand::AddColumn { .. } => "ADD COLUMN",
            AlterCommand::DropColumn { .. } => "DROP COLUMN",
        }
    }
}

/// One mutation command
#[derive(Debug, Clone)]
pub enum MutationCommand {
    /// Delete every row
    Delete,
    /// Set a column to a constant value in every row
    Update { column: String, value: Value },
}

/// One partition command
#[derive(Debug, Clone)]
pub enum PartitionCommand {
    Drop { partition: String },
    Attach { partition: String },
}

/// A held per-name DDL guard
pub struct DdlGuard {
    _guard: ArcMutexGuard<RawMutex, ()>,
}

/// Per-table-name mutexes serializing DDL
#[derive(Default)]
pub struct DdlGuardMap {
    guards: Mutex<FxHashMap<QualifiedName, Arc<Mutex<()>>>>,
}

impl DdlGuardMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard for one qualified name
    pub fn acquire(&self, name: &QualifiedName) -> DdlGuard {
        let slot = {
            let mut guards = self.guards.lock();
            Arc::clone(
                guards
                    .entry(name.clone())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        DdlGuard {
            _guard: slot.lock_arc(),
        }
    }

    /// Take guards for two names in lexicographical order
    pub fn acquire_pair(&self, a: &QualifiedName, b: &QualifiedName) -> Vec<DdlGuard> {
        if a == b {
            return vec![self.acquire(a)];
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        vec![self.acquire(first), self.acquire(second)]
    }
}

/// Executes DDL statements
pub trait DdlExecutor: Send + Sync {
    /// Create a table and start it up; returns the materialized identity
    fn execute_create(&self, query: &CreateTableQuery, ctx: &ExecutionContext)
        -> Result<StorageId>;

    /// Drop or truncate a table
    fn execute_drop(
        &self,
        id: &StorageId,
        kind: DropKind,
        opts: DropOptions,
        ctx: &ExecutionContext,
    ) -> Result<()>;

    /// Rename one or more tables
    fn execute_rename(&self, query: &RenameQuery, ctx: &ExecutionContext) -> Result<()>;
}

/// DDL executor operating directly on the catalog
///
/// Engines drop their data eagerly here, so the `sync` /
/// `ignore_sync_setting` knobs only matter to engines that defer physical
/// cleanup; the knobs are still threaded through for them.
#[derive(Default)]
pub struct CatalogDdlExecutor {
    guards: DdlGuardMap,
}

impl CatalogDdlExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DdlExecutor for CatalogDdlExecutor {
    fn execute_create(
        &self,
        query: &CreateTableQuery,
        ctx: &ExecutionContext,
    ) -> Result<StorageId> {
        let mut query = query.clone();
        if query.uuid.is_none() {
            query.uuid = Some(Uuid::new_v4());
        }
        let id = query.storage_id();

        let _guard = self.guards.acquire(&id.qualified_name());

        let database = ctx.catalog().get_database(&query.database)?;
        if database.has_table(&query.table) {
            if query.attach {
                // Reattach binds to the existing object
                return Ok(ctx.catalog().get_table(&id)?.storage_id());
            }
            return Err(Error::TableAlreadyExists(id.full_name()));
        }

        let storage = ctx.registry().create(&query, ctx)?;
        ctx.catalog()
            .attach_table(&query.database, query.clone(), Arc::clone(&storage))?;
        storage.startup(ctx)?;
        Ok(storage.storage_id())
    }

    fn execute_drop(
        &self,
        id: &StorageId,
        kind: DropKind,
        opts: DropOptions,
        ctx: &ExecutionContext,
    ) -> Result<()> {
        match kind {
            DropKind::Drop => {
                let _guard = opts
                    .may_lock_ddl_guard
                    .then(|| self.guards.acquire(&id.qualified_name()));
                let storage = ctx.catalog().get_table(id)?;
                storage.shutdown(ctx)?;
                storage.drop_storage(ctx)?;
                ctx.catalog().detach_table(id)?;
                Ok(())
            }
            DropKind::Truncate => {
                let storage = ctx.catalog().get_table(id)?;
                let lock = storage
                    .lock_exclusively(ctx.query_id(), ctx.settings().lock_acquire_timeout)?;
                storage.truncate(ctx, &lock)
            }
        }
    }

    fn execute_rename(&self, query: &RenameQuery, ctx: &ExecutionContext) -> Result<()> {
        for element in &query.elements {
            let _guards = self.guards.acquire_pair(
                &element.from.qualified_name(),
                &element.to.qualified_name(),
            );

            if ctx.catalog().try_get_table(&element.to).is_some() {
                return Err(Error::TableAlreadyExists(element.to.full_name()));
            }
            // Target database must exist before we detach anything
            ctx.catalog().get_database(&element.to.database)?;

            let (storage, mut create) = ctx.catalog().detach_table(&element.from)?;

            let mut new_id = element.to.clone();
            if new_id.uuid.is_none() {
                new_id.uuid = storage.storage_id().uuid;
            }
            storage.rename_in_memory(new_id.clone(), ctx)?;

            create.set_storage_id(&new_id);
            ctx.catalog()
                .attach_table(&new_id.database, create, storage)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;

    #[test]
    fn test_create_query_inner_table_needs() {
        let plain = CreateTableQuery::table("db", "t").with_engine("Memory");
        assert!(!plain.needs_inner_target_table());
        assert!(!plain.needs_scratch_table());
        assert_eq!(plain.needs_inner_tables(), 0);

        let select = SelectQueryDescription::new("SELECT id FROM db.src")
            .with_source_table(StorageId::new("db", "src"));

        let inner = CreateTableQuery::materialized_view("db", "v")
            .with_engine("Memory")
            .with_select(select.clone());
        assert!(inner.needs_inner_target_table());
        assert_eq!(inner.needs_inner_tables(), 1);

        let to_clause = CreateTableQuery::materialized_view("db", "v")
            .with_select(select.clone())
            .with_to_table(StorageId::new("db", "dst"));
        assert!(!to_clause.needs_inner_target_table());
        assert_eq!(to_clause.needs_inner_tables(), 0);

        let refreshable = CreateTableQuery::materialized_view("db", "v")
            .with_engine("Memory")
            .with_select(select.clone())
            .with_refresh(RefreshStrategy::every_secs(3600));
        assert!(refreshable.needs_scratch_table());
        assert_eq!(refreshable.needs_inner_tables(), 2);

        let append = CreateTableQuery::materialized_view("db", "v")
            .with_engine("Memory")
            .with_select(select)
            .with_refresh(RefreshStrategy::every_secs(3600).with_append(true));
        assert!(!append.needs_scratch_table());
        assert_eq!(append.needs_inner_tables(), 1);
    }

    #[test]
    fn test_create_query_schema() {
        let query = CreateTableQuery::table("db", "t").with_columns(vec![
            SchemaColumn::simple(0, "id", DataType::Integer),
            SchemaColumn::nullable(1, "note", DataType::Text),
        ]);
        let schema = query.schema();
        assert_eq!(schema.table_name, "t");
        assert_eq!(schema.column_names(), vec!["id", "note"]);
    }

    #[test]
    fn test_table_kind() {
        assert!(!TableKind::Table.is_view_or_dictionary());
        assert!(TableKind::View.is_view_or_dictionary());
        assert!(TableKind::MaterializedView.is_view_or_dictionary());
        assert!(TableKind::Dictionary.is_view_or_dictionary());
    }

    #[test]
    fn test_ddl_guard_map_pair_ordering() {
        let guards = DdlGuardMap::new();
        let a = StorageId::new("db", "a").qualified_name();
        let b = StorageId::new("db", "b").qualified_name();

        // Acquiring a pair in either argument order must not deadlock
        let first = guards.acquire_pair(&a, &b);
        drop(first);
        let second = guards.acquire_pair(&b, &a);
        assert_eq!(second.len(), 2);
        drop(second);

        // Equal names yield one guard
        assert_eq!(guards.acquire_pair(&a, &a).len(), 1);
    }
}
