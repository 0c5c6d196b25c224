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

//! Materialized view storage
//!
//! A materialized view presents itself as a regular table while its data
//! lives in a target table it either owns (an inner table) or was pointed at
//! (a TO clause). Refreshable views without APPEND additionally own a
//! scratch table: each refresh fills the scratch and then atomically moves
//! its contents over the target.
//!
//! Reads, writes, and maintenance statements are forwarded to the target,
//! resolved through the catalog on every call because renames can change
//! the inner identities underneath.

pub mod alter;
pub mod convert;
pub mod inner;
pub mod refresh;
pub mod select;

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::core::{Error, Result, Schema, SchemaColumn};
use crate::storage::catalog::{Catalog, Database};
use crate::storage::context::ExecutionContext;
use crate::storage::ddl::{
    AlterCommand, CreateTableQuery, DdlExecutor, DropKind, DropOptions, MutationCommand,
    PartitionCommand, RenameQuery,
};
use crate::storage::registry::{StorageFeatures, StorageRegistry};
use crate::storage::traits::{
    ActionLock, ActionLockKind, BackupEntriesCollector, BackupRestorer, QueryProcessingStage,
    ReadPlan, RowSink, StorageId, Table, TableLock, TableLockState,
};
use inner::{inner_table_name, InnerTableIds};
use refresh::{InsertQuery, RefreshTask};
use select::SelectQueryDescription;

/// Engine name in the storage registry
pub const MATERIALIZED_VIEW_ENGINE_NAME: &str = "MaterializedView";

/// In-memory metadata of a materialized view
#[derive(Debug, Clone)]
pub struct ViewMetadata {
    /// Declared columns of the view
    pub columns: Vec<SchemaColumn>,
    /// The stored SELECT
    pub select: SelectQueryDescription,
    /// Refresh strategy, when the view is refreshable
    pub refresh: Option<refresh::RefreshStrategy>,
    /// Table comment
    pub comment: Option<String>,
}

/// A materialized view
pub struct MaterializedViewTable {
    table_id: Mutex<StorageId>,
    metadata: RwLock<ViewMetadata>,
    has_inner_target_table: bool,
    has_scratch_table: bool,
    /// Inner identities; mutated under this mutex only
    inner_ids: Mutex<InnerTableIds>,
    /// True right after the scratch table was created or drained into the
    /// target; false once an insert into it has begun
    scratch_table_is_known_to_be_empty: AtomicBool,
    refresher: Option<Arc<RefreshTask>>,
    refresh_on_start: bool,
    lock_state: TableLockState,
    global_ctx: ExecutionContext,
}

impl MaterializedViewTable {
    /// Construct a materialized view from its CREATE query
    ///
    /// With `attach == false` this also creates the inner tables; if one of
    /// two creates fails, the other is dropped best-effort and the original
    /// error propagates.
    pub fn create(
        table_id: StorageId,
        local_ctx: &ExecutionContext,
        query: &CreateTableQuery,
        columns: Vec<SchemaColumn>,
        attach: bool,
        comment: Option<String>,
    ) -> Result<Arc<Self>> {
        let select = query.select.clone().ok_or_else(|| {
            Error::incorrect_query("SELECT query is not specified for MaterializedView")
        })?;

        let has_inner_target_table = query.needs_inner_target_table();
        if has_inner_target_table && query.storage.is_none() {
            return Err(Error::incorrect_query(
                "you must specify where to save results of a materialized view query: \
                 either ENGINE or an existing table in a TO clause",
            ));
        }
        let has_scratch_table = query.needs_scratch_table();

        if let Some(source) = &select.source_table {
            let max = local_ctx
                .settings()
                .max_materialized_views_count_for_table;
            if max > 0 {
                let dependent = local_ctx.catalog().get_dependent_views(source);
                if dependent.len() as u64 >= max {
                    return Err(Error::TooManyMaterializedViews { maximum: max });
                }
            }
        }

        let points_to_itself_by_uuid = table_id
            .uuid
            .is_some_and(|uuid| query.to_inner_uuids.contains(&uuid));
        let points_to_itself_by_name = query
            .to_table
            .as_ref()
            .is_some_and(|to| to.qualified_name() == table_id.qualified_name());
        if points_to_itself_by_uuid || points_to_itself_by_name {
            return Err(Error::bad_arguments(format!(
                "materialized view {} cannot point to itself",
                table_id.full_name()
            )));
        }

        let mut target_table_id = if has_inner_target_table {
            StorageId::new(
                table_id.database.clone(),
                inner_table_name(&table_id, false),
            )
        } else {
            query.to_table.clone().ok_or_else(|| {
                Error::incorrect_query(
                    "you must specify where to save results of a materialized view query: \
                     either ENGINE or an existing table in a TO clause",
                )
            })?
        };
        let mut scratch_table_id = has_scratch_table.then(|| {
            StorageId::new(table_id.database.clone(), inner_table_name(&table_id, true))
        });

        if !query.to_inner_uuids.is_empty() {
            if query.to_inner_uuids.len() != query.needs_inner_tables() {
                return Err(Error::incorrect_query(format!(
                    "materialized view needs {} inner tables, but TO INNER UUID contains {} uuids",
                    query.needs_inner_tables(),
                    query.to_inner_uuids.len()
                )));
            }
            if has_inner_target_table {
                target_table_id.uuid = Some(query.to_inner_uuids[0]);
            }
            if let Some(scratch) = scratch_table_id.as_mut() {
                scratch.uuid = query.to_inner_uuids.last().copied();
            }
        }

        // Prepare inner create queries; executed after construction
        let mut inner_target_create: Option<CreateTableQuery> = None;
        let mut scratch_create: Option<CreateTableQuery> = None;
        let mut scratch_known_empty = false;

        if !attach {
            if has_inner_target_table {
                let storage = query.storage.clone().ok_or_else(|| {
                    Error::internal("inner target table requires a storage clause")
                })?;
                inner_target_create = Some(
                    CreateTableQuery::table(target_table_id.database.clone(), "")
                        .with_columns(columns.clone())
                        .with_storage(storage),
                );
            }

            if has_scratch_table {
                // Scratch table's column list and engine must match the target's
                let candidate = match &inner_target_create {
                    Some(create) => create.clone(),
                    None => {
                        let database = local_ctx
                            .catalog()
                            .get_database(&target_table_id.database)?;
                        database.get_create_table_query(&target_table_id.table)?
                    }
                };
                inner::check_scratch_create_query(&candidate, local_ctx)?;
                scratch_create = Some(candidate);
                scratch_known_empty = true;
            }
        }

        if let Some(strategy) = &query.refresh {
            debug_assert_eq!(has_scratch_table, !strategy.append);
        }
        let refresh_on_start = query.refresh.is_some() && !attach && !query.is_create_empty;

        let metadata = ViewMetadata {
            columns,
            select,
            refresh: query.refresh,
            comment,
        };

        let view = Arc::new_cyclic(|weak| Self {
            table_id: Mutex::new(table_id.clone()),
            metadata: RwLock::new(metadata),
            has_inner_target_table,
            has_scratch_table,
            inner_ids: Mutex::new(InnerTableIds {
                target: target_table_id,
                scratch: scratch_table_id,
            }),
            scratch_table_is_known_to_be_empty: AtomicBool::new(scratch_known_empty),
            refresher: query
                .refresh
                .map(|strategy| RefreshTask::new(weak.clone(), table_id.clone(), strategy)),
            refresh_on_start,
            lock_state: TableLockState::new(),
            global_ctx: local_ctx.copy(),
        });

        view.create_inner_tables(inner_target_create, scratch_create, local_ctx)?;
        Ok(view)
    }

    /// Execute the prepared inner creates, rolling back on partial failure
    fn create_inner_tables(
        &self,
        inner_target_create: Option<CreateTableQuery>,
        scratch_create: Option<CreateTableQuery>,
        local_ctx: &ExecutionContext,
    ) -> Result<()> {
        let mut created: Vec<StorageId> = Vec::new();

        let mut run = |create: Option<CreateTableQuery>, scratch: bool| -> Result<()> {
            let Some(mut create) = create else {
                return Ok(());
            };
            let id = {
                let ids = self.inner_ids.lock();
                if scratch {
                    ids.scratch
                        .clone()
                        .ok_or_else(|| Error::internal("scratch create without scratch identity"))?
                } else {
                    ids.target.clone()
                }
            };
            create.set_storage_id(&id);
            let create_ctx = local_ctx.copy().as_internal();
            let materialized = local_ctx.ddl().execute_create(&create, &create_ctx)?;
            created.push(materialized.clone());
            let mut ids = self.inner_ids.lock();
            if scratch {
                ids.scratch = Some(materialized);
            } else {
                ids.target = materialized;
            }
            Ok(())
        };

        let mut result = run(inner_target_create, false);
        if result.is_ok() {
            result = run(scratch_create, true);
        }

        if let Err(error) = result {
            // If we created one table but failed to create the other, try to
            // drop it; errors here are logged and never escalate
            let view_name = self.storage_id().qualified_name();
            for id in &created {
                let may_lock_ddl_guard = view_name < id.qualified_name();
                let drop_result = local_ctx.ddl().execute_drop(
                    id,
                    DropKind::Drop,
                    DropOptions {
                        sync: false,
                        ignore_sync_setting: true,
                        may_lock_ddl_guard,
                    },
                    local_ctx,
                );
                if let Err(drop_error) = drop_result {
                    warn!(inner_table = %id, error = %drop_error, "failed to un-create inner table");
                }
            }
            return Err(error);
        }
        Ok(())
    }

    /// Identity of the target table; taken under the inner-identity mutex
    pub fn target_table_id(&self) -> StorageId {
        self.inner_ids.lock().target.clone()
    }

    /// Identity of the scratch table, when the view owns one
    pub fn scratch_table_id(&self) -> Option<StorageId> {
        self.inner_ids.lock().scratch.clone()
    }

    /// Identities of the inner tables this view owns (0, 1, or 2)
    pub fn inner_tables(&self) -> Vec<StorageId> {
        let ids = self.inner_ids.lock();
        let mut result = Vec::new();
        if self.has_inner_target_table {
            result.push(ids.target.clone());
        }
        if let Some(scratch) = &ids.scratch {
            result.push(scratch.clone());
        }
        result
    }

    pub fn has_inner_target_table(&self) -> bool {
        self.has_inner_target_table
    }

    pub fn has_scratch_table(&self) -> bool {
        self.has_scratch_table
    }

    /// The refresh task, when the view is refreshable
    pub fn refresher(&self) -> Option<&Arc<RefreshTask>> {
        self.refresher.as_ref()
    }

    /// Whether the scratch table is known to hold no rows
    pub fn scratch_table_is_known_to_be_empty(&self) -> bool {
        self.scratch_table_is_known_to_be_empty
            .load(Ordering::SeqCst)
    }

    /// Snapshot of the in-memory metadata
    pub fn metadata_snapshot(&self) -> ViewMetadata {
        self.metadata.read().clone()
    }

    /// Resolve the target table, failing when it is gone
    pub fn get_target_table(&self) -> Result<Arc<dyn Table>> {
        self.global_ctx.catalog().get_table(&self.target_table_id())
    }

    /// Resolve the target table if it still exists
    pub fn try_get_target_table(&self) -> Option<Arc<dyn Table>> {
        self.global_ctx
            .catalog()
            .try_get_table(&self.target_table_id())
    }

    /// Resolve the scratch table, failing when it is gone
    pub fn get_scratch_table(&self) -> Result<Arc<dyn Table>> {
        let id = self
            .scratch_table_id()
            .ok_or_else(|| Error::internal("materialized view has no scratch table"))?;
        self.global_ctx.catalog().get_table(&id)
    }

    /// Resolve the scratch table if it still exists
    pub fn try_get_scratch_table(&self) -> Option<Arc<dyn Table>> {
        let id = self.scratch_table_id()?;
        self.global_ctx.catalog().try_get_table(&id)
    }

    /// A context copy with a fresh query id for one refresh cycle
    pub fn create_refresh_context(&self) -> ExecutionContext {
        self.global_ctx.copy().with_fresh_query_id()
    }

    /// Prepare one refresh cycle and return the insert to run
    ///
    /// The insert targets the scratch table when one exists, else the
    /// target. A scratch not known to be empty is truncated first under an
    /// exclusive lock, covering the previous cycle's failed insert.
    pub fn prepare_refresh(&self, refresh_ctx: &ExecutionContext) -> Result<InsertQuery> {
        let destination = match self.scratch_table_id() {
            Some(scratch) => scratch,
            None => self.target_table_id(),
        };

        if self.has_scratch_table && !self.scratch_table_is_known_to_be_empty() {
            let scratch = self.get_scratch_table()?;
            let lock = scratch.lock_exclusively(
                refresh_ctx.query_id(),
                refresh_ctx.settings().lock_acquire_timeout,
            )?;
            scratch.truncate(refresh_ctx, &lock)?;
        }

        let select = self.metadata.read().select.clone();
        let header = select.sample_header(refresh_ctx)?;
        let columns = header.column_names_owned();

        self.scratch_table_is_known_to_be_empty
            .store(false, Ordering::SeqCst);

        Ok(InsertQuery {
            table: destination,
            columns,
            select,
        })
    }

    /// Atomically move the refreshed data from scratch to target
    ///
    /// No-op for APPEND views, which have no scratch table.
    pub fn transfer_refreshed_data(&self, refresh_ctx: &ExecutionContext) -> Result<()> {
        if !self.has_scratch_table {
            return Ok(());
        }

        let target = self.get_target_table()?;
        let scratch = self.get_scratch_table()?;
        target.transfer_all_data_from(scratch.as_ref(), true, true, refresh_ctx)?;

        self.scratch_table_is_known_to_be_empty
            .store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Drop the inner tables this view owns, if they still exist
    pub fn drop_inner_table_if_any(&self, sync: bool, ctx: &ExecutionContext) -> Result<()> {
        for inner_id in self.inner_tables() {
            // Best-effort guard ordering: lock the inner name only when it
            // sorts after the view's own name
            let may_lock_ddl_guard =
                self.storage_id().qualified_name() < inner_id.qualified_name();
            if self.global_ctx.catalog().try_get_table(&inner_id).is_some() {
                self.global_ctx.ddl().execute_drop(
                    &inner_id,
                    DropKind::Drop,
                    DropOptions {
                        sync,
                        ignore_sync_setting: true,
                        may_lock_ddl_guard,
                    },
                    ctx,
                )?;
            }
        }
        Ok(())
    }

    fn check_statement_can_be_forwarded(&self) -> Result<()> {
        if !self.has_inner_target_table {
            return Err(Error::incorrect_query(format!(
                "materialized view targets existing table {}. \
                 Execute the statement directly on it",
                self.target_table_id().full_name()
            )));
        }
        Ok(())
    }

    fn update_source_dependency(
        &self,
        old_source: Option<&StorageId>,
        old_view: &StorageId,
        new_source: Option<&StorageId>,
        new_view: &StorageId,
    ) {
        let catalog = self.global_ctx.catalog();
        match (old_source, new_source) {
            (Some(old_src), Some(new_src)) => {
                catalog.update_view_dependency(old_src, old_view, new_src, new_view)
            }
            (Some(old_src), None) => catalog.remove_view_dependency(old_src, old_view),
            (None, Some(new_src)) => catalog.add_view_dependency(new_src, new_view),
            (None, None) => {}
        }
    }
}

impl std::fmt::Debug for MaterializedViewTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterializedViewTable")
            .field("table_id", &self.table_id.lock())
            .field("has_inner_target_table", &self.has_inner_target_table)
            .field("has_scratch_table", &self.has_scratch_table)
            .finish()
    }
}

impl Table for MaterializedViewTable {
    fn storage_id(&self) -> StorageId {
        self.table_id.lock().clone()
    }

    fn engine_name(&self) -> &str {
        MATERIALIZED_VIEW_ENGINE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::new(self.storage_id().table, self.metadata.read().columns.clone())
    }

    fn comment(&self) -> Option<String> {
        self.metadata.read().comment.clone()
    }

    fn lock_state(&self) -> &TableLockState {
        &self.lock_state
    }

    fn query_processing_stage(&self, ctx: &ExecutionContext) -> Result<QueryProcessingStage> {
        self.get_target_table()?.query_processing_stage(ctx)
    }

    fn read(&self, columns: &[String], ctx: &ExecutionContext) -> Result<ReadPlan> {
        let storage = self.get_target_table()?;
        let lock =
            storage.lock_for_share(ctx.query_id(), ctx.settings().lock_acquire_timeout)?;

        let mut plan = storage.read(columns, ctx)?;
        if plan.is_initialized() {
            let view_header = {
                let metadata = self.metadata.read();
                let mut view_columns = Vec::with_capacity(columns.len());
                for name in columns {
                    let column = metadata
                        .columns
                        .iter()
                        .find(|c| c.name.eq_ignore_ascii_case(name))
                        .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
                    let mut column = column.clone();
                    column.id = view_columns.len();
                    view_columns.push(column);
                }
                Schema::header(view_columns)
            };
            let stream_header = plan
                .current_header()
                .cloned()
                .unwrap_or_default();

            if let Some(actions) = convert::converting_step(&stream_header, &view_header)? {
                plan.add_converting_step(
                    actions,
                    "Convert target table structure to materialized view structure",
                );
            }

            plan.add_storage_holder(storage);
            plan.add_table_lock(lock);
        }
        Ok(plan)
    }

    fn write(&self, ctx: &ExecutionContext) -> Result<Box<dyn RowSink>> {
        let storage = self.get_target_table()?;
        let lock =
            storage.lock_for_share(ctx.query_id(), ctx.settings().lock_acquire_timeout)?;

        let mut sink = storage.write(ctx)?;
        sink.add_table_lock(lock);
        Ok(sink)
    }

    fn optimize(&self, ctx: &ExecutionContext) -> Result<bool> {
        self.check_statement_can_be_forwarded()?;
        self.get_target_table()?.optimize(ctx)
    }

    fn check_mutation_is_possible(&self, commands: &[MutationCommand]) -> Result<()> {
        self.check_statement_can_be_forwarded()?;
        self.get_target_table()?.check_mutation_is_possible(commands)
    }

    fn mutate(&self, commands: &[MutationCommand], ctx: &ExecutionContext) -> Result<()> {
        self.check_statement_can_be_forwarded()?;
        self.get_target_table()?.mutate(commands, ctx)
    }

    fn check_alter_partition_is_possible(&self, commands: &[PartitionCommand]) -> Result<()> {
        self.check_statement_can_be_forwarded()?;
        self.get_target_table()?
            .check_alter_partition_is_possible(commands)
    }

    fn alter_partition(
        &self,
        commands: &[PartitionCommand],
        ctx: &ExecutionContext,
    ) -> Result<()> {
        self.check_statement_can_be_forwarded()?;
        self.get_target_table()?.alter_partition(commands, ctx)
    }

    fn check_alter_is_possible(
        &self,
        commands: &[AlterCommand],
        _ctx: &ExecutionContext,
    ) -> Result<()> {
        alter::check_alter_is_possible(
            commands,
            self.refresher.is_some(),
            self.has_scratch_table,
            self.engine_name(),
        )
    }

    fn alter(&self, commands: &[AlterCommand], ctx: &ExecutionContext) -> Result<()> {
        self.check_alter_is_possible(commands, ctx)?;

        let table_id = self.storage_id();
        let old_metadata = self.metadata.read().clone();
        let mut new_metadata = old_metadata.clone();
        alter::apply_alter(&mut new_metadata, commands);

        self.update_source_dependency(
            old_metadata.select.source_table.as_ref(),
            &table_id,
            new_metadata.select.source_table.as_ref(),
            &table_id,
        );

        // Persist the new metadata in the catalog
        let database = self.global_ctx.catalog().get_database(&table_id.database)?;
        let mut create = database.get_create_table_query(&table_id.table)?;
        create.select = Some(new_metadata.select.clone());
        create.refresh = new_metadata.refresh;
        create.comment = new_metadata.comment.clone();
        database.alter_table(&table_id.table, create)?;

        *self.metadata.write() = new_metadata.clone();

        if let (Some(refresher), Some(strategy)) = (&self.refresher, new_metadata.refresh) {
            if commands
                .iter()
                .any(|c| matches!(c, AlterCommand::ModifyRefresh { .. }))
            {
                refresher.alter_refresh_params(strategy);
            }
        }
        Ok(())
    }

    fn truncate(&self, _ctx: &ExecutionContext, _lock: &TableLock) -> Result<()> {
        self.check_statement_can_be_forwarded()?;
        self.global_ctx.ddl().execute_drop(
            &self.target_table_id(),
            DropKind::Truncate,
            DropOptions::default(),
            &self.global_ctx,
        )
    }

    fn virtual_columns(&self) -> Vec<SchemaColumn> {
        match self.try_get_target_table() {
            Some(table) => table.virtual_columns(),
            None => Vec::new(),
        }
    }

    fn total_rows(&self) -> Option<u64> {
        if self.has_inner_target_table {
            return self.try_get_target_table()?.total_rows();
        }
        None
    }

    fn total_bytes(&self) -> Option<u64> {
        if self.has_inner_target_table {
            return self.try_get_target_table()?.total_bytes();
        }
        None
    }

    fn total_bytes_uncompressed(&self) -> Option<u64> {
        if self.has_inner_target_table {
            return self.try_get_target_table()?.total_bytes_uncompressed();
        }
        None
    }

    fn data_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        if let Some(table) = self.try_get_target_table() {
            paths.extend(table.data_paths());
        }
        if let Some(table) = self.try_get_scratch_table() {
            paths.extend(table.data_paths());
        }
        paths
    }

    fn is_remote(&self) -> bool {
        self.try_get_target_table()
            .map(|table| table.is_remote())
            .unwrap_or(false)
    }

    fn supports_backup_partition(&self) -> bool {
        if self.has_inner_target_table {
            return self
                .try_get_target_table()
                .map(|table| table.supports_backup_partition())
                .unwrap_or(false);
        }
        false
    }

    fn backup_data(
        &self,
        collector: &mut dyn BackupEntriesCollector,
        data_path_in_backup: &str,
        partitions: Option<&[String]>,
    ) -> Result<()> {
        // Backup the target table's data only when it is inner
        if self.has_inner_target_table {
            match self.try_get_target_table() {
                Some(table) => {
                    table.backup_data(collector, data_path_in_backup, partitions)?;
                }
                None => {
                    warn!(
                        view = %self.storage_id(),
                        "inner table does not exist, will not backup any data"
                    );
                }
            }
        }
        Ok(())
    }

    fn restore_data_from_backup(
        &self,
        restorer: &dyn BackupRestorer,
        data_path_in_backup: &str,
        partitions: Option<&[String]>,
    ) -> Result<()> {
        if self.has_inner_target_table {
            return self.get_target_table()?.restore_data_from_backup(
                restorer,
                data_path_in_backup,
                partitions,
            );
        }
        Ok(())
    }

    fn get_action_lock(&self, kind: ActionLockKind) -> ActionLock {
        if kind == ActionLockKind::ViewRefresh {
            if let Some(refresher) = &self.refresher {
                refresher.stop();
            }
        }
        if self.has_inner_target_table {
            if let Some(target) = self.try_get_target_table() {
                return target.get_action_lock(kind);
            }
        }
        ActionLock::empty()
    }

    fn on_action_lock_remove(&self, kind: ActionLockKind) {
        if kind == ActionLockKind::ViewRefresh {
            if let Some(refresher) = &self.refresher {
                refresher.start();
            }
        }
    }

    fn startup(&self, _ctx: &ExecutionContext) -> Result<()> {
        let source = self.metadata.read().select.source_table.clone();
        if let Some(source) = source {
            self.global_ctx
                .catalog()
                .add_view_dependency(&source, &self.storage_id());
        }

        if let Some(refresher) = &self.refresher {
            refresher.initialize_and_start();
            if self.refresh_on_start {
                if let Err(error) = refresher.run() {
                    warn!(view = %self.storage_id(), %error, "initial refresh failed");
                }
            }
        }
        Ok(())
    }

    fn shutdown(&self, _ctx: &ExecutionContext) -> Result<()> {
        if let Some(refresher) = &self.refresher {
            refresher.shutdown();
        }

        // Make sure the dependency is removed after DETACH
        let source = self.metadata.read().select.source_table.clone();
        if let Some(source) = source {
            self.global_ctx
                .catalog()
                .remove_view_dependency(&source, &self.storage_id());
        }
        Ok(())
    }

    fn drop_storage(&self, ctx: &ExecutionContext) -> Result<()> {
        let source = self.metadata.read().select.source_table.clone();
        if let Some(source) = source {
            self.global_ctx
                .catalog()
                .remove_view_dependency(&source, &self.storage_id());
        }
        // Synchronous drop from the catalog's background worker deadlocks,
        // so the inner tables always go down with sync=false here
        self.drop_inner_table_if_any(false, ctx)
    }

    fn rename_in_memory(&self, new_id: StorageId, ctx: &ExecutionContext) -> Result<()> {
        let old_id = self.storage_id();

        let rename_inner_tables = new_id.database != old_id.database
            || !old_id.has_uuid()
            || !new_id.has_uuid();
        if rename_inner_tables {
            let mut rename = RenameQuery::new();
            let mut new_target_name: Option<String> = None;
            let mut new_scratch_name: Option<String> = None;

            if self.has_inner_target_table && self.try_get_target_table().is_some() {
                let inner_id = self.target_table_id();
                let name = inner_table_name(&new_id, false);
                rename.add_element(
                    inner_id,
                    StorageId::new(new_id.database.clone(), name.clone()),
                );
                new_target_name = Some(name);
            }
            if self.has_scratch_table {
                if let Some(inner_id) = self.scratch_table_id() {
                    let name = inner_table_name(&new_id, true);
                    rename.add_element(
                        inner_id,
                        StorageId::new(new_id.database.clone(), name.clone()),
                    );
                    new_scratch_name = Some(name);
                }
            }

            if !rename.is_empty() {
                self.global_ctx.ddl().execute_rename(&rename, ctx)?;
            }

            {
                let mut ids = self.inner_ids.lock();
                if let Some(name) = new_target_name {
                    ids.target.database = new_id.database.clone();
                    ids.target.table = name;
                }
                if let Some(name) = new_scratch_name {
                    if let Some(scratch) = ids.scratch.as_mut() {
                        scratch.database = new_id.database.clone();
                        scratch.table = name;
                    }
                }
            }
        }

        *self.table_id.lock() = new_id.clone();

        let source = self.metadata.read().select.source_table.clone();
        self.update_source_dependency(source.as_ref(), &old_id, source.as_ref(), &new_id);

        if let Some(refresher) = &self.refresher {
            refresher.rename(new_id);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Register the MaterializedView engine in a storage registry
pub fn register_materialized_view(registry: &StorageRegistry) {
    registry.register(
        MATERIALIZED_VIEW_ENGINE_NAME,
        StorageFeatures::default(),
        |query: &CreateTableQuery, ctx: &ExecutionContext| {
            let view: Arc<dyn Table> = MaterializedViewTable::create(
                query.storage_id(),
                ctx,
                query,
                query.columns.clone(),
                query.attach,
                query.comment.clone(),
            )?;
            Ok(view)
        },
    );
}
