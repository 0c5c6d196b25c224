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

//! Rename and ALTER tests
//!
//! Renaming a view renames its inner tables in the same DDL step and moves
//! the dependency edge; ALTER swaps metadata, persists it in the catalog,
//! and keeps the dependency graph in sync.

use std::sync::Arc;

use silica::core::{DataType, Error, SchemaColumn};
use silica::storage::{
    AlterCommand, Catalog, CreateTableQuery, Database, DdlExecutor, ExecutionContext,
    MaterializedViewTable,
    RefreshSchedule, RefreshStrategy, RenameQuery, RowSink, SelectQueryDescription, Settings,
    StorageId, Table,
};
use std::time::Duration;

fn source_columns() -> Vec<SchemaColumn> {
    vec![
        SchemaColumn::simple(0, "id", DataType::Integer),
        SchemaColumn::simple(1, "name", DataType::Text),
    ]
}

fn select_on(database: &str, table: &str) -> SelectQueryDescription {
    SelectQueryDescription::new(format!("SELECT id, name FROM {}.{}", database, table))
        .with_source_table(StorageId::new(database, table))
        .with_columns(source_columns())
}

fn setup_context() -> ExecutionContext {
    let ctx = ExecutionContext::in_memory(Settings::default());
    let create = CreateTableQuery::table("default", "src")
        .with_engine("Memory")
        .with_columns(source_columns());
    ctx.ddl()
        .execute_create(&create, &ctx)
        .expect("Failed to create source table");
    ctx
}

fn create_refreshable(ctx: &ExecutionContext, name: &str) -> StorageId {
    let query = CreateTableQuery::materialized_view("default", name)
        .with_engine("Memory")
        .with_columns(source_columns())
        .with_select(select_on("default", "src"))
        .with_refresh(RefreshStrategy::every_secs(3600))
        .with_create_empty(true);
    ctx.ddl()
        .execute_create(&query, ctx)
        .expect("Failed to create refreshable view")
}

fn as_view(storage: &Arc<dyn Table>) -> &MaterializedViewTable {
    storage
        .as_any()
        .downcast_ref::<MaterializedViewTable>()
        .expect("not a materialized view")
}

/// Renaming across databases renames both inner tables and updates the
/// dependency edge to the new view identity
#[test]
fn test_rename_across_databases() {
    let ctx = setup_context();
    ctx.catalog().create_database("reports").unwrap();

    let view_id = create_refreshable(&ctx, "v");
    let storage = ctx.catalog().get_table(&view_id).unwrap();
    let old_target = as_view(&storage).target_table_id();
    let old_scratch = as_view(&storage).scratch_table_id().unwrap();

    let mut rename = RenameQuery::new();
    rename.add_element(view_id.clone(), StorageId::new("reports", "v"));
    ctx.ddl().execute_rename(&rename, &ctx).unwrap();

    let new_id = StorageId::new("reports", "v");
    let storage = ctx.catalog().get_table(&new_id).unwrap();
    let view = as_view(&storage);
    assert_eq!(view.storage_id().qualified_name(), new_id.qualified_name());

    // Inner tables moved to the new database; old names are gone
    let new_target = view.target_table_id();
    let new_scratch = view.scratch_table_id().unwrap();
    assert_eq!(new_target.database, "reports");
    assert_eq!(new_scratch.database, "reports");
    assert!(ctx.catalog().get_table(&new_target).is_ok());
    assert!(ctx.catalog().get_table(&new_scratch).is_ok());
    assert!(ctx.catalog().try_get_table(&old_target).is_none());
    assert!(ctx.catalog().try_get_table(&old_scratch).is_none());

    // The inner names still derive from the view identity
    assert!(new_target.table.starts_with(".inner_id."));
    assert!(new_scratch.table.starts_with(".inner_scratch_id."));

    // The dependency edge follows the view
    let dependents = ctx
        .catalog()
        .get_dependent_views(&StorageId::new("default", "src"));
    assert_eq!(dependents.len(), 1);
    assert_eq!(dependents[0].qualified_name(), new_id.qualified_name());

    // The refresh task follows the view
    assert_eq!(
        view.refresher().unwrap().view_id().qualified_name(),
        new_id.qualified_name()
    );
}

/// Renaming a view without UUIDs re-mints the inner names from the new
/// view name
#[test]
fn test_rename_without_uuid_remints_inner_names() {
    let ctx = setup_context();

    let query = CreateTableQuery::materialized_view("default", "v")
        .with_engine("Memory")
        .with_columns(source_columns())
        .with_select(select_on("default", "src"))
        .with_refresh(RefreshStrategy::every_secs(3600))
        .with_create_empty(true);
    // Direct construction, no UUID on the view identity
    let view = MaterializedViewTable::create(
        StorageId::new("default", "v"),
        &ctx,
        &query,
        source_columns(),
        false,
        None,
    )
    .unwrap();
    view.startup(&ctx).unwrap();

    assert_eq!(view.target_table_id().table, ".inner.v");
    assert_eq!(view.scratch_table_id().unwrap().table, ".inner_scratch.v");

    view.rename_in_memory(StorageId::new("default", "v2"), &ctx)
        .unwrap();

    assert_eq!(view.storage_id().table, "v2");
    assert_eq!(view.target_table_id().table, ".inner.v2");
    assert_eq!(view.scratch_table_id().unwrap().table, ".inner_scratch.v2");

    // The renamed inner tables resolve through the catalog
    assert!(ctx.catalog().get_table(&view.target_table_id()).is_ok());
    assert!(ctx
        .catalog()
        .get_table(&view.scratch_table_id().unwrap())
        .is_ok());
    assert!(ctx
        .catalog()
        .try_get_table(&StorageId::new("default", ".inner.v"))
        .is_none());

    // Dependency edge points at the new identity
    let dependents = ctx
        .catalog()
        .get_dependent_views(&StorageId::new("default", "src"));
    assert_eq!(dependents.len(), 1);
    assert_eq!(dependents[0].qualified_name().table, "v2");
}

/// MODIFY QUERY replaces the SELECT, moves the dependency edge, and
/// persists the new metadata in the catalog
#[test]
fn test_modify_query_updates_dependency_and_metadata() {
    let ctx = setup_context();
    let create = CreateTableQuery::table("default", "other")
        .with_engine("Memory")
        .with_columns(source_columns());
    ctx.ddl().execute_create(&create, &ctx).unwrap();

    let view_id = create_refreshable(&ctx, "v");
    let storage = ctx.catalog().get_table(&view_id).unwrap();

    let new_select = select_on("default", "other");
    storage
        .alter(
            &[AlterCommand::ModifyQuery {
                select: new_select.clone(),
            }],
            &ctx,
        )
        .unwrap();

    // Dependency moved from src to other
    assert!(ctx
        .catalog()
        .get_dependent_views(&StorageId::new("default", "src"))
        .is_empty());
    let dependents = ctx
        .catalog()
        .get_dependent_views(&StorageId::new("default", "other"));
    assert_eq!(dependents.len(), 1);

    // In-memory metadata swapped
    assert_eq!(as_view(&storage).metadata_snapshot().select, new_select);

    // Persisted CREATE metadata updated
    let database = ctx.catalog().get_database("default").unwrap();
    let stored = database.get_create_table_query("v").unwrap();
    assert_eq!(
        stored.select.unwrap().source_table.unwrap().table,
        "other"
    );
}

/// MODIFY REFRESH pushes the new strategy to the refresh task
#[test]
fn test_modify_refresh_updates_task() {
    let ctx = setup_context();
    let view_id = create_refreshable(&ctx, "v");
    let storage = ctx.catalog().get_table(&view_id).unwrap();
    let view = as_view(&storage);

    let new_strategy = RefreshStrategy::every(Duration::from_secs(60));
    storage
        .alter(
            &[AlterCommand::ModifyRefresh {
                strategy: new_strategy,
            }],
            &ctx,
        )
        .unwrap();

    assert_eq!(
        view.refresher().unwrap().strategy().schedule,
        RefreshSchedule::Every(Duration::from_secs(60))
    );
    assert_eq!(view.metadata_snapshot().refresh, Some(new_strategy));
}

/// MODIFY REFRESH cannot add or remove APPEND
#[test]
fn test_modify_refresh_cannot_flip_append() {
    let ctx = setup_context();
    let view_id = create_refreshable(&ctx, "v");
    let storage = ctx.catalog().get_table(&view_id).unwrap();

    let err = storage
        .alter(
            &[AlterCommand::ModifyRefresh {
                strategy: RefreshStrategy::every_secs(60).with_append(true),
            }],
            &ctx,
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotImplemented(_)));
}

/// Comment alter persists through metadata and the catalog
#[test]
fn test_comment_alter() {
    let ctx = setup_context();
    let view_id = create_refreshable(&ctx, "v");
    let storage = ctx.catalog().get_table(&view_id).unwrap();

    storage
        .alter(
            &[AlterCommand::ModifyComment {
                comment: Some("hourly rollup of src".to_string()),
            }],
            &ctx,
        )
        .unwrap();

    assert_eq!(storage.comment().as_deref(), Some("hourly rollup of src"));
    let database = ctx.catalog().get_database("default").unwrap();
    let stored = database.get_create_table_query("v").unwrap();
    assert_eq!(stored.comment.as_deref(), Some("hourly rollup of src"));
}

/// Refresh keeps working against the renamed inner tables
#[test]
fn test_refresh_after_rename() {
    let ctx = setup_context();
    ctx.catalog().create_database("reports").unwrap();

    let view_id = create_refreshable(&ctx, "v");

    let source = ctx
        .catalog()
        .get_table(&StorageId::new("default", "src"))
        .unwrap();
    let mut sink = source.write(&ctx).unwrap();
    sink.write_rows(vec![silica::Row::from_values(vec![
        silica::Value::integer(7),
        silica::Value::text("x"),
    ])])
    .unwrap();
    sink.finish().unwrap();

    let mut rename = RenameQuery::new();
    rename.add_element(view_id, StorageId::new("reports", "v"));
    ctx.ddl().execute_rename(&rename, &ctx).unwrap();

    let storage = ctx
        .catalog()
        .get_table(&StorageId::new("reports", "v"))
        .unwrap();
    let view = as_view(&storage);

    view.refresher().unwrap().run().unwrap();
    assert_eq!(storage.total_rows(), Some(1));
    assert!(view.scratch_table_is_known_to_be_empty());
}
