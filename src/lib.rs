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

//! # Silica - columnar analytic storage layer with materialized views
//!
//! Silica is the storage layer of an embedded columnar analytic database,
//! centered on materialized views: table-like objects whose contents are
//! defined by a SELECT and physically stored in a target table the view
//! either owns or was pointed at.
//!
//! ## Key Features
//!
//! - **Forwarding facade** - a materialized view implements the full table
//!   contract (read, write, optimize, mutate, backup, action locks) by
//!   delegating to its target table, reconciling header differences with an
//!   explicit conversion step
//! - **Implicit inner tables** - views without a TO clause own their target
//!   table; creation is atomic with best-effort rollback
//! - **Scratch-swap refresh** - refreshable views without APPEND stage each
//!   refresh in a scratch table and atomically move its contents over the
//!   target
//! - **Catalog dependency graph** - source-table → view edges are kept in
//!   the catalog across startup, shutdown, rename, and ALTER
//! - **Rename with inner tables** - renaming a view renames the hidden
//!   tables it owns in the same DDL step
//!
//! ## Quick Start
//!
//! ```rust
//! use silica::core::{DataType, SchemaColumn};
//! use silica::storage::{
//!     CreateTableQuery, DdlExecutor, ExecutionContext, SelectQueryDescription, Settings,
//!     StorageId,
//! };
//!
//! let ctx = ExecutionContext::in_memory(Settings::default());
//!
//! // Create a source table
//! let columns = vec![
//!     SchemaColumn::simple(0, "id", DataType::Integer),
//!     SchemaColumn::simple(1, "name", DataType::Text),
//! ];
//! let src = CreateTableQuery::table("default", "src")
//!     .with_engine("Memory")
//!     .with_columns(columns.clone());
//! ctx.ddl().execute_create(&src, &ctx).unwrap();
//!
//! // Create a materialized view over it
//! let select = SelectQueryDescription::new("SELECT id, name FROM default.src")
//!     .with_source_table(StorageId::new("default", "src"))
//!     .with_columns(columns.clone());
//! let view = CreateTableQuery::materialized_view("default", "v")
//!     .with_engine("Memory")
//!     .with_columns(columns)
//!     .with_select(select);
//! ctx.ddl().execute_create(&view, &ctx).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Core types ([`DataType`], [`Value`], [`Row`], [`Schema`], [`Error`])
//! - [`storage`] - Storage traits, catalog, registry, DDL, engines, and
//!   materialized views

pub mod core;
pub mod storage;

// Re-export main types for convenience
pub use core::{DataType, Error, Result, Row, RowVec, Schema, SchemaBuilder, SchemaColumn, Value};

// Re-export config and context types
pub use storage::{ExecutionContext, Settings};

// Re-export catalog types
pub use storage::{Catalog, Database, MemoryCatalog};

// Re-export storage traits
pub use storage::{
    ActionLock, ActionLockKind, QualifiedName, QueryProcessingStage, ReadPlan, RowSink, StorageId,
    Table, TableLock,
};

// Re-export DDL types
pub use storage::{
    AlterCommand, CreateTableQuery, DropKind, DropOptions, MutationCommand, PartitionCommand,
    RenameQuery, StorageClause, TableKind,
};

// Re-export engine and view types
pub use storage::{
    InsertQuery, MaterializedViewTable, MemoryTable, RefreshSchedule, RefreshStrategy,
    SelectQueryDescription, StorageFeatures, StorageRegistry,
};
