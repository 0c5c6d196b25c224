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

//! Storage module for Silica
//!
//! This module contains the storage layer components including:
//! - Storage traits (Table, locks, plans, sinks, backup)
//! - The catalog (name resolution, dependency graph)
//! - The storage engine registry
//! - DDL statements and their execution
//! - The Memory engine
//! - Materialized views

pub mod catalog;
pub mod config;
pub mod context;
pub mod ddl;
pub mod memory;
pub mod registry;
pub mod traits;
pub mod view;

// Re-export config types
pub use config::Settings;

// Re-export context types
pub use context::{CatalogQueryRunner, ExecutionContext, QueryRunner};

// Re-export catalog types
pub use catalog::{Catalog, Database, MemoryCatalog, MemoryDatabase};

// Re-export registry types
pub use registry::{StorageFeatures, StorageRegistry};

// Re-export DDL types
pub use ddl::{
    AlterCommand, CatalogDdlExecutor, CreateTableQuery, DdlExecutor, DdlGuardMap, DropKind,
    DropOptions, MutationCommand, PartitionCommand, RenameQuery, StorageClause, TableKind,
};

// Re-export trait types
pub use traits::{
    ActionBlocker, ActionLock, ActionLockKind, BackupEntriesCollector, BackupRestorer,
    ConvertingActions, MemoryBackup, PlanStep, QualifiedName, QueryProcessingStage, ReadPlan,
    RowSink, StorageId, Table, TableLock, TableLockState,
};

// Re-export engine types
pub use memory::{register_memory_engine, MemoryTable};

// Re-export materialized view types
pub use view::refresh::{InsertQuery, RefreshSchedule, RefreshStrategy, RefreshTask};
pub use view::select::SelectQueryDescription;
pub use view::{register_materialized_view, MaterializedViewTable, ViewMetadata};
