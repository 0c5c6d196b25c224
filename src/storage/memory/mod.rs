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

//! Memory storage engine
//!
//! Rows live in process memory under a read-write lock. Supports the full
//! table contract needed by materialized views, including moving all data
//! between two Memory tables for the scratch-swap refresh protocol.

use std::any::Any;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::core::{Error, Result, Row, RowVec, Schema, Value};
use crate::storage::context::ExecutionContext;
use crate::storage::ddl::{CreateTableQuery, MutationCommand};
use crate::storage::registry::{StorageFeatures, StorageRegistry};
use crate::storage::traits::{
    ActionBlocker, ActionLock, ActionLockKind, BackupEntriesCollector, BackupRestorer, ReadPlan,
    RowSink, StorageId, Table, TableLock, TableLockState,
};

/// Engine name in the storage registry
pub const MEMORY_ENGINE_NAME: &str = "Memory";

struct MemoryTableData {
    schema: RwLock<Schema>,
    rows: RwLock<RowVec>,
}

/// A table fully resident in memory
pub struct MemoryTable {
    id: Mutex<StorageId>,
    data: Arc<MemoryTableData>,
    lock_state: TableLockState,
    merges_blocker: ActionBlocker,
    comment: Option<String>,
}

impl MemoryTable {
    /// Create an empty table with the given identity and schema
    pub fn new(id: StorageId, schema: Schema, comment: Option<String>) -> Self {
        Self {
            id: Mutex::new(id),
            data: Arc::new(MemoryTableData {
                schema: RwLock::new(schema),
                rows: RwLock::new(RowVec::new()),
            }),
            lock_state: TableLockState::new(),
            merges_blocker: ActionBlocker::new(),
            comment,
        }
    }

    /// Snapshot of all rows, for tests and diagnostics
    pub fn rows_snapshot(&self) -> RowVec {
        self.data.rows.read().clone()
    }
}

struct MemorySink {
    data: Arc<MemoryTableData>,
    header: Schema,
    locks: Vec<TableLock>,
}

impl RowSink for MemorySink {
    fn header(&self) -> &Schema {
        &self.header
    }

    fn write_rows(&mut self, rows: RowVec) -> Result<()> {
        let schema = self.data.schema.read();
        for row in &rows {
            row.validate(&schema)?;
        }
        drop(schema);
        self.data.rows.write().extend(rows);
        Ok(())
    }

    fn add_table_lock(&mut self, lock: TableLock) {
        self.locks.push(lock);
    }

    fn table_lock_count(&self) -> usize {
        self.locks.len()
    }
}

impl Table for MemoryTable {
    fn storage_id(&self) -> StorageId {
        self.id.lock().clone()
    }

    fn engine_name(&self) -> &str {
        MEMORY_ENGINE_NAME
    }

    fn schema(&self) -> Schema {
        self.data.schema.read().clone()
    }

    fn comment(&self) -> Option<String> {
        self.comment.clone()
    }

    fn lock_state(&self) -> &TableLockState {
        &self.lock_state
    }

    fn read(&self, columns: &[String], _ctx: &ExecutionContext) -> Result<ReadPlan> {
        let schema = self.data.schema.read();
        let mut indices = Vec::with_capacity(columns.len());
        let mut header_columns = Vec::with_capacity(columns.len());
        for name in columns {
            let (idx, col) = schema
                .find_column(name)
                .ok_or_else(|| Error::ColumnNotFound(name.clone()))?;
            indices.push(idx);
            let mut col = col.clone();
            col.id = header_columns.len();
            header_columns.push(col);
        }
        let header = Schema::header(header_columns);

        let rows = self.data.rows.read();
        let projected: RowVec = rows
            .iter()
            .map(|row| {
                Row::from_values(
                    indices
                        .iter()
                        .map(|&i| row.get(i).cloned().unwrap_or_else(Value::null_unknown))
                        .collect(),
                )
            })
            .collect();
        drop(rows);

        let mut plan = ReadPlan::new();
        plan.add_source(self.storage_id(), header, projected);
        Ok(plan)
    }

    fn write(&self, _ctx: &ExecutionContext) -> Result<Box<dyn RowSink>> {
        Ok(Box::new(MemorySink {
            data: Arc::clone(&self.data),
            header: self.data.schema.read().clone(),
            locks: Vec::new(),
        }))
    }

    fn optimize(&self, _ctx: &ExecutionContext) -> Result<bool> {
        // Nothing to compact in a flat row vector
        Ok(false)
    }

    fn check_mutation_is_possible(&self, commands: &[MutationCommand]) -> Result<()> {
        let schema = self.data.schema.read();
        for command in commands {
            if let MutationCommand::Update { column, .. } = command {
                if !schema.has_column(column) {
                    return Err(Error::ColumnNotFound(column.clone()));
                }
            }
        }
        Ok(())
    }

    fn mutate(&self, commands: &[MutationCommand], _ctx: &ExecutionContext) -> Result<()> {
        self.check_mutation_is_possible(commands)?;
        for command in commands {
            match command {
                MutationCommand::Delete => self.data.rows.write().clear(),
                MutationCommand::Update { column, value } => {
                    let idx = self
                        .data
                        .schema
                        .read()
                        .get_column_index(column)
                        .ok_or_else(|| Error::ColumnNotFound(column.clone()))?;
                    for row in self.data.rows.write().iter_mut() {
                        row.set(idx, value.clone())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn truncate(&self, _ctx: &ExecutionContext, lock: &TableLock) -> Result<()> {
        if !lock.is_exclusive() {
            return Err(Error::internal("truncate requires an exclusive table lock"));
        }
        self.data.rows.write().clear();
        Ok(())
    }

    fn transfer_all_data_from(
        &self,
        source: &dyn Table,
        remove_from_source: bool,
        replace_at_destination: bool,
        _ctx: &ExecutionContext,
    ) -> Result<()> {
        let source = source
            .as_any()
            .downcast_ref::<MemoryTable>()
            .ok_or_else(|| {
                Error::NotSupported(format!(
                    "cannot move data from engine {} into Memory",
                    source.engine_name()
                ))
            })?;

        let moved = if remove_from_source {
            std::mem::take(&mut *source.data.rows.write())
        } else {
            source.data.rows.read().clone()
        };

        let mut rows = self.data.rows.write();
        if replace_at_destination {
            *rows = moved;
        } else {
            rows.extend(moved);
        }
        Ok(())
    }

    fn total_rows(&self) -> Option<u64> {
        Some(self.data.rows.read().len() as u64)
    }

    fn total_bytes(&self) -> Option<u64> {
        Some(
            self.data
                .rows
                .read()
                .iter()
                .map(|r| r.approximate_byte_size() as u64)
                .sum(),
        )
    }

    fn total_bytes_uncompressed(&self) -> Option<u64> {
        self.total_bytes()
    }

    fn backup_data(
        &self,
        collector: &mut dyn BackupEntriesCollector,
        data_path_in_backup: &str,
        _partitions: Option<&[String]>,
    ) -> Result<()> {
        collector.add_table_data(data_path_in_backup, self.rows_snapshot());
        Ok(())
    }

    fn restore_data_from_backup(
        &self,
        restorer: &dyn BackupRestorer,
        data_path_in_backup: &str,
        _partitions: Option<&[String]>,
    ) -> Result<()> {
        if let Some(rows) = restorer.table_data(data_path_in_backup) {
            self.data.rows.write().extend(rows);
        }
        Ok(())
    }

    fn get_action_lock(&self, kind: ActionLockKind) -> ActionLock {
        match kind {
            ActionLockKind::Merges => self.merges_blocker.cancel(),
            _ => ActionLock::empty(),
        }
    }

    fn drop_storage(&self, _ctx: &ExecutionContext) -> Result<()> {
        self.data.rows.write().clear();
        Ok(())
    }

    fn rename_in_memory(&self, new_id: StorageId, _ctx: &ExecutionContext) -> Result<()> {
        let mut id = self.id.lock();
        self.data.schema.write().table_name = new_id.table.clone();
        *id = new_id;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Register the Memory engine in a storage registry
pub fn register_memory_engine(registry: &StorageRegistry) {
    registry.register(
        MEMORY_ENGINE_NAME,
        StorageFeatures {
            supports_moving_data_between_tables: true,
            supports_replication: false,
            supports_partition_by: false,
        },
        |query: &CreateTableQuery, _ctx: &ExecutionContext| {
            if query
                .storage
                .as_ref()
                .is_some_and(|s| s.partition_by.is_some())
            {
                return Err(Error::not_implemented(
                    "Memory engine does not support PARTITION BY",
                ));
            }
            Ok(Arc::new(MemoryTable::new(
                query.storage_id(),
                query.schema(),
                query.comment.clone(),
            )))
        },
    );
}
