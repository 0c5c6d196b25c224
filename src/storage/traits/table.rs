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

//! Table trait for database tables
//!
//! This is the storage contract every table-like object implements: reads,
//! writes, maintenance operations, introspection, backup, action locks, and
//! lifecycle. Most methods have conservative defaults so simple engines only
//! implement what they support.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};
use uuid::Uuid;

use crate::core::{Error, Result, Schema, SchemaColumn};
use crate::storage::context::ExecutionContext;
use crate::storage::ddl::{AlterCommand, MutationCommand, PartitionCommand};
use crate::storage::traits::backup::{BackupEntriesCollector, BackupRestorer};
use crate::storage::traits::plan::{QueryProcessingStage, ReadPlan};
use crate::storage::traits::sink::RowSink;

/// Database-qualified table name
///
/// Ordering is lexicographic on (database, table); DDL guards must be
/// acquired in this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    pub database: String,
    pub table: String,
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// Identity of a storage object: qualified name plus an optional stable UUID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageId {
    pub database: String,
    pub table: String,
    pub uuid: Option<Uuid>,
}

impl StorageId {
    /// Create an identity without a UUID
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            uuid: None,
        }
    }

    /// Create an identity with a UUID
    pub fn with_uuid(database: impl Into<String>, table: impl Into<String>, uuid: Uuid) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            uuid: Some(uuid),
        }
    }

    /// Whether a stable UUID is attached
    pub fn has_uuid(&self) -> bool {
        self.uuid.is_some()
    }

    /// The (database, table) pair
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName {
            database: self.database.clone(),
            table: self.table.clone(),
        }
    }

    /// "database.table" for messages and logs
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// An acquired table lock, shared or exclusive
///
/// Guards are reference-counted so they can be attached to plans and sinks
/// that outlive the acquiring call frame.
pub enum TableLock {
    Shared(ArcRwLockReadGuard<RawRwLock, ()>),
    Exclusive(ArcRwLockWriteGuard<RawRwLock, ()>),
}

impl TableLock {
    /// Whether this is an exclusive lock
    pub fn is_exclusive(&self) -> bool {
        matches!(self, TableLock::Exclusive(_))
    }
}

impl fmt::Debug for TableLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableLock::Shared(_) => write!(f, "TableLock::Shared"),
            TableLock::Exclusive(_) => write!(f, "TableLock::Exclusive"),
        }
    }
}

/// Per-table lock state backing [`Table::lock_for_share`] and
/// [`Table::lock_exclusively`]
#[derive(Debug, Clone, Default)]
pub struct TableLockState {
    lock: Arc<RwLock<()>>,
}

impl TableLockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a shared lock, failing after `timeout`
    pub fn lock_for_share(&self, table: &str, timeout: Duration) -> Result<TableLock> {
        match self.lock.try_read_arc_for(timeout) {
            Some(guard) => Ok(TableLock::Shared(guard)),
            None => Err(Error::LockAcquisitionTimeout {
                table: table.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Acquire an exclusive lock, failing after `timeout`
    pub fn lock_exclusively(&self, table: &str, timeout: Duration) -> Result<TableLock> {
        match self.lock.try_write_arc_for(timeout) {
            Some(guard) => Ok(TableLock::Exclusive(guard)),
            None => Err(Error::LockAcquisitionTimeout {
                table: table.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}

/// Categories of background activity that can be paused via action locks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionLockKind {
    /// Background merges of data parts
    Merges,
    /// Background data moves
    Moves,
    /// Periodic refresh of refreshable materialized views
    ViewRefresh,
}

/// Counter that background activity checks before doing work
///
/// While at least one [`ActionLock`] taken from the blocker is alive, the
/// activity is cancelled.
#[derive(Debug, Clone, Default)]
pub struct ActionBlocker {
    counter: Arc<AtomicUsize>,
}

impl ActionBlocker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the guarded activity is currently blocked
    pub fn is_cancelled(&self) -> bool {
        self.counter.load(Ordering::SeqCst) > 0
    }

    /// Take a lock that blocks the activity until dropped
    pub fn cancel(&self) -> ActionLock {
        self.counter.fetch_add(1, Ordering::SeqCst);
        ActionLock {
            counter: Some(Arc::clone(&self.counter)),
        }
    }
}

/// A held pause on one category of background activity
///
/// The default value is an empty lock that pauses nothing.
#[derive(Debug, Default)]
pub struct ActionLock {
    counter: Option<Arc<AtomicUsize>>,
}

impl ActionLock {
    /// An empty lock holding nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this lock holds nothing
    pub fn expired(&self) -> bool {
        self.counter.is_none()
    }
}

impl Drop for ActionLock {
    fn drop(&mut self) {
        if let Some(counter) = self.counter.take() {
            counter.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Table represents a table-like storage object
///
/// The contract covers the query path (read/write), maintenance
/// (optimize/mutate/partitions/truncate), introspection, backup, action
/// locks, and lifecycle. Simple engines implement the required methods and
/// inherit conservative defaults for the rest.
pub trait Table: Send + Sync {
    /// Returns the identity of this storage
    fn storage_id(&self) -> StorageId;

    /// Returns the engine name this storage was created with
    fn engine_name(&self) -> &str;

    /// Returns a snapshot of the schema at call time
    fn schema(&self) -> Schema;

    /// Returns the table comment, if any
    fn comment(&self) -> Option<String> {
        None
    }

    /// Returns the lock state used for share/exclusive table locks
    fn lock_state(&self) -> &TableLockState;

    /// Acquire a shared lock on this table
    fn lock_for_share(&self, _query_id: &str, timeout: Duration) -> Result<TableLock> {
        self.lock_state()
            .lock_for_share(&self.storage_id().full_name(), timeout)
    }

    /// Acquire an exclusive lock on this table
    fn lock_exclusively(&self, _query_id: &str, timeout: Duration) -> Result<TableLock> {
        self.lock_state()
            .lock_exclusively(&self.storage_id().full_name(), timeout)
    }

    /// To what stage this storage can process a SELECT on its own
    fn query_processing_stage(&self, _ctx: &ExecutionContext) -> Result<QueryProcessingStage> {
        Ok(QueryProcessingStage::FetchColumns)
    }

    /// Build a read plan producing the named columns
    fn read(&self, columns: &[String], ctx: &ExecutionContext) -> Result<ReadPlan>;

    /// Open a sink for inserting rows
    fn write(&self, ctx: &ExecutionContext) -> Result<Box<dyn RowSink>>;

    /// Run a maintenance optimization pass; returns whether work was done
    fn optimize(&self, _ctx: &ExecutionContext) -> Result<bool> {
        Err(Error::NotSupported(format!(
            "optimize is not supported by engine {}",
            self.engine_name()
        )))
    }

    /// Check that the given mutations can be applied
    fn check_mutation_is_possible(&self, _commands: &[MutationCommand]) -> Result<()> {
        Err(Error::NotSupported(format!(
            "mutations are not supported by engine {}",
            self.engine_name()
        )))
    }

    /// Apply the given mutations
    fn mutate(&self, _commands: &[MutationCommand], _ctx: &ExecutionContext) -> Result<()> {
        Err(Error::NotSupported(format!(
            "mutations are not supported by engine {}",
            self.engine_name()
        )))
    }

    /// Check that the given partition commands can be applied
    fn check_alter_partition_is_possible(&self, _commands: &[PartitionCommand]) -> Result<()> {
        Err(Error::NotSupported(format!(
            "partition operations are not supported by engine {}",
            self.engine_name()
        )))
    }

    /// Apply the given partition commands
    fn alter_partition(
        &self,
        _commands: &[PartitionCommand],
        _ctx: &ExecutionContext,
    ) -> Result<()> {
        Err(Error::NotSupported(format!(
            "partition operations are not supported by engine {}",
            self.engine_name()
        )))
    }

    /// Check that the given ALTER commands can be applied to this storage
    fn check_alter_is_possible(
        &self,
        commands: &[AlterCommand],
        _ctx: &ExecutionContext,
    ) -> Result<()> {
        if commands.is_empty() {
            return Ok(());
        }
        Err(Error::not_implemented(format!(
            "ALTER is not supported by engine {}",
            self.engine_name()
        )))
    }

    /// Apply the given ALTER commands
    fn alter(&self, _commands: &[AlterCommand], _ctx: &ExecutionContext) -> Result<()> {
        Err(Error::not_implemented(format!(
            "ALTER is not supported by engine {}",
            self.engine_name()
        )))
    }

    /// Remove all rows; the caller must hold an exclusive lock
    fn truncate(&self, _ctx: &ExecutionContext, _lock: &TableLock) -> Result<()> {
        Err(Error::NotSupported(format!(
            "truncate is not supported by engine {}",
            self.engine_name()
        )))
    }

    /// Move all data from `source` into this table
    ///
    /// With `remove_from_source` the source is left empty; with
    /// `replace_at_destination` existing destination data is replaced rather
    /// than appended. Only engines whose features advertise
    /// `supports_moving_data_between_tables` implement this.
    fn transfer_all_data_from(
        &self,
        _source: &dyn Table,
        _remove_from_source: bool,
        _replace_at_destination: bool,
        _ctx: &ExecutionContext,
    ) -> Result<()> {
        Err(Error::NotSupported(format!(
            "moving data between tables is not supported by engine {}",
            self.engine_name()
        )))
    }

    /// Implicit columns provided by the engine beyond the declared schema
    fn virtual_columns(&self) -> Vec<SchemaColumn> {
        Vec::new()
    }

    /// Exact or estimated row count, if cheaply available
    fn total_rows(&self) -> Option<u64> {
        None
    }

    /// Exact or estimated on-storage byte size, if cheaply available
    fn total_bytes(&self) -> Option<u64> {
        None
    }

    /// Uncompressed byte size, if cheaply available
    fn total_bytes_uncompressed(&self) -> Option<u64> {
        None
    }

    /// Filesystem or URI paths holding this table's data
    fn data_paths(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether this storage reads from remote servers
    fn is_remote(&self) -> bool {
        false
    }

    /// Whether per-partition backup is supported
    fn supports_backup_partition(&self) -> bool {
        false
    }

    /// Collect backup entries for this table's data
    fn backup_data(
        &self,
        _collector: &mut dyn BackupEntriesCollector,
        _data_path_in_backup: &str,
        _partitions: Option<&[String]>,
    ) -> Result<()> {
        Ok(())
    }

    /// Restore this table's data from a backup
    fn restore_data_from_backup(
        &self,
        _restorer: &dyn BackupRestorer,
        _data_path_in_backup: &str,
        _partitions: Option<&[String]>,
    ) -> Result<()> {
        Ok(())
    }

    /// Pause the given category of background activity
    fn get_action_lock(&self, _kind: ActionLockKind) -> ActionLock {
        ActionLock::empty()
    }

    /// Called when an action lock of the given kind is released
    fn on_action_lock_remove(&self, _kind: ActionLockKind) {}

    /// Called once after the storage is registered in the catalog
    fn startup(&self, _ctx: &ExecutionContext) -> Result<()> {
        Ok(())
    }

    /// Called before the storage is detached; must be safe to call twice
    fn shutdown(&self, _ctx: &ExecutionContext) -> Result<()> {
        Ok(())
    }

    /// Called when the storage is dropped from the catalog
    fn drop_storage(&self, _ctx: &ExecutionContext) -> Result<()> {
        Ok(())
    }

    /// Install a new identity after a rename
    fn rename_in_memory(&self, new_id: StorageId, ctx: &ExecutionContext) -> Result<()>;

    /// Downcasting support for engine-specific operations
    fn as_any(&self) -> &dyn Any;
}
