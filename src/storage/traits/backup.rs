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

//! Backup collaborator interfaces
//!
//! Storages hand their data to a collector during backup and read it back
//! from a restorer during restore. The backup machinery itself lives outside
//! the storage layer.

use rustc_hash::FxHashMap;

use crate::core::RowVec;

/// Receives table data during a backup pass
pub trait BackupEntriesCollector: Send {
    /// Add the data of one table under the given backup path
    fn add_table_data(&mut self, data_path_in_backup: &str, rows: RowVec);
}

/// Provides table data during a restore pass
pub trait BackupRestorer: Send + Sync {
    /// The data stored under the given backup path, if present
    fn table_data(&self, data_path_in_backup: &str) -> Option<RowVec>;
}

/// In-memory backup holding entries keyed by backup path
///
/// Implements both sides of the protocol; used by tests and small
/// deployments without an external backup store.
#[derive(Debug, Default)]
pub struct MemoryBackup {
    entries: FxHashMap<String, RowVec>,
}

impl MemoryBackup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries collected
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Backup paths of all collected entries
    pub fn paths(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

impl BackupEntriesCollector for MemoryBackup {
    fn add_table_data(&mut self, data_path_in_backup: &str, rows: RowVec) {
        self.entries.insert(data_path_in_backup.to_string(), rows);
    }
}

impl BackupRestorer for MemoryBackup {
    fn table_data(&self, data_path_in_backup: &str) -> Option<RowVec> {
        self.entries.get(data_path_in_backup).cloned()
    }
}
