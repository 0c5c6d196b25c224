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

//! Storage traits
//!
//! The contracts between the storage layer and its consumers: the table
//! contract, read plans, row sinks, and backup collaborators.

pub mod backup;
pub mod plan;
pub mod sink;
pub mod table;

pub use backup::{BackupEntriesCollector, BackupRestorer, MemoryBackup};
pub use plan::{ConvertingActions, PlanStep, QueryProcessingStage, ReadPlan};
pub use sink::RowSink;
pub use table::{
    ActionBlocker, ActionLock, ActionLockKind, QualifiedName, StorageId, Table, TableLock,
    TableLockState,
};
