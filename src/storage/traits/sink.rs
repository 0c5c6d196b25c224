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

//! Row sinks for the write path

use crate::core::{Result, RowVec, Schema};
use crate::storage::traits::table::TableLock;

/// Destination for inserted rows
///
/// A sink may carry table locks so the destination cannot be dropped or
/// exclusively locked while the insert is in flight.
pub trait RowSink: Send {
    /// The header the sink expects
    fn header(&self) -> &Schema;

    /// Write a batch of rows
    fn write_rows(&mut self, rows: RowVec) -> Result<()>;

    /// Finalize the insert
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    /// Attach an acquired table lock for the sink's lifetime
    fn add_table_lock(&mut self, lock: TableLock);

    /// Number of locks attached to the sink
    fn table_lock_count(&self) -> usize;
}
