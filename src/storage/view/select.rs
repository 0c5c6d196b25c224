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

//! Stored SELECT description of a materialized view

use crate::core::{Error, Result, Schema, SchemaColumn};
use crate::storage::catalog::Catalog;
use crate::storage::context::ExecutionContext;
use crate::storage::traits::{StorageId, Table};

/// The SELECT a materialized view was declared with
///
/// The query text itself is opaque to the storage layer; what the view needs
/// is the source table identity (for the dependency edge) and the declared
/// output header (for refresh inserts and read conversion).
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQueryDescription {
    /// The raw SELECT text
    pub query: String,

    /// The source table this SELECT reads from, if it reads a table
    pub source_table: Option<StorageId>,

    /// The declared output columns of the SELECT
    pub columns: Vec<SchemaColumn>,
}

impl SelectQueryDescription {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            source_table: None,
            columns: Vec::new(),
        }
    }

    pub fn with_source_table(mut self, source: StorageId) -> Self {
        self.source_table = Some(source);
        self
    }

    pub fn with_columns(mut self, columns: Vec<SchemaColumn>) -> Self {
        self.columns = columns;
        self
    }

    /// The source table, failing when the SELECT does not read one
    pub fn require_source_table(&self) -> Result<&StorageId> {
        self.source_table
            .as_ref()
            .ok_or_else(|| Error::incorrect_query("SELECT does not read from a table"))
    }

    /// The declared output header
    pub fn declared_header(&self) -> Schema {
        Schema::header(self.columns.clone())
    }

    /// The output header of this SELECT as the current analyzer sees it
    ///
    /// The new analyzer re-resolves each output column's type against the
    /// source table's live schema, so a column whose type changed since the
    /// view was declared is produced with its current type. The old analyzer
    /// returns the declared header. Both fall back to the declared header
    /// when the source table is gone.
    pub fn sample_header(&self, ctx: &ExecutionContext) -> Result<Schema> {
        if !ctx.settings().use_new_analyzer {
            return Ok(self.declared_header());
        }
        let source_schema = self
            .source_table
            .as_ref()
            .and_then(|id| ctx.catalog().try_get_table(id))
            .map(|table| table.schema());
        let Some(source_schema) = source_schema else {
            return Ok(self.declared_header());
        };
        let columns = self
            .columns
            .iter()
            .map(|col| {
                let mut col = col.clone();
                if let Some(live) = source_schema.get_column_by_name(&col.name) {
                    col.data_type = live.data_type;
                    col.nullable = live.nullable;
                }
                col
            })
            .collect();
        Ok(Schema::header(columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;
    use crate::storage::config::Settings;
    use crate::storage::ddl::{CreateTableQuery, DdlExecutor};

    fn select_on_src() -> SelectQueryDescription {
        SelectQueryDescription::new("SELECT id, name FROM default.src")
            .with_source_table(StorageId::new("default", "src"))
            .with_columns(vec![
                SchemaColumn::simple(0, "id", DataType::Integer),
                SchemaColumn::simple(1, "name", DataType::Text),
            ])
    }

    #[test]
    fn test_require_source_table() {
        let select = select_on_src();
        assert!(select.require_source_table().is_ok());
        assert!(SelectQueryDescription::new("SELECT 1")
            .require_source_table()
            .is_err());
    }

    #[test]
    fn test_sample_header_old_analyzer_returns_declared() {
        let ctx = ExecutionContext::in_memory(Settings::new().with_use_new_analyzer(false));
        let header = select_on_src().sample_header(&ctx).unwrap();
        assert_eq!(header.column_names(), vec!["id", "name"]);
        assert_eq!(header.columns[0].data_type, DataType::Integer);
    }

    #[test]
    fn test_sample_header_new_analyzer_resolves_live_types() {
        let ctx = ExecutionContext::in_memory(Settings::default());

        // Source exists with `id` as FLOAT now
        let create = CreateTableQuery::table("default", "src")
            .with_engine("Memory")
            .with_columns(vec![
                SchemaColumn::simple(0, "id", DataType::Float),
                SchemaColumn::simple(1, "name", DataType::Text),
            ]);
        ctx.ddl().execute_create(&create, &ctx).unwrap();

        let header = select_on_src().sample_header(&ctx).unwrap();
        assert_eq!(header.columns[0].data_type, DataType::Float);
        assert_eq!(header.columns[1].data_type, DataType::Text);
    }

    #[test]
    fn test_sample_header_falls_back_when_source_missing() {
        let ctx = ExecutionContext::in_memory(Settings::default());
        let header = select_on_src().sample_header(&ctx).unwrap();
        assert_eq!(header.columns[0].data_type, DataType::Integer);
    }
}
