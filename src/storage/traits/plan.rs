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

//! Read plans and header-converting steps
//!
//! A [`ReadPlan`] is the unit a storage's `read` produces: a source step
//! followed by zero or more transformation steps, plus the storage holders
//! and table locks that keep the underlying data alive while the plan runs.

use std::fmt;
use std::sync::Arc;

use crate::core::{Error, Result, Row, RowVec, Schema};
use crate::storage::traits::table::{StorageId, Table, TableLock};

/// To what stage a storage can process a SELECT on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryProcessingStage {
    /// The storage only returns raw columns
    #[default]
    FetchColumns,
    /// The storage returns partially-aggregated state
    WithMergeableState,
    /// The storage returns the final result
    Complete,
}

impl fmt::Display for QueryProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryProcessingStage::FetchColumns => write!(f, "FetchColumns"),
            QueryProcessingStage::WithMergeableState => write!(f, "WithMergeableState"),
            QueryProcessingStage::Complete => write!(f, "Complete"),
        }
    }
}

/// One output column of a converting step: which input position it reads
/// from and an optional cast
#[derive(Debug, Clone)]
struct ColumnMapping {
    source_index: usize,
    result_name: String,
    cast: Option<crate::core::DataType>,
}

/// Column-wise conversion between two headers, matching columns by name
///
/// With `project_input` disabled, input columns that no output column reads
/// from are appended to the result unchanged. Downstream stages may rely on
/// such extra columns, so they must not be silently dropped.
#[derive(Debug, Clone)]
pub struct ConvertingActions {
    mappings: Vec<ColumnMapping>,
    passthrough: Vec<usize>,
    input: Schema,
    output: Schema,
    project_input: bool,
}

impl ConvertingActions {
    /// Build a conversion from `from` into the structure of `to`
    ///
    /// Every column of `to` must exist in `from` by name; types are adapted
    /// with a cast where they differ.
    pub fn make_converting(from: &Schema, to: &Schema) -> Result<Self> {
        let mut mappings = Vec::with_capacity(to.columns.len());
        let mut consumed = vec![false; from.columns.len()];
        for col in &to.columns {
            let (idx, src) = from
                .find_column(&col.name)
                .ok_or_else(|| Error::ColumnNotFound(col.name.clone()))?;
            consumed[idx] = true;
            mappings.push(ColumnMapping {
                source_index: idx,
                result_name: col.name.clone(),
                cast: (src.data_type != col.data_type).then_some(col.data_type),
            });
        }
        let passthrough = consumed
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(i, _)| i)
            .collect();
        Ok(Self {
            mappings,
            passthrough,
            input: from.clone(),
            output: to.clone(),
            project_input: true,
        })
    }

    /// Control whether unmatched input columns are dropped (`true`) or
    /// passed through unchanged (`false`)
    pub fn set_project_input(&mut self, project: bool) {
        self.project_input = project;
    }

    /// The header this conversion produces
    pub fn output_header(&self) -> Schema {
        let mut header = self.output.clone();
        if !self.project_input {
            for &idx in &self.passthrough {
                let mut col = self.input.columns[idx].clone();
                col.id = header.columns.len();
                header.columns.push(col);
            }
        }
        header
    }

    /// Apply the conversion to one row
    pub fn apply(&self, row: &Row) -> Result<Row> {
        let mut values = Vec::with_capacity(self.mappings.len() + self.passthrough.len());
        for mapping in &self.mappings {
            let value = row.get(mapping.source_index).ok_or_else(|| {
                Error::table_columns_not_match(self.input.column_count(), row.len())
            })?;
            match mapping.cast {
                Some(target) => values.push(value.cast_to(target).ok_or_else(|| {
                    Error::bad_arguments(format!(
                        "cannot convert column '{}' from {} to {}",
                        mapping.result_name,
                        value.data_type(),
                        target
                    ))
                })?),
                None => values.push(value.clone()),
            }
        }
        if !self.project_input {
            for &idx in &self.passthrough {
                let value = row.get(idx).ok_or_else(|| {
                    Error::table_columns_not_match(self.input.column_count(), row.len())
                })?;
                values.push(value.clone());
            }
        }
        Ok(Row::from_values(values))
    }

    /// Apply the conversion to a batch of rows
    pub fn apply_all(&self, rows: &RowVec) -> Result<RowVec> {
        rows.iter().map(|row| self.apply(row)).collect()
    }
}

/// One step of a read plan
#[derive(Debug)]
pub enum PlanStep {
    /// Materialized source data read from a table
    Source {
        table: StorageId,
        columns: Vec<String>,
        rows: RowVec,
    },
    /// Header conversion
    Convert {
        description: String,
        actions: ConvertingActions,
    },
}

/// A built read plan with its storage holders and locks
#[derive(Default)]
pub struct ReadPlan {
    steps: Vec<PlanStep>,
    header: Option<Schema>,
    storages: Vec<Arc<dyn Table>>,
    locks: Vec<TableLock>,
}

impl fmt::Debug for ReadPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadPlan")
            .field("steps", &self.steps)
            .field("storage_holders", &self.storages.len())
            .field("table_locks", &self.locks.len())
            .finish()
    }
}

impl ReadPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a source step has been added
    pub fn is_initialized(&self) -> bool {
        !self.steps.is_empty()
    }

    /// The header of the data stream at the current end of the plan
    pub fn current_header(&self) -> Option<&Schema> {
        self.header.as_ref()
    }

    /// The plan steps, in order
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Add the source step producing `rows` with the given header
    pub fn add_source(&mut self, table: StorageId, header: Schema, rows: RowVec) {
        let columns = header.column_names_owned();
        self.steps.push(PlanStep::Source {
            table,
            columns,
            rows,
        });
        self.header = Some(header);
    }

    /// Append a converting step and advance the plan header
    pub fn add_converting_step(&mut self, actions: ConvertingActions, description: impl Into<String>) {
        self.header = Some(actions.output_header());
        self.steps.push(PlanStep::Convert {
            description: description.into(),
            actions,
        });
    }

    /// Keep a storage alive for the lifetime of the plan
    pub fn add_storage_holder(&mut self, storage: Arc<dyn Table>) {
        self.storages.push(storage);
    }

    /// Attach an acquired table lock to the plan
    pub fn add_table_lock(&mut self, lock: TableLock) {
        self.locks.push(lock);
    }

    /// Number of locks attached to the plan
    pub fn table_lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Run the plan to completion and collect the resulting rows
    pub fn execute(&self) -> Result<RowVec> {
        let mut current: Option<RowVec> = None;
        for step in &self.steps {
            match step {
                PlanStep::Source { rows, .. } => current = Some(rows.clone()),
                PlanStep::Convert { actions, .. } => {
                    let rows = current
                        .take()
                        .ok_or_else(|| Error::internal("converting step before source step"))?;
                    current = Some(actions.apply_all(&rows)?);
                }
            }
        }
        current.ok_or_else(|| Error::internal("read plan has no source step"))
    }
}
