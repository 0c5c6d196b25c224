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

//! Row type - a collection of values

use std::ops::Index;

use super::error::{Error, Result};
use super::schema::Schema;
use super::value::Value;

/// A database row (ordered collection of values)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

/// A batch of rows
pub type RowVec = Vec<Row>;

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Row { values: Vec::new() }
    }

    /// Create a row from a vector of values
    pub fn from_values(values: Vec<Value>) -> Self {
        Row { values }
    }

    /// Number of values in the row
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by column index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Set a value by column index
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::table_columns_not_match(index + 1, self.values.len())),
        }
    }

    /// Borrow the underlying values
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row and return the underlying values
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Rough in-memory size in bytes
    pub fn approximate_byte_size(&self) -> usize {
        self.values.iter().map(Value::approximate_byte_size).sum()
    }

    /// Validate the row against a schema: arity, NULLability, and types
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        if self.values.len() != schema.column_count() {
            return Err(Error::table_columns_not_match(
                schema.column_count(),
                self.values.len(),
            ));
        }
        for (value, column) in self.values.iter().zip(schema.columns.iter()) {
            if value.is_null() {
                if !column.nullable {
                    return Err(Error::bad_arguments(format!(
                        "NULL in non-nullable column '{}'",
                        column.name
                    )));
                }
                continue;
            }
            if value.data_type() != column.data_type {
                return Err(Error::bad_arguments(format!(
                    "type mismatch for column '{}': expected {}, got {}",
                    column.name,
                    column.data_type,
                    value.data_type()
                )));
            }
        }
        Ok(())
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::from_values(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::SchemaBuilder;
    use crate::core::types::DataType;

    fn sample_schema() -> Schema {
        SchemaBuilder::new("events")
            .add("id", DataType::Integer)
            .add("name", DataType::Text)
            .add_nullable("note", DataType::Text)
            .build()
    }

    #[test]
    fn test_row_basics() {
        let row = Row::from_values(vec![Value::integer(1), Value::text("a")]);
        assert_eq!(row.len(), 2);
        assert!(!row.is_empty());
        assert_eq!(row[0], Value::integer(1));
        assert_eq!(row.get(1), Some(&Value::text("a")));
        assert_eq!(row.get(2), None);
    }

    #[test]
    fn test_row_set() {
        let mut row = Row::from_values(vec![Value::integer(1)]);
        row.set(0, Value::integer(2)).unwrap();
        assert_eq!(row[0], Value::integer(2));
        assert!(row.set(5, Value::integer(3)).is_err());
    }

    #[test]
    fn test_row_validate() {
        let schema = sample_schema();

        let ok = Row::from_values(vec![
            Value::integer(1),
            Value::text("a"),
            Value::null(DataType::Text),
        ]);
        assert!(ok.validate(&schema).is_ok());

        let wrong_arity = Row::from_values(vec![Value::integer(1)]);
        assert!(matches!(
            wrong_arity.validate(&schema),
            Err(Error::TableColumnsNotMatch { .. })
        ));

        let null_in_required = Row::from_values(vec![
            Value::null(DataType::Integer),
            Value::text("a"),
            Value::null(DataType::Text),
        ]);
        assert!(null_in_required.validate(&schema).is_err());

        let wrong_type = Row::from_values(vec![
            Value::text("oops"),
            Value::text("a"),
            Value::null(DataType::Text),
        ]);
        assert!(wrong_type.validate(&schema).is_err());
    }
}
