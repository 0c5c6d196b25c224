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

//! Core types and definitions for Silica
//!
//! This module contains the fundamental types used throughout the storage
//! layer:
//!
//! - [`DataType`] - column data types (INTEGER, TEXT, FLOAT, etc.)
//! - [`Value`] - runtime values with type information
//! - [`Row`] - a database row (collection of values)
//! - [`Schema`] - table schema / stream header definition
//! - [`SchemaColumn`] - column definition
//! - [`Error`] - error types for all storage operations

pub mod error;
pub mod row;
pub mod schema;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use row::{Row, RowVec};
pub use schema::{Schema, SchemaBuilder, SchemaColumn};
pub use types::DataType;
pub use value::Value;

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Integration test: Create a schema, build rows, validate
    #[test]
    fn test_schema_row_integration() {
        let schema = SchemaBuilder::new("events")
            .add("id", DataType::Integer)
            .add("name", DataType::Text)
            .add_nullable("note", DataType::Text)
            .build();

        let row = Row::from_values(vec![
            Value::integer(1),
            Value::text("click"),
            Value::text("first"),
        ]);
        assert!(row.validate(&schema).is_ok());

        let row = Row::from_values(vec![
            Value::integer(2),
            Value::text("view"),
            Value::null(DataType::Text),
        ]);
        assert!(row.validate(&schema).is_ok());

        // NULL in a non-nullable column must fail
        let row = Row::from_values(vec![
            Value::integer(3),
            Value::null(DataType::Text),
            Value::null(DataType::Text),
        ]);
        assert!(row.validate(&schema).is_err());
    }

    /// Integration test: header conversion via value casts
    #[test]
    fn test_value_cast_integration() {
        let v = Value::integer(10);
        assert_eq!(v.cast_to(DataType::Float), Some(Value::float(10.0)));
        assert_eq!(v.cast_to(DataType::Text), Some(Value::text("10")));
        assert_eq!(v.cast_to(DataType::Integer), Some(Value::integer(10)));
    }
}
