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

//! Runtime values with type information

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::types::DataType;

/// A runtime value stored in a row
///
/// Text values are reference-counted so cloning rows during scans and
/// transfers stays cheap.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL with the declared column type
    Null(DataType),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 text string
    Text(Arc<str>),
    /// Boolean true/false
    Boolean(bool),
    /// Timestamp (UTC)
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Create an integer value
    pub fn integer(v: i64) -> Self {
        Value::Integer(v)
    }

    /// Create a float value
    pub fn float(v: f64) -> Self {
        Value::Float(v)
    }

    /// Create a text value
    pub fn text(v: impl AsRef<str>) -> Self {
        Value::Text(Arc::from(v.as_ref()))
    }

    /// Create a boolean value
    pub fn boolean(v: bool) -> Self {
        Value::Boolean(v)
    }

    /// Create a timestamp value
    pub fn timestamp(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }

    /// Create a NULL value with the given declared type
    pub fn null(data_type: DataType) -> Self {
        Value::Null(data_type)
    }

    /// Create a NULL value of unknown type
    pub fn null_unknown() -> Self {
        Value::Null(DataType::Null)
    }

    /// Returns true if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Returns the data type of this value
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null(dt) => *dt,
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
            Value::Timestamp(_) => DataType::Timestamp,
        }
    }

    /// Convert to i64 if possible (floats truncate, booleans map to 0/1)
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Float(v) => Some(*v as i64),
            Value::Boolean(v) => Some(*v as i64),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Convert to f64 if possible
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Boolean(v) => Some(*v as i64 as f64),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Convert to an owned string representation (NULL yields None)
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::Null(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Cast this value to the target type, if a lossless-enough cast exists
    ///
    /// Used by the header conversion step when a view's declared column type
    /// differs from the target table's column type.
    pub fn cast_to(&self, target: DataType) -> Option<Value> {
        if self.data_type() == target {
            return Some(self.clone());
        }
        match (self, target) {
            (Value::Null(_), dt) => Some(Value::Null(dt)),
            (_, DataType::Integer) => self.as_int64().map(Value::Integer),
            (_, DataType::Float) => self.as_float64().map(Value::Float),
            (_, DataType::Text) => self.as_string().map(Value::text),
            (Value::Integer(v), DataType::Boolean) => Some(Value::Boolean(*v != 0)),
            _ => None,
        }
    }

    /// Rough in-memory size in bytes, used for totalBytes accounting
    pub fn approximate_byte_size(&self) -> usize {
        match self {
            Value::Text(s) => std::mem::size_of::<Value>() + s.len(),
            _ => std::mem::size_of::<Value>(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_constructors_and_types() {
        assert_eq!(Value::integer(7).data_type(), DataType::Integer);
        assert_eq!(Value::float(1.5).data_type(), DataType::Float);
        assert_eq!(Value::text("x").data_type(), DataType::Text);
        assert_eq!(Value::boolean(true).data_type(), DataType::Boolean);
        assert_eq!(Value::null(DataType::Text).data_type(), DataType::Text);
        assert!(Value::null_unknown().is_null());
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::integer(42).as_int64(), Some(42));
        assert_eq!(Value::integer(42).as_float64(), Some(42.0));
        assert_eq!(Value::float(3.9).as_int64(), Some(3));
        assert_eq!(Value::boolean(true).as_int64(), Some(1));
        assert_eq!(Value::text("42").as_int64(), Some(42));
        assert_eq!(Value::text("x").as_int64(), None);
        assert_eq!(Value::null(DataType::Integer).as_string(), None);
        assert_eq!(Value::integer(1).as_string(), Some("1".to_string()));
    }

    #[test]
    fn test_value_cast() {
        assert_eq!(
            Value::integer(1).cast_to(DataType::Float),
            Some(Value::float(1.0))
        );
        assert_eq!(
            Value::float(2.0).cast_to(DataType::Integer),
            Some(Value::integer(2))
        );
        assert_eq!(
            Value::integer(5).cast_to(DataType::Text),
            Some(Value::text("5"))
        );
        assert_eq!(
            Value::null(DataType::Integer).cast_to(DataType::Text),
            Some(Value::null(DataType::Text))
        );
        assert_eq!(Value::boolean(true).cast_to(DataType::Timestamp), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::integer(1).to_string(), "1");
        assert_eq!(Value::text("abc").to_string(), "abc");
        assert_eq!(Value::null_unknown().to_string(), "NULL");
    }
}
