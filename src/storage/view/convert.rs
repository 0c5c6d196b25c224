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

//! Header reconciliation between a view and its target table
//!
//! The view's declared header and the target table's header may disagree in
//! column set, order, or types. Reads reconcile the two: columns absent on
//! either side are ignored, and a converting step is added only when the
//! remaining structures differ.

use crate::core::{Result, Schema};
use crate::storage::traits::ConvertingActions;

/// Remove from `target` every column whose name is absent from `src`
pub fn remove_non_common_columns(src: &Schema, target: &mut Schema) {
    target.retain_columns(|col| src.has_column(&col.name));
}

/// Build the converting step turning a target-table stream into the view's
/// structure, or None when no conversion is needed
///
/// Both headers are pruned to their common columns first. The conversion
/// matches columns by name and leaves columns outside the view structure in
/// the stream as is; a distributed source processing a join may return such
/// extra columns and they must survive unchanged.
pub fn converting_step(
    stream_header: &Schema,
    view_header: &Schema,
) -> Result<Option<ConvertingActions>> {
    let mut target = stream_header.clone();
    let mut view = view_header.clone();

    // No need to convert columns that do not exist in the view
    remove_non_common_columns(&view, &mut target);
    // No need to convert columns that do not exist in the stream; a source
    // processing the query up to a later stage may not return all of them
    remove_non_common_columns(&target, &mut view);

    if target.same_structure(&view) {
        return Ok(None);
    }

    let mut actions = ConvertingActions::make_converting(stream_header, &view)?;
    actions.set_project_input(false);
    Ok(Some(actions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Row, SchemaBuilder, Value};

    fn header(cols: &[(&str, DataType)]) -> Schema {
        let mut builder = SchemaBuilder::new("");
        for (name, dt) in cols {
            builder = builder.add(*name, *dt);
        }
        builder.build()
    }

    #[test]
    fn test_remove_non_common_columns() {
        let src = header(&[("a", DataType::Integer), ("b", DataType::Text)]);
        let mut target = header(&[
            ("b", DataType::Text),
            ("c", DataType::Float),
            ("a", DataType::Integer),
        ]);
        remove_non_common_columns(&src, &mut target);
        assert_eq!(target.column_names(), vec!["b", "a"]);
    }

    #[test]
    fn test_removal_is_commutative_on_common_set() {
        let a = header(&[
            ("x", DataType::Integer),
            ("y", DataType::Text),
            ("only_a", DataType::Float),
        ]);
        let b = header(&[
            ("y", DataType::Text),
            ("x", DataType::Integer),
            ("only_b", DataType::Boolean),
        ]);

        let mut a1 = a.clone();
        let mut b1 = b.clone();
        remove_non_common_columns(&b1, &mut a1);
        remove_non_common_columns(&a1, &mut b1);

        let mut b2 = b.clone();
        let mut a2 = a.clone();
        remove_non_common_columns(&a2, &mut b2);
        remove_non_common_columns(&b2, &mut a2);

        // Both orders leave the same column sets
        let mut names1 = a1.column_names_owned();
        let mut names2 = a2.column_names_owned();
        names1.sort();
        names2.sort();
        assert_eq!(names1, names2);
        assert_eq!(names1, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_no_step_for_equal_structures() {
        let stream = header(&[("a", DataType::Integer), ("b", DataType::Text)]);
        let view = header(&[("a", DataType::Integer), ("b", DataType::Text)]);
        assert!(converting_step(&stream, &view).unwrap().is_none());
    }

    #[test]
    fn test_no_step_when_equal_after_pruning() {
        // Extra stream-only and view-only columns are ignored
        let stream = header(&[
            ("a", DataType::Integer),
            ("stream_only", DataType::Float),
        ]);
        let view = header(&[("a", DataType::Integer), ("view_only", DataType::Text)]);
        assert!(converting_step(&stream, &view).unwrap().is_none());
    }

    #[test]
    fn test_step_reorders_and_keeps_extra_columns() {
        let stream = header(&[
            ("b", DataType::Text),
            ("joined", DataType::Float),
            ("a", DataType::Integer),
        ]);
        let view = header(&[("a", DataType::Integer), ("b", DataType::Text)]);

        let actions = converting_step(&stream, &view).unwrap().unwrap();
        let row = Row::from_values(vec![
            Value::text("x"),
            Value::float(0.5),
            Value::integer(1),
        ]);
        let converted = actions.apply(&row).unwrap();

        // View columns first, then the pass-through column
        assert_eq!(converted[0], Value::integer(1));
        assert_eq!(converted[1], Value::text("x"));
        assert_eq!(converted[2], Value::float(0.5));
    }

    #[test]
    fn test_step_casts_types() {
        let stream = header(&[("a", DataType::Integer)]);
        let view = header(&[("a", DataType::Float)]);
        let actions = converting_step(&stream, &view).unwrap().unwrap();

        let row = Row::from_values(vec![Value::integer(3)]);
        assert_eq!(actions.apply(&row).unwrap()[0], Value::float(3.0));
    }
}
