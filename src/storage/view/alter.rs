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

//! ALTER validation and application for materialized views
//!
//! A view accepts exactly three command kinds on itself: comment changes,
//! MODIFY QUERY, and MODIFY REFRESH. Everything else belongs on the target
//! table.

use crate::core::{Error, Result};
use crate::storage::ddl::AlterCommand;
use crate::storage::view::ViewMetadata;

/// Reject every command a materialized view cannot apply to itself
///
/// MODIFY REFRESH additionally requires an existing refresher and must not
/// flip the APPEND flag: adding or removing APPEND changes whether the view
/// owns a scratch table, which is fixed at creation.
pub(crate) fn check_alter_is_possible(
    commands: &[AlterCommand],
    has_refresher: bool,
    has_scratch_table: bool,
    storage_name: &str,
) -> Result<()> {
    for command in commands {
        match command {
            AlterCommand::ModifyComment { .. } => continue,
            AlterCommand::ModifyQuery { .. } => continue,
            AlterCommand::ModifyRefresh { strategy } => {
                if !has_refresher {
                    return Err(Error::not_implemented(
                        "MODIFY REFRESH is not supported by non-refreshable materialized views",
                    ));
                }
                if strategy.append != !has_scratch_table {
                    return Err(Error::not_implemented(
                        "adding/removing APPEND is not supported by refreshable materialized views",
                    ));
                }
                continue;
            }
            other => {
                return Err(Error::not_implemented(format!(
                    "alter of type '{}' is not supported by storage {}",
                    other.kind_name(),
                    storage_name
                )))
            }
        }
    }
    Ok(())
}

/// Compute new metadata from old by applying the commands in order
pub(crate) fn apply_alter(metadata: &mut ViewMetadata, commands: &[AlterCommand]) {
    for command in commands {
        match command {
            AlterCommand::ModifyComment { comment } => {
                metadata.comment = comment.clone();
            }
            AlterCommand::ModifyQuery { select } => {
                metadata.select = select.clone();
            }
            AlterCommand::ModifyRefresh { strategy } => {
                metadata.refresh = Some(*strategy);
            }
            // Rejected by check_alter_is_possible
            AlterCommand::AddColumn { .. } | AlterCommand::DropColumn { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, SchemaColumn};
    use crate::storage::traits::StorageId;
    use crate::storage::view::refresh::RefreshStrategy;
    use crate::storage::view::select::SelectQueryDescription;

    fn metadata() -> ViewMetadata {
        ViewMetadata {
            columns: vec![SchemaColumn::simple(0, "id", DataType::Integer)],
            select: SelectQueryDescription::new("SELECT id FROM default.src")
                .with_source_table(StorageId::new("default", "src")),
            refresh: Some(RefreshStrategy::every_secs(60)),
            comment: None,
        }
    }

    #[test]
    fn test_comment_and_query_alters_allowed() {
        let commands = [
            AlterCommand::ModifyComment {
                comment: Some("hourly rollup".to_string()),
            },
            AlterCommand::ModifyQuery {
                select: SelectQueryDescription::new("SELECT id FROM default.other")
                    .with_source_table(StorageId::new("default", "other")),
            },
        ];
        assert!(check_alter_is_possible(&commands, true, true, "MaterializedView").is_ok());
    }

    #[test]
    fn test_add_column_rejected() {
        let commands = [AlterCommand::AddColumn {
            column: SchemaColumn::simple(1, "extra", DataType::Text),
        }];
        let err =
            check_alter_is_possible(&commands, true, true, "MaterializedView").unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
        assert!(err.to_string().contains("ADD COLUMN"));
    }

    #[test]
    fn test_modify_refresh_requires_refresher() {
        let commands = [AlterCommand::ModifyRefresh {
            strategy: RefreshStrategy::every_secs(30),
        }];
        assert!(check_alter_is_possible(&commands, false, false, "MaterializedView").is_err());
        assert!(check_alter_is_possible(&commands, true, true, "MaterializedView").is_ok());
    }

    #[test]
    fn test_modify_refresh_cannot_flip_append() {
        // View has a scratch table, so APPEND must stay off
        let commands = [AlterCommand::ModifyRefresh {
            strategy: RefreshStrategy::every_secs(30).with_append(true),
        }];
        assert!(check_alter_is_possible(&commands, true, true, "MaterializedView").is_err());
        // View without a scratch table must keep APPEND on
        assert!(check_alter_is_possible(&commands, true, false, "MaterializedView").is_ok());
    }

    #[test]
    fn test_apply_alter() {
        let mut meta = metadata();
        let new_select = SelectQueryDescription::new("SELECT id FROM default.other")
            .with_source_table(StorageId::new("default", "other"));
        apply_alter(
            &mut meta,
            &[
                AlterCommand::ModifyComment {
                    comment: Some("updated".to_string()),
                },
                AlterCommand::ModifyQuery {
                    select: new_select.clone(),
                },
                AlterCommand::ModifyRefresh {
                    strategy: RefreshStrategy::every_secs(5),
                },
            ],
        );
        assert_eq!(meta.comment.as_deref(), Some("updated"));
        assert_eq!(meta.select, new_select);
        assert_eq!(meta.refresh, Some(RefreshStrategy::every_secs(5)));
    }
}
