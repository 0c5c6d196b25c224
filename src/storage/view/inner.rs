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

//! Inner tables of a materialized view
//!
//! Naming of the hidden tables a view owns, the mutex-guarded record of
//! their identities, and the validation a scratch table's create query must
//! pass before it is executed.

use crate::core::{Error, Result};
use crate::storage::context::ExecutionContext;
use crate::storage::ddl::CreateTableQuery;
use crate::storage::traits::StorageId;

/// Derive the name of an inner table from the view's identity
///
/// `".inner[_scratch]_id.<uuid>"` when the view has a UUID, otherwise
/// `".inner[_scratch].<view-table-name>"`. Deterministic for equal input.
pub fn inner_table_name(view_id: &StorageId, scratch: bool) -> String {
    let mut name = String::from(".inner");
    if scratch {
        name.push_str("_scratch");
    }
    match view_id.uuid {
        Some(uuid) => {
            name.push_str("_id.");
            name.push_str(&uuid.to_string());
        }
        None => {
            name.push('.');
            name.push_str(&view_id.table);
        }
    }
    name
}

/// The mutable identities of a view's inner tables
///
/// `target` is the table the view's data lives in, inner or external.
/// Mutated under the view's inner-identity mutex only.
#[derive(Debug, Clone)]
pub struct InnerTableIds {
    pub target: StorageId,
    pub scratch: Option<StorageId>,
}

/// Validate the create query derived for a scratch table
///
/// The scratch table must be a regular table whose engine can move data into
/// the target wholesale, and must be neither partitioned nor replicated.
pub fn check_scratch_create_query(
    create: &CreateTableQuery,
    ctx: &ExecutionContext,
) -> Result<()> {
    if create.kind.is_view_or_dictionary() {
        return Err(Error::bad_arguments(
            "materialized view can only write to a regular table, not dictionary or view",
        ));
    }

    let storage = create
        .storage
        .as_ref()
        .ok_or_else(|| Error::internal("target table create query missing ENGINE"))?;

    let features = ctx
        .registry()
        .try_get_features(&storage.engine)
        .ok_or_else(|| Error::UnknownStorageEngine(storage.engine.clone()))?;

    if !features.supports_moving_data_between_tables {
        return Err(Error::not_implemented(format!(
            "engine {} doesn't support moving data between tables as required by \
             refreshable materialized view (without APPEND). Only the following engines \
             support it: {}",
            storage.engine,
            ctx.registry()
                .names_with(|f| f.supports_moving_data_between_tables)
                .join(", ")
        )));
    }

    if storage.partition_by.is_some() {
        return Err(Error::not_implemented(
            "refreshable materialized views (without APPEND) don't support partitioned tables",
        ));
    }

    if features.supports_replication {
        // TODO: Enable coordinated refreshing for replicated targets
        return Err(Error::not_implemented(
            "refreshable materialized views (without APPEND) don't support replicated tables yet",
        ));
    }

    Ok(())
}
