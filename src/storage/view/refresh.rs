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

//! Refresh strategy and the per-view refresh task
//!
//! A refresh cycle is prepare → insert → transfer. The task owns the cycle;
//! when it fires is decided by an external scheduler, which only uses the
//! lifecycle API here (`initialize_and_start` / `run` / `stop` / `start` /
//! `shutdown`).

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::warn;

use crate::core::Result;
use crate::storage::context::QueryRunner;
use crate::storage::traits::StorageId;
use crate::storage::view::select::SelectQueryDescription;
use crate::storage::view::MaterializedViewTable;

/// When a refreshable view re-runs its SELECT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSchedule {
    /// At fixed wall-clock periods
    Every(Duration),
    /// A fixed delay after the previous refresh finished
    After(Duration),
}

/// REFRESH clause of a materialized view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStrategy {
    pub schedule: RefreshSchedule,
    /// APPEND mode: refreshes insert into the target directly instead of
    /// staging in a scratch table and swapping
    pub append: bool,
}

impl RefreshStrategy {
    pub fn every(period: Duration) -> Self {
        Self {
            schedule: RefreshSchedule::Every(period),
            append: false,
        }
    }

    pub fn every_secs(secs: u64) -> Self {
        Self::every(Duration::from_secs(secs))
    }

    pub fn after(delay: Duration) -> Self {
        Self {
            schedule: RefreshSchedule::After(delay),
            append: false,
        }
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }
}

/// INSERT ... SELECT prepared for one refresh cycle
#[derive(Debug, Clone)]
pub struct InsertQuery {
    /// Destination table (scratch when present, else target)
    pub table: StorageId,
    /// Destination column list, in SELECT sample-header order
    pub columns: Vec<String>,
    /// The SELECT feeding the insert
    pub select: SelectQueryDescription,
}

#[derive(Debug, Default)]
struct TaskState {
    initialized: bool,
    stopped: bool,
    shut_down: bool,
}

/// Background refresh task of one materialized view
///
/// The task holds a non-owning handle to its view; the view owns the task,
/// so a cycle that fires during teardown simply finds the view gone and does
/// nothing.
pub struct RefreshTask {
    view: Weak<MaterializedViewTable>,
    view_id: Mutex<StorageId>,
    strategy: Mutex<RefreshStrategy>,
    state: Mutex<TaskState>,
}

impl RefreshTask {
    /// Create the task for a view; the scheduler will not fire it until
    /// `initialize_and_start` ran
    pub(crate) fn new(
        view: Weak<MaterializedViewTable>,
        view_id: StorageId,
        strategy: RefreshStrategy,
    ) -> Arc<Self> {
        Arc::new(Self {
            view,
            view_id: Mutex::new(view_id),
            strategy: Mutex::new(strategy),
            state: Mutex::new(TaskState::default()),
        })
    }

    /// Mark the task ready; called from the view's startup
    pub fn initialize_and_start(&self) {
        let mut state = self.state.lock();
        if state.shut_down {
            return;
        }
        state.initialized = true;
        state.stopped = false;
    }

    /// Run one full refresh cycle now
    ///
    /// A stopped, shut-down, or not-yet-initialized task does nothing. A
    /// failed insert leaves the scratch table non-empty; the next cycle's
    /// prepare truncates it before retrying.
    pub fn run(&self) -> Result<()> {
        {
            let state = self.state.lock();
            if !state.initialized || state.stopped || state.shut_down {
                return Ok(());
            }
        }
        let Some(view) = self.view.upgrade() else {
            return Ok(());
        };

        let refresh_ctx = view.create_refresh_context();
        let insert = view.prepare_refresh(&refresh_ctx)?;
        if let Err(error) = refresh_ctx
            .query_runner()
            .execute_insert(&insert, &refresh_ctx)
        {
            warn!(
                view = %self.view_id.lock(),
                %error,
                "refresh insert failed; scratch table will be truncated on the next cycle"
            );
            return Err(error);
        }
        view.transfer_refreshed_data(&refresh_ctx)
    }

    /// Pause refreshing; idempotent
    pub fn stop(&self) {
        self.state.lock().stopped = true;
    }

    /// Resume refreshing; idempotent, no-op after shutdown
    pub fn start(&self) {
        let mut state = self.state.lock();
        if !state.shut_down {
            state.stopped = false;
        }
    }

    /// Permanently stop the task; called from the view's shutdown
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        state.stopped = true;
        state.shut_down = true;
    }

    /// Replace the refresh strategy (MODIFY REFRESH)
    pub fn alter_refresh_params(&self, strategy: RefreshStrategy) {
        *self.strategy.lock() = strategy;
    }

    /// The current strategy
    pub fn strategy(&self) -> RefreshStrategy {
        *self.strategy.lock()
    }

    /// Follow the view to its new identity
    pub fn rename(&self, new_id: StorageId) {
        *self.view_id.lock() = new_id;
    }

    /// The view identity this task refreshes
    pub fn view_id(&self) -> StorageId {
        self.view_id.lock().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().initialized
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_builders() {
        let hourly = RefreshStrategy::every_secs(3600);
        assert_eq!(
            hourly.schedule,
            RefreshSchedule::Every(Duration::from_secs(3600))
        );
        assert!(!hourly.append);
        assert!(hourly.with_append(true).append);

        let delayed = RefreshStrategy::after(Duration::from_secs(60));
        assert_eq!(
            delayed.schedule,
            RefreshSchedule::After(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_task_lifecycle_flags() {
        let task = RefreshTask::new(
            Weak::new(),
            StorageId::new("db", "v"),
            RefreshStrategy::every_secs(10),
        );
        assert!(!task.is_initialized());

        task.initialize_and_start();
        assert!(task.is_initialized());
        assert!(!task.is_stopped());

        // stop/start are idempotent
        task.stop();
        task.stop();
        assert!(task.is_stopped());
        task.start();
        task.start();
        assert!(!task.is_stopped());

        task.shutdown();
        assert!(task.is_shut_down());
        assert!(task.is_stopped());
        // start after shutdown stays stopped
        task.start();
        assert!(task.is_stopped());
    }

    #[test]
    fn test_run_without_view_is_noop() {
        let task = RefreshTask::new(
            Weak::new(),
            StorageId::new("db", "v"),
            RefreshStrategy::every_secs(10),
        );
        task.initialize_and_start();
        assert!(task.run().is_ok());
    }

    #[test]
    fn test_alter_and_rename() {
        let task = RefreshTask::new(
            Weak::new(),
            StorageId::new("db", "v"),
            RefreshStrategy::every_secs(10),
        );
        task.alter_refresh_params(RefreshStrategy::every_secs(60));
        assert_eq!(
            task.strategy().schedule,
            RefreshSchedule::Every(Duration::from_secs(60))
        );

        task.rename(StorageId::new("db", "v2"));
        assert_eq!(task.view_id().table, "v2");
    }
}
