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

//! Session and server settings consumed by the storage layer
//!

use std::time::Duration;

/// Settings that influence storage operations
///
/// A copy travels inside every execution context; tests override individual
/// knobs with the builder methods.
#[derive(Debug, Clone)]
pub struct Settings {
    /// How long to wait for a shared or exclusive table lock
    /// Default: 120 seconds
    pub lock_acquire_timeout: Duration,

    /// Maximum number of materialized views depending on one source table
    /// (0 = unlimited)
    /// Default: 0
    pub max_materialized_views_count_for_table: u64,

    /// Whether to compute SELECT sample headers with the new analyzer
    /// (re-resolving against the live source schema) instead of the stored
    /// declared header
    /// Default: true
    pub use_new_analyzer: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lock_acquire_timeout: Duration::from_secs(120),
            max_materialized_views_count_for_table: 0,
            use_new_analyzer: true,
        }
    }
}

impl Settings {
    /// Creates settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the lock acquisition timeout
    pub fn with_lock_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.lock_acquire_timeout = timeout;
        self
    }

    /// Builder method to cap dependent materialized views per source table
    pub fn with_max_materialized_views_count_for_table(mut self, max: u64) -> Self {
        self.max_materialized_views_count_for_table = max;
        self
    }

    /// Builder method to select the sample-header analyzer
    pub fn with_use_new_analyzer(mut self, enabled: bool) -> Self {
        self.use_new_analyzer = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.lock_acquire_timeout, Duration::from_secs(120));
        assert_eq!(settings.max_materialized_views_count_for_table, 0);
        assert!(settings.use_new_analyzer);
    }

    #[test]
    fn test_settings_builder() {
        let settings = Settings::new()
            .with_lock_acquire_timeout(Duration::from_millis(50))
            .with_max_materialized_views_count_for_table(3)
            .with_use_new_analyzer(false);

        assert_eq!(settings.lock_acquire_timeout, Duration::from_millis(50));
        assert_eq!(settings.max_materialized_views_count_for_table, 3);
        assert!(!settings.use_new_analyzer);
    }
}
