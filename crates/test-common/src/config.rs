//! `AppConfig` test helpers to eliminate duplication across tests.

use std::path::Path;

use stagecoach::config::{AppConfig, AppConfigBuilder};

use crate::constants::TEST_COMMAND_TIMEOUT_SECS;

/// Creates a standard test configuration for `project_dir` with colors
/// disabled.
pub fn test_config_with_dir<P: AsRef<Path>>(project_dir: P) -> AppConfig {
    AppConfigBuilder::default()
        .project_directory(project_dir.as_ref())
        .use_colors(false)
        .command_timeout_unchecked(TEST_COMMAND_TIMEOUT_SECS)
        .build()
}

/// Creates a test configuration that deploys at most `concurrency` items at
/// once.
pub fn test_config_with_concurrency<P: AsRef<Path>>(project_dir: P, concurrency: usize) -> AppConfig {
    AppConfigBuilder::default()
        .project_directory(project_dir.as_ref())
        .use_colors(false)
        .max_concurrency_unchecked(concurrency)
        .command_timeout_unchecked(TEST_COMMAND_TIMEOUT_SECS)
        .build()
}
