//! Common test utilities shared across all stagecoach crates.
//!
//! This crate provides standardized test helpers to eliminate code duplication
//! while maintaining test clarity and ergonomics.

pub mod config;
pub mod constants;
pub mod fixtures;
pub mod provider;
pub mod recorder;
pub mod service;

// Re-export the most commonly used items for convenience
pub use config::{test_config_with_concurrency, test_config_with_dir};
pub use constants::*;
pub use fixtures::{create_test_project, variables_file, write_variables_file};
pub use provider::ScriptedProvider;
pub use recorder::Recorder;
pub use service::{create_dispatcher_from, create_test_dispatcher, create_test_services, seed_stage};

// Re-export commonly used external dependencies for convenience
pub use stagecoach::config::AppConfigBuilder;
pub use tempfile::TempDir;
