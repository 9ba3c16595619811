pub mod json;

pub use self::json::JsonStateRepository;

use async_trait::async_trait;

use super::{Level, ProjectSnapshot, StateError, Variables};

/// Port for durable project state
#[cfg_attr(any(test, feature = "with_mocks"), mockall::automock)]
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Read the whole tree; a project that was never saved loads empty
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if stored files exist but cannot be read or
    /// parsed.
    async fn load(&self) -> Result<ProjectSnapshot, StateError>;

    /// Persist the project's own metadata
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the write fails.
    async fn write_project(&self, name: &str) -> Result<(), StateError>;

    /// Persist the variables of exactly one level, replacing what was stored
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the write fails.
    async fn write_variables(&self, level: &Level, variables: &Variables)
    -> Result<(), StateError>;

    /// Forget the variables stored for one level
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the stored file exists but cannot be removed.
    async fn delete_variables(&self, level: &Level) -> Result<(), StateError>;
}
