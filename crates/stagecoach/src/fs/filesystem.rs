//! File system abstraction layer
//!
//! This module provides a trait-based abstraction for file system operations
//! so project state and the local provider can be tested without touching
//! disk. It defines the port; [`crate::fs::real`] holds the adapter.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;

/// Port for file system operations
///
/// All disk access in stagecoach (configuration, project state files, the
/// local provider's resource ledger) goes through this trait.
#[cfg_attr(any(test, feature = "with_mocks"), mockall::automock)]
pub trait FileSystem: Send + Sync {
    /// Read a file and return its contents as a string
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the file does not exist, cannot be read,
    /// or is not valid UTF-8.
    fn read_file(&self, path: &Path) -> Result<String, FileSystemError>;

    /// Write data to a file
    ///
    /// Creates the file if it doesn't exist, overwrites it if it does, and
    /// creates any missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the parent directory cannot be created
    /// or the write fails.
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), FileSystemError>;

    /// Remove a file
    ///
    /// Removing a file that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the file exists but cannot be removed.
    fn remove_file(&self, path: &Path) -> Result<(), FileSystemError>;

    /// Check if a path exists
    fn path_exists(&self, path: &Path) -> bool;

    /// Expand a path with shell-like expansions (`~`)
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the home directory cannot be determined
    /// or the expanded path cannot be resolved.
    fn expand_path(&self, path: &Path) -> Result<PathBuf, FileSystemError>;

    /// List the contents of a directory
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError`] if the directory does not exist or cannot
    /// be read.
    fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>, FileSystemError>;

    /// Get the user's configuration directory for stagecoach
    ///
    /// # Errors
    ///
    /// Returns [`FileSystemError::HomeDirNotFound`] if the home directory
    /// cannot be determined.
    fn config_dir(&self) -> Result<PathBuf, FileSystemError>;
}

/// Errors that can occur during file system operations
#[derive(Error, Debug, Clone)]
pub enum FileSystemError {
    /// General IO error occurred during file system operation
    #[error("IO error: {0}")]
    IoError(Arc<io::Error>),

    /// Home directory could not be determined (needed for path expansion)
    #[error("Home directory not found")]
    HomeDirNotFound,
}

impl From<io::Error> for FileSystemError {
    fn from(error: io::Error) -> Self {
        Self::IoError(Arc::new(error))
    }
}

#[cfg(test)]
impl MockFileSystem {
    /// Set up a mock for reading a file with specific content
    pub(crate) fn mock_read_file<P, S>(&mut self, path: P, content: S)
    where
        PathBuf: From<P>,
        S: ToString,
    {
        let path_buf = PathBuf::from(path);
        let content_string = content.to_string();
        self.expect_read_file()
            .with(mockall::predicate::eq(path_buf))
            .returning(move |_| Ok(content_string.clone()));
    }

    /// Set up a mock for path existence checking
    pub(crate) fn mock_path_exists<P>(&mut self, path: P, exists: bool)
    where
        PathBuf: From<P>,
    {
        self.expect_path_exists()
            .with(mockall::predicate::eq(PathBuf::from(path)))
            .returning(move |_| exists);
    }

    /// Set up a mock for getting the configuration directory
    pub(crate) fn mock_config_dir_ok<P>(&mut self, path: P)
    where
        PathBuf: From<P>,
    {
        let p = PathBuf::from(path);
        self.expect_config_dir().return_once(|| Ok(p));
    }

    /// Set up a complete config file scenario: `config.yaml` exists in
    /// `config_dir` with `config_yaml` as content, `config.yml` does not.
    pub(crate) fn mock_config_file(&mut self, config_dir: &Path, config_yaml: &str) {
        let config_dir_owned = PathBuf::from(config_dir);
        let config_path = config_dir.join("config.yaml");

        self.expect_config_dir()
            .return_once(|| Ok(config_dir_owned));
        self.mock_path_exists(&config_path, true);
        self.mock_read_file(&config_path, config_yaml);

        self.mock_path_exists(config_dir.join("config.yml"), false);
    }

    /// Set up a mock for path expansion
    pub(crate) fn mock_expand_path<P>(&mut self, input: P, output: P)
    where
        PathBuf: From<P>,
    {
        let input = PathBuf::from(input);
        let output = PathBuf::from(output);

        self.expect_expand_path()
            .with(mockall::predicate::eq(input))
            .return_once(|_| Ok(output));
    }
}
