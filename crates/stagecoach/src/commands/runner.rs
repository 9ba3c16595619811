//! Command execution abstractions and types
//!
//! Shell hooks declared in the configuration file run through the
//! [`CommandRunner`] port so the hook plugin can be tested without spawning
//! processes.

use std::{
    borrow::Cow,
    path::{Path, PathBuf},
    process::Output,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;

/// Port for command execution
///
#[cfg_attr(any(test, feature = "with_mocks"), mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Execute a command from `working_directory` with extra environment
    /// variables set, using the runner's timeout
    ///
    /// A command that runs but exits non-zero is *not* an error here; check
    /// [`CommandOutput::is_success`].
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the command cannot be started or times out.
    async fn execute_in(
        &self,
        command: &str,
        working_directory: &Path,
        env: &[(String, String)],
    ) -> Result<CommandOutput, CommandError>;
}

/// Result of executing a command
///
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// The process output containing exit status and output streams
    pub(crate) output: Output,

    /// How long the command took to execute
    pub(crate) duration: Duration,
}

impl CommandOutput {
    #[must_use]
    pub fn new(output: Output, duration: Duration) -> Self {
        Self { output, duration }
    }

    /// Get the command's exit code, or -1 if the process was killed by a
    /// signal.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.output.status.code().unwrap_or(-1)
    }

    #[must_use]
    pub fn stdout(&self) -> &[u8] {
        &self.output.stdout
    }

    /// Get stdout as a UTF-8 string, replacing invalid sequences
    #[must_use]
    pub fn stdout_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output.stdout)
    }

    #[must_use]
    pub fn stderr(&self) -> &[u8] {
        &self.output.stderr
    }

    /// Get stderr as a UTF-8 string, replacing invalid sequences
    #[must_use]
    pub fn stderr_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output.stderr)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.output.status.success()
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// Errors that can occur during command execution
///
#[derive(Error, Debug, Clone)]
pub enum CommandError {
    /// Command execution exceeded the specified timeout
    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout {
        command: String,
        timeout: Duration,
        working_directory: PathBuf,
    },

    /// IO error occurred while starting or running the command
    #[error("IO Error executing command '{command}': {source}")]
    IoError {
        command: String,
        working_directory: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },
}
