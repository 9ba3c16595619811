// Shell command runner adapter implementation

use std::{
    path::Path,
    process::Stdio,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::runner::{CommandError, CommandOutput, CommandRunner};

/// Shell command runner implementation
///
#[derive(Clone, Debug)]
pub struct ShellCommandRunner {
    /// Path to the shell executable
    ///
    shell: String,

    /// Upper bound on how long a single command may run
    ///
    timeout: Duration,
}

impl ShellCommandRunner {
    /// Create a new shell command runner
    ///
    #[must_use]
    pub fn new(shell: &str, timeout: Duration) -> Self {
        Self {
            shell: shell.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn execute_in(
        &self,
        command: &str,
        working_directory: &Path,
        env: &[(String, String)],
    ) -> Result<CommandOutput, CommandError> {
        let start_time = Instant::now();
        let timeout = self.timeout;

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(working_directory)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, value);
        }

        debug!(%command, dir = %working_directory.display(), "running shell command");

        // Execute the command within the context of a timeout
        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| CommandError::Timeout {
                command: command.to_string(),
                timeout,
                working_directory: working_directory.to_path_buf(),
            })?
            .map_err(|e| CommandError::IoError {
                command: command.to_string(),
                working_directory: working_directory.to_path_buf(),
                source: Arc::new(e),
            })?;

        Ok(CommandOutput::new(output, start_time.elapsed()))
    }
}
