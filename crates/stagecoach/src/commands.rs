//! Shell command execution used by configuration-defined hooks

pub mod runner;
pub mod shell;

pub use runner::{CommandError, CommandOutput, CommandRunner};
pub use shell::ShellCommandRunner;

#[cfg(any(test, feature = "with_mocks"))]
pub use runner::MockCommandRunner;
