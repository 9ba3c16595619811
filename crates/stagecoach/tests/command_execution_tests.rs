use std::time::Duration;

use stagecoach::commands::{CommandError, CommandRunner, ShellCommandRunner};
use test_common::create_test_project;

#[tokio::test]
async fn test_command_execution_with_long_output() {
    let project = create_test_project();
    let runner = ShellCommandRunner::new("/bin/sh", Duration::from_secs(5));

    // Generate a command that produces a lot of output
    let command = "for i in $(seq 1 1000); do echo \"Line $i\"; done";

    let output = runner.execute_in(command, project.path(), &[]).await.unwrap();

    // Should capture all output lines
    let output_lines = output.stdout_str().lines().count();
    assert_eq!(output_lines, 1000);
}

#[tokio::test]
async fn test_command_runs_in_the_project_directory() {
    let project = create_test_project();
    let runner = ShellCommandRunner::new("/bin/sh", Duration::from_secs(5));

    let output = runner
        .execute_in(
            "cat s-project.json && echo \"$HOOK_NOTE\" >&2",
            project.path(),
            &[("HOOK_NOTE".to_string(), "from env".to_string())],
        )
        .await
        .unwrap();

    assert!(output.is_success());
    assert!(output.stdout_str().contains("\"name\": \"shop\""));
    assert_eq!(output.stderr_str().trim(), "from env");
}

#[tokio::test]
async fn test_command_timeout() {
    let project = create_test_project();
    let runner = ShellCommandRunner::new("/bin/sh", Duration::from_secs(1));

    // Command that runs longer than the timeout
    let result = runner.execute_in("sleep 5", project.path(), &[]).await;

    match result {
        Err(CommandError::Timeout {
            command, timeout, ..
        }) => {
            assert_eq!(command, "sleep 5");
            assert_eq!(timeout, Duration::from_secs(1));
        }
        other => panic!("Expected Timeout error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_non_zero_exit_is_not_an_error() {
    let project = create_test_project();
    let runner = ShellCommandRunner::new("/bin/sh", Duration::from_secs(5));

    let output = runner
        .execute_in("echo failing >&2; exit 3", project.path(), &[])
        .await
        .unwrap();

    assert!(!output.is_success());
    assert_eq!(output.exit_code(), 3);
    assert_eq!(output.stderr_str().trim(), "failing");
}
