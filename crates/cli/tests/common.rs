use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use assert_cmd::Command;
use tempfile::TempDir;

/// Directory name of the test project, and so its project name
pub const PROJECT_NAME: &str = "project";

// Helper to create a temporary config environment and an empty project
#[must_use]
pub fn setup_default_test_config() -> TempDir {
    setup_test_config("")
}

// Helper to create a temporary config environment; `extra_yaml` is appended
// after the `project_directory` line
#[must_use]
pub fn setup_test_config(extra_yaml: &str) -> TempDir {
    let temp_dir = tempfile::tempdir().unwrap();

    let config_dir = config_dir(&temp_dir);
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(project_dir(&temp_dir)).unwrap();

    let mut config_file = fs::File::create(config_dir.join("config.yaml")).unwrap();
    writeln!(
        config_file,
        "project_directory: {}",
        project_dir(&temp_dir).display()
    )
    .unwrap();
    config_file.write_all(extra_yaml.as_bytes()).unwrap();

    temp_dir
}

#[must_use]
pub fn config_dir(base_dir: &TempDir) -> PathBuf {
    base_dir.path().join(".config").join("stagecoach")
}

#[must_use]
pub fn project_dir(base_dir: &TempDir) -> PathBuf {
    base_dir.path().join(PROJECT_NAME)
}

#[must_use]
pub fn variables_file(project: &Path, stem: &str) -> PathBuf {
    project
        .join("_meta")
        .join("variables")
        .join(format!("s-variables-{stem}.json"))
}

// Helper function to get a command instance with environment variables pointing to our test config
#[must_use]
pub fn get_command_with_test_config(temp_dir: &TempDir) -> Command {
    let mut cmd = get_command();
    cmd.env("STAGECOACH_CONFIG_DIR", config_dir(temp_dir));
    cmd
}

// Helper function to get a command instance
#[must_use]
pub fn get_command() -> Command {
    let mut cmd = Command::cargo_bin("stagecoach").unwrap();
    cmd.env_remove("STAGECOACH_FAIL_RESOURCES");
    cmd
}

/// Run `stage create -s <stage> -r <region>` and expect it to succeed
pub fn create_stage(temp_dir: &TempDir, stage: &str, region: &str, extra: &[&str]) {
    get_command_with_test_config(temp_dir)
        .args(["stage", "create", "-s", stage, "-r", region])
        .args(extra)
        .assert()
        .success();
}
