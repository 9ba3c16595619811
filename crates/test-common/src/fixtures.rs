//! Project directory fixtures written straight to disk.

use std::{fs, path::PathBuf};

use tempfile::TempDir;

use crate::constants::TEST_PROJECT;

/// Creates an empty project named [`TEST_PROJECT`] in a fresh temp dir.
///
/// # Example
/// ```rust
/// let project = create_test_project();
/// assert!(project.path().join("s-project.json").exists());
/// ```
#[must_use]
pub fn create_test_project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("s-project.json"),
        format!("{{\n  \"name\": \"{TEST_PROJECT}\"\n}}\n"),
    )
    .unwrap();
    dir
}

/// Path of the variables file with the given stem (`common`, `<stage>` or
/// `<stage>-<region without dashes>`).
#[must_use]
pub fn variables_file(dir: &TempDir, stem: &str) -> PathBuf {
    dir.path()
        .join("_meta")
        .join("variables")
        .join(format!("s-variables-{stem}.json"))
}

/// Writes a variables file by hand, as another tool or an older version
/// might have left it.
pub fn write_variables_file(dir: &TempDir, stem: &str, variables: &[(&str, &str)]) -> PathBuf {
    let path = variables_file(dir, stem);
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    let map: serde_json::Map<String, serde_json::Value> = variables
        .iter()
        .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
        .collect();
    fs::write(&path, serde_json::to_string_pretty(&map).unwrap()).unwrap();
    path
}
