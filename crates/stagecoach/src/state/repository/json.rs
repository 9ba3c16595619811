use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    fs::FileSystem,
    state::{
        Level, PROJECT_VARIABLES_NAME, ProjectSnapshot, REGION_VARIABLE, StateError, Variables,
    },
};

use super::StateRepository;

const PROJECT_FILE: &str = "s-project.json";
const VARIABLES_DIR: [&str; 2] = ["_meta", "variables"];
const VARIABLES_PREFIX: &str = "s-variables-";

#[derive(Debug, Serialize, Deserialize)]
struct ProjectFile {
    name: String,
}

/// Stores project state as pretty-printed JSON files under the project
/// directory
///
/// ```text
/// <project>/s-project.json
/// <project>/_meta/variables/s-variables-common.json
/// <project>/_meta/variables/s-variables-<stage>.json
/// <project>/_meta/variables/s-variables-<stage>-<region without dashes>.json
/// ```
#[derive(Debug, Clone)]
pub struct JsonStateRepository<F: FileSystem> {
    fs: F,
    project_directory: PathBuf,
}

impl<F: FileSystem> JsonStateRepository<F> {
    pub fn new(fs: F, project_directory: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            project_directory: project_directory.into(),
        }
    }

    fn variables_dir(&self) -> PathBuf {
        VARIABLES_DIR
            .iter()
            .fold(self.project_directory.clone(), |path, part| path.join(part))
    }

    /// Where the variables of `level` are stored
    #[must_use]
    pub fn variables_path(&self, level: &Level) -> PathBuf {
        let stem = match level {
            Level::Project => PROJECT_VARIABLES_NAME.to_string(),
            Level::Stage { stage } => stage.clone(),
            Level::Region { stage, region } => format!("{stage}-{}", region.replace('-', "")),
        };
        self.variables_dir()
            .join(format!("{VARIABLES_PREFIX}{stem}.json"))
    }

    fn read_variables(&self, path: &Path) -> Result<Variables, StateError> {
        let contents = self.fs.read_file(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StateError> {
        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');
        self.fs.write_file(path, &bytes)?;
        debug!(path = %path.display(), "wrote state file");
        Ok(())
    }

    fn project_name(&self) -> Result<String, StateError> {
        let path = self.project_directory.join(PROJECT_FILE);
        if self.fs.path_exists(&path) {
            let file: ProjectFile = serde_json::from_str(&self.fs.read_file(&path)?)?;
            return Ok(file.name);
        }

        Ok(self
            .project_directory
            .file_name()
            .map_or_else(|| "project".to_string(), |n| n.to_string_lossy().into_owned()))
    }
}

#[async_trait]
impl<F: FileSystem> StateRepository for JsonStateRepository<F> {
    async fn load(&self) -> Result<ProjectSnapshot, StateError> {
        let mut snapshot = ProjectSnapshot {
            name: self.project_name()?,
            ..ProjectSnapshot::default()
        };

        let dir = self.variables_dir();
        if !self.fs.path_exists(&dir) {
            debug!(dir = %dir.display(), "no stored variables");
            return Ok(snapshot);
        }

        let mut paths = self.fs.list_directory(&dir)?;
        paths.sort();

        for path in paths {
            let Some(stem) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(VARIABLES_PREFIX))
                .and_then(|n| n.strip_suffix(".json"))
                .map(ToString::to_string)
            else {
                continue;
            };

            let variables = self.read_variables(&path)?;

            if stem == PROJECT_VARIABLES_NAME {
                snapshot.variables = variables;
                continue;
            }

            match stem.split_once('-') {
                None => {
                    snapshot.stages.entry(stem).or_default().variables = variables;
                }
                Some((stage, region_stem)) => {
                    let Some(region) = variables.get(REGION_VARIABLE).cloned() else {
                        warn!(path = %path.display(), "region file has no `region` variable; skipping");
                        continue;
                    };
                    if region.replace('-', "") != region_stem {
                        warn!(path = %path.display(), %region, "`region` variable does not match the file name; skipping");
                        continue;
                    }
                    snapshot
                        .stages
                        .entry(stage.to_string())
                        .or_default()
                        .regions
                        .insert(region, variables);
                }
            }
        }

        Ok(snapshot)
    }

    async fn write_project(&self, name: &str) -> Result<(), StateError> {
        self.write_json(
            &self.project_directory.join(PROJECT_FILE),
            &ProjectFile {
                name: name.to_string(),
            },
        )
    }

    async fn write_variables(
        &self,
        level: &Level,
        variables: &Variables,
    ) -> Result<(), StateError> {
        self.write_json(&self.variables_path(level), variables)
    }

    async fn delete_variables(&self, level: &Level) -> Result<(), StateError> {
        let path = self.variables_path(level);
        debug!(path = %path.display(), "removing state file");
        Ok(self.fs.remove_file(&path)?)
    }
}
