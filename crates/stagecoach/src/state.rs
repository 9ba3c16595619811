//! Hierarchical project state: Project → Stage → Region
//!
//! Each level owns a string→string variable map. Lookups fall back from a
//! region to its stage and then to the project. The tree is held behind a
//! [`tokio::sync::RwLock`] (structural changes take the write lock) and every
//! region's variables sit behind their own [`tokio::sync::Mutex`], so
//! concurrent deployment workers in one region serialize their writes.

pub mod model;
pub mod repository;

pub use self::{
    model::{
        Level, PROJECT_VARIABLES_NAME, ProjectSnapshot, REGION_VARIABLE, STAGE_VARIABLE,
        StageSnapshot, Variables,
    },
    repository::{JsonStateRepository, StateRepository},
};

#[cfg(any(test, feature = "with_mocks"))]
pub use self::repository::MockStateRepository;

use std::sync::{Arc, LazyLock};

use regex::Regex;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::fs::FileSystemError;

use self::model::{Project, Region, Stage};

static STAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+$").expect("stage name pattern is valid"));
static REGION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").expect("region name pattern is valid")
});

#[derive(Error, Debug, Clone)]
pub enum StateError {
    #[error("{0}")]
    Validation(String),

    #[error("Stage '{0}' does not exist")]
    UnknownStage(String),

    #[error("Region '{region}' does not exist in stage '{stage}'")]
    UnknownRegion { stage: String, region: String },

    #[error("Variable '{key}' is not defined for {level}")]
    UndefinedVariable { key: String, level: Level },

    #[error("State file access failed: {0}")]
    FileSystem(#[from] FileSystemError),

    #[error("State file is not valid JSON: {0}")]
    Serialization(Arc<serde_json::Error>),
}

impl From<serde_json::Error> for StateError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(Arc::new(error))
    }
}

/// Check a stage name before it is used as a key or a file name
///
/// # Errors
///
/// Returns [`StateError::Validation`] unless `stage` is lowercase letters and
/// digits only, or if it is the reserved [`PROJECT_VARIABLES_NAME`].
pub fn validate_stage_name(stage: &str) -> Result<(), StateError> {
    if stage == PROJECT_VARIABLES_NAME {
        return Err(StateError::Validation(format!(
            "invalid stage name '{stage}': the name is reserved for project variables"
        )));
    }
    if STAGE_NAME.is_match(stage) {
        Ok(())
    } else {
        Err(StateError::Validation(format!(
            "invalid stage name '{stage}': use lowercase letters and digits only"
        )))
    }
}

/// Check a region name such as `us-east-1`
///
/// # Errors
///
/// Returns [`StateError::Validation`] if `region` does not look like a cloud
/// region identifier.
pub fn validate_region_name(region: &str) -> Result<(), StateError> {
    if REGION_NAME.is_match(region) {
        Ok(())
    } else {
        Err(StateError::Validation(format!(
            "invalid region name '{region}': expected something like 'us-east-1'"
        )))
    }
}

/// Shared access to a project's stage/region tree and its persistence
pub struct ProjectState {
    repository: Arc<dyn StateRepository>,
    tree: RwLock<Project>,
}

impl ProjectState {
    /// Load the stored tree through `repository`
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if stored state cannot be read.
    pub async fn open(repository: Arc<dyn StateRepository>) -> Result<Self, StateError> {
        let snapshot = repository.load().await?;
        info!(project = %snapshot.name, stages = snapshot.stages.len(), "loaded project state");

        Ok(Self {
            repository,
            tree: RwLock::new(snapshot.into()),
        })
    }

    /// Re-read the tree from storage, discarding unsaved changes
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if stored state cannot be read.
    pub async fn load(&self) -> Result<(), StateError> {
        let snapshot = self.repository.load().await?;
        *self.tree.write().await = snapshot.into();
        Ok(())
    }

    pub async fn name(&self) -> String {
        self.tree.read().await.name.clone()
    }

    pub async fn stages(&self) -> Vec<String> {
        self.tree.read().await.stages.keys().cloned().collect()
    }

    /// Regions of `stage`, sorted by name
    ///
    /// # Errors
    ///
    /// Returns [`StateError::UnknownStage`] if `stage` does not exist.
    pub async fn regions(&self, stage: &str) -> Result<Vec<String>, StateError> {
        let tree = self.tree.read().await;
        let stage = lookup_stage(&tree, stage)?;
        Ok(stage.regions.keys().cloned().collect())
    }

    pub async fn stage_exists(&self, stage: &str) -> bool {
        self.tree.read().await.stages.contains_key(stage)
    }

    pub async fn region_exists(&self, stage: &str, region: &str) -> bool {
        self.tree
            .read()
            .await
            .stages
            .get(stage)
            .is_some_and(|s| s.regions.contains_key(region))
    }

    /// Add an empty stage carrying its own `stage` variable
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Validation`] for a malformed or existing name.
    pub async fn create_stage(&self, stage: &str) -> Result<(), StateError> {
        validate_stage_name(stage)?;

        let mut tree = self.tree.write().await;
        if tree.stages.contains_key(stage) {
            return Err(StateError::Validation(format!(
                "stage '{stage}' already exists"
            )));
        }

        let mut variables = Variables::new();
        variables.insert(STAGE_VARIABLE.to_string(), stage.to_string());
        tree.stages.insert(
            stage.to_string(),
            Stage {
                variables,
                ..Stage::default()
            },
        );
        debug!(stage, "created stage");
        Ok(())
    }

    /// Add a region to an existing stage, carrying its own `region` variable
    ///
    /// # Errors
    ///
    /// Returns [`StateError::UnknownStage`] if the stage is missing, or
    /// [`StateError::Validation`] for a malformed or existing region.
    pub async fn create_region(&self, stage: &str, region: &str) -> Result<(), StateError> {
        validate_region_name(region)?;

        let mut tree = self.tree.write().await;
        let stage_entry = tree
            .stages
            .get_mut(stage)
            .ok_or_else(|| StateError::UnknownStage(stage.to_string()))?;
        if stage_entry.regions.contains_key(region) {
            return Err(StateError::Validation(format!(
                "region '{region}' already exists in stage '{stage}'"
            )));
        }

        let mut variables = Variables::new();
        variables.insert(REGION_VARIABLE.to_string(), region.to_string());
        stage_entry
            .regions
            .insert(region.to_string(), Region::new(variables));
        debug!(stage, region, "created region");
        Ok(())
    }

    /// Forget a stage that was never saved, leaving storage untouched
    pub async fn discard_stage(&self, stage: &str) {
        if self.tree.write().await.stages.remove(stage).is_some() {
            debug!(stage, "discarded unsaved stage");
        }
    }

    /// Drop a stage and all of its regions, deleting their stored files
    ///
    /// Returns the regions that were removed with it.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::UnknownStage`] if `stage` does not exist, or the
    /// storage error if a file cannot be removed.
    pub async fn remove_stage(&self, stage: &str) -> Result<Vec<String>, StateError> {
        let removed = {
            let mut tree = self.tree.write().await;
            tree.stages
                .remove(stage)
                .ok_or_else(|| StateError::UnknownStage(stage.to_string()))?
        };

        let regions: Vec<String> = removed.regions.into_keys().collect();
        for region in &regions {
            self.repository
                .delete_variables(&Level::region(stage, region))
                .await?;
        }
        self.repository
            .delete_variables(&Level::stage(stage))
            .await?;

        info!(stage, regions = regions.len(), "removed stage");
        Ok(regions)
    }

    /// Drop one region and delete its stored file
    ///
    /// # Errors
    ///
    /// Returns [`StateError::UnknownStage`]/[`StateError::UnknownRegion`] if it
    /// does not exist, or the storage error if the file cannot be removed.
    pub async fn remove_region(&self, stage: &str, region: &str) -> Result<(), StateError> {
        {
            let mut tree = self.tree.write().await;
            let stage_entry = tree
                .stages
                .get_mut(stage)
                .ok_or_else(|| StateError::UnknownStage(stage.to_string()))?;
            stage_entry
                .regions
                .remove(region)
                .ok_or_else(|| StateError::UnknownRegion {
                    stage: stage.to_string(),
                    region: region.to_string(),
                })?;
        }

        self.repository
            .delete_variables(&Level::region(stage, region))
            .await?;
        info!(stage, region, "removed region");
        Ok(())
    }

    /// The lock guarding one region's variables
    ///
    /// Hold it across a read-check-write sequence (e.g. find-or-create) so
    /// concurrent workers in the same region see each other's writes.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::UnknownStage`]/[`StateError::UnknownRegion`] if it
    /// does not exist.
    pub async fn region_variables(
        &self,
        stage: &str,
        region: &str,
    ) -> Result<Arc<Mutex<Variables>>, StateError> {
        let tree = self.tree.read().await;
        let region = lookup_region(&tree, stage, region)?;
        Ok(Arc::clone(&region.variables))
    }

    /// Set `key` on exactly `level`
    ///
    /// The `stage` and `region` variables name their level and are read-only.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Validation`] for a read-only key, or an error if
    /// the level does not exist.
    pub async fn set_variable(&self, level: &Level, key: &str, value: &str) -> Result<(), StateError> {
        if key == STAGE_VARIABLE || key == REGION_VARIABLE {
            return Err(StateError::Validation(format!(
                "variable '{key}' is read-only"
            )));
        }

        match level {
            Level::Project => {
                self.tree
                    .write()
                    .await
                    .variables
                    .insert(key.to_string(), value.to_string());
            }
            Level::Stage { stage } => {
                let mut tree = self.tree.write().await;
                tree.stages
                    .get_mut(stage)
                    .ok_or_else(|| StateError::UnknownStage(stage.clone()))?
                    .variables
                    .insert(key.to_string(), value.to_string());
            }
            Level::Region { stage, region } => {
                let variables = self.region_variables(stage, region).await?;
                variables
                    .lock()
                    .await
                    .insert(key.to_string(), value.to_string());
            }
        }
        debug!(%level, key, "set variable");
        Ok(())
    }

    /// Look `key` up at `level`, falling back outwards to the project
    ///
    /// # Errors
    ///
    /// Returns [`StateError::UndefinedVariable`] if no level defines `key`, or
    /// an unknown stage/region error if `level` does not exist.
    pub async fn resolve_variable(&self, level: &Level, key: &str) -> Result<String, StateError> {
        let tree = self.tree.read().await;

        let mut current = Some(level.clone());
        while let Some(at) = current {
            let found = match &at {
                Level::Project => tree.variables.get(key).cloned(),
                Level::Stage { stage } => lookup_stage(&tree, stage)?.variables.get(key).cloned(),
                Level::Region { stage, region } => lookup_region(&tree, stage, region)?
                    .variables
                    .lock()
                    .await
                    .get(key)
                    .cloned(),
            };
            if let Some(value) = found {
                return Ok(value);
            }
            current = at.parent();
        }

        Err(StateError::UndefinedVariable {
            key: key.to_string(),
            level: level.clone(),
        })
    }

    /// Every variable visible from `level`, inner levels winning
    ///
    /// # Errors
    ///
    /// Returns an error if the level does not exist.
    pub async fn variables(&self, level: &Level) -> Result<Variables, StateError> {
        let tree = self.tree.read().await;

        let mut merged = tree.variables.clone();
        if let Level::Stage { stage } | Level::Region { stage, .. } = level {
            merged.extend(lookup_stage(&tree, stage)?.variables.clone());
        }
        if let Level::Region { stage, region } = level {
            let region = lookup_region(&tree, stage, region)?;
            merged.extend(region.variables.lock().await.clone());
        }

        Ok(merged)
    }

    /// Persist `level` and everything beneath it
    ///
    /// Saving unchanged state rewrites byte-identical files.
    ///
    /// # Errors
    ///
    /// Returns an error if the level does not exist or a write fails.
    pub async fn save(&self, level: &Level) -> Result<(), StateError> {
        let writes = {
            let tree = self.tree.read().await;
            let mut writes = Vec::new();

            match level {
                Level::Project => {
                    writes.push((Level::Project, tree.variables.clone()));
                    for (name, stage) in &tree.stages {
                        collect_stage(&mut writes, name, stage).await;
                    }
                }
                Level::Stage { stage } => {
                    collect_stage(&mut writes, stage, lookup_stage(&tree, stage)?).await;
                }
                Level::Region { stage, region } => {
                    let variables = lookup_region(&tree, stage, region)?
                        .variables
                        .lock()
                        .await
                        .clone();
                    writes.push((level.clone(), variables));
                }
            }

            if matches!(level, Level::Project) {
                self.repository.write_project(&tree.name).await?;
            }
            writes
        };

        for (at, variables) in &writes {
            self.repository.write_variables(at, variables).await?;
        }
        debug!(%level, files = writes.len(), "saved state");
        Ok(())
    }
}

async fn collect_stage(writes: &mut Vec<(Level, Variables)>, name: &str, stage: &Stage) {
    writes.push((Level::stage(name), stage.variables.clone()));
    for (region, entry) in &stage.regions {
        writes.push((
            Level::region(name, region),
            entry.variables.lock().await.clone(),
        ));
    }
}

fn lookup_stage<'a>(tree: &'a Project, stage: &str) -> Result<&'a Stage, StateError> {
    tree.stages
        .get(stage)
        .ok_or_else(|| StateError::UnknownStage(stage.to_string()))
}

fn lookup_region<'a>(
    tree: &'a Project,
    stage: &str,
    region: &str,
) -> Result<&'a Region, StateError> {
    lookup_stage(tree, stage)?
        .regions
        .get(region)
        .ok_or_else(|| StateError::UnknownRegion {
            stage: stage.to_string(),
            region: region.to_string(),
        })
}
