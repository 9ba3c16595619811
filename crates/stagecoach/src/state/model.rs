//! Plain data making up a project's stage/region tree

use std::{collections::BTreeMap, fmt, sync::Arc};

use tokio::sync::Mutex;

/// String variables owned by one level of the tree
pub type Variables = BTreeMap<String, String>;

/// Variable every stage carries with its own name
pub const STAGE_VARIABLE: &str = "stage";

/// Variable every region carries with its own name
pub const REGION_VARIABLE: &str = "region";

/// Name under which project-wide variables are stored; no stage may take it
pub const PROJECT_VARIABLES_NAME: &str = "common";

/// Addresses one level of the project tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Project,
    Stage { stage: String },
    Region { stage: String, region: String },
}

impl Level {
    #[must_use]
    pub fn project() -> Self {
        Self::Project
    }

    #[must_use]
    pub fn stage(stage: &str) -> Self {
        Self::Stage {
            stage: stage.to_string(),
        }
    }

    #[must_use]
    pub fn region(stage: &str, region: &str) -> Self {
        Self::Region {
            stage: stage.to_string(),
            region: region.to_string(),
        }
    }

    /// The narrowest level described by an optional stage and region
    #[must_use]
    pub fn from_parts(stage: Option<&str>, region: Option<&str>) -> Self {
        match (stage, region) {
            (Some(stage), Some(region)) => Self::region(stage, region),
            (Some(stage), None) => Self::stage(stage),
            (None, _) => Self::Project,
        }
    }

    /// The next level out, where variable lookups fall back to
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Project => None,
            Self::Stage { .. } => Some(Self::Project),
            Self::Region { stage, .. } => Some(Self::stage(stage)),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => f.write_str("project"),
            Self::Stage { stage } => write!(f, "stage '{stage}'"),
            Self::Region { stage, region } => write!(f, "region '{region}' of stage '{stage}'"),
        }
    }
}

/// A project as read from or written to storage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSnapshot {
    pub name: String,
    pub variables: Variables,
    pub stages: BTreeMap<String, StageSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSnapshot {
    pub variables: Variables,
    pub regions: BTreeMap<String, Variables>,
}

/// Live project tree
#[derive(Debug, Default)]
pub(crate) struct Project {
    pub(crate) name: String,
    pub(crate) variables: Variables,
    pub(crate) stages: BTreeMap<String, Stage>,
}

#[derive(Debug, Default)]
pub(crate) struct Stage {
    pub(crate) variables: Variables,
    pub(crate) regions: BTreeMap<String, Region>,
}

/// Region variables sit behind their own lock so concurrent workers in one
/// region serialize their writes without blocking other regions.
#[derive(Debug, Clone, Default)]
pub(crate) struct Region {
    pub(crate) variables: Arc<Mutex<Variables>>,
}

impl Region {
    pub(crate) fn new(variables: Variables) -> Self {
        Self {
            variables: Arc::new(Mutex::new(variables)),
        }
    }
}

impl From<ProjectSnapshot> for Project {
    fn from(snapshot: ProjectSnapshot) -> Self {
        Self {
            name: snapshot.name,
            variables: snapshot.variables,
            stages: snapshot
                .stages
                .into_iter()
                .map(|(name, stage)| {
                    let regions = stage
                        .regions
                        .into_iter()
                        .map(|(region, variables)| (region, Region::new(variables)))
                        .collect();
                    (
                        name,
                        Stage {
                            variables: stage.variables,
                            regions,
                        },
                    )
                })
                .collect(),
        }
    }
}
