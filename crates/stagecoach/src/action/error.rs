use std::{collections::BTreeMap, error::Error as _};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::StateError;

/// One item that failed during a deployment fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub item: String,
    pub message: String,
    pub causes: Vec<String>,
}

impl FailedItem {
    /// Capture `error` for `item`, flattening its source chain into `causes`
    #[must_use]
    pub fn from_error(item: &str, error: &ActionError) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            item: item.to_string(),
            message: error.to_string(),
            causes,
        }
    }
}

/// Every way an action dispatch can fail
///
/// Each variant family maps to a distinct process exit code via
/// [`ActionError::exit_code`].
#[derive(Error, Debug, Clone)]
pub enum ActionError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Action already registered: {0}")]
    DuplicateAction(String),

    #[error("No command matches '{context} {context_action}' ({matches} candidates)")]
    NoMatchingAction {
        context: String,
        context_action: String,
        matches: usize,
    },

    #[error("Variable '{key}' is not defined for {level}")]
    UndefinedVariable { key: String, level: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Remote operation failed [{code}]: {message}")]
    RemoteOperation { code: String, message: String },

    #[error("Deployment failed for {} item(s) in {} region(s)", count_items(.failed), .failed.len())]
    PartialDeployment {
        failed: BTreeMap<String, Vec<FailedItem>>,
    },

    #[error("Action '{action}' exceeded the maximum dispatch depth of {depth}")]
    RecursionLimit { action: String, depth: usize },

    #[error("Failed to persist project state")]
    Persistence(#[source] StateError),

    #[error("Hook `{command}` for {action} failed: {reason}")]
    Hook {
        action: String,
        command: String,
        reason: String,
    },
}

fn count_items(failed: &BTreeMap<String, Vec<FailedItem>>) -> usize {
    failed.values().map(Vec::len).sum()
}

impl ActionError {
    /// Process exit code for this error family
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PartialDeployment { .. } => 1,
            Self::Validation(_) | Self::NoMatchingAction { .. } => 2,
            Self::UnknownAction(_) | Self::DuplicateAction(_) | Self::RecursionLimit { .. } => 3,
            Self::UndefinedVariable { .. } => 4,
            Self::RemoteOperation { .. } => 5,
            Self::Persistence(_) => 6,
            Self::Hook { .. } => 7,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<StateError> for ActionError {
    fn from(error: StateError) -> Self {
        match error {
            StateError::Validation(message) => Self::Validation(message),
            StateError::UnknownStage(stage) => {
                Self::Validation(format!("stage '{stage}' does not exist"))
            }
            StateError::UnknownRegion { stage, region } => Self::Validation(format!(
                "region '{region}' does not exist in stage '{stage}'"
            )),
            StateError::UndefinedVariable { key, level } => Self::UndefinedVariable {
                key,
                level: level.to_string(),
            },
            other @ (StateError::FileSystem(_) | StateError::Serialization(_)) => {
                Self::Persistence(other)
            }
        }
    }
}
