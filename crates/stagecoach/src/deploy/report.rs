use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::{ActionError, FailedItem};

/// One item that deployed successfully
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployedItem {
    pub item: String,
    pub output: Value,
}

/// Consolidated outcome of a fan-out, grouped by region
///
/// Items appear in the order they were requested, not the order they
/// finished.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub deployed: BTreeMap<String, Vec<DeployedItem>>,
    pub failed: BTreeMap<String, Vec<FailedItem>>,
}

impl DeploymentReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.values().all(Vec::is_empty)
    }

    #[must_use]
    pub fn deployed_count(&self) -> usize {
        self.deployed.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed.values().map(Vec::len).sum()
    }

    pub(crate) fn record_success(&mut self, region: &str, item: &str, output: Value) {
        self.deployed
            .entry(region.to_string())
            .or_default()
            .push(DeployedItem {
                item: item.to_string(),
                output,
            });
    }

    pub(crate) fn record_failure(&mut self, region: &str, item: &str, error: &ActionError) {
        self.failed
            .entry(region.to_string())
            .or_default()
            .push(FailedItem::from_error(item, error));
    }

    /// Turn a report with failures into [`ActionError::PartialDeployment`]
    ///
    /// # Errors
    ///
    /// Fails when any region has failed items.
    pub fn into_result(self) -> Result<Self, ActionError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ActionError::PartialDeployment {
                failed: self.failed,
            })
        }
    }
}
