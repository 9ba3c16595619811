use std::{
    collections::{BTreeMap, BTreeSet},
    path::PathBuf,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::fs::FileSystem;

use super::{
    CloudProvider, NOT_FOUND, Operation, ProviderError, ResourceKind, ResourceOutput,
    ResourceRequest,
};

/// Comma-separated resource names the local provider refuses to deploy
pub const FAIL_RESOURCES_ENV: &str = "STAGECOACH_FAIL_RESOURCES";

const LEDGER_DIR: [&str; 2] = [".stagecoach", "resources"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LedgerEntry {
    kind: ResourceKind,
    name: String,
    id: String,
    arn: String,
    properties: Value,
}

impl From<&LedgerEntry> for ResourceOutput {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.clone(),
            arn: entry.arn.clone(),
            attributes: entry.properties.clone(),
        }
    }
}

/// Provider that records resources in JSON ledgers inside the project
///
/// Resources live in `<project>/.stagecoach/resources/<region>.json`, keyed by
/// kind and name. Ids are random; ARNs look like
/// `arn:local:<kind>:<region>:<name>`.
pub struct LocalProvider<F: FileSystem> {
    fs: F,
    project_directory: PathBuf,
    failing: BTreeSet<String>,
    ledger_lock: Mutex<()>,
}

impl<F: FileSystem> LocalProvider<F> {
    /// Create a provider, reading injected failures from
    /// [`FAIL_RESOURCES_ENV`]
    pub fn new(fs: F, project_directory: impl Into<PathBuf>) -> Self {
        let failing = std::env::var(FAIL_RESOURCES_ENV)
            .map(|names| {
                names
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            fs,
            project_directory: project_directory.into(),
            failing,
            ledger_lock: Mutex::new(()),
        }
    }

    /// Fail every request for these resource names
    #[must_use]
    pub fn with_failures<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing.extend(names.into_iter().map(Into::into));
        self
    }

    /// Ledger file for `region`
    #[must_use]
    pub fn ledger_path(&self, region: &str) -> PathBuf {
        LEDGER_DIR
            .iter()
            .fold(self.project_directory.clone(), |path, part| path.join(part))
            .join(format!("{region}.json"))
    }

    fn read_ledger(&self, region: &str) -> Result<BTreeMap<String, LedgerEntry>, ProviderError> {
        let path = self.ledger_path(region);
        if !self.fs.path_exists(&path) {
            return Ok(BTreeMap::new());
        }

        let contents = self.fs.read_file(&path).map_err(storage_error)?;
        serde_json::from_str(&contents).map_err(|e| ProviderError::new("CorruptLedger", e.to_string()))
    }

    fn write_ledger(
        &self,
        region: &str,
        ledger: &BTreeMap<String, LedgerEntry>,
    ) -> Result<(), ProviderError> {
        let mut bytes = serde_json::to_vec_pretty(ledger)
            .map_err(|e| ProviderError::new("CorruptLedger", e.to_string()))?;
        bytes.push(b'\n');
        self.fs
            .write_file(&self.ledger_path(region), &bytes)
            .map_err(storage_error)
    }
}

fn storage_error(error: impl std::fmt::Display) -> ProviderError {
    ProviderError::new("StorageUnavailable", error.to_string())
}

fn ledger_key(kind: ResourceKind, name: &str) -> String {
    format!("{kind}/{name}")
}

#[async_trait]
impl<F: FileSystem> CloudProvider for LocalProvider<F> {
    async fn apply(&self, request: ResourceRequest) -> Result<ResourceOutput, ProviderError> {
        debug!(kind = %request.kind, operation = ?request.operation, region = %request.region, name = %request.name, "applying resource");

        if self.failing.contains(&request.name) {
            warn!(name = %request.name, "failing resource on request");
            return Err(ProviderError::new(
                "InjectedFailure",
                format!("{} '{}' was configured to fail", request.kind, request.name),
            ));
        }

        let _guard = self.ledger_lock.lock().await;
        let mut ledger = self.read_ledger(&request.region)?;
        let key = ledger_key(request.kind, &request.name);
        let not_found = || {
            ProviderError::new(
                NOT_FOUND,
                format!(
                    "{} '{}' does not exist in {}",
                    request.kind, request.name, request.region
                ),
            )
        };

        match request.operation {
            Operation::Find => ledger.get(&key).map(ResourceOutput::from).ok_or_else(not_found),
            Operation::Delete => {
                let removed = ledger.remove(&key).ok_or_else(not_found)?;
                self.write_ledger(&request.region, &ledger)?;
                Ok(ResourceOutput::from(&removed))
            }
            Operation::CreateOrUpdate => {
                let entry = ledger.entry(key).or_insert_with(|| LedgerEntry {
                    kind: request.kind,
                    name: request.name.clone(),
                    id: Uuid::new_v4().simple().to_string(),
                    arn: format!("arn:local:{}:{}:{}", request.kind, request.region, request.name),
                    properties: Value::Null,
                });
                entry.properties = request.properties.clone();
                let output = ResourceOutput::from(&*entry);
                self.write_ledger(&request.region, &ledger)?;
                Ok(output)
            }
        }
    }
}
