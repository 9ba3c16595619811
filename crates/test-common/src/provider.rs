//! A cloud provider double that answers from a script and records every
//! request.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde_json::Value;
use stagecoach::provider::{
    CloudProvider, NOT_FOUND, Operation, ProviderError, ResourceKind, ResourceOutput,
    ResourceRequest,
};
use tokio::sync::Mutex;

/// Deterministic in-memory provider
///
/// Resources get `id = "<kind>-<name>"` and
/// `arn = "arn:test:<kind>:<region>:<name>"`. Names registered with
/// [`fail`](Self::fail) or [`fail_in`](Self::fail_in) are rejected with the
/// given error code.
#[derive(Default)]
pub struct ScriptedProvider {
    /// (region, name) → code; a `None` region matches every region
    failures: BTreeMap<(Option<String>, String), String>,
    existing: Mutex<BTreeSet<(String, ResourceKind, String)>>,
    requests: Mutex<Vec<ResourceRequest>>,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every request for `name` with `code`
    #[must_use]
    pub fn fail(mut self, name: &str, code: &str) -> Self {
        self.failures
            .insert((None, name.to_string()), code.to_string());
        self
    }

    /// Reject requests for `name` in `region` only
    #[must_use]
    pub fn fail_in(mut self, region: &str, name: &str, code: &str) -> Self {
        self.failures.insert(
            (Some(region.to_string()), name.to_string()),
            code.to_string(),
        );
        self
    }

    fn failure_for(&self, request: &ResourceRequest) -> Option<&String> {
        self.failures
            .get(&(Some(request.region.clone()), request.name.clone()))
            .or_else(|| self.failures.get(&(None, request.name.clone())))
    }

    /// Everything applied so far, in arrival order
    pub async fn requests(&self) -> Vec<ResourceRequest> {
        self.requests.lock().await.clone()
    }

    /// Names of the resources of `kind` requested so far
    pub async fn names(&self, kind: ResourceKind) -> Vec<String> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.name.clone())
            .collect()
    }
}

fn output(request: &ResourceRequest) -> ResourceOutput {
    ResourceOutput {
        id: format!("{}-{}", request.kind, request.name),
        arn: format!(
            "arn:test:{}:{}:{}",
            request.kind, request.region, request.name
        ),
        attributes: request.properties.clone(),
    }
}

#[async_trait]
impl CloudProvider for ScriptedProvider {
    async fn apply(&self, request: ResourceRequest) -> Result<ResourceOutput, ProviderError> {
        self.requests.lock().await.push(request.clone());

        if let Some(code) = self.failure_for(&request) {
            return Err(ProviderError::new(
                code.clone(),
                format!("scripted failure for {}", request.name),
            ));
        }

        let key = (request.region.clone(), request.kind, request.name.clone());
        let mut existing = self.existing.lock().await;
        match request.operation {
            Operation::CreateOrUpdate => {
                existing.insert(key);
                Ok(output(&request))
            }
            Operation::Find if existing.contains(&key) => Ok(output(&request)),
            Operation::Delete if existing.remove(&key) => Ok(ResourceOutput {
                attributes: Value::Null,
                ..output(&request)
            }),
            Operation::Find | Operation::Delete => Err(ProviderError::new(
                NOT_FOUND,
                format!("{} '{}' does not exist", request.kind, request.name),
            )),
        }
    }
}
