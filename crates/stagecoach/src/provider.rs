//! Port for the remote cloud provider
//!
//! Deployment actions describe the resources they need as
//! [`ResourceRequest`]s; what the provider does with them is opaque to the
//! engine. [`LocalProvider`] is the bundled adapter.

pub mod local;

pub use self::local::{FAIL_RESOURCES_ENV, LocalProvider};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::action::ActionError;

/// Error code for a resource that does not exist
pub const NOT_FOUND: &str = "NotFound";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    /// Per-region stack holding shared resources such as the function role
    Stack,
    /// Execution role functions in a region run under
    Role,
    Artifact,
    Function,
    RestApi,
    Method,
    EventSourceMapping,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stack => "stack",
            Self::Role => "role",
            Self::Artifact => "artifact",
            Self::Function => "function",
            Self::RestApi => "restApi",
            Self::Method => "method",
            Self::EventSourceMapping => "eventSourceMapping",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Create the resource, or update it in place if it exists
    CreateOrUpdate,
    /// Return the resource if it exists, failing with [`NOT_FOUND`] otherwise
    Find,
    Delete,
}

/// One resource operation in one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub kind: ResourceKind,
    pub operation: Operation,
    pub region: String,
    pub name: String,
    pub properties: Value,
}

impl ResourceRequest {
    #[must_use]
    pub fn new(kind: ResourceKind, operation: Operation, region: &str, name: &str) -> Self {
        Self {
            kind,
            operation,
            region: region.to_string(),
            name: name.to_string(),
            properties: Value::Null,
        }
    }

    #[must_use]
    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }
}

/// What the provider reports back about a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceOutput {
    pub id: String,
    pub arn: String,
    pub attributes: Value,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.code == NOT_FOUND
    }
}

impl From<ProviderError> for ActionError {
    fn from(error: ProviderError) -> Self {
        Self::RemoteOperation {
            code: error.code,
            message: error.message,
        }
    }
}

/// Port for remote resource operations
#[cfg_attr(any(test, feature = "with_mocks"), mockall::automock)]
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Apply one resource operation
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] with the provider's error code when the
    /// operation is rejected or fails.
    async fn apply(&self, request: ResourceRequest) -> Result<ResourceOutput, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_keeps_code() {
        let error: ActionError = ProviderError::new("Throttling", "rate exceeded").into();

        assert!(matches!(
            error,
            ActionError::RemoteOperation { ref code, .. } if code == "Throttling"
        ));
        assert_eq!(error.exit_code(), 5);
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = ResourceRequest::new(
            ResourceKind::EventSourceMapping,
            Operation::CreateOrUpdate,
            "us-east-1",
            "orders",
        );

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["kind"], "eventSourceMapping");
        assert_eq!(json["operation"], "createOrUpdate");
    }
}
