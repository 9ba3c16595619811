use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::{
    action::{
        Action, ActionError, CliMetadata, CliParameter, Context, Dispatcher, Handler, Plugin,
        RegistryBuilder,
    },
    provider::{Operation, ResourceKind, ResourceRequest},
};

use super::common::{
    Services, deploy_items, ignore_not_found, region_option, stage_option, worker_level,
};

pub const ENDPOINT_DEPLOY: &str = "endpointDeploy";
pub const ENDPOINT_BUILD_API_GATEWAY: &str = "endpointBuildApiGateway";
pub const ENDPOINT_REMOVE: &str = "endpointRemove";
pub const ENDPOINT_REMOVE_API_GATEWAY: &str = "endpointRemoveApiGateway";

/// Region variable holding the REST API every endpoint of the region hangs off
pub const REST_API_VARIABLE: &str = "restApiId";

const METHOD_SEPARATOR: char = '~';
const DEFAULT_METHOD: &str = "GET";
const METHODS: [&str; 8] = ["ANY", "DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"];

/// An endpoint item: `users/list` or `users/list~POST`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub path: String,
    pub method: String,
}

impl Endpoint {
    pub(crate) fn parse(item: &str) -> Result<Self, ActionError> {
        let (path, method) = item
            .split_once(METHOD_SEPARATOR)
            .unwrap_or((item, DEFAULT_METHOD));
        let path = path.trim_matches('/');
        let method = method.to_ascii_uppercase();

        if path.is_empty() {
            return Err(ActionError::validation(format!(
                "endpoint '{item}' has an empty path"
            )));
        }
        if !METHODS.contains(&method.as_str()) {
            return Err(ActionError::validation(format!(
                "endpoint '{item}' has an unsupported method '{method}'"
            )));
        }

        Ok(Self {
            path: path.to_string(),
            method,
        })
    }

    /// Provider name of the method resource under `api_name`
    fn resource_name(&self, api_name: &str) -> String {
        format!("{api_name}/{}/{}", self.method, self.path)
    }
}

fn api_name(project: &str, stage: &str) -> String {
    format!("{project}-{stage}")
}

/// Parse every item so a malformed one fails before any region is touched
fn check_endpoints(paths: &[String]) -> Result<(), ActionError> {
    paths.iter().try_for_each(|path| Endpoint::parse(path).map(|_| ()))
}

/// `endpoint deploy`, `endpoint remove` and their per-item workers
pub struct EndpointPlugin {
    services: Services,
}

impl EndpointPlugin {
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Plugin for EndpointPlugin {
    fn name(&self) -> &str {
        "endpoint"
    }

    async fn register_actions(&self, registry: &mut RegistryBuilder) -> Result<(), ActionError> {
        registry.register(
            Action::new(ENDPOINT_DEPLOY, Arc::new(DeployEndpoints(self.services.clone()))).with_cli(
                CliMetadata::new("endpoint", "deploy", "Deploy endpoints to every targeted region")
                    .option(stage_option())
                    .option(region_option())
                    .parameter(
                        CliParameter::new("paths", 0, "Endpoints as path or path~METHOD")
                            .variadic(),
                    ),
            ),
        )?;

        registry.register(Action::new(
            ENDPOINT_BUILD_API_GATEWAY,
            Arc::new(BuildEndpoint(self.services.clone())),
        ))?;

        registry.register(
            Action::new(ENDPOINT_REMOVE, Arc::new(RemoveEndpoints(self.services.clone()))).with_cli(
                CliMetadata::new("endpoint", "remove", "Remove endpoints from every targeted region")
                    .option(stage_option())
                    .option(region_option())
                    .parameter(
                        CliParameter::new("paths", 0, "Endpoints as path or path~METHOD")
                            .variadic(),
                    ),
            ),
        )?;

        registry.register(Action::new(
            ENDPOINT_REMOVE_API_GATEWAY,
            Arc::new(RemoveEndpoint(self.services.clone())),
        ))
    }
}

struct DeployEndpoints(Services);

#[async_trait]
impl Handler for DeployEndpoints {
    async fn handle(&self, dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let paths = ctx.params().to_vec();
        check_endpoints(&paths)?;
        deploy_items(&self.0, dispatcher, ctx, ENDPOINT_BUILD_API_GATEWAY, paths).await
    }
}

struct BuildEndpoint(Services);

#[async_trait]
impl Handler for BuildEndpoint {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let Services {
            state, provider, ..
        } = &self.0;
        let (stage, region, item) = worker_level(ctx)?;
        let endpoint = Endpoint::parse(&item)?;
        let api_name = api_name(&state.name().await, &stage);

        let variables = state.region_variables(&stage, &region).await?;
        let api_id = {
            let mut variables = variables.lock().await;
            if let Some(id) = variables.get(REST_API_VARIABLE) {
                id.clone()
            } else {
                let api = provider
                    .apply(ResourceRequest::new(
                        ResourceKind::RestApi,
                        Operation::CreateOrUpdate,
                        &region,
                        &api_name,
                    ))
                    .await?;
                debug!(%region, id = %api.id, "created rest api");
                variables.insert(REST_API_VARIABLE.to_string(), api.id.clone());
                api.id
            }
        };

        provider
            .apply(
                ResourceRequest::new(
                    ResourceKind::Method,
                    Operation::CreateOrUpdate,
                    &region,
                    &endpoint.resource_name(&api_name),
                )
                .with_properties(json!({ "restApiId": api_id })),
            )
            .await?;

        let url = format!(
            "https://{api_id}.execute-api.{region}.amazonaws.com/{stage}/{}",
            endpoint.path
        );
        info!(%region, %url, method = %endpoint.method, "endpoint deployed");
        ctx.set_output(json!({
            "path": endpoint.path,
            "method": endpoint.method,
            "url": url,
        }));
        Ok(())
    }
}

struct RemoveEndpoints(Services);

#[async_trait]
impl Handler for RemoveEndpoints {
    async fn handle(&self, dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let paths = ctx.params().to_vec();
        check_endpoints(&paths)?;
        deploy_items(&self.0, dispatcher, ctx, ENDPOINT_REMOVE_API_GATEWAY, paths).await
    }
}

/// Deletes one method; the region's REST API stays for the remaining endpoints
struct RemoveEndpoint(Services);

#[async_trait]
impl Handler for RemoveEndpoint {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let Services {
            state, provider, ..
        } = &self.0;
        let (stage, region, item) = worker_level(ctx)?;
        let endpoint = Endpoint::parse(&item)?;
        let api_name = api_name(&state.name().await, &stage);

        let removed = ignore_not_found(
            provider
                .apply(ResourceRequest::new(
                    ResourceKind::Method,
                    Operation::Delete,
                    &region,
                    &endpoint.resource_name(&api_name),
                ))
                .await,
        )?;

        info!(%region, path = %endpoint.path, method = %endpoint.method, "endpoint removed");
        ctx.set_output(json!({
            "path": endpoint.path,
            "method": endpoint.method,
            "removed": removed.is_some(),
        }));
        Ok(())
    }
}
