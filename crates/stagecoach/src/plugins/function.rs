use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::{
    action::{
        Action, ActionError, CliMetadata, CliParameter, Context, Dispatcher, Handler, Plugin,
        RegistryBuilder,
    },
    provider::{Operation, ResourceKind, ResourceRequest},
    state::Level,
};

use super::{
    common::{
        Services, deploy_items, ignore_not_found, region_option, stage_option, worker_level,
    },
    region::IAM_ROLE_VARIABLE,
};

pub const FUNCTION_DEPLOY: &str = "functionDeploy";
pub const CODE_DEPLOY_LAMBDA: &str = "codeDeployLambda";
pub const FUNCTION_REMOVE: &str = "functionRemove";
pub const CODE_REMOVE_LAMBDA: &str = "codeRemoveLambda";

pub(crate) fn function_name(project: &str, function: &str, stage: &str) -> String {
    format!("{project}-{function}-{stage}")
}

fn artifact_name(function: &str) -> String {
    format!("{function}.zip")
}

/// `function deploy`, `function remove` and their per-item workers
pub struct FunctionPlugin {
    services: Services,
}

impl FunctionPlugin {
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Plugin for FunctionPlugin {
    fn name(&self) -> &str {
        "function"
    }

    async fn register_actions(&self, registry: &mut RegistryBuilder) -> Result<(), ActionError> {
        registry.register(
            Action::new(FUNCTION_DEPLOY, Arc::new(DeployFunctions(self.services.clone()))).with_cli(
                CliMetadata::new("function", "deploy", "Deploy functions to every targeted region")
                    .option(stage_option())
                    .option(region_option())
                    .parameter(CliParameter::new("names", 0, "Functions to deploy").variadic()),
            ),
        )?;

        registry.register(Action::new(
            CODE_DEPLOY_LAMBDA,
            Arc::new(DeployCode(self.services.clone())),
        ))?;

        registry.register(
            Action::new(FUNCTION_REMOVE, Arc::new(RemoveFunctions(self.services.clone()))).with_cli(
                CliMetadata::new("function", "remove", "Remove functions from every targeted region")
                    .option(stage_option())
                    .option(region_option())
                    .parameter(CliParameter::new("names", 0, "Functions to remove").variadic()),
            ),
        )?;

        registry.register(Action::new(
            CODE_REMOVE_LAMBDA,
            Arc::new(RemoveCode(self.services.clone())),
        ))
    }
}

struct DeployFunctions(Services);

#[async_trait]
impl Handler for DeployFunctions {
    async fn handle(&self, dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let names = ctx.params().to_vec();
        deploy_items(&self.0, dispatcher, ctx, CODE_DEPLOY_LAMBDA, names).await
    }
}

struct DeployCode(Services);

#[async_trait]
impl Handler for DeployCode {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let Services {
            state, provider, ..
        } = &self.0;
        let (stage, region, function) = worker_level(ctx)?;

        let role = state
            .resolve_variable(&Level::region(&stage, &region), IAM_ROLE_VARIABLE)
            .await?;
        let project = state.name().await;
        let name = function_name(&project, &function, &stage);

        let artifact = provider
            .apply(
                ResourceRequest::new(
                    ResourceKind::Artifact,
                    Operation::CreateOrUpdate,
                    &region,
                    &artifact_name(&name),
                )
                .with_properties(json!({ "function": function })),
            )
            .await?;
        let deployed = provider
            .apply(
                ResourceRequest::new(
                    ResourceKind::Function,
                    Operation::CreateOrUpdate,
                    &region,
                    &name,
                )
                .with_properties(json!({ "role": role, "artifact": artifact.id })),
            )
            .await?;

        info!(%region, function = %name, "function deployed");
        ctx.set_output(json!({
            "name": name,
            "arn": deployed.arn,
            "artifact": artifact.id,
        }));
        Ok(())
    }
}

struct RemoveFunctions(Services);

#[async_trait]
impl Handler for RemoveFunctions {
    async fn handle(&self, dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let names = ctx.params().to_vec();
        deploy_items(&self.0, dispatcher, ctx, CODE_REMOVE_LAMBDA, names).await
    }
}

/// Deletes a function and its uploaded artifact; either may already be gone
struct RemoveCode(Services);

#[async_trait]
impl Handler for RemoveCode {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let Services {
            state, provider, ..
        } = &self.0;
        let (stage, region, function) = worker_level(ctx)?;
        let name = function_name(&state.name().await, &function, &stage);

        let removed = ignore_not_found(
            provider
                .apply(ResourceRequest::new(
                    ResourceKind::Function,
                    Operation::Delete,
                    &region,
                    &name,
                ))
                .await,
        )?;
        ignore_not_found(
            provider
                .apply(ResourceRequest::new(
                    ResourceKind::Artifact,
                    Operation::Delete,
                    &region,
                    &artifact_name(&name),
                ))
                .await,
        )?;

        info!(%region, function = %name, existed = removed.is_some(), "function removed");
        ctx.set_output(json!({
            "name": name,
            "removed": removed.is_some(),
        }));
        Ok(())
    }
}
