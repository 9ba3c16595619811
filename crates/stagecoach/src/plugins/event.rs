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
};

use super::{
    common::{
        Services, deploy_items, ignore_not_found, region_option, stage_option, worker_level,
    },
    function::function_name,
};

pub const EVENT_DEPLOY: &str = "eventDeploy";
pub const EVENT_DEPLOY_LAMBDA: &str = "eventDeployLambda";
pub const EVENT_REMOVE: &str = "eventRemove";
pub const EVENT_REMOVE_LAMBDA: &str = "eventRemoveLambda";

const SOURCE_SEPARATOR: char = '~';

/// Deployed function name and event source named by `item`
async fn event_target(services: &Services, stage: &str, item: &str) -> (String, String) {
    let (function, source) = match item.split_once(SOURCE_SEPARATOR) {
        Some((function, source)) => (function, Some(source.to_string())),
        None => (item, None),
    };
    let name = function_name(&services.state.name().await, function, stage);
    let source = source.unwrap_or_else(|| format!("{name}-events"));
    (name, source)
}

/// `event deploy`, `event remove` and their per-item workers
///
/// Items are function names, optionally followed by `~<source>`. Without a
/// source the function is wired to `<function resource>-events`.
pub struct EventPlugin {
    services: Services,
}

impl EventPlugin {
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Plugin for EventPlugin {
    fn name(&self) -> &str {
        "event"
    }

    async fn register_actions(&self, registry: &mut RegistryBuilder) -> Result<(), ActionError> {
        registry.register(
            Action::new(EVENT_DEPLOY, Arc::new(DeployEvents(self.services.clone()))).with_cli(
                CliMetadata::new("event", "deploy", "Connect event sources to deployed functions")
                    .option(stage_option())
                    .option(region_option())
                    .parameter(
                        CliParameter::new("names", 0, "Functions as name or name~source")
                            .variadic(),
                    ),
            ),
        )?;

        registry.register(Action::new(
            EVENT_DEPLOY_LAMBDA,
            Arc::new(DeployEventSource(self.services.clone())),
        ))?;

        registry.register(
            Action::new(EVENT_REMOVE, Arc::new(RemoveEvents(self.services.clone()))).with_cli(
                CliMetadata::new("event", "remove", "Disconnect event sources from functions")
                    .option(stage_option())
                    .option(region_option())
                    .parameter(
                        CliParameter::new("names", 0, "Functions as name or name~source")
                            .variadic(),
                    ),
            ),
        )?;

        registry.register(Action::new(
            EVENT_REMOVE_LAMBDA,
            Arc::new(RemoveEventSource(self.services.clone())),
        ))
    }
}

struct DeployEvents(Services);

#[async_trait]
impl Handler for DeployEvents {
    async fn handle(&self, dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let names = ctx.params().to_vec();
        deploy_items(&self.0, dispatcher, ctx, EVENT_DEPLOY_LAMBDA, names).await
    }
}

struct DeployEventSource(Services);

#[async_trait]
impl Handler for DeployEventSource {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let provider = &self.0.provider;
        let (stage, region, item) = worker_level(ctx)?;
        let (name, source) = event_target(&self.0, &stage, &item).await;

        let target = provider
            .apply(ResourceRequest::new(
                ResourceKind::Function,
                Operation::Find,
                &region,
                &name,
            ))
            .await?;
        let mapping = provider
            .apply(
                ResourceRequest::new(
                    ResourceKind::EventSourceMapping,
                    Operation::CreateOrUpdate,
                    &region,
                    &format!("{name}/{source}"),
                )
                .with_properties(json!({ "functionArn": target.arn, "source": source })),
            )
            .await?;

        info!(%region, function = %name, %source, "event source connected");
        ctx.set_output(json!({
            "function": name,
            "source": source,
            "uuid": mapping.id,
        }));
        Ok(())
    }
}

struct RemoveEvents(Services);

#[async_trait]
impl Handler for RemoveEvents {
    async fn handle(&self, dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let names = ctx.params().to_vec();
        deploy_items(&self.0, dispatcher, ctx, EVENT_REMOVE_LAMBDA, names).await
    }
}

struct RemoveEventSource(Services);

#[async_trait]
impl Handler for RemoveEventSource {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let (stage, region, item) = worker_level(ctx)?;
        let (name, source) = event_target(&self.0, &stage, &item).await;

        let removed = ignore_not_found(
            self.0
                .provider
                .apply(ResourceRequest::new(
                    ResourceKind::EventSourceMapping,
                    Operation::Delete,
                    &region,
                    &format!("{name}/{source}"),
                ))
                .await,
        )?;

        info!(%region, function = %name, %source, "event source disconnected");
        ctx.set_output(json!({
            "function": name,
            "source": source,
            "removed": removed.is_some(),
        }));
        Ok(())
    }
}
