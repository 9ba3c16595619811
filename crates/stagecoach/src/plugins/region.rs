use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::{
    action::{
        Action, ActionError, CliMetadata, CliOption, Context, Dispatcher, Handler, Plugin,
        RegistryBuilder,
    },
    provider::{Operation, ResourceKind, ResourceRequest},
    router::{REGION_OPTION, STAGE_OPTION},
    state::Level,
};

use super::common::{Services, ignore_not_found, region_option, required, stage_option};

pub const REGION_CREATE: &str = "regionCreate";
pub const REGION_REMOVE: &str = "regionRemove";

/// Skip provisioning the region's resource stack
pub const NO_EXE_CF_OPTION: &str = "noExeCf";

/// Region variable holding the role functions run under
pub const IAM_ROLE_VARIABLE: &str = "iamRoleArnLambda";

pub(crate) fn stack_name(project: &str, stage: &str) -> String {
    format!("{project}-{stage}-r")
}

pub(crate) fn role_name(project: &str, stage: &str, region: &str) -> String {
    format!("{project}-{stage}-{region}-lambda")
}

/// `region create` and `region remove`
pub struct RegionPlugin {
    services: Services,
}

impl RegionPlugin {
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Plugin for RegionPlugin {
    fn name(&self) -> &str {
        "region"
    }

    async fn register_actions(&self, registry: &mut RegistryBuilder) -> Result<(), ActionError> {
        registry.register(
            Action::new(REGION_CREATE, Arc::new(CreateRegion(self.services.clone()))).with_cli(
                CliMetadata::new("region", "create", "Add a region to a stage")
                    .option(stage_option())
                    .option(region_option())
                    .option(CliOption::switch(
                        NO_EXE_CF_OPTION,
                        Some('c'),
                        "Don't create the region's resource stack",
                    )),
            ),
        )?;

        registry.register(
            Action::new(REGION_REMOVE, Arc::new(RemoveRegion(self.services.clone()))).with_cli(
                CliMetadata::new("region", "remove", "Remove a region from a stage")
                    .option(stage_option())
                    .option(region_option()),
            ),
        )
    }
}

struct CreateRegion(Services);

#[async_trait]
impl Handler for CreateRegion {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let Services {
            state, provider, ..
        } = &self.0;
        let stage = required(ctx.stage(), STAGE_OPTION)?.to_string();
        let region = required(ctx.region(), REGION_OPTION)?.to_string();

        state.create_region(&stage, &region).await?;
        let level = Level::region(&stage, &region);

        let mut role_arn = None;
        if !ctx.switch(NO_EXE_CF_OPTION) {
            let project = state.name().await;
            let stack = provider
                .apply(
                    ResourceRequest::new(
                        ResourceKind::Stack,
                        Operation::CreateOrUpdate,
                        &region,
                        &stack_name(&project, &stage),
                    )
                    .with_properties(json!({ "project": project, "stage": stage })),
                )
                .await?;
            let role = provider
                .apply(
                    ResourceRequest::new(
                        ResourceKind::Role,
                        Operation::CreateOrUpdate,
                        &region,
                        &role_name(&project, &stage, &region),
                    )
                    .with_properties(json!({ "stack": stack.id })),
                )
                .await?;
            state
                .set_variable(&level, IAM_ROLE_VARIABLE, &role.arn)
                .await?;
            role_arn = Some(role.arn);
        }

        state.save(&level).await?;
        info!(%stage, %region, "region created");
        ctx.set_output(json!({
            "stage": stage,
            "region": region,
            IAM_ROLE_VARIABLE: role_arn,
        }));
        Ok(())
    }
}

struct RemoveRegion(Services);

#[async_trait]
impl Handler for RemoveRegion {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let Services {
            state, provider, ..
        } = &self.0;
        let stage = required(ctx.stage(), STAGE_OPTION)?.to_string();
        let region = required(ctx.region(), REGION_OPTION)?.to_string();
        if !state.region_exists(&stage, &region).await {
            return Err(ActionError::validation(format!(
                "region '{region}' does not exist in stage '{stage}'"
            )));
        }

        let project = state.name().await;
        ignore_not_found(
            provider
                .apply(ResourceRequest::new(
                    ResourceKind::Role,
                    Operation::Delete,
                    &region,
                    &role_name(&project, &stage, &region),
                ))
                .await,
        )?;

        state.remove_region(&stage, &region).await?;
        info!(%stage, %region, "region removed");
        ctx.set_output(json!({ "stage": stage, "region": region }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::{action::PluginLoader, plugins::common::testing};

    async fn dispatcher(services: &Services) -> Dispatcher {
        let registry = PluginLoader::new()
            .with_plugin(RegionPlugin::new(services.clone()))
            .load()
            .await
            .unwrap();
        Dispatcher::new(registry)
    }

    #[tokio::test]
    async fn test_create_region_records_role() {
        let dir = tempdir().unwrap();
        let services = testing::services(dir.path(), &[]).await;
        services.state.create_stage("dev").await.unwrap();
        let dispatcher = dispatcher(&services).await;

        let mut ctx = Context::new().with_stage("dev").with_region("eu-west-1");
        dispatcher.dispatch(REGION_CREATE, &mut ctx).await.unwrap();

        let arn = services
            .state
            .resolve_variable(&Level::region("dev", "eu-west-1"), IAM_ROLE_VARIABLE)
            .await
            .unwrap();
        assert!(arn.starts_with("arn:local:role:eu-west-1:"));
        assert_eq!(ctx.output().unwrap()[IAM_ROLE_VARIABLE], json!(arn));
    }

    #[tokio::test]
    async fn test_no_exe_cf_skips_the_stack() {
        let dir = tempdir().unwrap();
        let services = testing::services(dir.path(), &[]).await;
        services.state.create_stage("dev").await.unwrap();
        let dispatcher = dispatcher(&services).await;

        let mut ctx = Context::new()
            .with_stage("dev")
            .with_region("eu-west-1")
            .with_option(NO_EXE_CF_OPTION, "true");
        dispatcher.dispatch(REGION_CREATE, &mut ctx).await.unwrap();

        let role = services
            .state
            .resolve_variable(&Level::region("dev", "eu-west-1"), IAM_ROLE_VARIABLE)
            .await;
        assert!(matches!(
            role,
            Err(crate::state::StateError::UndefinedVariable { .. })
        ));
        assert!(!dir.path().join(".stagecoach/resources/eu-west-1.json").exists());
    }

    #[tokio::test]
    async fn test_stack_failure_is_a_remote_error() {
        let dir = tempdir().unwrap();
        let services = testing::services(dir.path(), &["shop-dev-r"]).await;
        services.state.create_stage("dev").await.unwrap();
        let dispatcher = dispatcher(&services).await;

        let mut ctx = Context::new().with_stage("dev").with_region("eu-west-1");
        let result = dispatcher.dispatch(REGION_CREATE, &mut ctx).await;

        assert!(matches!(result, Err(ActionError::RemoteOperation { .. })));
    }

    #[tokio::test]
    async fn test_remove_region() {
        let dir = tempdir().unwrap();
        let services = testing::services(dir.path(), &[]).await;
        services.state.create_stage("dev").await.unwrap();
        let dispatcher = dispatcher(&services).await;
        let mut ctx = Context::new().with_stage("dev").with_region("eu-west-1");
        dispatcher.dispatch(REGION_CREATE, &mut ctx).await.unwrap();

        let mut ctx = Context::new().with_stage("dev").with_region("eu-west-1");
        dispatcher.dispatch(REGION_REMOVE, &mut ctx).await.unwrap();

        assert!(!services.state.region_exists("dev", "eu-west-1").await);
        let again = dispatcher.dispatch(REGION_REMOVE, &mut ctx).await;
        assert!(matches!(again, Err(ActionError::Validation(_))));
    }
}
