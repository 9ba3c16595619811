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
    state::{Level, validate_region_name, validate_stage_name},
};

use super::{
    common::{Services, ignore_not_found, region_option, required, stage_option},
    region::{NO_EXE_CF_OPTION, REGION_CREATE, role_name, stack_name},
};

pub const STAGE_CREATE: &str = "stageCreate";
pub const STAGE_REMOVE: &str = "stageRemove";

/// `stage create` and `stage remove`
pub struct StagePlugin {
    services: Services,
}

impl StagePlugin {
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Plugin for StagePlugin {
    fn name(&self) -> &str {
        "stage"
    }

    async fn register_actions(&self, registry: &mut RegistryBuilder) -> Result<(), ActionError> {
        registry.register(
            Action::new(STAGE_CREATE, Arc::new(CreateStage(self.services.clone()))).with_cli(
                CliMetadata::new("stage", "create", "Create a stage and its first region")
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
            Action::new(STAGE_REMOVE, Arc::new(RemoveStage(self.services.clone()))).with_cli(
                CliMetadata::new("stage", "remove", "Remove a stage and all of its regions")
                    .option(stage_option()),
            ),
        )
    }
}

struct CreateStage(Services);

#[async_trait]
impl Handler for CreateStage {
    async fn handle(&self, dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let state = &self.0.state;
        let stage = required(ctx.stage(), STAGE_OPTION)?.to_string();
        let region = required(ctx.region(), REGION_OPTION)?.to_string();

        // Both names are checked before anything is written
        validate_stage_name(&stage)?;
        validate_region_name(&region)?;

        state.create_stage(&stage).await?;
        if let Err(e) = dispatcher.dispatch(REGION_CREATE, ctx).await {
            state.discard_stage(&stage).await;
            return Err(e);
        }

        state.save(&Level::stage(&stage)).await?;
        info!(%stage, "stage created");
        Ok(())
    }
}

struct RemoveStage(Services);

#[async_trait]
impl Handler for RemoveStage {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let Services {
            state, provider, ..
        } = &self.0;
        let stage = required(ctx.stage(), STAGE_OPTION)?.to_string();
        let project = state.name().await;

        for region in state.regions(&stage).await? {
            for (kind, name) in [
                (ResourceKind::Role, role_name(&project, &stage, &region)),
                (ResourceKind::Stack, stack_name(&project, &stage)),
            ] {
                ignore_not_found(
                    provider
                        .apply(ResourceRequest::new(kind, Operation::Delete, &region, &name))
                        .await,
                )?;
            }
        }

        let regions = state.remove_stage(&stage).await?;
        info!(%stage, "stage removed");
        ctx.set_output(json!({ "stage": stage, "regions": regions }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::{
        action::PluginLoader,
        plugins::{common::testing, region::RegionPlugin},
    };

    async fn dispatcher(services: &Services) -> Dispatcher {
        let registry = PluginLoader::new()
            .with_plugin(StagePlugin::new(services.clone()))
            .with_plugin(RegionPlugin::new(services.clone()))
            .load()
            .await
            .unwrap();
        Dispatcher::new(registry)
    }

    #[tokio::test]
    async fn test_create_stage_creates_its_first_region() {
        let dir = tempdir().unwrap();
        let services = testing::services(dir.path(), &[]).await;
        let dispatcher = dispatcher(&services).await;

        let mut ctx = Context::new().with_stage("dev").with_region("us-east-1");
        dispatcher.dispatch(STAGE_CREATE, &mut ctx).await.unwrap();

        let state = &services.state;
        assert!(state.region_exists("dev", "us-east-1").await);
        assert_eq!(
            state
                .resolve_variable(&Level::stage("dev"), "stage")
                .await
                .unwrap(),
            "dev"
        );
        assert!(
            state
                .resolve_variable(&Level::region("dev", "us-east-1"), "iamRoleArnLambda")
                .await
                .is_ok()
        );
        assert!(
            dir.path()
                .join("_meta/variables/s-variables-dev-useast1.json")
                .exists()
        );
    }

    #[tokio::test]
    async fn test_invalid_region_creates_nothing() {
        let dir = tempdir().unwrap();
        let services = testing::services(dir.path(), &[]).await;
        let dispatcher = dispatcher(&services).await;

        let mut ctx = Context::new().with_stage("dev").with_region("moon");
        let result = dispatcher.dispatch(STAGE_CREATE, &mut ctx).await;

        assert!(matches!(result, Err(ActionError::Validation(_))));
        assert!(!services.state.stage_exists("dev").await);
    }

    #[tokio::test]
    async fn test_failed_first_region_leaves_no_stage_behind() {
        let dir = tempdir().unwrap();
        let services = testing::services(dir.path(), &["shop-dev-r"]).await;

        let mut ctx = Context::new().with_stage("dev").with_region("us-east-1");
        let result = dispatcher(&services)
            .await
            .dispatch(STAGE_CREATE, &mut ctx)
            .await;

        assert!(matches!(result, Err(ActionError::RemoteOperation { .. })));
        assert!(!services.state.stage_exists("dev").await);
        assert!(
            !dir.path()
                .join("_meta/variables/s-variables-dev.json")
                .exists()
        );

        let retry = testing::services(dir.path(), &[]).await;
        let mut ctx = Context::new().with_stage("dev").with_region("us-east-1");
        dispatcher(&retry)
            .await
            .dispatch(STAGE_CREATE, &mut ctx)
            .await
            .unwrap();
        assert!(retry.state.region_exists("dev", "us-east-1").await);
    }

    #[tokio::test]
    async fn test_remove_stage_cascades_and_deletes_files() {
        let dir = tempdir().unwrap();
        let services = testing::services(dir.path(), &[]).await;
        let dispatcher = dispatcher(&services).await;
        let mut ctx = Context::new().with_stage("dev").with_region("us-east-1");
        dispatcher.dispatch(STAGE_CREATE, &mut ctx).await.unwrap();

        let mut ctx = Context::new().with_stage("dev");
        dispatcher.dispatch(STAGE_REMOVE, &mut ctx).await.unwrap();

        assert!(!services.state.stage_exists("dev").await);
        assert!(
            !dir.path()
                .join("_meta/variables/s-variables-dev-useast1.json")
                .exists()
        );
        assert_eq!(ctx.output().unwrap()["regions"], json!(["us-east-1"]));
    }
}
