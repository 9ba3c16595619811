//! Pieces shared by the built-in plugins

use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};

use crate::{
    action::{ActionError, CliOption, Context, Dispatcher},
    commands::CommandRunner,
    deploy::{DeploymentReport, FanOut},
    provider::{CloudProvider, ProviderError, ResourceOutput},
    router::{REGION_OPTION, STAGE_OPTION},
    state::{Level, ProjectState},
};

/// Everything the built-in plugins act on
#[derive(Clone)]
pub struct Services {
    pub state: Arc<ProjectState>,
    pub provider: Arc<dyn CloudProvider>,
    pub runner: Arc<dyn CommandRunner>,
    pub project_directory: PathBuf,
    pub concurrency: NonZeroUsize,
}

pub(crate) fn stage_option() -> CliOption {
    CliOption::value(STAGE_OPTION, Some('s'), "Stage to act on")
}

pub(crate) fn region_option() -> CliOption {
    CliOption::value(REGION_OPTION, Some('r'), "Region to act on")
}

pub(crate) fn required<'a>(value: Option<&'a str>, flag: &str) -> Result<&'a str, ActionError> {
    value.ok_or_else(|| ActionError::validation(format!("--{flag} is required")))
}

/// The stage named on the command line, or the project's only stage
pub(crate) async fn target_stage(state: &ProjectState, ctx: &Context) -> Result<String, ActionError> {
    if let Some(stage) = ctx.stage() {
        if !state.stage_exists(stage).await {
            return Err(ActionError::validation(format!("stage '{stage}' does not exist")));
        }
        return Ok(stage.to_string());
    }

    match state.stages().await.as_slice() {
        [only] => Ok(only.clone()),
        [] => Err(ActionError::validation(
            "the project has no stages; run `stage create` first",
        )),
        _ => Err(ActionError::validation(
            "the project has several stages; pick one with --stage",
        )),
    }
}

/// The region named on the command line, or every region of `stage`
pub(crate) async fn target_regions(
    state: &ProjectState,
    stage: &str,
    ctx: &Context,
) -> Result<Vec<String>, ActionError> {
    if let Some(region) = ctx.region() {
        if !state.region_exists(stage, region).await {
            return Err(ActionError::validation(format!(
                "region '{region}' does not exist in stage '{stage}'"
            )));
        }
        return Ok(vec![region.to_string()]);
    }

    let regions = state.regions(stage).await?;
    if regions.is_empty() {
        return Err(ActionError::validation(format!(
            "stage '{stage}' has no regions; run `region create` first"
        )));
    }
    Ok(regions)
}

/// Stage and region of a fan-out worker's context
pub(crate) fn worker_level(ctx: &Context) -> Result<(String, String, String), ActionError> {
    let stage = required(ctx.stage(), STAGE_OPTION)?;
    let region = required(ctx.region(), REGION_OPTION)?;
    let item = ctx
        .item()
        .ok_or_else(|| ActionError::validation("no item to deploy"))?;
    Ok((stage.to_string(), region.to_string(), item.to_string()))
}

/// Fan `action` out over `items` in the targeted regions, saving each region
/// once it settles, and leave the report in the context output
pub(crate) async fn deploy_items(
    services: &Services,
    dispatcher: &Dispatcher,
    ctx: &mut Context,
    action: &str,
    items: Vec<String>,
) -> Result<(), ActionError> {
    if items.is_empty() {
        return Err(ActionError::validation("name at least one item to deploy"));
    }

    let stage = target_stage(&services.state, ctx).await?;
    let regions = target_regions(&services.state, &stage, ctx).await?;

    let report = FanOut::new(dispatcher, action, &stage)
        .with_concurrency(services.concurrency)
        .run_with(&regions, &items, |region| {
            let state = Arc::clone(&services.state);
            let level = Level::region(&stage, &region);
            async move { state.save(&level).await.map_err(ActionError::from) }
        })
        .await;

    finish(ctx, report)
}

fn finish(ctx: &mut Context, report: DeploymentReport) -> Result<(), ActionError> {
    ctx.set_output(serde_json::to_value(&report).map_err(|e| {
        ActionError::validation(format!("deployment report is not serializable: {e}"))
    })?);
    report.into_result().map(|_| ())
}

/// Treat a missing resource as already gone
pub(crate) fn ignore_not_found(
    result: Result<ResourceOutput, ProviderError>,
) -> Result<Option<ResourceOutput>, ActionError> {
    match result {
        Ok(output) => Ok(Some(output)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}


#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_single_stage_is_the_default() {
        let dir = tempdir().unwrap();
        let services = testing::services(dir.path(), &[]).await;
        services.state.create_stage("dev").await.unwrap();

        let stage = target_stage(&services.state, &Context::new()).await.unwrap();

        assert_eq!(stage, "dev");
    }

    #[tokio::test]
    async fn test_several_stages_need_a_flag() {
        let dir = tempdir().unwrap();
        let services = testing::services(dir.path(), &[]).await;
        services.state.create_stage("dev").await.unwrap();
        services.state.create_stage("prod").await.unwrap();

        let result = target_stage(&services.state, &Context::new()).await;
        assert!(matches!(result, Err(ActionError::Validation(_))));

        let chosen = target_stage(&services.state, &Context::new().with_stage("prod"))
            .await
            .unwrap();
        assert_eq!(chosen, "prod");
    }

    #[tokio::test]
    async fn test_all_regions_are_the_default() {
        let dir = tempdir().unwrap();
        let services = testing::services(dir.path(), &[]).await;
        services.state.create_stage("dev").await.unwrap();
        services.state.create_region("dev", "us-east-1").await.unwrap();
        services.state.create_region("dev", "eu-west-1").await.unwrap();

        let all = target_regions(&services.state, "dev", &Context::new())
            .await
            .unwrap();
        assert_eq!(all, vec!["eu-west-1", "us-east-1"]);

        let one = target_regions(&services.state, "dev", &Context::new().with_region("us-east-1"))
            .await
            .unwrap();
        assert_eq!(one, vec!["us-east-1"]);

        let missing =
            target_regions(&services.state, "dev", &Context::new().with_region("ap-south-1")).await;
        assert!(matches!(missing, Err(ActionError::Validation(_))));
    }
}
