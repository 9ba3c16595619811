//! Service creation helpers to eliminate plugin setup duplication in tests.

use std::{sync::Arc, time::Duration};

use stagecoach::{
    action::{Dispatcher, PluginLoader},
    commands::ShellCommandRunner,
    config::AppConfig,
    fs::RealFileSystem,
    plugins::{self, Services, region::IAM_ROLE_VARIABLE},
    provider::CloudProvider,
    state::{JsonStateRepository, Level, ProjectState},
};

use crate::constants::{TEST_COMMAND_TIMEOUT_SECS, TEST_ROLE_ARN};

/// Creates services over the configured project directory with `provider`
/// standing in for the cloud.
pub async fn create_test_services(config: &AppConfig, provider: Arc<dyn CloudProvider>) -> Services {
    let project_directory = config.project_directory().clone();
    let repository = Arc::new(JsonStateRepository::new(
        RealFileSystem,
        project_directory.clone(),
    ));

    Services {
        state: Arc::new(ProjectState::open(repository).await.unwrap()),
        provider,
        runner: Arc::new(ShellCommandRunner::new(
            "/bin/sh",
            Duration::from_secs(TEST_COMMAND_TIMEOUT_SECS),
        )),
        project_directory,
        concurrency: config.max_concurrency(),
    }
}

/// Loads the built-in plugins `config` enables.
pub async fn create_test_dispatcher(config: &AppConfig, services: &Services) -> Dispatcher {
    plugins::load(config, services).await.unwrap()
}

/// Loads exactly the plugins in `loader`, honoring the configured depth.
pub async fn create_dispatcher_from(config: &AppConfig, loader: PluginLoader) -> Dispatcher {
    Dispatcher::new(loader.load().await.unwrap()).with_max_depth(config.max_dispatch_depth())
}

/// Creates `stage` with `regions`, each carrying a role, and saves it.
pub async fn seed_stage(services: &Services, stage: &str, regions: &[&str]) {
    let state = &services.state;
    state.create_stage(stage).await.unwrap();
    for region in regions {
        state.create_region(stage, region).await.unwrap();
        state
            .set_variable(&Level::region(stage, region), IAM_ROLE_VARIABLE, TEST_ROLE_ARN)
            .await
            .unwrap();
    }
    state.save(&Level::stage(stage)).await.unwrap();
}
