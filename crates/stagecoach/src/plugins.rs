//! The plugins bundled with stagecoach
//!
//! Each one registers a family of actions (and, for `shell-hooks`, the hooks
//! declared in the configuration). The configuration's `plugins` list picks
//! which ones load; without it every built-in is enabled.

pub mod common;
pub mod endpoint;
pub mod event;
pub mod function;
pub mod region;
pub mod shell_hooks;
pub mod stage;
pub mod variables;

pub use self::{
    common::Services, endpoint::EndpointPlugin, event::EventPlugin, function::FunctionPlugin,
    region::RegionPlugin, shell_hooks::ShellHooksPlugin, stage::StagePlugin,
    variables::VariablesPlugin,
};

use std::sync::Arc;

use tracing::debug;

use crate::{
    action::{ActionError, Dispatcher, Plugin, PluginLoader},
    commands::ShellCommandRunner,
    config::AppConfig,
    fs::RealFileSystem,
    provider::LocalProvider,
    state::{JsonStateRepository, ProjectState},
};

/// Names accepted in the configuration's `plugins` list, in load order
pub const BUILTIN_PLUGINS: [&str; 7] = [
    "stage",
    "region",
    "function",
    "endpoint",
    "event",
    "variables",
    "shell-hooks",
];

const SHELL: &str = "/bin/sh";

/// Services for the configured project, backed by the local file system
///
/// # Errors
///
/// Returns [`ActionError::Persistence`] if the project's state files cannot
/// be read.
pub async fn local_services(config: &AppConfig) -> Result<Services, ActionError> {
    let project_directory = config.project_directory().clone();
    let repository = Arc::new(JsonStateRepository::new(
        RealFileSystem,
        project_directory.clone(),
    ));

    Ok(Services {
        state: Arc::new(ProjectState::open(repository).await?),
        provider: Arc::new(LocalProvider::new(RealFileSystem, project_directory.clone())),
        runner: Arc::new(ShellCommandRunner::new(SHELL, config.command_timeout())),
        project_directory,
        concurrency: config.max_concurrency(),
    })
}

fn builtin(name: &str, config: &AppConfig, services: &Services) -> Option<Box<dyn Plugin>> {
    let services = services.clone();
    let plugin: Box<dyn Plugin> = match name {
        "stage" => Box::new(StagePlugin::new(services)),
        "region" => Box::new(RegionPlugin::new(services)),
        "function" => Box::new(FunctionPlugin::new(services)),
        "endpoint" => Box::new(EndpointPlugin::new(services)),
        "event" => Box::new(EventPlugin::new(services)),
        "variables" => Box::new(VariablesPlugin::new(services)),
        "shell-hooks" => Box::new(ShellHooksPlugin::new(services, config.hooks().to_vec())),
        _ => return None,
    };
    Some(plugin)
}

/// A loader holding the built-in plugins `config` enables
///
/// # Errors
///
/// Returns [`ActionError::Validation`] for a plugin name that is not built in.
pub fn builtin_plugins(config: &AppConfig, services: &Services) -> Result<PluginLoader, ActionError> {
    let enabled: Vec<&str> = match config.plugins() {
        Some(names) => names.iter().map(String::as_str).collect(),
        None => BUILTIN_PLUGINS.to_vec(),
    };

    let mut loader = PluginLoader::new();
    for name in enabled {
        let plugin = builtin(name, config, services).ok_or_else(|| {
            ActionError::validation(format!(
                "unknown plugin '{name}'; expected one of: {}",
                BUILTIN_PLUGINS.join(", ")
            ))
        })?;
        loader.add(plugin);
    }

    debug!(plugins = ?loader.plugin_names(), "selected plugins");
    Ok(loader)
}

/// Load the enabled plugins and wrap the frozen registry in a dispatcher
///
/// # Errors
///
/// Returns any plugin selection or registration failure.
pub async fn load(config: &AppConfig, services: &Services) -> Result<Dispatcher, ActionError> {
    let registry = builtin_plugins(config, services)?.load().await?;
    Ok(Dispatcher::new(registry).with_max_depth(config.max_dispatch_depth()))
}
