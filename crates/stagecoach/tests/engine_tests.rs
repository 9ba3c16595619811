use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use stagecoach::action::{
    Action, ActionError, Context, Handler, HookPhase, Plugin, PluginLoader, RegistryBuilder,
};
use test_common::{Recorder, create_dispatcher_from, create_test_project, test_config_with_dir};

/// A plugin assembled from recorded handlers
#[derive(Default)]
struct ScriptedPlugin {
    name: &'static str,
    actions: Vec<(&'static str, Arc<dyn Handler>)>,
    hooks: Vec<(&'static str, HookPhase, Arc<dyn Handler>)>,
}

impl ScriptedPlugin {
    fn named(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn action(mut self, name: &'static str, handler: Arc<dyn Handler>) -> Self {
        self.actions.push((name, handler));
        self
    }

    fn hook(mut self, action: &'static str, phase: HookPhase, handler: Arc<dyn Handler>) -> Self {
        self.hooks.push((action, phase, handler));
        self
    }
}

#[async_trait]
impl Plugin for ScriptedPlugin {
    fn name(&self) -> &str {
        self.name
    }

    async fn register_actions(&self, registry: &mut RegistryBuilder) -> Result<(), ActionError> {
        for (name, handler) in &self.actions {
            registry.register(Action::new(name, Arc::clone(handler)))?;
        }
        Ok(())
    }

    async fn register_hooks(&self, registry: &mut RegistryBuilder) -> Result<(), ActionError> {
        for (action, phase, handler) in &self.hooks {
            registry.register_hook(action, *phase, Arc::clone(handler));
        }
        Ok(())
    }
}

fn build_plugins(recorder: &Recorder) -> PluginLoader {
    // The observer loads first but hooks actions owned by the later plugin
    let observer = ScriptedPlugin::named("observer")
        .hook("outer", HookPhase::Pre, recorder.handler("outer:pre1"))
        .hook("outer", HookPhase::Pre, recorder.handler("outer:pre2"))
        .hook("outer", HookPhase::Post, recorder.handler("outer:post"))
        .hook("inner", HookPhase::Pre, recorder.handler("inner:pre"))
        .hook("inner", HookPhase::Post, recorder.handler("inner:post"));
    let owner = ScriptedPlugin::named("owner")
        .action("outer", recorder.dispatching("outer", "inner"))
        .action("inner", recorder.handler("inner"));

    PluginLoader::new().with_plugin(observer).with_plugin(owner)
}

#[tokio::test]
async fn test_hooks_and_nested_dispatch_run_in_order() {
    let project = create_test_project();
    let config = test_config_with_dir(project.path());
    let recorder = Recorder::new();
    let dispatcher = create_dispatcher_from(&config, build_plugins(&recorder)).await;

    dispatcher
        .dispatch("outer", &mut Context::new())
        .await
        .unwrap();

    assert_eq!(
        recorder.entries(),
        vec![
            "outer:pre1",
            "outer:pre2",
            "outer",
            "inner:pre",
            "inner",
            "inner:post",
            "outer:post",
        ]
    );
}

#[tokio::test]
async fn test_failing_pre_hook_skips_handler_and_post_hooks() {
    let project = create_test_project();
    let config = test_config_with_dir(project.path());
    let recorder = Recorder::new();
    let loader = PluginLoader::new().with_plugin(
        ScriptedPlugin::named("guarded")
            .action("guarded", recorder.handler("guarded"))
            .hook("guarded", HookPhase::Pre, recorder.failing("check"))
            .hook("guarded", HookPhase::Pre, recorder.handler("never:pre"))
            .hook("guarded", HookPhase::Post, recorder.handler("never:post")),
    );
    let dispatcher = create_dispatcher_from(&config, loader).await;

    let result = dispatcher.dispatch("guarded", &mut Context::new()).await;

    assert!(matches!(result, Err(ActionError::Validation(m)) if m == "check failed"));
    assert_eq!(recorder.entries(), vec!["check"]);
}

#[tokio::test]
async fn test_nested_failure_propagates_to_the_caller() {
    let project = create_test_project();
    let config = test_config_with_dir(project.path());
    let recorder = Recorder::new();
    let loader = PluginLoader::new().with_plugin(
        ScriptedPlugin::named("chain")
            .action("outer", recorder.dispatching("outer", "inner"))
            .action("inner", recorder.failing("inner"))
            .hook("outer", HookPhase::Post, recorder.handler("outer:post")),
    );
    let dispatcher = create_dispatcher_from(&config, loader).await;

    let result = dispatcher.dispatch("outer", &mut Context::new()).await;

    assert_eq!(result.unwrap_err().exit_code(), 2);
    assert_eq!(recorder.entries(), vec!["outer", "inner"]);
}

#[tokio::test]
async fn test_self_dispatch_hits_the_depth_limit() {
    let project = create_test_project();
    let config = test_common::AppConfigBuilder::default()
        .project_directory(project.path())
        .max_dispatch_depth_unchecked(4)
        .build();
    let recorder = Recorder::new();
    let loader = PluginLoader::new().with_plugin(
        ScriptedPlugin::named("loop").action("spin", recorder.dispatching("spin", "spin")),
    );
    let dispatcher = create_dispatcher_from(&config, loader).await;

    let result = dispatcher.dispatch("spin", &mut Context::new()).await;

    assert!(matches!(
        result,
        Err(ActionError::RecursionLimit { ref action, depth: 4 }) if action == "spin"
    ));
    assert_eq!(recorder.entries().len(), 4);
}

#[tokio::test]
async fn test_unknown_action_runs_nothing() {
    let project = create_test_project();
    let config = test_config_with_dir(project.path());
    let recorder = Recorder::new();
    let dispatcher = create_dispatcher_from(&config, build_plugins(&recorder)).await;

    let result = dispatcher.dispatch("missing", &mut Context::new()).await;

    assert!(matches!(result, Err(ActionError::UnknownAction(name)) if name == "missing"));
    assert!(recorder.entries().is_empty());
}
