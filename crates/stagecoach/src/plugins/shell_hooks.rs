use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    action::{ActionError, Context, Dispatcher, Handler, HookPhase, Plugin, RegistryBuilder},
    config::HookConfig,
};

use super::common::Services;

/// Environment variables every shell hook sees
pub const ACTION_ENV: &str = "STAGECOACH_ACTION";
pub const PHASE_ENV: &str = "STAGECOACH_PHASE";
pub const STAGE_ENV: &str = "STAGECOACH_STAGE";
pub const REGION_ENV: &str = "STAGECOACH_REGION";

/// Registers the configured `hooks` as shell commands
///
/// Hooks run from the project directory in the order they are configured.
/// A hook that cannot start, times out, or exits non-zero fails the
/// dispatch.
pub struct ShellHooksPlugin {
    services: Services,
    hooks: Vec<HookConfig>,
}

impl ShellHooksPlugin {
    #[must_use]
    pub fn new(services: Services, hooks: Vec<HookConfig>) -> Self {
        Self { services, hooks }
    }
}

#[async_trait]
impl Plugin for ShellHooksPlugin {
    fn name(&self) -> &str {
        "shell-hooks"
    }

    async fn register_actions(&self, _registry: &mut RegistryBuilder) -> Result<(), ActionError> {
        Ok(())
    }

    async fn register_hooks(&self, registry: &mut RegistryBuilder) -> Result<(), ActionError> {
        for hook in &self.hooks {
            if hook.run().trim().is_empty() {
                return Err(ActionError::validation(format!(
                    "{} hook for '{}' has no command",
                    hook.phase(),
                    hook.action()
                )));
            }
            registry.register_hook(
                hook.action(),
                hook.phase(),
                Arc::new(ShellHook {
                    services: self.services.clone(),
                    action: hook.action().to_string(),
                    phase: hook.phase(),
                    command: hook.run().to_string(),
                }),
            );
        }
        Ok(())
    }
}

struct ShellHook {
    services: Services,
    action: String,
    phase: HookPhase,
    command: String,
}

impl ShellHook {
    fn env(&self, ctx: &Context) -> Vec<(String, String)> {
        let mut env = vec![
            (ACTION_ENV.to_string(), self.action.clone()),
            (PHASE_ENV.to_string(), self.phase.to_string()),
        ];
        if let Some(stage) = ctx.stage() {
            env.push((STAGE_ENV.to_string(), stage.to_string()));
        }
        if let Some(region) = ctx.region() {
            env.push((REGION_ENV.to_string(), region.to_string()));
        }
        env
    }

    fn failure(&self, reason: String) -> ActionError {
        ActionError::Hook {
            action: self.action.clone(),
            command: self.command.clone(),
            reason,
        }
    }
}

#[async_trait]
impl Handler for ShellHook {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        debug!(action = %self.action, phase = %self.phase, command = %self.command, "running hook");

        let output = self
            .services
            .runner
            .execute_in(&self.command, &self.services.project_directory, &self.env(ctx))
            .await
            .map_err(|e| self.failure(e.to_string()))?;

        if output.is_success() {
            return Ok(());
        }

        let stderr = output.stderr_str();
        warn!(action = %self.action, code = output.exit_code(), %stderr, "hook failed");
        Err(self.failure(format!(
            "exited with status {}: {}",
            output.exit_code(),
            stderr.trim()
        )))
    }
}
