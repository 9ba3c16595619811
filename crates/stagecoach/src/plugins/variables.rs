use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::{
    action::{
        Action, ActionError, CliMetadata, CliParameter, Context, Dispatcher, Handler, Plugin,
        RegistryBuilder,
    },
    state::{Level, ProjectState},
};

use super::common::{Services, region_option, stage_option};

pub const VARIABLES_LIST: &str = "variablesList";
pub const VARIABLES_SET: &str = "variablesSet";

/// `variables list` and `variables set`
pub struct VariablesPlugin {
    services: Services,
}

impl VariablesPlugin {
    #[must_use]
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Plugin for VariablesPlugin {
    fn name(&self) -> &str {
        "variables"
    }

    async fn register_actions(&self, registry: &mut RegistryBuilder) -> Result<(), ActionError> {
        registry.register(
            Action::new(VARIABLES_LIST, Arc::new(ListVariables(self.services.clone()))).with_cli(
                CliMetadata::new("variables", "list", "Show the variables visible at a level")
                    .option(stage_option())
                    .option(region_option()),
            ),
        )?;

        registry.register(
            Action::new(VARIABLES_SET, Arc::new(SetVariable(self.services.clone()))).with_cli(
                CliMetadata::new("variables", "set", "Set a variable at the narrowest given level")
                    .option(stage_option())
                    .option(region_option())
                    .parameter(CliParameter::new("key", 0, "Variable name"))
                    .parameter(CliParameter::new("value", 1, "Variable value")),
            ),
        )
    }
}

/// The level named by `-s`/`-r`, which must already exist
async fn target_level(state: &ProjectState, ctx: &Context) -> Result<Level, ActionError> {
    if ctx.region().is_some() && ctx.stage().is_none() {
        return Err(ActionError::validation("--region needs --stage"));
    }

    let level = Level::from_parts(ctx.stage(), ctx.region());
    let exists = match &level {
        Level::Project => true,
        Level::Stage { stage } => state.stage_exists(stage).await,
        Level::Region { stage, region } => state.region_exists(stage, region).await,
    };
    if exists {
        Ok(level)
    } else {
        Err(ActionError::validation(format!("{level} does not exist")))
    }
}

struct ListVariables(Services);

#[async_trait]
impl Handler for ListVariables {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let state = &self.0.state;
        let level = target_level(state, ctx).await?;
        let variables = state.variables(&level).await?;
        ctx.set_output(json!(variables));
        Ok(())
    }
}

struct SetVariable(Services);

#[async_trait]
impl Handler for SetVariable {
    async fn handle(&self, _dispatcher: &Dispatcher, ctx: &mut Context) -> Result<(), ActionError> {
        let state = &self.0.state;
        let level = target_level(state, ctx).await?;
        let [key, value] = ctx.params() else {
            return Err(ActionError::validation("expected a key and a value"));
        };
        let (key, value) = (key.clone(), value.clone());

        state.set_variable(&level, &key, &value).await?;
        state.save(&level).await?;
        info!(%level, %key, "variable set");
        ctx.set_output(json!({ "level": level.to_string(), "key": key, "value": value }));
        Ok(())
    }
}
