//! Maps `<context> <contextAction> [params] [--flag value]` onto an action
//!
//! The first two tokens that are neither flags nor flag values pick the
//! action by its [`CliMetadata`]. Everything else is parsed with a `clap` command built
//! from that metadata, and the result becomes the initial [`Context`].

use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::debug;

use crate::action::{Action, ActionError, CliMetadata, Context, Dispatcher};

/// Option names copied into [`Context::stage`] and [`Context::region`]
pub const STAGE_OPTION: &str = "stage";
pub const REGION_OPTION: &str = "region";

/// One CLI-visible command, for help output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSummary {
    pub context: String,
    pub context_action: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct Router {
    dispatcher: Dispatcher,
}

impl Router {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Every action reachable from the command line, sorted by verb
    #[must_use]
    pub fn commands(&self) -> Vec<CommandSummary> {
        let mut commands: Vec<_> = self
            .dispatcher
            .registry()
            .actions()
            .filter_map(Action::metadata)
            .map(|metadata| CommandSummary {
                context: metadata.context().to_string(),
                context_action: metadata.context_action().to_string(),
                description: metadata.description().to_string(),
            })
            .collect();
        commands.sort_by(|a, b| {
            (&a.context, &a.context_action).cmp(&(&b.context, &b.context_action))
        });
        commands
    }

    /// Pick the action for `args` and build its initial context
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NoMatchingAction`] unless exactly one action
    /// matches the two verbs, or [`ActionError::Validation`] if the remaining
    /// arguments do not fit that action's options and parameters.
    pub fn resolve(&self, args: &[String]) -> Result<(&Action, Context), ActionError> {
        let mut verbs = Vec::with_capacity(2);
        let mut rest = Vec::with_capacity(args.len());
        let mut flag_value_next = false;
        for arg in args {
            if verbs.len() < 2 && !flag_value_next && !arg.starts_with('-') {
                verbs.push(arg.as_str());
            } else {
                flag_value_next = verbs.len() < 2 && !flag_value_next && self.takes_value(arg);
                rest.push(arg.clone());
            }
        }

        let (context, context_action) = match verbs.as_slice() {
            [context, context_action] => (*context, *context_action),
            _ => {
                return Err(ActionError::NoMatchingAction {
                    context: verbs.first().copied().unwrap_or_default().to_string(),
                    context_action: String::new(),
                    matches: 0,
                });
            }
        };

        let candidates: Vec<&Action> = self
            .dispatcher
            .registry()
            .actions()
            .filter(|action| {
                action.metadata().is_some_and(|m| {
                    m.context() == context && m.context_action() == context_action
                })
            })
            .collect();

        let [action] = candidates.as_slice() else {
            return Err(ActionError::NoMatchingAction {
                context: context.to_string(),
                context_action: context_action.to_string(),
                matches: candidates.len(),
            });
        };
        let Some(metadata) = action.metadata() else {
            return Err(ActionError::UnknownAction(action.name().to_string()));
        };

        let matches = build_command(metadata)
            .try_get_matches_from(rest)
            .map_err(|e| ActionError::validation(e.to_string().trim_end()))?;
        let ctx = context_from_matches(metadata, &matches);

        debug!(action = action.name(), ?ctx, "routed command");
        Ok((*action, ctx))
    }

    /// Whether `arg` is a flag that some action declares with a separate value
    fn takes_value(&self, arg: &str) -> bool {
        let mut options = self
            .dispatcher
            .registry()
            .actions()
            .filter_map(Action::metadata)
            .flat_map(CliMetadata::options)
            .filter(|option| option.takes_value());

        if let Some(long) = arg.strip_prefix("--") {
            !long.contains('=') && options.any(|option| option.flag() == long)
        } else if let Some(short) = arg.strip_prefix('-') {
            let mut chars = short.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => options.any(|option| option.shortcut() == Some(c)),
                _ => false,
            }
        } else {
            false
        }
    }

    /// Resolve `args` and dispatch the matching action
    ///
    /// # Errors
    ///
    /// Returns routing errors from [`resolve`](Self::resolve) or whatever the
    /// dispatch fails with.
    pub async fn route(&self, args: &[String]) -> Result<Context, ActionError> {
        let (action, mut ctx) = self.resolve(args)?;
        self.dispatcher.dispatch(action.name(), &mut ctx).await?;
        Ok(ctx)
    }
}

fn build_command(metadata: &CliMetadata) -> Command {
    let mut command = Command::new(format!(
        "{} {}",
        metadata.context(),
        metadata.context_action()
    ))
    .about(metadata.description().to_string())
    .no_binary_name(true)
    .disable_help_flag(true)
    .disable_version_flag(true);

    for option in metadata.options() {
        let mut arg = Arg::new(option.flag().to_string())
            .long(option.flag().to_string())
            .help(option.description().to_string());
        if let Some(short) = option.shortcut() {
            arg = arg.short(short);
        }
        arg = if option.takes_value() {
            arg.action(ArgAction::Set).value_name("VALUE")
        } else {
            arg.action(ArgAction::SetTrue)
        };
        command = command.arg(arg);
    }

    let mut parameters: Vec<_> = metadata.parameters().iter().collect();
    parameters.sort_by_key(|p| p.position());
    for (index, parameter) in parameters.into_iter().enumerate() {
        let arg = Arg::new(parameter.name().to_string())
            .index(index + 1)
            .help(parameter.description().to_string());
        let arg = if parameter.is_variadic() {
            arg.num_args(0..).action(ArgAction::Append)
        } else {
            arg.required(true).action(ArgAction::Set)
        };
        command = command.arg(arg);
    }

    command
}

fn context_from_matches(metadata: &CliMetadata, matches: &ArgMatches) -> Context {
    let mut ctx = Context::new();

    for option in metadata.options() {
        if option.takes_value() {
            if let Some(value) = matches.get_one::<String>(option.flag()) {
                ctx.set_option(option.flag(), value);
            }
        } else if matches.get_flag(option.flag()) {
            ctx.set_option(option.flag(), "true");
        }
    }

    let mut parameters: Vec<_> = metadata.parameters().iter().collect();
    parameters.sort_by_key(|p| p.position());
    for parameter in parameters {
        if let Some(values) = matches.get_many::<String>(parameter.name()) {
            ctx.params_mut().extend(values.cloned());
        }
    }

    ctx.set_stage(ctx.option(STAGE_OPTION).map(ToString::to_string));
    ctx.set_region(ctx.option(REGION_OPTION).map(ToString::to_string));
    ctx
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::action::{CliOption, CliParameter, Handler, RegistryBuilder, handler_fn};

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(ToString::to_string).collect()
    }

    fn echo() -> Arc<dyn Handler> {
        handler_fn(|_, ctx| {
            Box::pin(async move {
                ctx.push_property("ran", "yes");
                Ok(())
            })
        })
    }

    fn router() -> Router {
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                Action::new("stageCreate", echo()).with_cli(
                    CliMetadata::new("stage", "create", "Create a stage")
                        .option(CliOption::value("stage", Some('s'), "Stage"))
                        .option(CliOption::value("region", Some('r'), "Region"))
                        .option(CliOption::switch("noExeCf", Some('c'), "Skip stack")),
                ),
            )
            .unwrap();
        builder
            .register(
                Action::new("functionDeploy", echo()).with_cli(
                    CliMetadata::new("function", "deploy", "Deploy functions")
                        .option(CliOption::value("stage", Some('s'), "Stage"))
                        .parameter(CliParameter::new("names", 0, "Functions").variadic()),
                ),
            )
            .unwrap();
        builder
            .register(
                Action::new("variablesSet", echo()).with_cli(
                    CliMetadata::new("variables", "set", "Set a variable")
                        .parameter(CliParameter::new("value", 1, "Value"))
                        .parameter(CliParameter::new("key", 0, "Key")),
                ),
            )
            .unwrap();
        builder
            .register(Action::new("codeDeployLambda", echo()))
            .unwrap();
        Router::new(Dispatcher::new(builder.freeze()))
    }

    #[tokio::test]
    async fn test_flags_and_params_land_in_context() {
        let ctx = router()
            .route(&args("stage create -s dev --region us-east-1 --noExeCf"))
            .await
            .unwrap();

        assert_eq!(ctx.option("stage"), Some("dev"));
        assert_eq!(ctx.option("region"), Some("us-east-1"));
        assert!(ctx.switch("noExeCf"));
        assert_eq!(ctx.stage(), Some("dev"));
        assert_eq!(ctx.region(), Some("us-east-1"));
        assert_eq!(ctx.property_strings("ran"), vec!["yes"]);
    }

    #[tokio::test]
    async fn test_variadic_positionals() {
        let ctx = router()
            .route(&args("function deploy users orders -s prod"))
            .await
            .unwrap();

        assert_eq!(ctx.params(), ["users".to_string(), "orders".to_string()]);
        assert_eq!(ctx.stage(), Some("prod"));
        assert_eq!(ctx.region(), None);
    }

    #[test]
    fn test_positionals_follow_declared_positions() {
        let router = router();
        let (action, ctx) = router.resolve(&args("variables set apiKey s3cret")).unwrap();

        assert_eq!(action.name(), "variablesSet");
        assert_eq!(ctx.params(), ["apiKey".to_string(), "s3cret".to_string()]);
    }

    #[test]
    fn test_leading_flags_are_not_verbs() {
        let router = router();

        let (action, ctx) = router
            .resolve(&args("-s dev stage create -r us-east-1"))
            .unwrap();
        assert_eq!(action.name(), "stageCreate");
        assert_eq!(ctx.stage(), Some("dev"));
        assert_eq!(ctx.region(), Some("us-east-1"));

        let (action, ctx) = router
            .resolve(&args("--stage prod function deploy users"))
            .unwrap();
        assert_eq!(action.name(), "functionDeploy");
        assert_eq!(ctx.params(), ["users".to_string()]);
        assert_eq!(ctx.stage(), Some("prod"));
    }

    #[test]
    fn test_unknown_verb() {
        let router = router();
        let result = router.resolve(&args("stage explode -s dev"));

        assert!(matches!(
            result,
            Err(ActionError::NoMatchingAction { matches: 0, .. })
        ));
    }

    #[test]
    fn test_missing_verbs() {
        let router = router();
        let result = router.resolve(&args("stage"));

        assert!(matches!(result, Err(ActionError::NoMatchingAction { .. })));
    }

    #[test]
    fn test_ambiguous_metadata() {
        let mut builder = RegistryBuilder::new();
        for name in ["first", "second"] {
            builder
                .register(Action::new(name, echo()).with_cli(CliMetadata::new("x", "y", "")))
                .unwrap();
        }
        let router = Router::new(Dispatcher::new(builder.freeze()));

        let result = router.resolve(&args("x y"));

        assert!(matches!(
            result,
            Err(ActionError::NoMatchingAction { matches: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_flag_is_a_validation_error() {
        let router = router();
        let result = router.resolve(&args("stage create --bogus 1"));

        assert!(matches!(result, Err(ActionError::Validation(_))));
    }

    #[test]
    fn test_missing_required_parameter() {
        let router = router();
        let result = router.resolve(&args("variables set onlyKey"));

        assert!(matches!(result, Err(ActionError::Validation(_))));
    }

    #[test]
    fn test_commands_lists_cli_actions_only() {
        let commands = router().commands();

        let verbs: Vec<_> = commands
            .iter()
            .map(|c| format!("{} {}", c.context, c.context_action))
            .collect();
        assert_eq!(
            verbs,
            vec!["function deploy", "stage create", "variables set"]
        );
    }
}
