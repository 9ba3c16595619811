use std::error::Error as _;

use serde_json::Value;
use stagecoach::{
    action::ActionError,
    config::AppConfig,
    deploy::DeploymentReport,
    plugins::{self, variables::VARIABLES_LIST},
    router::Router,
    state::Variables,
};
use tracing::debug;

use crate::{tables::TableReporter, terminal_progress_reporter::TerminalProgressReporter};

/// Build the router for `config` and run `args` through it
///
/// Returns the process exit code.
pub(crate) async fn run(
    args: &[String],
    config: &AppConfig,
    reporter: TerminalProgressReporter,
) -> i32 {
    let router = match build_router(config).await {
        Ok(router) => router,
        Err(e) => return report_failure(&e, reporter),
    };

    if args.is_empty() {
        TableReporter::new()
            .setup(vec!["Command", "Description"])
            .add_commands(&router.commands())
            .print();
        return 0;
    }

    let (action, mut ctx) = match router.resolve(args) {
        Ok(resolved) => resolved,
        Err(e) => {
            reporter.report_error(&e);
            if matches!(e, ActionError::NoMatchingAction { .. }) {
                reporter.report_info("Run stagecoach without arguments to list commands");
            }
            return e.exit_code();
        }
    };

    debug!(action = action.name(), "dispatching");
    reporter.report_progress(format!("Running {}", action.name()));
    let result = router.dispatcher().dispatch(action.name(), &mut ctx).await;

    if let Some(output) = ctx.output() {
        render_output(action.name(), output, reporter);
    }

    match result {
        Ok(()) => {
            reporter.report_success(format!("{} finished", action.name()));
            0
        }
        Err(e) => report_failure(&e, reporter),
    }
}

async fn build_router(config: &AppConfig) -> Result<Router, ActionError> {
    let services = plugins::local_services(config).await?;
    let dispatcher = plugins::load(config, &services).await?;
    Ok(Router::new(dispatcher))
}

fn report_failure(error: &ActionError, reporter: TerminalProgressReporter) -> i32 {
    match error {
        // The report table already lists every failed item
        ActionError::PartialDeployment { .. } => reporter.report_warning(error),
        _ => {
            reporter.report_error(error);
            let mut source = error.source();
            while let Some(cause) = source {
                reporter.report_error(format!("  caused by: {cause}"));
                source = cause.source();
            }
        }
    }
    error.exit_code()
}

/// Print an action's output as a table when its shape is known
fn render_output(action: &str, output: &Value, reporter: TerminalProgressReporter) {
    if let Ok(report) = serde_json::from_value::<DeploymentReport>(output.clone()) {
        TableReporter::new()
            .setup(vec!["Region", "Item", "Status", "Detail"])
            .add_deployment_report(&report, reporter)
            .print();
        reporter.report_info(format!(
            "{} deployed, {} failed",
            report.deployed_count(),
            report.failed_count()
        ));
        return;
    }

    if action == VARIABLES_LIST {
        if let Ok(variables) = serde_json::from_value::<Variables>(output.clone()) {
            if variables.is_empty() {
                reporter.report_info("No variables set");
            } else {
                TableReporter::new()
                    .setup(vec!["Variable", "Value"])
                    .add_variables(&variables)
                    .print();
            }
            return;
        }
    }

    match serde_json::to_string_pretty(output) {
        Ok(pretty) => println!("{pretty}"),
        Err(_) => println!("{output}"),
    }
}
