use comfy_table::{
    ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL_CONDENSED,
};
use serde_json::Value;
use stagecoach::{deploy::DeploymentReport, router::CommandSummary, state::Variables};

use crate::terminal_progress_reporter::TerminalProgressReporter;

/// Output keys worth showing for a deployed item, most specific first
const DETAIL_KEYS: [&str; 4] = ["url", "arn", "source", "name"];

pub(crate) struct TableReporter {
    table: Table,
}

impl TableReporter {
    pub(crate) fn new() -> Self {
        Self {
            table: Table::new(),
        }
    }

    pub(crate) fn setup(&mut self, header: Vec<&'static str>) -> &mut Self {
        self.table
            .load_preset(UTF8_FULL_CONDENSED)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header);

        self
    }

    /// One row per item, regions in order, deployed items before failures
    pub(crate) fn add_deployment_report(
        &mut self,
        report: &DeploymentReport,
        reporter: TerminalProgressReporter,
    ) -> &mut Self {
        let regions = report
            .deployed
            .keys()
            .chain(report.failed.keys())
            .collect::<std::collections::BTreeSet<_>>();

        for region in regions {
            for deployed in report.deployed.get(region).into_iter().flatten() {
                self.table.add_row(vec![
                    region.clone(),
                    deployed.item.clone(),
                    reporter.format_success("deployed"),
                    detail(&deployed.output),
                ]);
            }
            for failed in report.failed.get(region).into_iter().flatten() {
                let mut message = failed.message.clone();
                for cause in &failed.causes {
                    message.push_str("\n  caused by: ");
                    message.push_str(cause);
                }
                self.table.add_row(vec![
                    region.clone(),
                    failed.item.clone(),
                    reporter.format_error("failed"),
                    message,
                ]);
            }
        }

        self
    }

    pub(crate) fn add_variables(&mut self, variables: &Variables) -> &mut Self {
        for (key, value) in variables {
            self.table.add_row(vec![key.clone(), value.clone()]);
        }
        self
    }

    pub(crate) fn add_commands(&mut self, commands: &[CommandSummary]) -> &mut Self {
        for command in commands {
            self.table.add_row(vec![
                format!("{} {}", command.context, command.context_action),
                command.description.clone(),
            ]);
        }
        self
    }

    #[cfg(test)]
    pub(crate) fn render(&self) -> String {
        self.table.to_string()
    }

    pub(crate) fn print(&self) {
        println!("{}", &self.table);
    }
}

fn detail(output: &Value) -> String {
    DETAIL_KEYS
        .iter()
        .find_map(|key| output.get(key).and_then(Value::as_str))
        .map_or_else(|| output.to_string(), ToString::to_string)
}
