mod cli;
mod commands;
mod config;
mod tables;
mod terminal_progress_reporter;

use std::process;

use clap::Parser;
use stagecoach::{
    config::{ApplyToConfig, ConfigLoader, YamlLoader},
    fs::RealFileSystem,
};
use terminal_progress_reporter::TerminalProgressReporter;
use tracing::{Level, debug};

use crate::{cli::ClapCli, commands::run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ClapCli::parse();

    let fs = RealFileSystem;

    let config = {
        // 1. Load config.yaml
        let config = YamlLoader::new(&fs).load_config()?;

        // 2. Apply CLI args to config (overriding)
        args.apply_to_config(config)
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if config.verbose() {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .with_ansi(config.use_colors())
        .init();

    debug!("CLI arguments: {:#?}", &args);
    debug!("Final config: {:#?}", &config);

    console::set_colors_enabled(config.use_colors());
    let reporter = TerminalProgressReporter::new(config.use_colors());

    // 3. Route and execute the requested command
    let exit_code = run(&args.command, &config, reporter).await;

    process::exit(exit_code)
}
