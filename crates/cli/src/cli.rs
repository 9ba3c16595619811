// src/cli.rs
use std::{num::NonZeroUsize, path::PathBuf};

use clap::Parser;

/// Stagecoach - A plugin-driven deployment orchestrator
///
/// Commands take the form `<context> <contextAction> [params] [--flag value]`,
/// for example `stage create -s dev -r us-east-1`. Run without a command to
/// list everything the enabled plugins provide.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct ClapCli {
    /// Override the project directory from config
    ///
    #[clap(long, short = 'p')]
    pub(crate) project_directory: Option<PathBuf>,

    /// Override how many items deploy at once within a region
    ///
    #[clap(long, short = 'c')]
    pub(crate) concurrency: Option<NonZeroUsize>,

    /// Show detailed output
    ///
    #[clap(long, short = 'v', default_value_t = false)]
    pub(crate) verbose: bool,

    /// Disable colored output
    ///
    #[clap(long, default_value_t = false)]
    pub(crate) no_color: bool,

    /// The command to route, e.g. `function deploy users -s dev`
    ///
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub(crate) command: Vec<String>,
}
