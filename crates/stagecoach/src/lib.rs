//! Stagecoach - A plugin-driven deployment orchestrator
//!
//! The `stagecoach` library provides the engine behind the `stagecoach` CLI:
//! named actions contributed by plugins, wrapped in pre/post hooks, dispatched
//! recursively against a shared context, and fanned out across a stage's
//! regions with per-item failure containment.
//!
//! # Architecture
//!
//! The core is kept apart from the outside world through ports: the
//! [`provider::CloudProvider`] performs remote resource operations, the
//! [`state::StateRepository`] persists the project tree, [`fs::FileSystem`]
//! wraps file access and [`commands::CommandRunner`] runs shell hooks. Each
//! port ships with a local adapter so the tool runs without a cloud account.
//!
//! # Main Components
//!
//! - [`action`] - Registry, dispatcher, hooks and the plugin interface
//! - [`router`] - Maps `<context> <contextAction>` command lines onto actions
//! - [`deploy`] - Region-by-region fan-out with a consolidated report
//! - [`state`] - Project → Stage → Region variables with fallback lookup
//! - [`provider`] - Remote resource port and the local ledger adapter
//! - [`plugins`] - The built-in stage, region, function, endpoint, event,
//!   variables and shell-hook plugins
//! - [`config`] - Application configuration management
//! - [`commands`] - Command execution abstractions
//! - [`fs`] - File system abstractions
//!
//! # Examples
//!
//! ```no_run
//! use stagecoach::{config::AppConfigBuilder, plugins, router::Router};
//!
//! # async fn run() -> Result<(), stagecoach::action::ActionError> {
//! let config = AppConfigBuilder::default()
//!     .project_directory("/srv/shop")
//!     .build();
//! let services = plugins::local_services(&config).await?;
//! let router = Router::new(plugins::load(&config, &services).await?);
//!
//! let args = ["variables", "list", "-s", "dev"].map(String::from);
//! let ctx = router.route(&args).await?;
//! if let Some(variables) = ctx.output() {
//!     println!("{variables}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod fs;
pub mod plugins;
pub mod provider;
pub mod router;
pub mod state;
