//! The action/hook execution engine
//!
//! Plugins register named [`Action`]s (a [`Handler`] plus optional CLI
//! metadata) and [`HookPhase::Pre`]/[`HookPhase::Post`] hooks into a
//! [`RegistryBuilder`]. Once every plugin has registered, the builder is
//! frozen into an immutable [`Registry`] and handed to a [`Dispatcher`], which
//! runs pre-hooks, the handler and post-hooks for a name against one shared
//! [`Context`]. Handlers receive the dispatcher and may dispatch other actions
//! recursively; each nested dispatch completes its whole cycle before the
//! caller resumes.

pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod metadata;
pub mod plugin;
pub mod registry;

pub use self::{
    context::Context,
    dispatcher::Dispatcher,
    error::{ActionError, FailedItem},
    handler::{Handler, handler_fn},
    metadata::{CliMetadata, CliOption, CliParameter},
    plugin::{Plugin, PluginLoader},
    registry::{Action, HookPhase, Registry, RegistryBuilder},
};
