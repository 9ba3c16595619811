use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ActionError, CliMetadata, Handler};

/// When a hook runs relative to its action's handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookPhase {
    Pre,
    Post,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pre => f.write_str("pre"),
            Self::Post => f.write_str("post"),
        }
    }
}

/// A named unit of work
///
/// Actions without [`CliMetadata`] are internal: they can only be reached by
/// another handler dispatching them.
#[derive(Clone)]
pub struct Action {
    name: String,
    handler: Arc<dyn Handler>,
    metadata: Option<CliMetadata>,
}

impl Action {
    #[must_use]
    pub fn new(name: &str, handler: Arc<dyn Handler>) -> Self {
        Self {
            name: name.to_string(),
            handler,
            metadata: None,
        }
    }

    #[must_use]
    pub fn with_cli(mut self, metadata: CliMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&CliMetadata> {
        self.metadata.as_ref()
    }

    pub(crate) fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

type HookMap = HashMap<(String, HookPhase), Vec<Arc<dyn Handler>>>;

/// Mutable registry used while plugins load
#[derive(Default)]
pub struct RegistryBuilder {
    actions: BTreeMap<String, Action>,
    hooks: HookMap,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::DuplicateAction`] if the name is taken, or
    /// [`ActionError::Validation`] if its CLI metadata is malformed.
    pub fn register(&mut self, action: Action) -> Result<(), ActionError> {
        if self.actions.contains_key(action.name()) {
            return Err(ActionError::DuplicateAction(action.name().to_string()));
        }
        if let Some(metadata) = action.metadata() {
            metadata.validate(action.name())?;
        }

        debug!(action = action.name(), "registered action");
        self.actions.insert(action.name().to_string(), action);
        Ok(())
    }

    /// Append a hook for `action`; the action does not need to exist yet
    pub fn register_hook(&mut self, action: &str, phase: HookPhase, handler: Arc<dyn Handler>) {
        debug!(action, %phase, "registered hook");
        self.hooks
            .entry((action.to_string(), phase))
            .or_default()
            .push(handler);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Finish loading; nothing can be registered afterwards
    #[must_use]
    pub fn freeze(self) -> Arc<Registry> {
        let mut orphaned: Vec<_> = self
            .hooks
            .iter()
            .filter(|((action, _), _)| !self.actions.contains_key(action))
            .map(|((action, phase), handlers)| (action.as_str(), *phase, handlers.len()))
            .collect();
        orphaned.sort_unstable();
        for (action, phase, count) in orphaned {
            warn!(action, %phase, count, "hooks registered for an action that does not exist; they will never run");
        }

        Arc::new(Registry {
            actions: self.actions,
            hooks: self.hooks,
        })
    }
}

/// Frozen set of actions and hooks
pub struct Registry {
    actions: BTreeMap<String, Action>,
    hooks: HookMap,
}

impl Registry {
    /// Find an action by name
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnknownAction`] if nothing is registered as `name`.
    pub fn lookup(&self, name: &str) -> Result<&Action, ActionError> {
        self.actions
            .get(name)
            .ok_or_else(|| ActionError::UnknownAction(name.to_string()))
    }

    /// Hooks for `action` in `phase`, in registration order
    #[must_use]
    pub fn hooks(&self, action: &str, phase: HookPhase) -> &[Arc<dyn Handler>] {
        self.hooks
            .get(&(action.to_string(), phase))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All actions, ordered by name
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{CliOption, handler_fn};

    fn noop() -> Arc<dyn Handler> {
        handler_fn(|_, _| Box::pin(async { Ok(()) }))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut builder = RegistryBuilder::new();
        builder.register(Action::new("stageCreate", noop())).unwrap();

        let registry = builder.freeze();

        assert_eq!(registry.lookup("stageCreate").unwrap().name(), "stageCreate");
        assert!(matches!(
            registry.lookup("nope"),
            Err(ActionError::UnknownAction(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut builder = RegistryBuilder::new();
        builder.register(Action::new("a", noop())).unwrap();

        let result = builder.register(Action::new("a", noop()));

        assert!(matches!(result, Err(ActionError::DuplicateAction(name)) if name == "a"));
    }

    #[test]
    fn test_malformed_metadata_is_rejected() {
        let mut builder = RegistryBuilder::new();
        let metadata = CliMetadata::new("stage", "create", "")
            .option(CliOption::value("stage", Some('s'), ""))
            .option(CliOption::value("stage", Some('t'), ""));

        let result = builder.register(Action::new("stageCreate", noop()).with_cli(metadata));

        assert!(matches!(result, Err(ActionError::Validation(_))));
        assert!(!builder.contains("stageCreate"));
    }

    #[test]
    fn test_hooks_keep_registration_order() {
        let mut builder = RegistryBuilder::new();
        let first = noop();
        let second = noop();
        builder.register_hook("later", HookPhase::Pre, Arc::clone(&first));
        builder.register_hook("later", HookPhase::Pre, Arc::clone(&second));
        builder.register(Action::new("later", noop())).unwrap();

        let registry = builder.freeze();
        let hooks = registry.hooks("later", HookPhase::Pre);

        assert_eq!(hooks.len(), 2);
        assert!(Arc::ptr_eq(&hooks[0], &first));
        assert!(Arc::ptr_eq(&hooks[1], &second));
        assert!(registry.hooks("later", HookPhase::Post).is_empty());
    }

    #[test]
    fn test_orphan_hooks_are_kept_inert() {
        let mut builder = RegistryBuilder::new();
        builder.register_hook("ghost", HookPhase::Post, noop());

        let registry = builder.freeze();

        assert_eq!(registry.hooks("ghost", HookPhase::Post).len(), 1);
        assert!(registry.lookup("ghost").is_err());
    }

    #[test]
    fn test_hook_phase_serde() {
        let phase: HookPhase = serde_json::from_str("\"pre\"").unwrap();
        assert_eq!(phase, HookPhase::Pre);
        assert_eq!(serde_json::to_string(&HookPhase::Post).unwrap(), "\"post\"");
        assert_eq!(HookPhase::Post.to_string(), "post");
    }
}
