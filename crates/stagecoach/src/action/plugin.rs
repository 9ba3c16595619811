use std::sync::Arc;

use async_trait::async_trait;
use tracing::{Instrument, debug, info_span};

use super::{ActionError, Registry, RegistryBuilder};

/// A bundle of actions and hooks
///
/// Loading happens in two rounds: every plugin's
/// [`register_actions`](Plugin::register_actions) runs before any plugin's
/// [`register_hooks`](Plugin::register_hooks), so hooks may target actions
/// from any plugin.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Register this plugin's actions
    ///
    /// # Errors
    ///
    /// Propagates registration failures such as
    /// [`ActionError::DuplicateAction`].
    async fn register_actions(&self, registry: &mut RegistryBuilder) -> Result<(), ActionError>;

    /// Register this plugin's hooks
    ///
    /// # Errors
    ///
    /// Implementations may fail if their hook configuration is invalid.
    async fn register_hooks(&self, _registry: &mut RegistryBuilder) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Instantiates plugins into a frozen [`Registry`]
#[derive(Default)]
pub struct PluginLoader {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    #[must_use]
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Register every plugin's actions, then every plugin's hooks, then freeze
    ///
    /// # Errors
    ///
    /// Stops at the first plugin that fails to register.
    pub async fn load(self) -> Result<Arc<Registry>, ActionError> {
        let mut builder = RegistryBuilder::new();

        for plugin in &self.plugins {
            debug!(plugin = plugin.name(), "registering actions");
            plugin
                .register_actions(&mut builder)
                .instrument(info_span!("plugin", name = plugin.name()))
                .await?;
        }

        for plugin in &self.plugins {
            debug!(plugin = plugin.name(), "registering hooks");
            plugin.register_hooks(&mut builder).await?;
        }

        Ok(builder.freeze())
    }
}
