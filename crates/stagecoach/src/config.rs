pub mod loader;

pub use self::loader::{ApplyToConfig, ConfigLoadError, ConfigLoader, Yaml as YamlLoader};

use std::{
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    time::Duration,
};

use serde::Deserialize;

use crate::action::HookPhase;

const VERBOSE_DEFAULT: bool = false;
const USE_COLORS_DEFAULT: bool = true;
const MAX_CONCURRENCY_DEFAULT: NonZeroUsize = NonZeroUsize::new(5).unwrap();
const MAX_DISPATCH_DEPTH_DEFAULT: NonZeroUsize = NonZeroUsize::new(32).unwrap();
const COMMAND_TIMEOUT_DEFAULT: NonZeroU64 = NonZeroU64::new(60).unwrap();

/// Comprehensive application configuration that combines file config and CLI args
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    // Core settings
    pub(crate) project_directory: PathBuf,

    // UI settings
    #[serde(default)]
    pub(crate) verbose: bool,

    #[serde(default = "default_use_colors")]
    pub(crate) use_colors: bool,

    // Execution settings
    #[serde(default = "default_max_concurrency")]
    pub(crate) max_concurrency: NonZeroUsize,

    #[serde(default = "default_max_dispatch_depth")]
    pub(crate) max_dispatch_depth: NonZeroUsize,

    #[serde(default = "default_command_timeout")]
    pub(crate) command_timeout: NonZeroU64,

    // Plugin settings
    #[serde(default)]
    pub(crate) plugins: Option<Vec<String>>,

    #[serde(default)]
    pub(crate) hooks: Vec<HookConfig>,
}

/// A shell command to run as a hook around an action
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HookConfig {
    pub(crate) action: String,
    pub(crate) phase: HookPhase,
    pub(crate) run: String,
}

impl HookConfig {
    #[must_use]
    pub fn new(action: &str, phase: HookPhase, run: &str) -> Self {
        Self {
            action: action.to_string(),
            phase,
            run: run.to_string(),
        }
    }

    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[must_use]
    pub fn phase(&self) -> HookPhase {
        self.phase
    }

    #[must_use]
    pub fn run(&self) -> &str {
        &self.run
    }
}

fn default_use_colors() -> bool {
    USE_COLORS_DEFAULT
}
fn default_max_concurrency() -> NonZeroUsize {
    MAX_CONCURRENCY_DEFAULT
}
fn default_max_dispatch_depth() -> NonZeroUsize {
    MAX_DISPATCH_DEPTH_DEFAULT
}
fn default_command_timeout() -> NonZeroU64 {
    COMMAND_TIMEOUT_DEFAULT
}

impl AppConfig {
    #[must_use]
    pub fn project_directory(&self) -> &PathBuf {
        &self.project_directory
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    #[must_use]
    pub fn use_colors(&self) -> bool {
        self.use_colors
    }

    #[must_use]
    pub fn max_concurrency(&self) -> NonZeroUsize {
        self.max_concurrency
    }

    #[must_use]
    pub fn max_dispatch_depth(&self) -> NonZeroUsize {
        self.max_dispatch_depth
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout.into())
    }

    /// Built-in plugins to load; `None` means all of them
    #[must_use]
    pub fn plugins(&self) -> Option<&[String]> {
        self.plugins.as_deref()
    }

    #[must_use]
    pub fn hooks(&self) -> &[HookConfig] {
        &self.hooks
    }

    pub fn project_directory_mut(&mut self) -> &mut PathBuf {
        &mut self.project_directory
    }

    pub fn verbose_mut(&mut self) -> &mut bool {
        &mut self.verbose
    }

    pub fn use_colors_mut(&mut self) -> &mut bool {
        &mut self.use_colors
    }

    pub fn max_concurrency_mut(&mut self) -> &mut NonZeroUsize {
        &mut self.max_concurrency
    }
}

/// Builder pattern for `AppConfig` testing
///
#[derive(Default, Debug)]
pub struct AppConfigBuilder {
    project_directory: PathBuf,
    verbose: Option<bool>,
    use_colors: Option<bool>,
    max_concurrency: Option<NonZeroUsize>,
    max_dispatch_depth: Option<NonZeroUsize>,
    command_timeout: Option<NonZeroU64>,
    plugins: Option<Vec<String>>,
    hooks: Vec<HookConfig>,
}

impl AppConfigBuilder {
    #[must_use]
    pub fn project_directory<D>(mut self, project_directory: D) -> Self
    where
        D: AsRef<std::ffi::OsStr>,
    {
        self.project_directory = PathBuf::from(project_directory.as_ref());
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    #[must_use]
    pub fn use_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = Some(use_colors);
        self
    }

    #[must_use]
    pub fn max_concurrency_unchecked(mut self, max: usize) -> Self {
        self.max_concurrency = Some(NonZeroUsize::new(max).unwrap());
        self
    }

    #[must_use]
    pub fn max_dispatch_depth_unchecked(mut self, max: usize) -> Self {
        self.max_dispatch_depth = Some(NonZeroUsize::new(max).unwrap());
        self
    }

    #[must_use]
    pub fn command_timeout_unchecked(mut self, timeout: u64) -> Self {
        self.command_timeout = Some(NonZeroU64::new(timeout).unwrap());
        self
    }

    #[must_use]
    pub fn plugins(mut self, plugins: &[&str]) -> Self {
        self.plugins = Some(plugins.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn hook(mut self, hook: HookConfig) -> Self {
        self.hooks.push(hook);
        self
    }

    #[must_use]
    pub fn build(self) -> AppConfig {
        AppConfig {
            project_directory: self.project_directory,
            verbose: self.verbose.unwrap_or(VERBOSE_DEFAULT),
            use_colors: self.use_colors.unwrap_or(USE_COLORS_DEFAULT),
            max_concurrency: self.max_concurrency.unwrap_or(MAX_CONCURRENCY_DEFAULT),
            max_dispatch_depth: self
                .max_dispatch_depth
                .unwrap_or(MAX_DISPATCH_DEPTH_DEFAULT),
            command_timeout: self.command_timeout.unwrap_or(COMMAND_TIMEOUT_DEFAULT),
            plugins: self.plugins,
            hooks: self.hooks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_app_config_builder() {
        let config = AppConfigBuilder::default()
            .project_directory("/test/project")
            .verbose(true)
            .use_colors(false)
            .max_concurrency_unchecked(3)
            .max_dispatch_depth_unchecked(8)
            .command_timeout_unchecked(120)
            .build();

        assert_eq!(config.project_directory, PathBuf::from("/test/project"));
        assert!(config.verbose);
        assert!(!config.use_colors);
        assert_eq!(config.max_concurrency().get(), 3);
        assert_eq!(config.max_dispatch_depth().get(), 8);
        assert_eq!(config.command_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_mutable_accessors() {
        let mut config = AppConfigBuilder::default()
            .project_directory("/old/path")
            .verbose(false)
            .use_colors(true)
            .build();

        *config.project_directory_mut() = PathBuf::from("/new/path");
        *config.verbose_mut() = true;
        *config.use_colors_mut() = false;
        *config.max_concurrency_mut() = NonZeroUsize::new(2).unwrap();

        assert_eq!(config.project_directory(), &PathBuf::from("/new/path"));
        assert!(config.verbose());
        assert!(!config.use_colors());
        assert_eq!(config.max_concurrency().get(), 2);
    }

    #[test]
    fn test_default_values() {
        let config = AppConfigBuilder::default()
            .project_directory("/test/project")
            .build();

        assert_eq!(config.verbose(), VERBOSE_DEFAULT);
        assert_eq!(config.use_colors(), USE_COLORS_DEFAULT);
        assert_eq!(config.max_concurrency().get(), 5);
        assert_eq!(config.max_dispatch_depth().get(), 32);
        assert_eq!(config.command_timeout().as_secs(), 60);
        assert!(config.plugins().is_none());
        assert!(config.hooks().is_empty());
    }

    #[test]
    fn test_serde_deserialization() {
        let yaml = r#"
            project_directory: "/opt/project"
            verbose: true
            use_colors: false
            max_concurrency: 3
            max_dispatch_depth: 10
            command_timeout: 90
            plugins: ["stage", "region", "function"]
            hooks:
              - action: functionDeploy
                phase: pre
                run: "cargo test"
              - action: functionDeploy
                phase: post
                run: "echo done"
        "#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.project_directory, PathBuf::from("/opt/project"));
        assert!(config.verbose);
        assert!(!config.use_colors);
        assert_eq!(config.max_concurrency.get(), 3);
        assert_eq!(config.max_dispatch_depth.get(), 10);
        assert_eq!(config.command_timeout.get(), 90);
        assert_eq!(
            config.plugins(),
            Some(&["stage".to_string(), "region".to_string(), "function".to_string()][..])
        );
        assert_eq!(
            config.hooks(),
            &[
                HookConfig::new("functionDeploy", HookPhase::Pre, "cargo test"),
                HookConfig::new("functionDeploy", HookPhase::Post, "echo done"),
            ]
        );
    }

    #[test]
    fn test_serde_partial_deserialization() {
        let yaml = r#"
            project_directory: "/dev/project"
        "#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.project_directory, PathBuf::from("/dev/project"));
        assert!(!config.verbose);
        assert!(config.use_colors);
        assert_eq!(config.max_concurrency.get(), 5);
        assert_eq!(config.command_timeout.get(), 60);
    }

    #[test]
    fn test_serde_rejects_zero_concurrency() {
        let yaml = r#"
            project_directory: "/dev/project"
            max_concurrency: 0
        "#;

        let result: Result<AppConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }
}
