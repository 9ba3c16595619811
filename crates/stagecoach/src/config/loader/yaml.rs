use std::path::PathBuf;

use ::config::FileFormat;
use tracing::debug;

use crate::{config::AppConfig, fs::FileSystem};

use super::{ConfigLoadError, ConfigLoader};

/// Loads `config.yaml` (or `config.yml`) from the stagecoach config directory
pub struct Yaml<'a, F: FileSystem> {
    fs: &'a F,
}

impl<'a, F: FileSystem> Yaml<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }
}

impl<F: FileSystem> ConfigLoader for Yaml<'_, F> {
    fn load_config(&self) -> Result<AppConfig, ConfigLoadError> {
        let config_paths = match self.find_config_file_paths() {
            Ok(paths) => paths,
            Err(searched) => {
                return Err(ConfigLoadError::NotFound { searched });
            }
        };

        let config_path = match config_paths.as_slice() {
            [] => {
                return Err(ConfigLoadError::NotFound {
                    searched: PathBuf::new(),
                });
            }
            [single] => single,
            _ => {
                return Err(ConfigLoadError::MultipleFound(
                    config_paths
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>(),
                ));
            }
        };
        debug!(path = %config_path.display(), "loading config");

        let file_contents = self.fs.read_file(config_path)?;

        let config = ::config::Config::builder()
            .add_source(::config::File::from_str(&file_contents, FileFormat::Yaml))
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        // Special handling for project_directory ~ expansion
        if let Ok(expanded) = self.fs.expand_path(app_config.project_directory()) {
            app_config.project_directory = expanded;
        }

        Ok(app_config)
    }

    fn find_config_file_paths(&self) -> Result<Vec<PathBuf>, PathBuf> {
        let mut paths = Vec::new();

        if let Ok(config_dir) = self.fs.config_dir() {
            let config_yaml = config_dir.join("config.yaml");
            let config_yml = config_dir.join("config.yml");

            if self.fs.path_exists(&config_yaml) {
                paths.push(config_yaml);
            }
            if self.fs.path_exists(&config_yml) {
                paths.push(config_yml);
            }

            if paths.is_empty() {
                return Err(config_dir);
            }
        }

        Ok(paths)
    }
}
