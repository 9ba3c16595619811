use stagecoach::config::{AppConfig, ApplyToConfig};

use crate::cli::ClapCli;

impl ApplyToConfig for ClapCli {
    fn apply_to_config(&self, mut config: AppConfig) -> AppConfig {
        // Override project directory if specified
        if let Some(dir) = self.project_directory.as_ref() {
            *config.project_directory_mut() = dir.clone();
        }

        if let Some(concurrency) = self.concurrency {
            *config.max_concurrency_mut() = concurrency;
        }

        // Flags only ever switch these on/off relative to the file
        if self.verbose {
            *config.verbose_mut() = true;
        }
        if self.no_color {
            *config.use_colors_mut() = false;
        }

        config
    }
}
