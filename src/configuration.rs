use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tower_core::configuration::CoreConfiguration;

pub const DEFAULT_LOG_FILE: &str = "tower_2048.log";

/// Settings for the terminal game. Everything is optional in the file.
///
/// ```toml
/// log_file = "debug.log"
///
/// [core]
/// initial_grid_size = 4
/// seed = 7
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct AppConfiguration {
    pub core: CoreConfiguration,
    /// Where the best score is kept. Defaults to the user data directory.
    pub high_score_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

impl AppConfiguration {
    pub fn from_toml_str(text: &str) -> crate::Result<Self> {
        let configuration: AppConfiguration = toml::from_str(text)?;
        configuration.core.validate()?;
        Ok(configuration)
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE))
    }
}
