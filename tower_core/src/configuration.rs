use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Settings for a play session. The milestone pacing table is fixed and is
/// not part of this.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CoreConfiguration {
    #[serde(default = "default_grid_size")]
    pub initial_grid_size: usize,
    /// Seed for tile placement. Random each session when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_grid_size() -> usize {
    4
}

impl Default for CoreConfiguration {
    fn default() -> Self {
        CoreConfiguration {
            initial_grid_size: default_grid_size(),
            seed: None,
        }
    }
}

impl CoreConfiguration {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, CoreError> {
        let configuration: Self = toml::from_str(toml_str)?;
        configuration.validate()?;
        Ok(configuration)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.initial_grid_size < 2 {
            return Err(CoreError::InvalidConfiguration(format!(
                "initial_grid_size must be at least 2, got {}",
                self.initial_grid_size
            )));
        }
        Ok(())
    }
}
