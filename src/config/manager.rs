use super::evolution::EvolutionConfig;
use super::grammar::GrammarConfig;
use super::traits::ConfigSection;
use crate::error::{GramevoError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete application configuration: every engine parameter plus the
/// grammar source, loadable from one TOML or JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub evolution: EvolutionConfig,
    pub grammar: GrammarConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.evolution.validate()?;
        self.grammar.validate()?;
        Ok(())
    }
}

/// Loads and persists `AppConfig` files. Missing keys fall back to defaults,
/// so a partial file is enough to override just a few parameters.
#[derive(Debug, Clone, Copy)]
pub struct ConfigManager;

impl ConfigManager {
    pub fn load(path: &Path) -> Result<AppConfig> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;
        let app: AppConfig = settings.try_deserialize()?;
        app.validate()?;
        log::debug!("configuration loaded from {}", path.display());
        Ok(app)
    }

    pub fn save(app: &AppConfig, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(app)
            .map_err(|e| GramevoError::Configuration(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}
