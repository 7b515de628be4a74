//! # Engine Configuration
//!
//! One TOML file configures the whole engine:
//!
//! ```toml
//! [scheduler]
//! refresh_interval_ms = 5000
//!
//! [journal]
//! capacity = 10000
//!
//! [[powerup]]
//! id = 1
//! name = "Hint"
//! price = 15
//! effect_kind = "hint"
//! ```
//!
//! Every section is optional. Without any `[[powerup]]` table the built-in
//! catalog is used.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::catalog::{CatalogEntry, StaticCatalog};
use crate::error::ConfigResult;
use crate::journal::JournalConfig;
use crate::scheduler::SchedulerConfig;

/// Full engine configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Refresh scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Journal settings.
    pub journal: JournalConfig,
    /// Catalog entries.
    pub powerup: Vec<CatalogEntry>,
}

impl EngineConfig {
    /// Production settings with the built-in catalog.
    #[must_use]
    pub fn production() -> Self {
        Self {
            scheduler: SchedulerConfig::production(),
            journal: JournalConfig::production(),
            powerup: Vec::new(),
        }
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed or unknown keys.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Builds the catalog: the configured entries, or the built-in set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` on duplicate ids or invalid entries.
    pub fn catalog(&self) -> ConfigResult<StaticCatalog> {
        if self.powerup.is_empty() {
            return Ok(StaticCatalog::builtin());
        }
        StaticCatalog::from_entries(self.powerup.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.scheduler.refresh_interval_ms, 5_000);
        assert_eq!(config.journal.capacity, 10_000);
        assert_eq!(config.catalog().unwrap().len(), 3);
    }

    #[test]
    fn test_production_config() {
        let config = EngineConfig::production();
        assert_eq!(config.scheduler.refresh_interval_ms, 15_000);
        assert_eq!(config.journal.capacity, 100_000);
        assert!(config.powerup.is_empty());
        assert_eq!(config.catalog().unwrap().len(), 3);
    }

    #[test]
    fn test_full_config() {
        let text = r#"
            [scheduler]
            refresh_interval_ms = 250

            [journal]
            capacity = 64

            [[powerup]]
            id = 5
            name = "Shield"
            price = 80
            effect_kind = "protection"
            cooldown_secs = 600
        "#;
        let config = EngineConfig::from_toml_str(text).unwrap();
        assert_eq!(config.scheduler.refresh_interval_ms, 250);
        assert_eq!(config.journal.capacity, 64);

        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.iter().all(|e| e.has_cooldown()));
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("[metrics]\nenabled = true"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_invalid_entry_surfaces_on_catalog_build() {
        let text = r#"
            [[powerup]]
            id = 1
            name = ""
            price = 1
            effect_kind = "hint"
        "#;
        let config = EngineConfig::from_toml_str(text).unwrap();
        assert!(matches!(config.catalog(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EngineConfig::from_file("/nonexistent/powerups.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
