/// Application configuration
use crate::error::{CliError, Result};
use cadence_core::Catalog;
use cadence_playback::{CoordinatorConfig, VirtualEngineConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when none is given
const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub engine: VirtualEngineConfig,

    #[serde(default)]
    pub library: LibrarySettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LibrarySettings {
    /// Catalog file; the bundled sample catalog is used when unset
    #[serde(default)]
    pub catalog: Option<PathBuf>,

    /// Directory holding bundled audio resources
    #[serde(default)]
    pub bundle_dir: Option<PathBuf>,
}

impl LibrarySettings {
    /// Catalog at `path`, else the configured catalog, else the bundled samples
    pub fn load_catalog(&self, path: Option<&Path>) -> Result<Catalog> {
        match path.or(self.catalog.as_deref()) {
            Some(path) => Ok(Catalog::load(path)?),
            None => Ok(Catalog::seed()),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// Environment variables use the `CADENCE_` prefix and `__` between
    /// nested keys, e.g. `CADENCE_COORDINATOR__POLL_INTERVAL_MS=250`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Load configuration, reading environment overrides from `env` instead
    /// of the process environment when given
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(CliError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        // Override with environment variables (prefixed with CADENCE_)
        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;
        tracing::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.coordinator.poll_interval_ms == 0 {
            return Err(CliError::Config(
                "coordinator.poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.engine.tick_ms == 0 {
            return Err(CliError::Config(
                "engine.tick_ms must be greater than zero".to_string(),
            ));
        }

        if self.engine.default_item_secs == 0 {
            return Err(CliError::Config(
                "engine.default_item_secs must be greater than zero".to_string(),
            ));
        }

        if let Some(catalog) = &self.library.catalog {
            if !catalog.is_file() {
                return Err(CliError::Config(format!(
                    "Catalog not found at {:?}",
                    catalog
                )));
            }
        }

        if let Some(dir) = &self.library.bundle_dir {
            if !dir.is_dir() {
                return Err(CliError::Config(format!(
                    "Bundle directory not found at {:?}",
                    dir
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert_eq!(config.coordinator.poll_interval_ms, 500);
        assert_eq!(config.engine.default_item_secs, 180);
        assert!(config.library.catalog.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = AppConfig::default();
        config.coordinator.poll_interval_ms = 0;
        assert!(matches!(config.validate(), Err(CliError::Config(_))));
    }

    #[test]
    fn missing_catalog_is_rejected() {
        let mut config = AppConfig::default();
        config.library.catalog = Some(PathBuf::from("/no/such/catalog.toml"));
        assert!(config.validate().is_err());
    }
}
