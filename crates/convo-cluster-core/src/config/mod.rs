//! Configuration management for the clustering engine.
//!
//! Configuration is fixed for the duration of one invocation; the engine
//! copies what it needs at construction time.

mod sub_configs;

#[cfg(test)]
mod tests;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

pub use sub_configs::{ClusteringConfig, ConsolidationConfig, LoggingConfig, DEFAULT_MAX_BATCH_SIZE};

/// Environment variable selecting the environment-specific config file.
pub const ENV_VAR: &str = "CONVO_CLUSTER_ENV";

/// Prefix of environment overrides, e.g. `CONVO_CLUSTER__CLUSTERING__LINKAGE`.
pub const ENV_PREFIX: &str = "CONVO_CLUSTER";

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub clustering: ClusteringConfig,
    #[serde(default)]
    pub consolidation: ConsolidationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/default.toml (base settings)
    /// 2. config/{CONVO_CLUSTER_ENV}.toml (environment-specific)
    /// 3. Environment variables with CONVO_CLUSTER__ prefix
    pub fn load() -> CoreResult<Self> {
        let env = std::env::var(ENV_VAR).unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults for testing/development.
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without validating it.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string_pretty(self).map_err(|e| CoreError::SerializationError(e.to_string()))
    }

    /// Validate configuration values.
    pub fn validate(&self) -> CoreResult<()> {
        self.clustering.validate()?;
        self.consolidation.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
