//! Hierarchical configuration loading for the CLI binary.
//!
//! Lives entirely outside [`crate::services::orchestrator::run`]'s call
//! graph: the binary loads an [`AppConfig`], then hands the library only
//! the plain [`EngineConfig`] it needs.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::EngineConfig;
use crate::infrastructure::logging::LogConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment could not merge or deserialize the configuration sources.
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    /// `max_workers` was zero.
    #[error("max_workers must be at least 1")]
    InvalidMaxWorkers,

    /// `logging.level` did not parse as a `tracing` level.
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
}

/// Everything the binary needs to run: engine configuration plus logging.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Engine configuration, handed to [`crate::services::orchestrator::run`] as-is.
    #[serde(flatten)]
    pub engine: EngineConfig,

    /// Logging configuration, consumed only by the binary.
    #[serde(default)]
    pub logging: LogConfig,
}

/// Loads [`AppConfig`] from defaults, `firsttry.toml`, `firsttry.local.toml`,
/// and `FIRSTTRY_`-prefixed environment variables, in ascending precedence.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a run rooted at `repo_root`. The returned
    /// `engine.repo_root` is always `repo_root`, regardless of what any
    /// config file says, since the repository root is a command-line
    /// concern, not a persisted setting.
    pub fn load(repo_root: &Path) -> Result<AppConfig, ConfigError> {
        let mut config: AppConfig = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(repo_root.join("firsttry.toml")))
            .merge(Toml::file(repo_root.join("firsttry.local.toml")))
            .merge(Env::prefixed("FIRSTTRY_").split("__"))
            .extract()?;

        config.engine.repo_root = repo_root.to_path_buf();
        Self::validate(&config)?;
        Ok(config)
    }

    fn validate(config: &AppConfig) -> Result<(), ConfigError> {
        if config.engine.max_workers == 0 {
            return Err(ConfigError::InvalidMaxWorkers);
        }
        if config.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        Ok(())
    }
}
