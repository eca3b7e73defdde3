//! Layered configuration
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. TOML file: `--config`, else `STEPWISE_CONFIG_PATH`, else `./stepwise.toml` if present
//! 3. Environment variables `STEPWISE_<SECTION>__<KEY>` (a `.env` file is loaded first)
//! 4. Explicit overrides set on the builder (CLI flags)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::interpreter::executor::ScopeSettings;

const ENV_PREFIX: &str = "STEPWISE";
const CONFIG_PATH_VAR: &str = "STEPWISE_CONFIG_PATH";
const DEFAULT_CONFIG_FILE: &str = "stepwise.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterpreterConfig {
    /// Seconds to wait between retry attempts
    pub retry_delay_secs: f64,
    /// Factor applied to every `delay` statement (0 skips them)
    pub delay_scale: f64,
    pub include_dir: PathBuf,
    pub include_extension: String,
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        let settings = ScopeSettings::default();
        InterpreterConfig {
            retry_delay_secs: settings.retry_delay.as_secs_f64(),
            delay_scale: settings.delay_scale,
            include_dir: settings.include_dir,
            include_extension: settings.include_extension,
            max_call_depth: settings.max_call_depth,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// JSON file of canned remote responses and module sources
    pub mock_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load from the default sources with no overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Interpreter settings handed to every scope
    pub fn scope_settings(&self) -> Result<ScopeSettings, ConfigError> {
        let delay = self.interpreter.retry_delay_secs;
        let retry_delay = Duration::try_from_secs_f64(delay).map_err(|_| {
            ConfigError::Invalid(format!(
                "interpreter.retry_delay_secs must be a non-negative number of seconds \
                 that fits a duration, got {}",
                delay
            ))
        })?;
        Ok(ScopeSettings {
            retry_delay,
            delay_scale: self.interpreter.delay_scale,
            include_dir: self.interpreter.include_dir.clone(),
            include_extension: self.interpreter.include_extension.clone(),
            max_call_depth: self.interpreter.max_call_depth,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.scope_settings()?;
        let scale = self.interpreter.delay_scale;
        if !scale.is_finite() || scale < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "interpreter.delay_scale must be a non-negative number, got {}",
                scale
            )));
        }
        if self.interpreter.max_call_depth == 0 {
            return Err(ConfigError::Invalid(
                "interpreter.max_call_depth must be at least 1".to_string(),
            ));
        }
        if self.interpreter.include_extension.is_empty() {
            return Err(ConfigError::Invalid(
                "interpreter.include_extension must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder applying explicit overrides on top of the layered sources
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    include_dir: Option<PathBuf>,
    mock_file: Option<PathBuf>,
    retry_delay_secs: Option<f64>,
    log_level: Option<String>,
    skip_env: bool,
}

impl ConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn include_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.include_dir = dir;
        self
    }

    pub fn mock_file(mut self, path: Option<PathBuf>) -> Self {
        self.mock_file = path;
        self
    }

    pub fn retry_delay_secs(mut self, secs: Option<f64>) -> Self {
        self.retry_delay_secs = secs;
        self
    }

    pub fn log_level(mut self, level: Option<String>) -> Self {
        self.log_level = level;
        self
    }

    /// Ignore `STEPWISE_*` environment variables and `.env`
    pub fn skip_env(mut self, skip: bool) -> Self {
        self.skip_env = skip;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        if !self.skip_env {
            // A missing .env is not an error
            let _ = dotenvy::dotenv();
        }

        let defaults = InterpreterConfig::default();
        let mut builder = config::Config::builder()
            .set_default("interpreter.retry_delay_secs", defaults.retry_delay_secs)?
            .set_default("interpreter.delay_scale", defaults.delay_scale)?
            .set_default(
                "interpreter.include_dir",
                defaults.include_dir.to_string_lossy().into_owned(),
            )?
            .set_default("interpreter.include_extension", defaults.include_extension)?
            .set_default("interpreter.max_call_depth", defaults.max_call_depth as u64)?
            .set_default("log.level", LogConfig::default().level)?;

        // Config file: explicit path > env var > ./stepwise.toml
        let env_path = if self.skip_env {
            None
        } else {
            std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from)
        };
        match self.config_path.clone().or(env_path) {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path));
                }
                tracing::debug!(path = %path.display(), "loading config file");
                builder = builder.add_source(
                    config::File::new(&path.to_string_lossy(), config::FileFormat::Toml)
                        .required(true),
                );
            }
            None => {
                builder = builder.add_source(
                    config::File::new(DEFAULT_CONFIG_FILE, config::FileFormat::Toml)
                        .required(false),
                );
            }
        }

        if !self.skip_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        builder = builder
            .set_override_option(
                "interpreter.include_dir",
                self.include_dir
                    .map(|dir| dir.to_string_lossy().into_owned()),
            )?
            .set_override_option(
                "resolver.mock_file",
                self.mock_file
                    .map(|path| path.to_string_lossy().into_owned()),
            )?
            .set_override_option("interpreter.retry_delay_secs", self.retry_delay_secs)?
            .set_override_option("log.level", self.log_level)?;

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
