use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::rl::config::EngineConfig;
use crate::rl::training::{step_name, timestamped_name};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for the daily-rotated log file; console only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Directory holding named checkpoints
    #[serde(default = "default_checkpoint_dir")]
    pub dir: PathBuf,
    /// Checkpoints kept after rotation
    #[serde(default = "default_max_checkpoints")]
    pub max_checkpoints: usize,
    /// Name prefix for generated checkpoints
    #[serde(default = "default_checkpoint_prefix")]
    pub prefix: String,
    /// How generated checkpoints are named
    #[serde(default)]
    pub naming: CheckpointNaming,
}

/// Suffix scheme for generated checkpoint names.
///
/// Rotation orders names lexically, so keep one scheme per directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointNaming {
    /// `<prefix>_step<train_steps>`
    #[default]
    Step,
    /// `<prefix>_<YYYYmmdd_HHMMSS>`
    Timestamp,
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("./checkpoints")
}

fn default_max_checkpoints() -> usize {
    5
}

fn default_checkpoint_prefix() -> String {
    "engine".to_string()
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            dir: default_checkpoint_dir(),
            max_checkpoints: default_max_checkpoints(),
            prefix: default_checkpoint_prefix(),
            naming: CheckpointNaming::default(),
        }
    }
}

impl CheckpointConfig {
    /// Name for a checkpoint taken after `train_steps` steps
    pub fn checkpoint_name(&self, train_steps: u64) -> String {
        match self.naming {
            CheckpointNaming::Step => step_name(&self.prefix, train_steps),
            CheckpointNaming::Timestamp => timestamped_name(&self.prefix),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("checkpoint.max_checkpoints", 5)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("PLOY_LEARN_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (PLOY_LEARN_ENGINE__TRAINING__BATCH_SIZE, etc.)
            .add_source(
                Environment::with_prefix("PLOY_LEARN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = match self.engine.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if self.checkpoint.max_checkpoints == 0 {
            errors.push("checkpoint.max_checkpoints must be > 0".to_string());
        }
        if self.checkpoint.prefix.trim().is_empty() {
            errors.push("checkpoint.prefix must not be empty".to_string());
        }
        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            errors.push(format!("unknown logging.level: {}", self.logging.level));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
