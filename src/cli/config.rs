//! Configuration commands
//!
//! ploy-learn config show     - Show the effective configuration
//! ploy-learn config validate - Validate configuration

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;

use super::output::{self, OutputMode};
use crate::config::AppConfig;

/// Configuration-related commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration (defaults, files, environment)
    Show {
        /// Configuration section to show (engine, logging, checkpoint)
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Validate the effective configuration
    Validate,
}

impl ConfigCommands {
    pub fn run(self, config: &AppConfig, mode: OutputMode) -> Result<()> {
        match self {
            Self::Show { section } => show_config(config, section.as_deref(), mode),
            Self::Validate => validate_config(config),
        }
    }
}

/// Render the configuration, or one section of it, as TOML
pub fn render_toml(config: &AppConfig, section: Option<&str>) -> Result<String> {
    let value = toml::Value::try_from(config).context("failed to serialize configuration")?;
    let value = match section {
        None => value,
        Some(name) => value
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("unknown configuration section '{name}'"))?,
    };
    toml::to_string_pretty(&value).context("failed to render configuration")
}

fn show_config(config: &AppConfig, section: Option<&str>, mode: OutputMode) -> Result<()> {
    match mode {
        OutputMode::Json => output::print_item(config),
        OutputMode::Table => {
            println!("{}", render_toml(config, section)?);
            Ok(())
        }
    }
}

fn validate_config(config: &AppConfig) -> Result<()> {
    match config.validate() {
        Ok(()) => {
            output::print_success("Configuration is valid");
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                output::print_warn(error);
            }
            Err(anyhow!("{} configuration error(s)", errors.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_roundtrips_through_toml() {
        let mut config = AppConfig::default();
        config.engine.training.batch_size = 64;
        config.engine.seed = Some(9);

        let rendered = render_toml(&config, None).unwrap();
        let parsed: AppConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.engine, config.engine);
        assert_eq!(parsed.checkpoint.prefix, "engine");
    }

    #[test]
    fn test_render_section() {
        let rendered = render_toml(&AppConfig::default(), Some("checkpoint")).unwrap();
        assert!(rendered.contains("max_checkpoints = 5"));
        assert!(render_toml(&AppConfig::default(), Some("nope")).is_err());
    }
}
