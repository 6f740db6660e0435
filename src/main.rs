use anyhow::anyhow;
use clap::Parser;
use ploy_learn::cli::{self, Cli, Commands};
use ploy_learn::config::AppConfig;
use tracing::debug;

mod main_runtime;

use main_runtime::{init_logging, init_logging_simple};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    // `config validate` reports problems itself
    if !matches!(cli.command, Commands::Config(_)) {
        config
            .validate()
            .map_err(|errors| anyhow!("invalid configuration:\n  {}", errors.join("\n  ")))?;
    }

    let _log_guard = if cli.command.is_long_running() {
        init_logging(&config.logging)
    } else {
        init_logging_simple();
        None
    };
    debug!(config_dir = %cli.config.display(), "Configuration loaded");

    cli::run(cli, config).await
}
