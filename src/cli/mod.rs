//! ploy-learn CLI
//!
//! Commands:
//! - `ploy-learn simulate` - Train the engine on synthetic trades
//! - `ploy-learn inspect` - Show metrics and controller state of a checkpoint
//! - `ploy-learn predict` - Greedy action and Q-values for a state
//! - `ploy-learn list` - List checkpoints in the configured directory
//! - `ploy-learn config` - Show or validate the effective configuration

pub mod checkpoint;
pub mod config;
pub mod output;
pub mod simulate;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use output::OutputMode;

/// Continuous learning engine CLI
#[derive(Parser, Debug)]
#[command(name = "ploy-learn")]
#[command(author, version, about = "Online DQN learning from realized trades")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml plus <PLOY_LEARN_ENV>.toml)
    #[arg(short, long, global = true, default_value = "config")]
    pub config: PathBuf,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed synthetic trade outcomes through the engine
    Simulate {
        /// Number of trades to simulate
        #[arg(short, long, default_value = "500")]
        trades: usize,
        /// RNG seed (overrides engine.seed)
        #[arg(long)]
        seed: Option<u64>,
        /// Save the final state to this file
        #[arg(long)]
        checkpoint: Option<PathBuf>,
        /// Save into the rotating checkpoint directory
        #[arg(long)]
        save: bool,
        /// Log progress every N trades (0 disables)
        #[arg(long, default_value = "100")]
        progress_every: usize,
    },
    /// Load a checkpoint and show its metrics and controller state
    Inspect {
        /// Checkpoint file (default: newest in checkpoint.dir)
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Greedy action and Q-values for a comma-separated state
    Predict {
        /// Checkpoint file (default: newest in checkpoint.dir)
        #[arg(long)]
        checkpoint: Option<PathBuf>,
        /// Feature vector, e.g. "0.1,-0.4,..."
        #[arg(short, long, allow_hyphen_values = true)]
        state: String,
    },
    /// List checkpoints in checkpoint.dir
    List,
    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

impl Commands {
    /// Whether the command runs long enough to want full logging
    pub fn is_long_running(&self) -> bool {
        matches!(self, Commands::Simulate { .. })
    }
}

/// Dispatch a parsed command
pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let mode = OutputMode::from_json_flag(cli.json);

    match cli.command {
        Commands::Simulate {
            trades,
            seed,
            checkpoint,
            save,
            progress_every,
        } => {
            simulate::run(
                simulate::SimulateArgs {
                    trades,
                    seed,
                    checkpoint,
                    save,
                    progress_every,
                },
                config,
                mode,
            )
            .await
        }
        Commands::Inspect { checkpoint } => checkpoint::inspect(checkpoint, &config, mode),
        Commands::Predict { checkpoint, state } => {
            checkpoint::predict(checkpoint, &state, &config, mode)
        }
        Commands::List => checkpoint::list(&config, mode),
        Commands::Config(cmd) => cmd.run(&config, mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate() {
        let cli = Cli::try_parse_from([
            "ploy-learn",
            "simulate",
            "--trades",
            "50",
            "--seed",
            "7",
            "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(cli.command.is_long_running());
        match cli.command {
            Commands::Simulate { trades, seed, save, .. } => {
                assert_eq!(trades, 50);
                assert_eq!(seed, Some(7));
                assert!(!save);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_predict_with_negative_state() {
        let cli =
            Cli::try_parse_from(["ploy-learn", "predict", "--state", "-0.5,0.1"]).unwrap();
        match cli.command {
            Commands::Predict { state, checkpoint } => {
                assert_eq!(state, "-0.5,0.1");
                assert!(checkpoint.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
