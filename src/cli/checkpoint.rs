//! Checkpoint commands: `inspect`, `predict` and `list`.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Serialize;
use tabled::Tabled;

use super::output::{self, OutputMode};
use crate::config::AppConfig;
use crate::rl::adaptive::ControllerState;
use crate::rl::core::TradeAction;
use crate::rl::engine::LearningEngine;
use crate::rl::performance::PerformanceSnapshot;
use crate::rl::training::{Checkpointer, FileCheckpointStore};

#[derive(Debug, Serialize)]
struct InspectReport {
    checkpoint: String,
    parameters: usize,
    metrics: PerformanceSnapshot,
    controller: ControllerState,
}

#[derive(Debug, Serialize, Tabled)]
pub struct QValueRow {
    pub action: String,
    pub q_value: String,
    pub greedy: String,
}

#[derive(Debug, Serialize)]
struct PredictReport {
    action: TradeAction,
    q_values: Vec<f64>,
}

#[derive(Debug, Serialize, Tabled)]
pub struct CheckpointRow {
    pub name: String,
    pub path: String,
}

/// Resolve an explicit path or fall back to the newest checkpoint
fn resolve_checkpoint(explicit: Option<PathBuf>, config: &AppConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let checkpointer =
        Checkpointer::new(&config.checkpoint.dir, config.checkpoint.max_checkpoints);
    let latest = checkpointer.latest_checkpoint().ok_or_else(|| {
        anyhow!(
            "no checkpoints in {}; pass --checkpoint <path>",
            config.checkpoint.dir.display()
        )
    })?;
    Ok(checkpointer.checkpoint_path(&latest))
}

fn load_engine(path: &Path, config: &AppConfig) -> anyhow::Result<LearningEngine> {
    let mut engine = LearningEngine::new(config.engine.clone())?;
    engine
        .load(&FileCheckpointStore::new(path))
        .with_context(|| format!("failed to load checkpoint {}", path.display()))?;
    Ok(engine)
}

/// Parse a comma-separated feature vector
pub fn parse_state(raw: &str) -> anyhow::Result<Vec<f64>> {
    raw.split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid feature value '{}'", v.trim()))
        })
        .collect()
}

pub fn inspect(
    checkpoint: Option<PathBuf>,
    config: &AppConfig,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let path = resolve_checkpoint(checkpoint, config)?;
    let engine = load_engine(&path, config)?;

    let report = InspectReport {
        checkpoint: path.display().to_string(),
        parameters: engine.online().network().parameter_count(),
        metrics: engine.metrics(),
        controller: engine.controller_state(),
    };

    match mode {
        OutputMode::Json => output::print_item(&report)?,
        OutputMode::Table => {
            println!("Checkpoint: {}", report.checkpoint);
            println!("Parameters: {}", report.parameters);
            output::print_items(&output::metric_rows(&report.metrics), mode)?;
            output::print_items(&output::controller_rows(&report.controller), mode)?;
        }
    }
    Ok(())
}

pub fn predict(
    checkpoint: Option<PathBuf>,
    state: &str,
    config: &AppConfig,
    mode: OutputMode,
) -> anyhow::Result<()> {
    let path = resolve_checkpoint(checkpoint, config)?;
    let engine = load_engine(&path, config)?;
    let state = parse_state(state)?;

    let q_values = engine.q_values(&state)?;
    let action = engine.greedy_action(&state)?;

    match mode {
        OutputMode::Json => output::print_item(&PredictReport { action, q_values })?,
        OutputMode::Table => {
            let rows: Vec<QValueRow> = TradeAction::all()
                .iter()
                .zip(q_values.iter())
                .map(|(a, q)| QValueRow {
                    action: a.to_string(),
                    q_value: format!("{:.6}", q),
                    greedy: if *a == action { "*".to_string() } else { String::new() },
                })
                .collect();
            output::print_items(&rows, mode)?;
        }
    }
    Ok(())
}

pub fn list(config: &AppConfig, mode: OutputMode) -> anyhow::Result<()> {
    let checkpointer =
        Checkpointer::new(&config.checkpoint.dir, config.checkpoint.max_checkpoints);
    let rows: Vec<CheckpointRow> = checkpointer
        .list_checkpoints()
        .into_iter()
        .map(|name| CheckpointRow {
            path: checkpointer.checkpoint_path(&name).display().to_string(),
            name,
        })
        .collect();

    if rows.is_empty() && mode == OutputMode::Table {
        output::print_warn(&format!(
            "No checkpoints in {}",
            checkpointer.dir().display()
        ));
        return Ok(());
    }
    output::print_items(&rows, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state() {
        assert_eq!(parse_state("0.1, -2,3e-1").unwrap(), vec![0.1, -2.0, 0.3]);
        assert!(parse_state("0.1,abc").is_err());
        assert!(parse_state("").is_err());
    }

    #[test]
    fn test_resolve_prefers_explicit_path() {
        let config = AppConfig::default();
        let path = resolve_checkpoint(Some(PathBuf::from("/tmp/x.json")), &config).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x.json"));
    }
}
