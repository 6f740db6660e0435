//! `ploy-learn simulate`: drive the engine with synthetic trades.

use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use super::output::{self, OutputMode};
use crate::config::AppConfig;
use crate::rl::adaptive::ControllerState;
use crate::rl::core::{TradeAction, TradeOutcome};
use crate::rl::engine::LearningEngine;
use crate::rl::integration::EngineHandle;
use crate::rl::performance::PerformanceSnapshot;
use crate::rl::training::{CheckpointStore, Checkpointer, FileCheckpointStore, TrainingStats};

/// Position size in price units per trade
const NOTIONAL: f64 = 5_000.0;

/// Mean-reverting price process
#[derive(Debug, Clone)]
pub struct SyntheticMarket {
    price: f64,
    mean_price: f64,
    volatility: f64,
    mean_reversion: f64,
    returns: Vec<f64>,
    window: usize,
    rng: StdRng,
}

impl SyntheticMarket {
    pub fn new(window: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        Self {
            price: 0.5,
            mean_price: 0.5,
            volatility: 0.02,
            mean_reversion: 0.3,
            returns: vec![0.0; window],
            window,
            rng,
        }
    }

    /// Standard normal sample (Box-Muller)
    fn sample_normal(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(0.0001..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// Advance one step and return the price move
    pub fn step(&mut self) -> f64 {
        let shock = self.sample_normal() * self.volatility;
        let reversion = self.mean_reversion * (self.mean_price - self.price);
        let before = self.price;
        self.price = (self.price + shock + reversion).clamp(0.01, 0.99);

        let change = self.price - before;
        self.returns.push(change / self.volatility);
        if self.returns.len() > self.window {
            self.returns.remove(0);
        }
        change
    }

    /// Recent normalized returns, newest last; slot 0 holds the distance from the mean
    pub fn features(&self) -> Vec<f64> {
        let mut features = self.returns.clone();
        if let Some(slot) = features.first_mut() {
            *slot = (self.price - self.mean_price) / self.volatility;
        }
        features
    }
}

/// Realized profit of holding `action` over a price move
pub fn trade_profit(action: TradeAction, price_move: f64) -> f64 {
    match action {
        TradeAction::Buy => price_move * NOTIONAL,
        TradeAction::Sell => -price_move * NOTIONAL,
        TradeAction::Hold => 0.0,
    }
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    trades: usize,
    metrics: PerformanceSnapshot,
    controller: ControllerState,
    training: TrainingStats,
    adjustments: usize,
    checkpoint: Option<String>,
}

pub struct SimulateArgs {
    pub trades: usize,
    pub seed: Option<u64>,
    pub checkpoint: Option<PathBuf>,
    pub save: bool,
    pub progress_every: usize,
}

pub async fn run(args: SimulateArgs, mut config: AppConfig, mode: OutputMode) -> anyhow::Result<()> {
    if args.seed.is_some() {
        config.engine.seed = args.seed;
    }
    let state_size = config.engine.network.state_size;
    let engine = LearningEngine::new(config.engine.clone())?;
    let handle = EngineHandle::new(engine);
    let mut market = SyntheticMarket::new(state_size, config.engine.seed);

    for i in 0..args.trades {
        let state_before = market.features();
        let action = handle.predict(state_before.clone()).await?;
        let profit = trade_profit(action, market.step());
        let report = handle
            .learn_from_trade(TradeOutcome::new(
                state_before,
                action,
                profit,
                market.features(),
            ))
            .await?;

        if args.progress_every > 0 && (i + 1) % args.progress_every == 0 {
            let metrics = handle.metrics().await;
            info!(
                trades = report.total_trades,
                win_rate = metrics.win_rate,
                equity = metrics.current_equity,
                loss = report.loss,
                "Simulation progress"
            );
        }
    }

    let checkpoint = save_checkpoint(&handle, &args, &config).await?;

    let (training, adjustments) = handle
        .with_engine(|engine| (engine.training_stats().clone(), engine.adjustments().len()))
        .await;
    let summary = SimulationSummary {
        trades: args.trades,
        metrics: handle.metrics().await,
        controller: handle.controller_state().await,
        training,
        adjustments,
        checkpoint,
    };

    match mode {
        OutputMode::Json => output::print_item(&summary)?,
        OutputMode::Table => {
            output::print_items(&output::metric_rows(&summary.metrics), mode)?;
            output::print_items(&output::controller_rows(&summary.controller), mode)?;
            if let Some(path) = &summary.checkpoint {
                output::print_success(&format!("Checkpoint saved to {path}"));
            }
        }
    }
    Ok(())
}

async fn save_checkpoint(
    handle: &EngineHandle,
    args: &SimulateArgs,
    config: &AppConfig,
) -> anyhow::Result<Option<String>> {
    if let Some(path) = &args.checkpoint {
        let store = FileCheckpointStore::new(path);
        let described = store.describe();
        handle.save(Arc::new(store)).await?;
        return Ok(Some(described));
    }

    if args.save {
        let checkpointer =
            Checkpointer::new(&config.checkpoint.dir, config.checkpoint.max_checkpoints);
        let steps = handle.controller_state().await.train_steps;
        let store = checkpointer.store(&config.checkpoint.checkpoint_name(steps));
        let described = store.describe();
        handle.save(Arc::new(store)).await?;
        checkpointer.cleanup_old_checkpoints();
        return Ok(Some(described));
    }

    Ok(None)
}
