//! Continuous Learning Engine
//!
//! Turns closed trades into DQN updates, serves epsilon-greedy actions, and
//! lets the adaptive controller retune itself from live performance.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{LearnError, PersistenceError, Result};
use crate::rl::adaptive::{AdaptiveController, AdjustmentEvent, ControllerState};
use crate::rl::config::EngineConfig;
use crate::rl::core::{
    argmax, ProfitRewardFunction, RewardFunction, RewardSignal, TradeAction, TradeOutcome,
    NUM_ACTIONS,
};
use crate::rl::memory::{ReplayBuffer, Transition};
use crate::rl::networks::{QFunction, QNetwork};
use crate::rl::performance::{PerformanceSnapshot, PerformanceTracker};
use crate::rl::training::{
    CheckpointStore, DqnTrainer, EngineCheckpoint, TrainOutcome, TrainingStats,
    CHECKPOINT_FORMAT_VERSION,
};

/// What happened while learning from one trade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnReport {
    /// Shaped reward stored with the transition
    pub reward: RewardSignal,
    /// Loss of the training step, if one ran
    pub loss: Option<f64>,
    /// Whether the target network was synced during this trade
    pub target_synced: bool,
    /// Adjustment applied by the controller, if any
    pub adjustment: Option<AdjustmentEvent>,
    /// Buffer length after the append
    pub buffer_len: usize,
    pub total_trades: u64,
}

/// Online DQN learner fed by realized trades
pub struct LearningEngine<Q: QFunction = QNetwork> {
    config: EngineConfig,
    buffer: ReplayBuffer,
    trainer: DqnTrainer<Q>,
    tracker: PerformanceTracker,
    controller: AdaptiveController,
    state: ControllerState,
    reward_fn: Box<dyn RewardFunction>,
    rng: StdRng,
}

impl LearningEngine<QNetwork> {
    /// Engine with a freshly initialized dense Q-network
    pub fn new(config: EngineConfig) -> Result<Self> {
        validate_config(&config)?;
        let mut rng = seeded_rng(config.seed);
        let network = QNetwork::new(config.network.state_size, &config.layer_widths(), &mut rng);
        Self::build(config, network, rng)
    }
}

impl<Q: QFunction> LearningEngine<Q> {
    /// Engine around a caller-supplied approximator
    pub fn with_network(config: EngineConfig, network: Q) -> Result<Self> {
        validate_config(&config)?;
        let rng = seeded_rng(config.seed);
        Self::build(config, network, rng)
    }

    fn build(config: EngineConfig, network: Q, rng: StdRng) -> Result<Self> {
        if network.input_dim() != config.network.state_size {
            return Err(LearnError::shape(
                "network input_dim",
                config.network.state_size,
                network.input_dim(),
            ));
        }
        if network.output_dim() != NUM_ACTIONS {
            return Err(LearnError::shape(
                "network output_dim",
                NUM_ACTIONS,
                network.output_dim(),
            ));
        }

        let trainer = DqnTrainer::new(
            network,
            config.training.clone(),
            config.exploration.clone(),
        )?;

        info!(
            state_size = config.network.state_size,
            buffer_size = config.training.buffer_size,
            batch_size = config.training.batch_size,
            "Learning engine initialized"
        );

        Ok(Self {
            buffer: ReplayBuffer::new(config.training.buffer_size),
            trainer,
            tracker: PerformanceTracker::new(),
            controller: AdaptiveController::new(config.adaptive.clone()),
            state: ControllerState::from_config(&config),
            reward_fn: Box::new(ProfitRewardFunction::new()),
            rng,
            config,
        })
    }

    /// Online Q-values for `state`
    pub fn q_values(&self, state: &[f64]) -> Result<Vec<f64>> {
        crate::rl::core::validate_state(state, self.config.network.state_size, "predict state")?;
        self.trainer.online().predict(state)
    }

    /// Greedy action for `state`; ties go to the lowest action index
    pub fn greedy_action(&self, state: &[f64]) -> Result<TradeAction> {
        let q = self.q_values(state)?;
        let idx = argmax(&q)
            .ok_or_else(|| LearnError::Internal(format!("no maximal Q-value in {:?}", q)))?;
        TradeAction::try_from_index(idx)
    }

    /// Epsilon-greedy action for `state`
    pub fn predict(&mut self, state: &[f64]) -> Result<TradeAction> {
        let greedy = self.greedy_action(state)?;
        if self.rng.gen::<f64>() < self.state.exploration_rate {
            let idx = self.rng.gen_range(0..NUM_ACTIONS);
            return TradeAction::try_from_index(idx);
        }
        Ok(greedy)
    }

    /// Learn from one closed trade.
    ///
    /// The outcome is validated before anything is mutated. Once appended,
    /// the trade is always recorded in performance and seen by the
    /// controller; a failed training step is returned as an error after that.
    pub fn learn_from_trade(&mut self, outcome: TradeOutcome) -> Result<LearnReport> {
        if let Err(e) = outcome.validate(self.config.network.state_size) {
            warn!(error = %e, "Rejected trade outcome");
            return Err(e);
        }

        let reward = self.reward_fn.compute(outcome.profit);
        self.buffer.push(Transition::terminal(
            outcome.state_before,
            outcome.action,
            reward.total,
            outcome.state_after,
        ));

        let trained = if self.trainer.ready(&self.buffer) {
            Some(self.trainer.train(&self.buffer, &mut self.state, &mut self.rng))
        } else {
            None
        };

        let metrics = self.tracker.record_at(outcome.profit, outcome.closed_at).clone();
        let adjustment = self.controller.maybe_adjust(&metrics, &mut self.state);

        let trained: Option<TrainOutcome> = match trained.transpose() {
            Ok(trained) => trained,
            Err(e) => {
                warn!(
                    error = %e,
                    trades = metrics.total_trades,
                    lr = self.state.learning_rate,
                    "Training step failed; trade recorded without an update"
                );
                return Err(e);
            }
        };

        debug!(
            profit = outcome.profit,
            reward = reward.total,
            action = %outcome.action,
            trades = metrics.total_trades,
            "Learned from trade"
        );

        Ok(LearnReport {
            reward,
            loss: trained.map(|t| t.loss),
            target_synced: trained.map(|t| t.target_synced).unwrap_or(false),
            adjustment,
            buffer_len: self.buffer.len(),
            total_trades: metrics.total_trades,
        })
    }

    /// Current performance metrics
    pub fn metrics(&self) -> PerformanceSnapshot {
        self.tracker.metrics()
    }

    pub fn controller_state(&self) -> ControllerState {
        self.state
    }

    /// Override epsilon, e.g. to force greedy evaluation
    pub fn set_exploration_rate(&mut self, rate: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(LearnError::Validation(format!(
                "exploration rate {} outside [0, 1]",
                rate
            )));
        }
        self.state.exploration_rate = rate;
        Ok(())
    }

    pub fn training_stats(&self) -> &TrainingStats {
        self.trainer.stats()
    }

    /// Recent controller adjustments, oldest first
    pub fn adjustments(&self) -> Vec<AdjustmentEvent> {
        self.controller.history().cloned().collect()
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn online(&self) -> &Q {
        self.trainer.online()
    }

    /// Capture the persistent state
    pub fn checkpoint(&self) -> EngineCheckpoint<Q::Params, Q::OptimizerState> {
        EngineCheckpoint {
            format_version: CHECKPOINT_FORMAT_VERSION,
            saved_at: Utc::now(),
            state_size: self.config.network.state_size,
            action_size: NUM_ACTIONS,
            online: self.trainer.online().parameters(),
            target: self.trainer.target().parameters(),
            optimizer: Some(self.trainer.online().optimizer_state()),
            training: self.trainer.stats().clone(),
            controller: self.state,
            metrics: self.tracker.metrics(),
            trades: self.tracker.trades().to_vec(),
        }
    }

    /// Restore a captured state.
    ///
    /// Everything is staged first; on error the engine is left untouched.
    /// The replay buffer is not part of a checkpoint and is kept.
    pub fn restore(
        &mut self,
        checkpoint: EngineCheckpoint<Q::Params, Q::OptimizerState>,
    ) -> Result<()> {
        if checkpoint.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(incompatible(format!(
                "format version {} (expected {})",
                checkpoint.format_version, CHECKPOINT_FORMAT_VERSION
            )));
        }
        if checkpoint.state_size != self.config.network.state_size {
            return Err(incompatible(format!(
                "state_size {} (engine expects {})",
                checkpoint.state_size, self.config.network.state_size
            )));
        }
        if checkpoint.action_size != NUM_ACTIONS {
            return Err(incompatible(format!(
                "action_size {} (engine expects {})",
                checkpoint.action_size, NUM_ACTIONS
            )));
        }

        let mut online = self.trainer.online().clone();
        online
            .set_parameters(checkpoint.online)
            .map_err(|e| incompatible(format!("online parameters: {}", e)))?;
        if let Some(optimizer) = checkpoint.optimizer {
            online
                .set_optimizer_state(optimizer)
                .map_err(|e| incompatible(format!("optimizer state: {}", e)))?;
        }
        let mut target = self.trainer.target().clone();
        target
            .set_parameters(checkpoint.target)
            .map_err(|e| incompatible(format!("target parameters: {}", e)))?;

        let tracker = PerformanceTracker::from_history(checkpoint.trades);
        if tracker.metrics().total_trades != checkpoint.metrics.total_trades {
            return Err(LearnError::Persistence(PersistenceError::Corrupt(format!(
                "trade history has {} trades but metrics report {}",
                tracker.metrics().total_trades,
                checkpoint.metrics.total_trades
            ))));
        }

        self.trainer
            .replace_networks(online, target, checkpoint.training);
        self.tracker = tracker;
        self.state = checkpoint.controller;
        Ok(())
    }

    /// Persist the engine state to `store`
    pub fn save(&self, store: &dyn CheckpointStore) -> Result<()> {
        let bytes = self.checkpoint().to_bytes()?;
        store.write(&bytes)?;
        info!(
            store = %store.describe(),
            bytes = bytes.len(),
            train_steps = self.state.train_steps,
            "Saved engine checkpoint"
        );
        Ok(())
    }

    /// Restore the engine state from `store`; no partial overwrite on error
    pub fn load(&mut self, store: &dyn CheckpointStore) -> Result<()> {
        let bytes = store.read()?;
        let checkpoint = EngineCheckpoint::from_bytes(&bytes)?;
        if let Err(e) = self.restore(checkpoint) {
            warn!(store = %store.describe(), error = %e, "Rejected engine checkpoint");
            return Err(e);
        }
        info!(
            store = %store.describe(),
            trades = self.tracker.trades().len(),
            train_steps = self.state.train_steps,
            "Loaded engine checkpoint"
        );
        Ok(())
    }
}

fn validate_config(config: &EngineConfig) -> Result<()> {
    config
        .validate()
        .map_err(|errors| LearnError::Validation(errors.join("; ")))
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn incompatible(msg: String) -> LearnError {
    LearnError::Persistence(PersistenceError::Incompatible(msg))
}
