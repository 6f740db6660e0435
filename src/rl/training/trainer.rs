//! Training Loop
//!
//! Deep Q-learning over the replay buffer with a periodically synced
//! target network.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LearnError, Result};
use crate::rl::adaptive::ControllerState;
use crate::rl::config::{ExplorationConfig, TrainingConfig};
use crate::rl::core::validate_state;
use crate::rl::memory::{ReplayBuffer, Transition};
use crate::rl::networks::QFunction;

/// Smoothing factor of the loss moving average
const LOSS_EMA_ALPHA: f64 = 0.05;

/// Training statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Gradient steps performed (restored from checkpoints)
    pub steps: u64,
    /// Target network syncs performed
    pub target_syncs: u64,
    /// Loss of the latest step
    pub last_loss: Option<f64>,
    /// Exponential moving average of the loss
    pub loss_ema: Option<f64>,
}

/// Result of one training step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainOutcome {
    pub loss: f64,
    /// `train_steps` after this step
    pub train_steps: u64,
    /// Whether the target network was synced
    pub target_synced: bool,
    /// Exploration rate after decay
    pub exploration_rate: f64,
}

/// Owns the online and target networks and runs DQN updates
#[derive(Debug, Clone)]
pub struct DqnTrainer<Q: QFunction> {
    online: Q,
    target: Q,
    training: TrainingConfig,
    exploration: ExplorationConfig,
    stats: TrainingStats,
}

impl<Q: QFunction> DqnTrainer<Q> {
    /// Create a trainer; the target starts as a copy of `online`.
    pub fn new(online: Q, training: TrainingConfig, exploration: ExplorationConfig) -> Result<Self> {
        if training.update_target_every == 0 {
            return Err(LearnError::Validation(
                "update_target_every must be > 0".to_string(),
            ));
        }
        let mut target = online.clone();
        target.set_parameters(online.parameters())?;

        Ok(Self {
            online,
            target,
            training,
            exploration,
            stats: TrainingStats::default(),
        })
    }

    pub fn online(&self) -> &Q {
        &self.online
    }

    pub fn target(&self) -> &Q {
        &self.target
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.training
    }

    /// Whether the buffer holds at least one batch
    pub fn ready(&self, buffer: &ReplayBuffer) -> bool {
        buffer.has_enough_samples(self.training.batch_size)
    }

    /// Copy online parameters into the target network
    pub fn sync_target(&mut self) -> Result<()> {
        self.target.set_parameters(self.online.parameters())?;
        self.stats.target_syncs += 1;
        Ok(())
    }

    /// Replace both networks and the statistics, e.g. after restoring a checkpoint
    pub fn replace_networks(&mut self, online: Q, target: Q, stats: TrainingStats) {
        self.online = online;
        self.target = target;
        self.stats = stats;
    }

    /// Bellman targets for a batch.
    ///
    /// Each target vector is the online prediction with only the taken
    /// action's slot replaced, so untaken actions contribute zero error.
    /// Every transition is shape-checked before anything is computed.
    pub fn compute_targets(&self, batch: &[Transition]) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>)> {
        let state_size = self.online.input_dim();
        for transition in batch {
            validate_state(&transition.state, state_size, "transition state")?;
            validate_state(&transition.next_state, state_size, "transition next_state")?;
        }

        let states: Vec<Vec<f64>> = batch.iter().map(|t| t.state.clone()).collect();
        let mut targets = self.online.forward(&states)?;

        for (transition, target) in batch.iter().zip(targets.iter_mut()) {
            let action = transition.action.to_index();
            if action >= target.len() {
                return Err(LearnError::InvalidAction(action));
            }

            let value = if transition.done {
                transition.reward
            } else {
                let next_q = self.target.predict(&transition.next_state)?;
                let max_next = next_q.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                transition.reward + self.training.gamma * max_next
            };
            target[action] = value;
        }

        Ok((states, targets))
    }

    /// One training step over a freshly sampled batch.
    ///
    /// Reads the learning rate from `state` and advances `train_steps` and
    /// the exploration decay; it never touches `state.learning_rate`.
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        buffer: &ReplayBuffer,
        state: &mut ControllerState,
        rng: &mut R,
    ) -> Result<TrainOutcome> {
        let batch = buffer.sample(self.training.batch_size, rng)?;
        let (states, targets) = self.compute_targets(&batch)?;

        let loss = self.online.train_step(&states, &targets, state.learning_rate)?;

        state.train_steps += 1;
        self.stats.steps += 1;
        self.stats.last_loss = Some(loss);
        self.stats.loss_ema = Some(match self.stats.loss_ema {
            Some(ema) => ema + LOSS_EMA_ALPHA * (loss - ema),
            None => loss,
        });

        let target_synced = state.train_steps % self.training.update_target_every == 0;
        if target_synced {
            self.sync_target()?;
            info!(
                train_steps = state.train_steps,
                "Synced target network (sync #{})", self.stats.target_syncs
            );
        }

        state.exploration_rate =
            (state.exploration_rate * self.exploration.decay).max(self.exploration.min);

        debug!(
            train_steps = state.train_steps,
            loss,
            epsilon = state.exploration_rate,
            lr = state.learning_rate,
            "Training step complete"
        );

        Ok(TrainOutcome {
            loss,
            train_steps: state.train_steps,
            target_synced,
            exploration_rate: state.exploration_rate,
        })
    }
}
