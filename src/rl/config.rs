//! RL Configuration
//!
//! Configuration structs for the continuous learning engine. Every section
//! has defaults so partial config files deserialize cleanly.

use serde::{Deserialize, Serialize};

use crate::rl::core::NUM_ACTIONS;

/// Hidden layer widths of the Q-network (fixed architecture)
pub const HIDDEN_LAYERS: [usize; 4] = [256, 128, 64, 32];

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Network shape configuration
    pub network: NetworkConfig,
    /// Training loop configuration
    pub training: TrainingConfig,
    /// Exploration schedule
    pub exploration: ExplorationConfig,
    /// Performance-driven hyperparameter controller
    pub adaptive: AdaptiveConfig,
    /// RNG seed for weight init, exploration and replay sampling.
    /// `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl EngineConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.network.state_size == 0 {
            errors.push("network.state_size must be > 0".to_string());
        }
        if self.training.buffer_size == 0 {
            errors.push("training.buffer_size must be > 0".to_string());
        }
        if self.training.batch_size == 0 {
            errors.push("training.batch_size must be > 0".to_string());
        }
        if self.training.batch_size > self.training.buffer_size {
            errors.push(format!(
                "training.batch_size {} exceeds training.buffer_size {}",
                self.training.batch_size, self.training.buffer_size
            ));
        }
        if !(0.0..=1.0).contains(&self.training.gamma) {
            errors.push("training.gamma must be within [0, 1]".to_string());
        }
        if self.training.update_target_every == 0 {
            errors.push("training.update_target_every must be > 0".to_string());
        }
        if !(self.training.learning_rate.is_finite() && self.training.learning_rate > 0.0) {
            errors.push("training.learning_rate must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.exploration.initial) {
            errors.push("exploration.initial must be within [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.exploration.min) {
            errors.push("exploration.min must be within [0, 1]".to_string());
        }
        if self.exploration.min > self.exploration.initial {
            errors.push("exploration.min must not exceed exploration.initial".to_string());
        }
        if !(self.exploration.decay > 0.0 && self.exploration.decay <= 1.0) {
            errors.push("exploration.decay must be within (0, 1]".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Layer widths from the first hidden layer to the output layer
    pub fn layer_widths(&self) -> Vec<usize> {
        let mut widths = HIDDEN_LAYERS.to_vec();
        widths.push(NUM_ACTIONS);
        widths
    }
}

/// Network shape configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Length of every state vector
    pub state_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { state_size: 15 }
    }
}

/// Training loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Replay buffer capacity
    pub buffer_size: usize,
    /// Transitions per training step
    pub batch_size: usize,
    /// Discount factor
    pub gamma: f64,
    /// Training steps between target network syncs
    pub update_target_every: u64,
    /// Initial learning rate (later owned by the adaptive controller)
    pub learning_rate: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            buffer_size: 10_000,
            batch_size: 32,
            gamma: 0.95,
            update_target_every: 100,
            learning_rate: 0.001,
        }
    }
}

/// Epsilon-greedy exploration schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Starting exploration rate
    pub initial: f64,
    /// Multiplicative decay applied after each training step
    pub decay: f64,
    /// Floor for the decayed exploration rate
    pub min: f64,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            initial: 1.0,
            decay: 0.995,
            min: 0.01,
        }
    }
}

/// Thresholds and factors of the adaptive controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Disable to freeze learning and exploration rates
    pub enabled: bool,
    /// Trades required before the win-rate trigger applies (strictly greater)
    pub win_rate_min_trades: u64,
    /// Win rate below which the controller triggers and slows learning
    pub low_win_rate: f64,
    /// Win rate above which learning is sped up
    pub high_win_rate: f64,
    /// Trades required before the Sharpe trigger applies (strictly greater)
    pub sharpe_min_trades: u64,
    /// Sharpe ratio below which the controller triggers and explores more
    pub low_sharpe: f64,
    /// Drawdown above which the controller triggers
    pub max_drawdown: f64,
    /// Learning-rate multiplier on poor win rate
    pub lr_decrease_factor: f64,
    /// Learning-rate multiplier on strong win rate
    pub lr_increase_factor: f64,
    /// Exploration multiplier on poor Sharpe
    pub exploration_boost_factor: f64,
    /// Cap applied to boosted exploration
    pub exploration_boost_cap: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            win_rate_min_trades: 50,
            low_win_rate: 0.45,
            high_win_rate: 0.60,
            sharpe_min_trades: 100,
            low_sharpe: 0.5,
            max_drawdown: 0.20,
            lr_decrease_factor: 0.9,
            lr_increase_factor: 1.1,
            exploration_boost_factor: 1.2,
            exploration_boost_cap: 0.3,
        }
    }
}
