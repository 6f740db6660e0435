//! Adaptive hyperparameter controller
//!
//! Watches performance metrics and nudges the learning rate and the
//! exploration rate when live results degrade.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::rl::config::{AdaptiveConfig, EngineConfig};
use crate::rl::performance::PerformanceSnapshot;

/// Number of adjustment events retained for observability
const ADJUSTMENT_HISTORY_LEN: usize = 100;

/// Mutable learning hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Epsilon for epsilon-greedy action selection
    pub exploration_rate: f64,
    /// Step size handed to the optimizer
    pub learning_rate: f64,
    /// Completed training steps
    pub train_steps: u64,
}

impl ControllerState {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            exploration_rate: config.exploration.initial,
            learning_rate: config.training.learning_rate,
            train_steps: 0,
        }
    }
}

/// Conditions that made the controller fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentTriggers {
    pub low_win_rate: bool,
    pub low_sharpe: bool,
    pub drawdown: bool,
}

impl AdjustmentTriggers {
    pub fn any(&self) -> bool {
        self.low_win_rate || self.low_sharpe || self.drawdown
    }
}

/// One applied adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentEvent {
    pub at: DateTime<Utc>,
    pub total_trades: u64,
    pub triggers: AdjustmentTriggers,
    pub learning_rate_before: f64,
    pub learning_rate_after: f64,
    pub exploration_before: f64,
    pub exploration_after: f64,
}

/// Performance-driven controller for learning and exploration rates
///
/// The learning rate is never clamped, so repeated adjustments in the same
/// direction compound without bound.
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    config: AdaptiveConfig,
    history: VecDeque<AdjustmentEvent>,
}

impl AdaptiveController {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            config,
            history: VecDeque::with_capacity(ADJUSTMENT_HISTORY_LEN),
        }
    }

    /// Evaluate each trigger independently
    pub fn triggers(&self, metrics: &PerformanceSnapshot) -> AdjustmentTriggers {
        let c = &self.config;
        AdjustmentTriggers {
            low_win_rate: metrics.total_trades > c.win_rate_min_trades
                && metrics.win_rate < c.low_win_rate,
            low_sharpe: metrics.total_trades > c.sharpe_min_trades
                && metrics.sharpe_ratio < c.low_sharpe,
            drawdown: metrics.max_drawdown > c.max_drawdown,
        }
    }

    /// Whether any degradation condition holds
    pub fn should_adjust(&self, metrics: &PerformanceSnapshot) -> bool {
        self.config.enabled && self.triggers(metrics).any()
    }

    /// Apply an adjustment if warranted; returns the recorded event
    pub fn maybe_adjust(
        &mut self,
        metrics: &PerformanceSnapshot,
        state: &mut ControllerState,
    ) -> Option<AdjustmentEvent> {
        if !self.should_adjust(metrics) {
            return None;
        }
        Some(self.adjust(metrics, state))
    }

    /// Apply the rate mutations unconditionally
    ///
    /// The learning-rate and exploration changes are independent and may
    /// both happen in one call.
    pub fn adjust(
        &mut self,
        metrics: &PerformanceSnapshot,
        state: &mut ControllerState,
    ) -> AdjustmentEvent {
        let c = &self.config;
        let learning_rate_before = state.learning_rate;
        let exploration_before = state.exploration_rate;

        if metrics.win_rate < c.low_win_rate {
            state.learning_rate *= c.lr_decrease_factor;
        } else if metrics.win_rate > c.high_win_rate {
            state.learning_rate *= c.lr_increase_factor;
        }

        if metrics.sharpe_ratio < c.low_sharpe {
            state.exploration_rate =
                (state.exploration_rate * c.exploration_boost_factor).min(c.exploration_boost_cap);
        }

        let event = AdjustmentEvent {
            at: Utc::now(),
            total_trades: metrics.total_trades,
            triggers: self.triggers(metrics),
            learning_rate_before,
            learning_rate_after: state.learning_rate,
            exploration_before,
            exploration_after: state.exploration_rate,
        };

        info!(
            trades = metrics.total_trades,
            win_rate = metrics.win_rate,
            sharpe = metrics.sharpe_ratio,
            drawdown = metrics.max_drawdown,
            "Adjusted hyperparameters: lr {:.6} -> {:.6}, epsilon {:.4} -> {:.4}",
            learning_rate_before,
            state.learning_rate,
            exploration_before,
            state.exploration_rate
        );

        if self.history.len() >= ADJUSTMENT_HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(event.clone());
        event
    }

    /// Recent adjustments, oldest first
    pub fn history(&self) -> impl Iterator<Item = &AdjustmentEvent> {
        self.history.iter()
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }
}

impl Default for AdaptiveController {
    fn default() -> Self {
        Self::new(AdaptiveConfig::default())
    }
}
