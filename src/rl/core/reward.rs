//! Reward Functions
//!
//! Shapes realized trade profit into a training reward.

use serde::{Deserialize, Serialize};

/// Multiplier applied to losing trades
pub const LOSS_PENALTY_MULTIPLIER: f64 = 1.5;

/// Profit (account currency) above which the large-win bonus applies
pub const LARGE_WIN_THRESHOLD: f64 = 100.0;

/// Flat bonus added to large wins, before scaling
pub const LARGE_WIN_BONUS: f64 = 50.0;

/// Divisor keeping rewards in a numerically stable range
pub const REWARD_SCALE: f64 = 1000.0;

/// Reward signal components
///
/// Breaking down the reward into components helps with debugging
/// (which component is driving behavior). All components are already
/// divided by [`REWARD_SCALE`], so they sum to `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardSignal {
    /// Raw profit contribution
    pub base: f64,
    /// Extra negative reward from the loss multiplier (<= 0)
    pub loss_penalty: f64,
    /// Large-win bonus (>= 0)
    pub win_bonus: f64,
    /// Final shaped reward
    pub total: f64,
}

/// Trait for computing rewards from realized profit
pub trait RewardFunction: Send + Sync {
    /// Compute reward for a closed trade with realized `profit`
    fn compute(&self, profit: f64) -> RewardSignal;
}

/// Asymmetric profit shaping
///
/// Losses are amplified by 1.5x, wins over 100 units earn a flat +50,
/// and the result is divided by 1000.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfitRewardFunction;

impl ProfitRewardFunction {
    pub fn new() -> Self {
        Self
    }
}

impl RewardFunction for ProfitRewardFunction {
    fn compute(&self, profit: f64) -> RewardSignal {
        let mut reward = profit;
        if profit < 0.0 {
            reward *= LOSS_PENALTY_MULTIPLIER;
        }
        if profit > LARGE_WIN_THRESHOLD {
            reward += LARGE_WIN_BONUS;
        }
        let total = reward / REWARD_SCALE;

        let loss_penalty = if profit < 0.0 {
            profit * (LOSS_PENALTY_MULTIPLIER - 1.0) / REWARD_SCALE
        } else {
            0.0
        };
        let win_bonus = if profit > LARGE_WIN_THRESHOLD {
            LARGE_WIN_BONUS / REWARD_SCALE
        } else {
            0.0
        };

        RewardSignal {
            base: profit / REWARD_SCALE,
            loss_penalty,
            win_bonus,
            total,
        }
    }
}

/// Shaped reward for a realized profit
pub fn shape_reward(profit: f64) -> f64 {
    ProfitRewardFunction.compute(profit).total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_win() {
        assert_eq!(shape_reward(50.0), 0.05);
    }

    #[test]
    fn test_loss_amplified() {
        assert_eq!(shape_reward(-50.0), -0.075);
    }

    #[test]
    fn test_large_win_bonus() {
        assert_eq!(shape_reward(150.0), 0.2);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(shape_reward(100.0), 0.1);
        assert_eq!(shape_reward(0.0), 0.0);
    }

    #[test]
    fn test_large_loss_has_no_bonus() {
        // -200 * 1.5 / 1000
        assert!((shape_reward(-200.0) - (-0.3)).abs() < 1e-12);
    }

    #[test]
    fn test_components_sum_to_total() {
        let reward_fn = ProfitRewardFunction::new();
        for profit in [-120.0, -3.5, 0.0, 42.0, 100.5, 900.0] {
            let signal = reward_fn.compute(profit);
            let sum = signal.base + signal.loss_penalty + signal.win_bonus;
            assert!((sum - signal.total).abs() < 1e-12, "profit {profit}");
        }
    }

    #[test]
    fn test_loss_hurts_more_than_gain_helps() {
        let reward_fn = ProfitRewardFunction::new();
        let gain = reward_fn.compute(10.0);
        let loss = reward_fn.compute(-10.0);
        assert!(loss.total.abs() > gain.total);
        assert!(loss.loss_penalty < 0.0);
    }
}
