//! Core RL abstractions
//!
//! Fundamental types for state representation, actions, and rewards.

pub mod action;
pub mod reward;
pub mod state;

pub use action::{argmax, TradeAction, NUM_ACTIONS};
pub use reward::{shape_reward, ProfitRewardFunction, RewardFunction, RewardSignal};
pub use state::{validate_state, TradeOutcome};
