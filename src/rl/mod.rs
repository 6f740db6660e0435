//! Reinforcement Learning Module
//!
//! Continuous online learning from realized trades.
//!
//! # Features
//!
//! - **Action Space**: Discrete Hold/Buy/Sell
//! - **Algorithm**: DQN with experience replay and a periodically synced target network
//! - **Reward Shaping**: Loss-averse, large-win bonus, scaled
//! - **Adaptive Control**: Learning and exploration rates retuned from live performance
//! - **Persistence**: JSON checkpoints through pluggable stores
//!
//! # Usage
//!
//! ```no_run
//! use ploy_learn::rl::{EngineConfig, LearningEngine, TradeAction, TradeOutcome};
//!
//! let mut engine = LearningEngine::new(EngineConfig::default())?;
//! let state = vec![0.0; 15];
//! let action = engine.predict(&state)?;
//! engine.learn_from_trade(TradeOutcome::new(state.clone(), action, 12.5, state))?;
//! # Ok::<(), ploy_learn::error::LearnError>(())
//! ```

pub mod adaptive;
pub mod config;
pub mod core;
pub mod engine;
pub mod integration;
pub mod memory;
pub mod networks;
pub mod performance;
pub mod training;

// Config exports
pub use config::{AdaptiveConfig, EngineConfig, ExplorationConfig, NetworkConfig, TrainingConfig};

// Core exports
pub use core::{
    argmax, shape_reward, ProfitRewardFunction, RewardFunction, RewardSignal, TradeAction,
    TradeOutcome, NUM_ACTIONS,
};

// Memory exports
pub use memory::{ReplayBuffer, Transition};

// Network exports
pub use networks::{QFunction, QNetwork};

// Engine exports
pub use adaptive::{AdaptiveController, AdjustmentEvent, ControllerState};
pub use engine::{LearnReport, LearningEngine};
pub use integration::EngineHandle;
pub use performance::{PerformanceSnapshot, PerformanceTracker, TradeRecord};

// Training exports
pub use training::{
    CheckpointStore, Checkpointer, DqnTrainer, EngineCheckpoint, FileCheckpointStore,
    MemoryCheckpointStore, TrainingStats,
};
