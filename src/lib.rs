pub mod cli;
pub mod config;
pub mod error;
pub mod ml;
pub mod rl;

pub use config::AppConfig;
pub use error::{LearnError, PersistenceError, Result};
pub use rl::{
    CheckpointStore, EngineConfig, EngineHandle, FileCheckpointStore, LearnReport, LearningEngine,
    MemoryCheckpointStore, PerformanceSnapshot, QFunction, QNetwork, TradeAction, TradeOutcome,
};
