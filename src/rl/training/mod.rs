//! Training Infrastructure
//!
//! DQN training loop and checkpoint persistence.

pub mod checkpointing;
pub mod trainer;

pub use checkpointing::{
    step_name, timestamped_name, CheckpointStore, Checkpointer, EngineCheckpoint,
    FileCheckpointStore, MemoryCheckpointStore, CHECKPOINT_FORMAT_VERSION,
};
pub use trainer::{DqnTrainer, TrainOutcome, TrainingStats};
