use thiserror::Error;

/// Main error type for the learning engine
#[derive(Error, Debug)]
pub enum LearnError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Shape errors
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    // Replay errors
    #[error("Insufficient data: requested {requested} samples, buffer holds {available}")]
    InsufficientData { requested: usize, available: usize },

    #[error("Invalid action index: {0}")]
    InvalidAction(usize),

    // Persistence errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LearnError {
    /// Build a shape mismatch error for the given context
    pub fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        LearnError::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

/// Result type alias for LearnError
pub type Result<T> = std::result::Result<T, LearnError>;

/// Specific error types for checkpoint persistence
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt checkpoint: {0}")]
    Corrupt(String),

    #[error("Incompatible checkpoint: {0}")]
    Incompatible(String),

    #[error("Checkpoint not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Corrupt(err.to_string())
    }
}

impl From<std::io::Error> for LearnError {
    fn from(err: std::io::Error) -> Self {
        LearnError::Persistence(PersistenceError::Io(err))
    }
}
