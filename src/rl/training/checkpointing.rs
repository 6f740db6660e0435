//! Model Checkpointing
//!
//! Save and load engine state (network parameters, controller state,
//! performance history) as JSON through a pluggable store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::PersistenceError;
use crate::rl::adaptive::ControllerState;
use crate::rl::performance::{PerformanceSnapshot, TradeRecord};

use super::trainer::TrainingStats;

/// Current checkpoint payload version
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// File extension used for checkpoints
const CHECKPOINT_EXTENSION: &str = "json";

/// Byte-level destination/source for checkpoints
pub trait CheckpointStore: Send + Sync {
    /// Persist `payload`, replacing any previous content
    fn write(&self, payload: &[u8]) -> Result<(), PersistenceError>;

    /// Read the last persisted payload
    fn read(&self) -> Result<Vec<u8>, PersistenceError>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Serialized engine state
///
/// `optimizer` and `training` are optional so older payloads still load;
/// without them training resumes with fresh optimizer moments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>, S: Deserialize<'de>"))]
pub struct EngineCheckpoint<P, S = ()> {
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub state_size: usize,
    pub action_size: usize,
    pub online: P,
    pub target: P,
    /// Optimizer state of the online network
    #[serde(default)]
    pub optimizer: Option<S>,
    #[serde(default)]
    pub training: TrainingStats,
    pub controller: ControllerState,
    pub metrics: PerformanceSnapshot,
    pub trades: Vec<TradeRecord>,
}

impl<P, S> EngineCheckpoint<P, S>
where
    P: Serialize + serde::de::DeserializeOwned,
    S: Serialize + serde::de::DeserializeOwned,
{
    pub fn to_bytes(&self) -> Result<Vec<u8>, PersistenceError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersistenceError> {
        let checkpoint: Self = serde_json::from_slice(bytes)?;
        if checkpoint.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(PersistenceError::Incompatible(format!(
                "format version {} (expected {})",
                checkpoint.format_version, CHECKPOINT_FORMAT_VERSION
            )));
        }
        Ok(checkpoint)
    }
}

/// Single-file store with atomic replace (temp file + rename)
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn write(&self, payload: &[u8]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(payload)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn read(&self) -> Result<Vec<u8>, PersistenceError> {
        if !self.path.exists() {
            return Err(PersistenceError::NotFound(self.path.display().to_string()));
        }
        Ok(fs::read(&self.path)?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process store, mostly for tests and warm restarts
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    payload: Mutex<Option<Vec<u8>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with raw bytes
    pub fn with_payload(payload: Vec<u8>) -> Self {
        Self {
            payload: Mutex::new(Some(payload)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<Vec<u8>>>, PersistenceError> {
        self.payload
            .lock()
            .map_err(|_| PersistenceError::Io(std::io::Error::other("checkpoint store poisoned")))
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn write(&self, payload: &[u8]) -> Result<(), PersistenceError> {
        *self.lock()? = Some(payload.to_vec());
        Ok(())
    }

    fn read(&self) -> Result<Vec<u8>, PersistenceError> {
        self.lock()?
            .clone()
            .ok_or_else(|| PersistenceError::NotFound("memory store is empty".to_string()))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Directory of named checkpoints with rotation
pub struct Checkpointer {
    /// Directory for checkpoints
    checkpoint_dir: PathBuf,
    /// Maximum checkpoints to keep
    max_checkpoints: usize,
}

impl Checkpointer {
    /// Create a new checkpointer
    pub fn new<P: AsRef<Path>>(checkpoint_dir: P, max_checkpoints: usize) -> Self {
        let checkpoint_dir = checkpoint_dir.as_ref().to_path_buf();

        // Create directory if it doesn't exist
        if !checkpoint_dir.exists() {
            if let Err(e) = fs::create_dir_all(&checkpoint_dir) {
                warn!("Failed to create checkpoint directory: {}", e);
            }
        }

        Self {
            checkpoint_dir,
            max_checkpoints,
        }
    }

    /// Get checkpoint path for a given name
    pub fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.checkpoint_dir
            .join(format!("{}.{}", name, CHECKPOINT_EXTENSION))
    }

    /// Store for a named checkpoint
    pub fn store(&self, name: &str) -> FileCheckpointStore {
        FileCheckpointStore::new(self.checkpoint_path(name))
    }

    /// List available checkpoints, sorted by name
    pub fn list_checkpoints(&self) -> Vec<String> {
        let mut checkpoints = Vec::new();
        let suffix = format!(".{}", CHECKPOINT_EXTENSION);

        if let Ok(entries) = fs::read_dir(&self.checkpoint_dir) {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Some(stem) = name.strip_suffix(&suffix) {
                        checkpoints.push(stem.to_string());
                    }
                }
            }
        }

        checkpoints.sort();
        checkpoints
    }

    /// Get latest checkpoint name
    pub fn latest_checkpoint(&self) -> Option<String> {
        self.list_checkpoints().into_iter().last()
    }

    /// Remove the oldest checkpoints beyond `max_checkpoints`
    pub fn cleanup_old_checkpoints(&self) {
        let checkpoints = self.list_checkpoints();

        if checkpoints.len() <= self.max_checkpoints {
            return;
        }

        let to_remove = checkpoints.len() - self.max_checkpoints;
        for name in checkpoints.into_iter().take(to_remove) {
            let path = self.checkpoint_path(&name);
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove old checkpoint {:?}: {}", path, e);
            } else {
                info!("Removed old checkpoint: {}", name);
            }
        }
    }

    /// Check if a checkpoint exists
    pub fn exists(&self, name: &str) -> bool {
        self.checkpoint_path(name).exists()
    }

    pub fn dir(&self) -> &Path {
        &self.checkpoint_dir
    }
}

impl Default for Checkpointer {
    fn default() -> Self {
        Self::new("./checkpoints", 5)
    }
}

/// Generate a checkpoint name with timestamp
pub fn timestamped_name(prefix: &str) -> String {
    let now = Utc::now();
    format!("{}_{}", prefix, now.format("%Y%m%d_%H%M%S"))
}

/// Generate a checkpoint name with training step number
pub fn step_name(prefix: &str, train_steps: u64) -> String {
    format!("{}_step{:08}", prefix, train_steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    fn unique_dir(tag: &str) -> PathBuf {
        temp_dir().join(format!(
            "ploy_learn_{}_{}_{}",
            tag,
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    #[test]
    fn test_checkpoint_path() {
        let checkpointer = Checkpointer::new(unique_dir("path"), 5);
        let path = checkpointer.checkpoint_path("model_v1");

        assert!(path.to_string_lossy().ends_with("model_v1.json"));
    }

    #[test]
    fn test_timestamped_name() {
        let name = timestamped_name("dqn");
        assert!(name.starts_with("dqn_"));
        assert!(name.len() > 10);
    }

    #[test]
    fn test_step_name() {
        assert_eq!(step_name("dqn", 100), "dqn_step00000100");
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = unique_dir("file");
        let store = FileCheckpointStore::new(dir.join("nested").join("engine.json"));

        assert!(matches!(store.read(), Err(PersistenceError::NotFound(_))));
        store.write(b"{\"a\":1}").unwrap();
        store.write(b"{\"a\":2}").unwrap();
        assert_eq!(store.read().unwrap(), b"{\"a\":2}".to_vec());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCheckpointStore::new();
        assert!(store.read().is_err());
        store.write(b"abc").unwrap();
        assert_eq!(store.read().unwrap(), b"abc".to_vec());
    }

    #[test]
    fn test_rotation_keeps_newest() {
        let dir = unique_dir("rotate");
        let checkpointer = Checkpointer::new(&dir, 2);
        for step in [1, 2, 3] {
            checkpointer
                .store(&step_name("dqn", step))
                .write(b"{}")
                .unwrap();
        }

        checkpointer.cleanup_old_checkpoints();

        assert_eq!(
            checkpointer.list_checkpoints(),
            vec!["dqn_step00000002".to_string(), "dqn_step00000003".to_string()]
        );
        assert_eq!(
            checkpointer.latest_checkpoint().as_deref(),
            Some("dqn_step00000003")
        );
        assert!(!checkpointer.exists("dqn_step00000001"));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let json = serde_json::json!({
            "format_version": 99,
            "saved_at": Utc::now(),
            "state_size": 2,
            "action_size": 3,
            "online": 0,
            "target": 0,
            "controller": {"exploration_rate": 1.0, "learning_rate": 0.001, "train_steps": 0},
            "metrics": PerformanceSnapshot::default(),
            "trades": []
        });
        let bytes = serde_json::to_vec(&json).unwrap();
        assert!(matches!(
            EngineCheckpoint::<u8>::from_bytes(&bytes),
            Err(PersistenceError::Incompatible(_))
        ));
    }

    #[test]
    fn test_payload_without_optimizer_state_loads() {
        let json = serde_json::json!({
            "format_version": CHECKPOINT_FORMAT_VERSION,
            "saved_at": Utc::now(),
            "state_size": 2,
            "action_size": 3,
            "online": 1,
            "target": 2,
            "controller": {"exploration_rate": 0.5, "learning_rate": 0.001, "train_steps": 7},
            "metrics": PerformanceSnapshot::default(),
            "trades": []
        });
        let bytes = serde_json::to_vec(&json).unwrap();
        let checkpoint = EngineCheckpoint::<u8, u8>::from_bytes(&bytes).unwrap();
        assert_eq!(checkpoint.optimizer, None);
        assert_eq!(checkpoint.training, TrainingStats::default());
        assert_eq!(checkpoint.controller.train_steps, 7);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        assert!(matches!(
            EngineCheckpoint::<u8>::from_bytes(b"not a checkpoint"),
            Err(PersistenceError::Corrupt(_))
        ));
    }
}
