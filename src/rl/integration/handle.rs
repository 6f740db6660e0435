//! Shared engine handle
//!
//! Serializes every read and write behind one async mutex so a caller can
//! never observe a half-applied training step.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::{LearnError, Result};
use crate::rl::adaptive::ControllerState;
use crate::rl::core::{TradeAction, TradeOutcome};
use crate::rl::engine::{LearnReport, LearningEngine};
use crate::rl::networks::{QFunction, QNetwork};
use crate::rl::performance::PerformanceSnapshot;
use crate::rl::training::{CheckpointStore, EngineCheckpoint};

/// Cloneable, thread-safe access to a [`LearningEngine`]
pub struct EngineHandle<Q: QFunction + 'static = QNetwork> {
    inner: Arc<Mutex<LearningEngine<Q>>>,
}

impl<Q: QFunction + 'static> Clone for EngineHandle<Q> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Q: QFunction + 'static> EngineHandle<Q> {
    pub fn new(engine: LearningEngine<Q>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub async fn predict(&self, state: Vec<f64>) -> Result<TradeAction> {
        self.inner.lock().await.predict(&state)
    }

    pub async fn q_values(&self, state: Vec<f64>) -> Result<Vec<f64>> {
        self.inner.lock().await.q_values(&state)
    }

    pub async fn learn_from_trade(&self, outcome: TradeOutcome) -> Result<LearnReport> {
        self.inner.lock().await.learn_from_trade(outcome)
    }

    pub async fn metrics(&self) -> PerformanceSnapshot {
        self.inner.lock().await.metrics()
    }

    pub async fn controller_state(&self) -> ControllerState {
        self.inner.lock().await.controller_state()
    }

    /// Snapshot under the lock, then write on the blocking pool
    pub async fn save(&self, store: Arc<dyn CheckpointStore>) -> Result<()> {
        let bytes = {
            let engine = self.inner.lock().await;
            engine.checkpoint().to_bytes()?
        };

        let target = store.describe();
        let len = bytes.len();
        tokio::task::spawn_blocking(move || store.write(&bytes))
            .await
            .map_err(|e| LearnError::Internal(format!("checkpoint write task failed: {}", e)))??;

        info!(store = %target, bytes = len, "Saved engine checkpoint");
        Ok(())
    }

    /// Read on the blocking pool, then decode and restore under the lock
    pub async fn load(&self, store: Arc<dyn CheckpointStore>) -> Result<()> {
        let target = store.describe();
        let bytes = tokio::task::spawn_blocking(move || store.read())
            .await
            .map_err(|e| LearnError::Internal(format!("checkpoint read task failed: {}", e)))??;

        let mut engine = self.inner.lock().await;
        let checkpoint: EngineCheckpoint<Q::Params, Q::OptimizerState> =
            EngineCheckpoint::from_bytes(&bytes)?;
        engine.restore(checkpoint)?;

        info!(store = %target, "Loaded engine checkpoint");
        Ok(())
    }

    /// Run `f` with exclusive access to the engine
    pub async fn with_engine<T>(&self, f: impl FnOnce(&mut LearningEngine<Q>) -> T) -> T {
        let mut engine = self.inner.lock().await;
        f(&mut engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::config::EngineConfig;
    use crate::rl::training::MemoryCheckpointStore;

    fn handle(seed: u64) -> EngineHandle {
        let mut config = EngineConfig::default();
        config.network.state_size = 3;
        config.training.batch_size = 2;
        config.training.buffer_size = 16;
        config.seed = Some(seed);
        EngineHandle::new(LearningEngine::new(config).unwrap())
    }

    #[tokio::test]
    async fn test_concurrent_learning() {
        let h = handle(1);
        let mut tasks = Vec::new();
        for i in 0..8 {
            let h = h.clone();
            tasks.push(tokio::spawn(async move {
                let x = i as f64 / 8.0;
                h.learn_from_trade(TradeOutcome::new(
                    vec![x, 0.5, -x],
                    TradeAction::Buy,
                    if i % 2 == 0 { 12.0 } else { -4.0 },
                    vec![0.0, x, 1.0],
                ))
                .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let metrics = h.metrics().await;
        assert_eq!(metrics.total_trades, 8);
        assert_eq!(metrics.winning_trades, 4);
        assert_eq!(h.controller_state().await.train_steps, 7);
    }

    #[tokio::test]
    async fn test_save_and_load_through_handle() {
        let h = handle(2);
        for i in 0..5 {
            h.learn_from_trade(TradeOutcome::new(
                vec![0.1 * i as f64; 3],
                TradeAction::Sell,
                7.0,
                vec![0.2; 3],
            ))
            .await
            .unwrap();
        }

        let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
        h.save(Arc::clone(&store)).await.unwrap();

        let restored = handle(3);
        restored.load(store).await.unwrap();

        let state = vec![0.3, -0.2, 0.9];
        assert_eq!(
            restored.q_values(state.clone()).await.unwrap(),
            h.q_values(state).await.unwrap()
        );
        assert_eq!(restored.metrics().await, h.metrics().await);
    }

    #[tokio::test]
    async fn test_load_error_propagates() {
        let h = handle(4);
        let store: Arc<dyn CheckpointStore> = Arc::new(MemoryCheckpointStore::new());
        assert!(h.load(store).await.is_err());
        assert_eq!(h.metrics().await.total_trades, 0);
    }
}
