use std::path::PathBuf;

use ploy_learn::error::{LearnError, PersistenceError};
use ploy_learn::rl::training::{step_name, Checkpointer};
use ploy_learn::rl::{EngineConfig, LearningEngine, TradeAction, TradeOutcome};
use ploy_learn::CheckpointStore;

const STATE: usize = 6;

fn config(seed: u64) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.network.state_size = STATE;
    config.training.batch_size = 8;
    config.training.buffer_size = 32;
    config.training.update_target_every = 10;
    config.seed = Some(seed);
    config
}

fn features(i: usize) -> Vec<f64> {
    (0..STATE).map(|j| ((i * 7 + j * 3) % 11) as f64 / 11.0 - 0.5).collect()
}

fn temp_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ploy_learn_it_{}_{}", tag, std::process::id()))
}

/// Drive enough trades to fill the buffer past capacity, sync the target,
/// and reload the result into a fresh engine from disk.
#[test]
fn engine_survives_checkpoint_rotation_and_reload() {
    let dir = temp_dir("lifecycle");
    let _ = std::fs::remove_dir_all(&dir);
    let checkpointer = Checkpointer::new(&dir, 2);

    let mut engine = LearningEngine::new(config(11)).unwrap();
    for i in 0..60 {
        let state = features(i);
        let action = engine.predict(&state).unwrap();
        let profit = if state[0] > 0.0 { 40.0 } else { -25.0 };
        engine
            .learn_from_trade(TradeOutcome::new(state, action, profit, features(i + 1)))
            .unwrap();

        if (i + 1) % 20 == 0 {
            let steps = engine.controller_state().train_steps;
            engine.save(&checkpointer.store(&step_name("it", steps))).unwrap();
            checkpointer.cleanup_old_checkpoints();
        }
    }

    // 60 trades, training from trade 8 onward
    assert_eq!(engine.controller_state().train_steps, 53);
    assert_eq!(engine.buffer_len(), 32);
    assert_eq!(engine.training_stats().target_syncs, 5);

    let names = checkpointer.list_checkpoints();
    assert_eq!(names.len(), 2);
    let latest = checkpointer.latest_checkpoint().unwrap();
    assert_eq!(latest, step_name("it", 53));

    let mut restored = LearningEngine::new(config(99)).unwrap();
    restored.load(&checkpointer.store(&latest)).unwrap();

    assert_eq!(restored.metrics(), engine.metrics());
    assert_eq!(restored.controller_state(), engine.controller_state());
    for i in 0..20 {
        assert_eq!(
            restored.q_values(&features(i)).unwrap(),
            engine.q_values(&features(i)).unwrap()
        );
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn seeded_engines_are_reproducible() {
    let run = || {
        let mut engine = LearningEngine::new(config(5)).unwrap();
        let mut actions = Vec::new();
        for i in 0..30 {
            let state = features(i);
            let action = engine.predict(&state).unwrap();
            actions.push(action);
            engine
                .learn_from_trade(TradeOutcome::new(state, action, 10.0 - i as f64, features(i + 1)))
                .unwrap();
        }
        (actions, engine.q_values(&features(0)).unwrap())
    };

    assert_eq!(run(), run());
}

#[test]
fn truncated_checkpoint_file_is_rejected() {
    let dir = temp_dir("truncated");
    let _ = std::fs::remove_dir_all(&dir);
    let checkpointer = Checkpointer::new(&dir, 5);
    let store = checkpointer.store("broken");

    let engine = LearningEngine::new(config(3)).unwrap();
    engine.save(&store).unwrap();
    let bytes = store.read().unwrap();
    store.write(&bytes[..bytes.len() / 2]).unwrap();

    let mut fresh = LearningEngine::new(config(4)).unwrap();
    let before = fresh.q_values(&features(2)).unwrap();
    let err = fresh.load(&store).unwrap_err();
    assert!(
        matches!(err, LearnError::Persistence(PersistenceError::Corrupt(_))),
        "expected corrupt checkpoint, got: {err}"
    );
    assert_eq!(fresh.q_values(&features(2)).unwrap(), before);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn greedy_policy_never_explores() {
    let mut engine = LearningEngine::new(config(8)).unwrap();
    engine.set_exploration_rate(0.0).unwrap();

    for i in 0..25 {
        let state = features(i);
        assert_eq!(engine.predict(&state).unwrap(), engine.greedy_action(&state).unwrap());
    }
    assert!(TradeAction::all().contains(&engine.greedy_action(&features(0)).unwrap()));
}
