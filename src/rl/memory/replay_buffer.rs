//! Replay Buffer
//!
//! Fixed-capacity experience replay for off-policy Q-learning.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::error::{LearnError, Result};
use crate::rl::core::TradeAction;

/// A single transition in the environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// State features before action
    pub state: Vec<f64>,
    /// Action taken
    pub action: TradeAction,
    /// Shaped reward received
    pub reward: f64,
    /// Next state features
    pub next_state: Vec<f64>,
    /// Whether the episode terminated with this transition
    pub done: bool,
}

impl Transition {
    /// Create a new transition
    pub fn new(
        state: Vec<f64>,
        action: TradeAction,
        reward: f64,
        next_state: Vec<f64>,
        done: bool,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }

    /// Create a terminal transition (every closed trade is terminal)
    pub fn terminal(state: Vec<f64>, action: TradeAction, reward: f64, next_state: Vec<f64>) -> Self {
        Self::new(state, action, reward, next_state, true)
    }
}

/// Replay buffer for experience storage
///
/// Appends until full, then evicts the oldest transition on every push.
#[derive(Debug)]
pub struct ReplayBuffer {
    /// Storage for transitions, oldest first
    buffer: VecDeque<Transition>,
    /// Maximum capacity
    capacity: usize,
}

impl ReplayBuffer {
    /// Create a new replay buffer with given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a transition to the buffer
    pub fn push(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Sample `batch_size` transitions uniformly at random, with replacement
    pub fn sample<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Result<Vec<Transition>> {
        if self.buffer.len() < batch_size {
            return Err(LearnError::InsufficientData {
                requested: batch_size,
                available: self.buffer.len(),
            });
        }

        Ok((0..batch_size)
            .map(|_| self.buffer[rng.gen_range(0..self.buffer.len())].clone())
            .collect())
    }

    /// Iterate transitions from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }

    /// Clear all transitions
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Get current number of transitions
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Check if buffer reached capacity
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.capacity
    }

    /// Check if buffer has enough samples for training
    pub fn has_enough_samples(&self, min_samples: usize) -> bool {
        self.buffer.len() >= min_samples
    }

    /// Get buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.buffer.len() as f64 / self.capacity as f64
    }
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self::new(10_000)
    }
}
