//! Q-Network (action-value function)
//!
//! Online and target models share this type. The engine only talks to it
//! through [`QFunction`], so any numerical backend can stand in.

use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{LearnError, Result};
use crate::ml::{Activation, Adam, DenseNetwork};

/// Parametric action-value approximator
pub trait QFunction: Clone + Send + Sync {
    /// Deep-copied parameter snapshot
    type Params: Clone + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync;

    /// Expected state length
    fn input_dim(&self) -> usize;

    /// Number of action values produced
    fn output_dim(&self) -> usize;

    /// Action values for one state
    fn predict(&self, state: &[f64]) -> Result<Vec<f64>>;

    /// Action values for a batch of states
    fn forward(&self, states: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        states.iter().map(|s| self.predict(s)).collect()
    }

    /// Snapshot of the current parameters (by value)
    fn parameters(&self) -> Self::Params;

    /// Replace the parameters; rejects a topology mismatch.
    /// Optimizer state is reset.
    fn set_parameters(&mut self, params: Self::Params) -> Result<()>;

    /// Optimizer state carried in checkpoints
    type OptimizerState: Clone
        + PartialEq
        + std::fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync;

    fn optimizer_state(&self) -> Self::OptimizerState;

    /// Resume from saved optimizer state; must match the current parameters
    fn set_optimizer_state(&mut self, state: Self::OptimizerState) -> Result<()>;

    /// One gradient update toward `targets`; returns the MSE loss
    fn train_step(
        &mut self,
        states: &[Vec<f64>],
        targets: &[Vec<f64>],
        learning_rate: f64,
    ) -> Result<f64>;
}

/// Dense MLP Q-network trained with Adam
#[derive(Debug, Clone)]
pub struct QNetwork {
    network: DenseNetwork,
    optimizer: Adam,
}

impl QNetwork {
    /// `input_dim -> widths...` with ReLU hidden layers and a linear head
    pub fn new<R: Rng + ?Sized>(input_dim: usize, widths: &[usize], rng: &mut R) -> Self {
        let network = DenseNetwork::init(input_dim, widths, Activation::Relu, Activation::Linear, rng);
        Self::from_network(network)
    }

    /// Wrap an existing network with fresh optimizer state
    pub fn from_network(network: DenseNetwork) -> Self {
        let optimizer = Adam::new(&network);
        Self { network, optimizer }
    }

    pub fn network(&self) -> &DenseNetwork {
        &self.network
    }

    pub fn optimizer_steps(&self) -> u64 {
        self.optimizer.step_count()
    }
}

impl QFunction for QNetwork {
    type Params = DenseNetwork;
    type OptimizerState = Adam;

    fn input_dim(&self) -> usize {
        self.network.input_dim
    }

    fn output_dim(&self) -> usize {
        self.network.output_dim()
    }

    fn predict(&self, state: &[f64]) -> Result<Vec<f64>> {
        self.network.forward(state)
    }

    fn parameters(&self) -> DenseNetwork {
        self.network.clone()
    }

    fn set_parameters(&mut self, params: DenseNetwork) -> Result<()> {
        params.validate().map_err(LearnError::Validation)?;
        if params.input_dim != self.network.input_dim {
            return Err(LearnError::shape(
                "parameter input_dim",
                self.network.input_dim,
                params.input_dim,
            ));
        }
        if params.topology() != self.network.topology() {
            return Err(LearnError::Validation(format!(
                "parameter topology mismatch: expected {:?}, got {:?}",
                self.network.topology(),
                params.topology()
            )));
        }

        self.optimizer = Adam::new(&params);
        self.network = params;
        Ok(())
    }

    fn optimizer_state(&self) -> Adam {
        self.optimizer.clone()
    }

    fn set_optimizer_state(&mut self, state: Adam) -> Result<()> {
        state.check_shape(&self.network)?;
        self.optimizer = state;
        Ok(())
    }

    fn train_step(
        &mut self,
        states: &[Vec<f64>],
        targets: &[Vec<f64>],
        learning_rate: f64,
    ) -> Result<f64> {
        let (loss, grads) = self.network.mse_gradients(states, targets)?;
        self.optimizer.apply(&mut self.network, &grads, learning_rate)?;
        Ok(loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_net(seed: u64) -> QNetwork {
        QNetwork::new(4, &[8, 3], &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_predict_shape() {
        let net = small_net(1);
        let q = net.predict(&[0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(q.len(), 3);
        assert_eq!(net.input_dim(), 4);
        assert_eq!(net.output_dim(), 3);
    }

    #[test]
    fn test_forward_matches_predict() {
        let net = small_net(2);
        let states = vec![vec![0.1; 4], vec![-0.3; 4]];
        let batch = net.forward(&states).unwrap();
        assert_eq!(batch[1], net.predict(&states[1]).unwrap());
    }

    #[test]
    fn test_parameters_are_deep_copies() {
        let mut net = small_net(3);
        let snapshot = net.parameters();

        let states = vec![vec![0.5; 4]];
        let targets = vec![vec![1.0, -1.0, 0.5]];
        net.train_step(&states, &targets, 0.01).unwrap();

        assert_ne!(net.parameters(), snapshot);
        // The snapshot is unaffected by training
        assert_eq!(snapshot, small_net(3).parameters());
    }

    #[test]
    fn test_set_parameters_copies_values() {
        let source = small_net(4);
        let mut dest = small_net(5);
        dest.set_parameters(source.parameters()).unwrap();

        let state = [0.2, -0.1, 0.7, 0.0];
        assert_eq!(dest.predict(&state).unwrap(), source.predict(&state).unwrap());
    }

    #[test]
    fn test_set_parameters_rejects_other_topology() {
        let mut net = small_net(6);
        let other = QNetwork::new(4, &[16, 3], &mut StdRng::seed_from_u64(6));
        assert!(net.set_parameters(other.parameters()).is_err());

        let wider_input = QNetwork::new(5, &[8, 3], &mut StdRng::seed_from_u64(6));
        assert!(matches!(
            net.set_parameters(wider_input.parameters()),
            Err(LearnError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_train_step_is_deterministic() {
        let states = vec![vec![0.3, 0.1, -0.2, 0.9], vec![0.0, 0.5, 0.5, -0.4]];
        let targets = vec![vec![0.2, 0.0, -0.1], vec![0.1, 0.3, 0.0]];

        let mut a = small_net(7);
        let mut b = small_net(7);
        let la = a.train_step(&states, &targets, 0.001).unwrap();
        let lb = b.train_step(&states, &targets, 0.001).unwrap();

        assert_eq!(la, lb);
        assert_eq!(a.parameters(), b.parameters());
    }

    #[test]
    fn test_resume_with_optimizer_state_is_exact() {
        let states = vec![vec![0.3, 0.1, -0.2, 0.9], vec![0.0, 0.5, 0.5, -0.4]];
        let targets = vec![vec![0.2, 0.0, -0.1], vec![0.1, 0.3, 0.0]];

        let mut original = small_net(9);
        for _ in 0..10 {
            original.train_step(&states, &targets, 0.01).unwrap();
        }

        let mut resumed = small_net(10);
        resumed.set_parameters(original.parameters()).unwrap();
        assert_eq!(resumed.optimizer_steps(), 0);
        resumed.set_optimizer_state(original.optimizer_state()).unwrap();
        assert_eq!(resumed.optimizer_steps(), 10);

        let mut reset = small_net(11);
        reset.set_parameters(original.parameters()).unwrap();

        for _ in 0..5 {
            original.train_step(&states, &targets, 0.01).unwrap();
            resumed.train_step(&states, &targets, 0.01).unwrap();
            reset.train_step(&states, &targets, 0.01).unwrap();
        }
        assert_eq!(resumed.parameters(), original.parameters());
        assert_ne!(reset.parameters(), original.parameters());
    }

    #[test]
    fn test_optimizer_state_rejects_other_topology() {
        let mut net = small_net(12);
        let other = QNetwork::new(4, &[16, 3], &mut StdRng::seed_from_u64(12));
        assert!(net.set_optimizer_state(other.optimizer_state()).is_err());
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut net = small_net(8);
        let states = vec![vec![0.3, 0.1, -0.2, 0.9], vec![0.0, 0.5, 0.5, -0.4]];
        let targets = vec![vec![0.2, 0.0, -0.1], vec![0.1, 0.3, 0.0]];

        let first = net.train_step(&states, &targets, 0.01).unwrap();
        let mut last = first;
        for _ in 0..200 {
            last = net.train_step(&states, &targets, 0.01).unwrap();
        }
        assert!(last < first);
        assert_eq!(net.optimizer_steps(), 201);
    }
}
