//! Adam optimizer for [`DenseNetwork`] parameters.
//!
//! Bias correction is folded into the step size:
//! `lr_t = lr * sqrt(1 - beta2^t) / (1 - beta1^t)`.

use serde::{Deserialize, Serialize};

use super::dense::{DenseNetwork, LayerGradient};
use crate::error::{LearnError, Result};

pub const ADAM_BETA1: f64 = 0.9;
pub const ADAM_BETA2: f64 = 0.999;
pub const ADAM_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LayerMoments {
    m_weights: Vec<Vec<f64>>,
    v_weights: Vec<Vec<f64>>,
    m_bias: Vec<f64>,
    v_bias: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adam {
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    /// Number of updates applied so far
    step: u64,
    moments: Vec<LayerMoments>,
}

impl Adam {
    /// Zeroed moments shaped like `network`
    pub fn new(network: &DenseNetwork) -> Self {
        let moments = network
            .layers
            .iter()
            .map(|layer| LayerMoments {
                m_weights: vec![vec![0.0; layer.in_dim()]; layer.out_dim()],
                v_weights: vec![vec![0.0; layer.in_dim()]; layer.out_dim()],
                m_bias: vec![0.0; layer.out_dim()],
                v_bias: vec![0.0; layer.out_dim()],
            })
            .collect();

        Self {
            beta1: ADAM_BETA1,
            beta2: ADAM_BETA2,
            epsilon: ADAM_EPSILON,
            step: 0,
            moments,
        }
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Reject moments that were not built for `network`
    pub fn check_shape(&self, network: &DenseNetwork) -> Result<()> {
        if self.moments.len() != network.layers.len() {
            return Err(LearnError::shape(
                "optimizer layers",
                network.layers.len(),
                self.moments.len(),
            ));
        }
        for (mom, layer) in self.moments.iter().zip(network.layers.iter()) {
            let rows_ok = mom.m_weights.len() == layer.out_dim()
                && mom.v_weights.len() == layer.out_dim()
                && mom
                    .m_weights
                    .iter()
                    .chain(mom.v_weights.iter())
                    .all(|row| row.len() == layer.in_dim());
            if !rows_ok || mom.m_bias.len() != layer.out_dim() || mom.v_bias.len() != layer.out_dim() {
                return Err(LearnError::Validation(format!(
                    "optimizer moments do not match layer {}x{}",
                    layer.out_dim(),
                    layer.in_dim()
                )));
            }
        }
        Ok(())
    }

    /// Apply one update to `network` in place.
    pub fn apply(
        &mut self,
        network: &mut DenseNetwork,
        grads: &[LayerGradient],
        learning_rate: f64,
    ) -> Result<()> {
        if grads.len() != network.layers.len() || self.moments.len() != network.layers.len() {
            return Err(LearnError::shape(
                "optimizer layers",
                network.layers.len(),
                grads.len(),
            ));
        }
        if !learning_rate.is_finite() {
            return Err(LearnError::Validation(format!(
                "learning rate must be finite, got {learning_rate}"
            )));
        }

        self.step += 1;
        let t = self.step as f64;
        let bias_c1 = 1.0 - self.beta1.powf(t);
        let bias_c2 = 1.0 - self.beta2.powf(t);
        let lr = learning_rate * (bias_c2.sqrt() / bias_c1);

        let (b1, b2, eps) = (self.beta1, self.beta2, self.epsilon);
        for ((layer, grad), mom) in network
            .layers
            .iter_mut()
            .zip(grads.iter())
            .zip(self.moments.iter_mut())
        {
            for (o, row) in layer.weights.iter_mut().enumerate() {
                for (i, w) in row.iter_mut().enumerate() {
                    adam_scalar_step(
                        w,
                        &mut mom.m_weights[o][i],
                        &mut mom.v_weights[o][i],
                        grad.weights[o][i],
                        lr,
                        (b1, b2, eps),
                    );
                }
            }
            for (o, b) in layer.bias.iter_mut().enumerate() {
                adam_scalar_step(
                    b,
                    &mut mom.m_bias[o],
                    &mut mom.v_bias[o],
                    grad.bias[o],
                    lr,
                    (b1, b2, eps),
                );
            }
        }

        Ok(())
    }
}

fn adam_scalar_step(
    w: &mut f64,
    m: &mut f64,
    v: &mut f64,
    g: f64,
    lr: f64,
    (b1, b2, eps): (f64, f64, f64),
) {
    *m = *m * b1 + g * (1.0 - b1);
    *v = *v * b2 + g * g * (1.0 - b2);
    *w -= (*m / (v.sqrt() + eps)) * lr;
}
