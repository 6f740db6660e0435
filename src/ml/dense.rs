//! Dense neural network (CPU-only).
//!
//! Small fully connected MLPs used as Q-value approximators:
//! - forward inference with explicit shape validation
//! - batched mean-squared-error gradients via backpropagation
//!
//! Design goals:
//! - Stable, deterministic, dependency-light.
//! - Explicit shape validation (fail fast, never coerce).

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{LearnError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Tanh,
    Sigmoid,
}

impl Default for Activation {
    fn default() -> Self {
        Self::Linear
    }
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => sigmoid(x),
        }
    }

    /// Derivative expressed in terms of the activation output `y = f(x)`.
    fn derivative_from_output(self, y: f64) -> f64 {
        match self {
            Activation::Linear => 1.0,
            Activation::Relu => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Tanh => 1.0 - y * y,
            Activation::Sigmoid => y * (1.0 - y),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weights shape: [out_dim][in_dim]
    pub weights: Vec<Vec<f64>>,
    /// Bias shape: [out_dim]
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    /// Glorot-uniform initialized layer with zero bias
    pub fn glorot<R: Rng + ?Sized>(
        in_dim: usize,
        out_dim: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        let limit = (6.0 / (in_dim + out_dim) as f64).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        let weights = (0..out_dim)
            .map(|_| (0..in_dim).map(|_| dist.sample(rng)).collect())
            .collect();

        Self {
            weights,
            bias: vec![0.0; out_dim],
            activation,
        }
    }

    pub fn in_dim(&self) -> usize {
        self.weights.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn out_dim(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, x: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(self.bias.iter())
            .map(|(row, b)| {
                let sum = row.iter().zip(x.iter()).fold(*b, |acc, (w, v)| acc + w * v);
                self.activation.apply(sum)
            })
            .collect()
    }

    fn zeros_like(&self) -> LayerGradient {
        LayerGradient {
            weights: vec![vec![0.0; self.in_dim()]; self.out_dim()],
            bias: vec![0.0; self.out_dim()],
        }
    }
}

/// Gradient of the loss with respect to one layer's parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradient {
    /// Shape: [out_dim][in_dim]
    pub weights: Vec<Vec<f64>>,
    /// Shape: [out_dim]
    pub bias: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseNetwork {
    /// Expected input dimension.
    pub input_dim: usize,

    pub layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Build a network `input_dim -> widths[0] -> ... -> widths[n-1]`.
    ///
    /// Every layer but the last uses `hidden`; the last uses `output`.
    pub fn init<R: Rng + ?Sized>(
        input_dim: usize,
        widths: &[usize],
        hidden: Activation,
        output: Activation,
        rng: &mut R,
    ) -> Self {
        let mut layers = Vec::with_capacity(widths.len());
        let mut in_dim = input_dim;
        for (idx, &out_dim) in widths.iter().enumerate() {
            let activation = if idx + 1 == widths.len() {
                output
            } else {
                hidden
            };
            layers.push(DenseLayer::glorot(in_dim, out_dim, activation, rng));
            in_dim = out_dim;
        }

        Self { input_dim, layers }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.input_dim == 0 {
            return Err("input_dim must be > 0".to_string());
        }
        if self.layers.is_empty() {
            return Err("layers must not be empty".to_string());
        }

        let mut expected_in = self.input_dim;
        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.out_dim() == 0 {
                return Err(format!("layer[{idx}] out_dim must be > 0"));
            }
            if layer.bias.len() != layer.out_dim() {
                return Err(format!(
                    "layer[{idx}] bias len {} != out_dim {}",
                    layer.bias.len(),
                    layer.out_dim()
                ));
            }
            for (r, row) in layer.weights.iter().enumerate() {
                if row.len() != expected_in {
                    return Err(format!(
                        "layer[{idx}] weights row {r} len {} != expected in_dim {expected_in}",
                        row.len()
                    ));
                }
                if row.iter().any(|v| !v.is_finite()) {
                    return Err(format!("layer[{idx}] weights contain non-finite values"));
                }
            }
            if layer.bias.iter().any(|v| !v.is_finite()) {
                return Err(format!("layer[{idx}] bias contain non-finite values"));
            }
            expected_in = layer.out_dim();
        }
        Ok(())
    }

    /// Per-layer `(in_dim, out_dim, activation)` triples
    pub fn topology(&self) -> Vec<(usize, usize, Activation)> {
        self.layers
            .iter()
            .map(|l| (l.in_dim(), l.out_dim(), l.activation))
            .collect()
    }

    pub fn output_dim(&self) -> usize {
        self.layers.last().map(|l| l.out_dim()).unwrap_or(0)
    }

    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.out_dim() * l.in_dim() + l.bias.len())
            .sum()
    }

    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.check_input(input)?;

        let mut x: Vec<f64> = input.to_vec();
        for layer in &self.layers {
            x = layer.forward(&x);
        }
        Ok(x)
    }

    /// Mean-squared-error loss and its gradients over a batch.
    ///
    /// The loss is averaged over every output of every sample, so a batch of
    /// `n` samples with `k` outputs contributes `sum((y - t)^2) / (n * k)`.
    pub fn mse_gradients(
        &self,
        inputs: &[Vec<f64>],
        targets: &[Vec<f64>],
    ) -> Result<(f64, Vec<LayerGradient>)> {
        if inputs.len() != targets.len() {
            return Err(LearnError::shape(
                "gradient batch targets",
                inputs.len(),
                targets.len(),
            ));
        }
        if inputs.is_empty() {
            return Err(LearnError::Validation(
                "gradient batch must not be empty".to_string(),
            ));
        }

        let out_dim = self.output_dim();
        for (input, target) in inputs.iter().zip(targets) {
            self.check_input(input)?;
            if target.len() != out_dim {
                return Err(LearnError::shape("gradient target", out_dim, target.len()));
            }
        }

        let denom = (inputs.len() * out_dim) as f64;
        let mut grads: Vec<LayerGradient> = self.layers.iter().map(|l| l.zeros_like()).collect();
        let mut loss_sum = 0.0;

        for (input, target) in inputs.iter().zip(targets) {
            let activations = self.trace(input);
            let output = &activations[activations.len() - 1];

            // dL/dy for this sample
            let mut delta: Vec<f64> = output
                .iter()
                .zip(target.iter())
                .map(|(y, t)| {
                    let diff = y - t;
                    loss_sum += diff * diff;
                    2.0 * diff / denom
                })
                .collect();

            for li in (0..self.layers.len()).rev() {
                let layer = &self.layers[li];
                let layer_in = &activations[li];
                let layer_out = &activations[li + 1];

                // dL/dz
                for (d, y) in delta.iter_mut().zip(layer_out.iter()) {
                    *d *= layer.activation.derivative_from_output(*y);
                }

                let grad = &mut grads[li];
                for (o, d) in delta.iter().enumerate() {
                    if *d == 0.0 {
                        continue;
                    }
                    grad.bias[o] += d;
                    for (gw, x) in grad.weights[o].iter_mut().zip(layer_in.iter()) {
                        *gw += d * x;
                    }
                }

                if li > 0 {
                    let mut prev = vec![0.0; layer.in_dim()];
                    for (row, d) in layer.weights.iter().zip(delta.iter()) {
                        if *d == 0.0 {
                            continue;
                        }
                        for (p, w) in prev.iter_mut().zip(row.iter()) {
                            *p += d * w;
                        }
                    }
                    delta = prev;
                }
            }
        }

        Ok((loss_sum / denom, grads))
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if input.len() != self.input_dim {
            return Err(LearnError::shape(
                "DenseNetwork input",
                self.input_dim,
                input.len(),
            ));
        }
        Ok(())
    }

    /// Activations of every layer, input first.
    fn trace(&self, input: &[f64]) -> Vec<Vec<f64>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_vec());
        for layer in &self.layers {
            let next = layer.forward(&activations[activations.len() - 1]);
            activations.push(next);
        }
        activations
    }
}

fn sigmoid(x: f64) -> f64 {
    // Numerically-stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn single_layer(weights: Vec<Vec<f64>>, bias: Vec<f64>, activation: Activation) -> DenseNetwork {
        DenseNetwork {
            input_dim: weights[0].len(),
            layers: vec![DenseLayer {
                weights,
                bias,
                activation,
            }],
        }
    }

    #[test]
    fn forward_sigmoid() {
        let net = single_layer(vec![vec![1.0, 2.0]], vec![0.0], Activation::Sigmoid);
        net.validate().unwrap();

        let p0 = net.forward(&[0.0, 0.0]).unwrap();
        assert!((p0[0] - 0.5).abs() < 1e-12);

        let p1 = net.forward(&[1.0, 0.0]).unwrap();
        assert!(p1[0] > 0.5);
    }

    #[test]
    fn counts_parameters() {
        let net = DenseNetwork::init(4, &[8, 3], Activation::Relu, Activation::Linear, &mut StdRng::seed_from_u64(2));
        // (4*8 + 8) + (8*3 + 3)
        assert_eq!(net.parameter_count(), 67);
    }

    #[test]
    fn validates_shapes() {
        let bad = DenseNetwork {
            input_dim: 3,
            layers: vec![DenseLayer {
                weights: vec![vec![1.0, 2.0]], // in_dim mismatch
                bias: vec![0.0],
                activation: Activation::Linear,
            }],
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn forward_rejects_wrong_input_len() {
        let net = single_layer(vec![vec![1.0, 2.0]], vec![0.0], Activation::Linear);
        let err = net.forward(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            LearnError::ShapeMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn init_builds_requested_topology() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = DenseNetwork::init(
            15,
            &[256, 128, 64, 32, 3],
            Activation::Relu,
            Activation::Linear,
            &mut rng,
        );
        net.validate().unwrap();

        let dims: Vec<(usize, usize)> = net.topology().iter().map(|(i, o, _)| (*i, *o)).collect();
        assert_eq!(dims, vec![(15, 256), (256, 128), (128, 64), (64, 32), (32, 3)]);
        assert_eq!(net.layers[4].activation, Activation::Linear);
        assert_eq!(net.layers[0].activation, Activation::Relu);
        assert_eq!(net.output_dim(), 3);
    }

    #[test]
    fn init_is_deterministic_for_seed() {
        let a = DenseNetwork::init(4, &[8, 2], Activation::Relu, Activation::Linear, &mut StdRng::seed_from_u64(1));
        let b = DenseNetwork::init(4, &[8, 2], Activation::Relu, Activation::Linear, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }

    #[test]
    fn linear_gradient_matches_closed_form() {
        // y = w*x + b, loss = (y - t)^2 with one sample and one output
        let net = single_layer(vec![vec![2.0]], vec![1.0], Activation::Linear);
        let (loss, grads) = net.mse_gradients(&[vec![3.0]], &[vec![4.0]]).unwrap();

        // y = 7, diff = 3
        assert!((loss - 9.0).abs() < 1e-12);
        assert!((grads[0].weights[0][0] - 18.0).abs() < 1e-12);
        assert!((grads[0].bias[0] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(11);
        let net = DenseNetwork::init(3, &[5, 2], Activation::Tanh, Activation::Linear, &mut rng);
        let inputs = vec![vec![0.3, -0.2, 0.9], vec![-0.5, 0.1, 0.4]];
        let targets = vec![vec![0.5, -1.0], vec![0.0, 0.25]];

        let (_, grads) = net.mse_gradients(&inputs, &targets).unwrap();

        let h = 1e-6;
        let mut plus = net.clone();
        plus.layers[0].weights[2][1] += h;
        let mut minus = net.clone();
        minus.layers[0].weights[2][1] -= h;
        let (lp, _) = plus.mse_gradients(&inputs, &targets).unwrap();
        let (lm, _) = minus.mse_gradients(&inputs, &targets).unwrap();
        let numeric = (lp - lm) / (2.0 * h);

        assert!((numeric - grads[0].weights[2][1]).abs() < 1e-6);
    }

    #[test]
    fn gradient_rejects_bad_target_len() {
        let net = single_layer(vec![vec![1.0, 2.0]], vec![0.0], Activation::Linear);
        let result = net.mse_gradients(&[vec![1.0, 1.0]], &[vec![1.0, 2.0]]);
        assert!(matches!(result, Err(LearnError::ShapeMismatch { .. })));
    }
}
