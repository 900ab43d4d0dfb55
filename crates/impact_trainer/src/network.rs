//! Fixed-topology dense regression network
//!
//! input → Dense(128, ReLU) → Dropout → Dense(64, ReLU) → Dropout →
//! Dense(32, ReLU) → Dense(1)
//!
//! Weights are Glorot-uniform, biases start at zero. Dropout is inverted
//! (kept activations are scaled by `1 / (1 - rate)`) and only active while
//! training.

use canopy_impact_core::{ImpactError, Result};
use serde::{Deserialize, Serialize};

use crate::deterministic::DeterministicRng;

pub const HIDDEN_UNITS: [usize; 3] = [128, 64, 32];

/// Number of leading hidden layers followed by dropout
const DROPOUT_LAYERS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Relu => z.max(0.0),
            Activation::Linear => z,
        }
    }

    fn derivative(self, z: f64) -> f64 {
        match self {
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Linear => 1.0,
        }
    }
}

/// Fully connected layer. `weights` is row-major `outputs × inputs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub inputs: usize,
    pub outputs: usize,
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
    pub activation: Activation,
    /// Dropout rate applied to this layer's output during training
    pub dropout: f64,
}

impl DenseLayer {
    fn glorot(
        inputs: usize,
        outputs: usize,
        activation: Activation,
        dropout: f64,
        rng: &mut DeterministicRng,
    ) -> Self {
        let limit = (6.0 / (inputs + outputs) as f64).sqrt();
        let weights = (0..inputs * outputs)
            .map(|_| rng.uniform(-limit, limit))
            .collect();
        Self {
            inputs,
            outputs,
            weights,
            bias: vec![0.0; outputs],
            activation,
            dropout,
        }
    }

    /// Pre-activation `W·x + b`
    fn linear(&self, x: &[f64]) -> Vec<f64> {
        self.weights
            .chunks_exact(self.inputs)
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
            .collect()
    }
}

/// Gradient buffers laid out like [`ImpactNetwork::parameters_mut`]
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub tensors: Vec<Vec<f64>>,
}

impl Gradients {
    fn zeros_like(network: &ImpactNetwork) -> Self {
        let tensors = network
            .layers
            .iter()
            .flat_map(|l| [vec![0.0; l.weights.len()], vec![0.0; l.bias.len()]])
            .collect();
        Self { tensors }
    }
}

/// Cached forward pass for one sample
struct Trace {
    /// Input to each layer, plus the final output
    activations: Vec<Vec<f64>>,
    pre_activations: Vec<Vec<f64>>,
    /// Per-layer dropout multipliers (empty when no dropout)
    masks: Vec<Vec<f64>>,
}

/// Regression network predicting the impact score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactNetwork {
    pub input_width: usize,
    pub layers: Vec<DenseLayer>,
}

impl ImpactNetwork {
    /// Build the fixed topology for `input_width` features
    pub fn new(input_width: usize, dropout_rate: f64, rng: &mut DeterministicRng) -> Result<Self> {
        if input_width == 0 {
            return Err(ImpactError::Training(
                "network needs at least one input feature".to_string(),
            ));
        }

        let mut layers = Vec::with_capacity(HIDDEN_UNITS.len() + 1);
        let mut fan_in = input_width;
        for (idx, &units) in HIDDEN_UNITS.iter().enumerate() {
            let dropout = if idx < DROPOUT_LAYERS { dropout_rate } else { 0.0 };
            layers.push(DenseLayer::glorot(fan_in, units, Activation::Relu, dropout, rng));
            fan_in = units;
        }
        layers.push(DenseLayer::glorot(fan_in, 1, Activation::Linear, 0.0, rng));

        Ok(Self {
            input_width,
            layers,
        })
    }

    /// Total trainable parameter count
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.len() + l.bias.len())
            .sum()
    }

    /// Weight and bias buffers in layer order: `[w0, b0, w1, b1, ...]`
    pub fn parameters_mut(&mut self) -> Vec<&mut Vec<f64>> {
        self.layers
            .iter_mut()
            .flat_map(|l| [&mut l.weights, &mut l.bias])
            .collect()
    }

    fn check_width(&self, row: &[f64]) -> Result<()> {
        if row.len() != self.input_width {
            return Err(ImpactError::DimensionMismatch {
                expected: self.input_width,
                actual: row.len(),
            });
        }
        Ok(())
    }

    /// Inference for one row (dropout disabled)
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        self.check_width(row)?;
        let mut x = row.to_vec();
        for layer in &self.layers {
            x = layer
                .linear(&x)
                .into_iter()
                .map(|z| layer.activation.apply(z))
                .collect();
        }
        Ok(x[0])
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter().map(|r| self.predict_row(r)).collect()
    }

    /// Mean squared error and mean absolute error over `rows`
    pub fn evaluate(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<(f64, f64)> {
        if rows.is_empty() {
            return Err(ImpactError::Training("nothing to evaluate".to_string()));
        }
        let predictions = self.predict(rows)?;
        let n = predictions.len() as f64;
        let (se, ae) = predictions
            .iter()
            .zip(targets)
            .fold((0.0, 0.0), |(se, ae), (p, t)| {
                let err = p - t;
                (se + err * err, ae + err.abs())
            });
        Ok((se / n, ae / n))
    }

    fn forward_train(&self, row: &[f64], rng: &mut DeterministicRng) -> Trace {
        let mut activations = vec![row.to_vec()];
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut masks = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            let z = layer.linear(&activations[activations.len() - 1]);
            let mut a: Vec<f64> = z.iter().map(|&v| layer.activation.apply(v)).collect();

            let mask: Vec<f64> = if layer.dropout > 0.0 {
                let keep = 1.0 - layer.dropout;
                (0..a.len())
                    .map(|_| if rng.next_f64() < keep { 1.0 / keep } else { 0.0 })
                    .collect()
            } else {
                Vec::new()
            };
            for (v, m) in a.iter_mut().zip(&mask) {
                *v *= m;
            }

            pre_activations.push(z);
            masks.push(mask);
            activations.push(a);
        }

        Trace {
            activations,
            pre_activations,
            masks,
        }
    }

    /// Mean squared error gradients over one mini-batch.
    ///
    /// Returns the batch loss (computed on the dropout-perturbed forward pass)
    /// and the gradients.
    pub fn batch_gradients(
        &self,
        rows: &[&[f64]],
        targets: &[f64],
        rng: &mut DeterministicRng,
    ) -> Result<(f64, Gradients)> {
        if rows.is_empty() || rows.len() != targets.len() {
            return Err(ImpactError::Training(format!(
                "batch has {} rows and {} targets",
                rows.len(),
                targets.len()
            )));
        }

        let mut grads = Gradients::zeros_like(self);
        let batch = rows.len() as f64;
        let mut loss = 0.0;

        for (row, &target) in rows.iter().zip(targets) {
            self.check_width(row)?;
            let trace = self.forward_train(row, rng);
            let prediction = trace.activations[self.layers.len()][0];
            let err = prediction - target;
            loss += err * err;

            let mut delta = vec![2.0 * err / batch];
            for (idx, layer) in self.layers.iter().enumerate().rev() {
                for (d, m) in delta.iter_mut().zip(&trace.masks[idx]) {
                    *d *= m;
                }
                for (d, &z) in delta.iter_mut().zip(&trace.pre_activations[idx]) {
                    *d *= layer.activation.derivative(z);
                }

                let input = &trace.activations[idx];
                let w_grad = &mut grads.tensors[2 * idx];
                for (o, &d) in delta.iter().enumerate() {
                    if d == 0.0 {
                        continue;
                    }
                    let row_grad = &mut w_grad[o * layer.inputs..(o + 1) * layer.inputs];
                    for (g, &x) in row_grad.iter_mut().zip(input) {
                        *g += d * x;
                    }
                }
                for (g, &d) in grads.tensors[2 * idx + 1].iter_mut().zip(&delta) {
                    *g += d;
                }

                if idx > 0 {
                    let mut previous = vec![0.0; layer.inputs];
                    for (o, &d) in delta.iter().enumerate() {
                        if d == 0.0 {
                            continue;
                        }
                        let weights = &layer.weights[o * layer.inputs..(o + 1) * layer.inputs];
                        for (p, &w) in previous.iter_mut().zip(weights) {
                            *p += d * w;
                        }
                    }
                    delta = previous;
                }
            }
        }

        Ok((loss / batch, grads))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(width: usize) -> ImpactNetwork {
        let mut rng = DeterministicRng::new(42);
        ImpactNetwork::new(width, 0.3, &mut rng).unwrap()
    }

    #[test]
    fn test_topology() {
        let net = network(5);
        let shapes: Vec<(usize, usize)> = net.layers.iter().map(|l| (l.inputs, l.outputs)).collect();
        assert_eq!(shapes, vec![(5, 128), (128, 64), (64, 32), (32, 1)]);
        let dropouts: Vec<f64> = net.layers.iter().map(|l| l.dropout).collect();
        assert_eq!(dropouts, vec![0.3, 0.3, 0.0, 0.0]);
        assert_eq!(net.layers[3].activation, Activation::Linear);
        assert_eq!(
            net.parameter_count(),
            5 * 128 + 128 + 128 * 64 + 64 + 64 * 32 + 32 + 32 + 1
        );
    }

    #[test]
    fn test_zero_width_rejected() {
        let mut rng = DeterministicRng::new(1);
        assert!(ImpactNetwork::new(0, 0.3, &mut rng).is_err());
    }

    #[test]
    fn test_same_seed_same_weights() {
        assert_eq!(network(4), network(4));
    }

    #[test]
    fn test_inference_is_deterministic() -> Result<()> {
        let net = network(3);
        let row = [0.5, -1.0, 2.0];
        assert_eq!(net.predict_row(&row)?, net.predict_row(&row)?);
        Ok(())
    }

    #[test]
    fn test_width_mismatch() {
        let net = network(3);
        assert!(matches!(
            net.predict_row(&[1.0]),
            Err(ImpactError::DimensionMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_gradients_match_finite_differences() -> Result<()> {
        let mut rng = DeterministicRng::new(9);
        let net = ImpactNetwork::new(3, 0.0, &mut rng)?;
        let row = [0.3, -0.2, 0.8];
        let target = 1.5;

        let (_, grads) = net.batch_gradients(&[&row[..]], &[target], &mut rng)?;

        let eps = 1e-6;
        for (tensor_idx, param_idx) in [(0, 0), (1, 3), (6, 7), (7, 0)] {
            let mut plus = net.clone();
            plus.parameters_mut()[tensor_idx][param_idx] += eps;
            let mut minus = net.clone();
            minus.parameters_mut()[tensor_idx][param_idx] -= eps;

            let (loss_plus, _) = plus.evaluate(&[row.to_vec()], &[target])?;
            let (loss_minus, _) = minus.evaluate(&[row.to_vec()], &[target])?;
            let numeric = (loss_plus - loss_minus) / (2.0 * eps);
            let analytic = grads.tensors[tensor_idx][param_idx];
            assert!(
                (numeric - analytic).abs() < 1e-4 * (1.0 + numeric.abs()),
                "tensor {tensor_idx}[{param_idx}]: numeric {numeric} vs analytic {analytic}"
            );
        }
        Ok(())
    }
}
