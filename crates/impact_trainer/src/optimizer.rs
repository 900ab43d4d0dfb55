//! Adam optimizer

use crate::network::Gradients;

/// Adam with bias-corrected step size
///
/// lr_t = lr · √(1 − β2ᵗ) / (1 − β1ᵗ)
/// θ ← θ − lr_t · m / (√v + ε)
#[derive(Debug, Clone)]
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    t: u64,
    m: Vec<Vec<f64>>,
    v: Vec<Vec<f64>>,
}

impl Adam {
    pub fn new(lr: f64, beta1: f64, beta2: f64, epsilon: f64) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// β1 = 0.9, β2 = 0.999, ε = 1e-7
    pub fn default_params(lr: f64) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-7)
    }

    pub fn step_count(&self) -> u64 {
        self.t
    }

    /// Apply one update. `params` and `grads` must share layout.
    pub fn step(&mut self, params: Vec<&mut Vec<f64>>, grads: &Gradients) {
        if self.m.is_empty() {
            self.m = grads.tensors.iter().map(|g| vec![0.0; g.len()]).collect();
            self.v = self.m.clone();
        }
        self.t += 1;

        let t = self.t as i32;
        let lr_t = self.lr * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t));

        for (((param, grad), m), v) in params
            .into_iter()
            .zip(&grads.tensors)
            .zip(&mut self.m)
            .zip(&mut self.v)
        {
            for (((p, &g), m), v) in param.iter_mut().zip(grad).zip(m.iter_mut()).zip(v.iter_mut()) {
                *m = self.beta1 * *m + (1.0 - self.beta1) * g;
                *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
                *p -= lr_t * *m / (v.sqrt() + self.epsilon);
            }
        }
    }
}
