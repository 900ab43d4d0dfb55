//! Mini-batch trainer for the impact network
//!
//! Adam on mean squared error, per-epoch reshuffling, and early stopping on
//! validation loss with best-weight restoration.

use canopy_impact_core::{ImpactError, Result, TrainingConfig};
use tracing::{debug, info};

use crate::deterministic::DeterministicRng;
use crate::network::ImpactNetwork;
use crate::optimizer::Adam;

/// Stops training when the monitored loss stops improving
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    /// Number of epochs to wait for improvement
    patience: usize,
    /// Minimum decrease that counts as improvement
    min_delta: f64,
    best_loss: f64,
    best_epoch: usize,
    epochs_without_improvement: usize,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f64) -> Self {
        Self {
            patience,
            min_delta,
            best_loss: f64::INFINITY,
            best_epoch: 0,
            epochs_without_improvement: 0,
        }
    }

    /// Record an epoch's loss. Returns `true` if it is a new best.
    pub fn observe(&mut self, epoch: usize, loss: f64) -> bool {
        if loss < self.best_loss - self.min_delta {
            self.best_loss = loss;
            self.best_epoch = epoch;
            self.epochs_without_improvement = 0;
            true
        } else {
            self.epochs_without_improvement += 1;
            false
        }
    }

    pub fn should_stop(&self) -> bool {
        self.epochs_without_improvement >= self.patience
    }

    pub fn best_loss(&self) -> f64 {
        self.best_loss
    }

    pub fn best_epoch(&self) -> usize {
        self.best_epoch
    }
}

/// Losses recorded at the end of one epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochRecord {
    pub epoch: usize,
    pub loss: f64,
    pub val_loss: f64,
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Network with the best validation weights restored
    pub network: ImpactNetwork,
    pub history: Vec<EpochRecord>,
    pub best_epoch: usize,
    pub best_val_loss: f64,
    pub stopped_early: bool,
}

impl TrainingOutcome {
    pub fn epochs_run(&self) -> usize {
        self.history.len()
    }
}

/// Trainer for the fixed-topology impact network
pub struct ImpactTrainer {
    config: TrainingConfig,
    seed: i64,
}

impl ImpactTrainer {
    pub fn new(config: TrainingConfig, seed: i64) -> Self {
        Self { config, seed }
    }

    /// Train on `(x_train, y_train)`, monitoring `(x_val, y_val)`.
    ///
    /// With an empty validation partition the training loss is monitored
    /// instead.
    pub fn train(
        &self,
        x_train: &[Vec<f64>],
        y_train: &[f64],
        x_val: &[Vec<f64>],
        y_val: &[f64],
    ) -> Result<TrainingOutcome> {
        if x_train.is_empty() {
            return Err(ImpactError::Training("no training rows".to_string()));
        }
        if x_train.len() != y_train.len() || x_val.len() != y_val.len() {
            return Err(ImpactError::Training(
                "feature and target counts differ".to_string(),
            ));
        }

        let input_width = x_train[0].len();
        let mut rng = DeterministicRng::new(self.seed);
        let mut network = ImpactNetwork::new(input_width, self.config.dropout_rate, &mut rng)?;
        let mut optimizer = Adam::default_params(self.config.learning_rate);
        let mut early_stopping = EarlyStopping::new(self.config.patience, 0.0);

        info!(
            "Training network: {} inputs, {} parameters, {} training rows, {} validation rows",
            input_width,
            network.parameter_count(),
            x_train.len(),
            x_val.len()
        );

        let batch_size = self.config.batch_size.max(1);
        let mut best_network = network.clone();
        let mut history = Vec::new();
        let mut stopped_early = false;

        for epoch in 0..self.config.epochs {
            let order = rng.permutation(x_train.len());
            let mut epoch_loss = 0.0;

            for batch in order.chunks(batch_size) {
                let rows: Vec<&[f64]> = batch.iter().map(|&i| x_train[i].as_slice()).collect();
                let targets: Vec<f64> = batch.iter().map(|&i| y_train[i]).collect();

                let (loss, grads) = network.batch_gradients(&rows, &targets, &mut rng)?;
                optimizer.step(network.parameters_mut(), &grads);
                epoch_loss += loss * batch.len() as f64;
            }
            epoch_loss /= x_train.len() as f64;

            let val_loss = if x_val.is_empty() {
                epoch_loss
            } else {
                network.evaluate(x_val, y_val)?.0
            };
            if !val_loss.is_finite() {
                return Err(ImpactError::Training(format!(
                    "loss diverged at epoch {}",
                    epoch + 1
                )));
            }

            debug!(
                "Epoch {}/{}: loss={:.4} val_loss={:.4}",
                epoch + 1,
                self.config.epochs,
                epoch_loss,
                val_loss
            );
            history.push(EpochRecord {
                epoch: epoch + 1,
                loss: epoch_loss,
                val_loss,
            });

            if early_stopping.observe(epoch + 1, val_loss) {
                best_network = network.clone();
            }
            if early_stopping.should_stop() {
                info!(
                    "Early stopping at epoch {}: no improvement for {} epochs",
                    epoch + 1,
                    self.config.patience
                );
                stopped_early = true;
                break;
            }
        }

        if history.is_empty() {
            return Err(ImpactError::Training("no epochs were run".to_string()));
        }

        info!(
            "Restoring weights from epoch {} (val_loss={:.4})",
            early_stopping.best_epoch(),
            early_stopping.best_loss()
        );

        Ok(TrainingOutcome {
            network: best_network,
            history,
            best_epoch: early_stopping.best_epoch(),
            best_val_loss: early_stopping.best_loss(),
            stopped_early,
        })
    }
}
